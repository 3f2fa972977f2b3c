use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use civtiles::{
    engine::{EngineBuilder, EngineSettings},
    export::{ExportOptions, MapDocument},
    ingest, logging, ConfigLoader, ScoringConfig,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Score and tier strategy-game map exports")]
struct Cli {
    /// Log filter directive, e.g. `debug` or `civtiles::ingest=debug` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a CSV map export into a scored JSON document
    Convert {
        /// Map export to read
        input: PathBuf,

        /// JSON document to write
        output: PathBuf,

        /// Scoring config (YAML, or JSON by extension); built-in tables when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Include base food/production/gold on every tile
        #[arg(long)]
        include_yields: bool,

        /// Keep the export's row order instead of sorting by score
        #[arg(long)]
        keep_input_order: bool,

        /// Log scoring progress every N tiles (0 disables)
        #[arg(long, default_value_t = 0)]
        progress_every: usize,
    },
    /// Print the effective scoring config as YAML
    ShowConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<ScoringConfig> {
    match path {
        Some(path) => ConfigLoader::new(".")
            .load(path)
            .with_context(|| format!("Failed to load scoring config {}", path.display())),
        None => Ok(ScoringConfig::civ6_default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref())?;

    match cli.command {
        Command::Convert {
            input,
            output,
            config,
            include_yields,
            keep_input_order,
            progress_every,
        } => {
            if !input.is_file() {
                bail!("Input file '{}' not found", input.display());
            }
            let config = load_config(config.as_deref())?;
            let mut map = ingest::read_map(&input)
                .with_context(|| format!("Failed to read map export {}", input.display()))?;

            let settings = EngineSettings {
                map_name: map.name().to_string(),
                progress_every,
            };
            let mut engine = EngineBuilder::new(settings)
                .with_standard_stages()
                .build();
            engine.run(&mut map, &config)?;

            let options = ExportOptions {
                include_yields,
                keep_input_order,
            };
            let document = MapDocument::build(&map, &options);
            let written = document
                .write(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let meta = &document.metadata;
            info!(
                target: "civtiles::cli",
                output = %written.display(),
                tiles = meta.total_tiles,
                bounds = %format!(
                    "{},{} to {},{}",
                    meta.min_x, meta.min_y, meta.max_x, meta.max_y
                ),
                "conversion complete"
            );
        }
        Command::ShowConfig { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_yaml_string()?);
        }
    }
    Ok(())
}
