use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    config::ScoringConfig,
    map::TileMap,
    stages::{NormalizationOutcome, NormalizeStage, ScoreStage, TierStage, YieldStage},
};

pub struct EngineSettings {
    pub map_name: String,
    /// Log scoring progress every N tiles; 0 disables progress logging.
    pub progress_every: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            map_name: "map".to_string(),
            progress_every: 0,
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    stages: Vec<Box<dyn Stage>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push_stage(&mut self, stage: impl Stage + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Yields, scores, normalization and tiers, in that order.
    pub fn with_standard_stages(self) -> Self {
        self.with_stage(YieldStage::new())
            .with_stage(ScoreStage::new())
            .with_stage(NormalizeStage::new())
            .with_stage(TierStage::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            stages: self.stages,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    stages: Vec<Box<dyn Stage>>,
    settings: EngineSettings,
}

impl Engine {
    /// Runs every stage over the whole population, strictly in order.
    ///
    /// The config is validated before any tile is touched.
    pub fn run(&mut self, map: &mut TileMap, config: &ScoringConfig) -> Result<RunReport> {
        config
            .validate()
            .context("scoring config rejected before scoring")?;

        let ctx = StageContext {
            config,
            map_name: &self.settings.map_name,
            progress_every: self.settings.progress_every,
        };
        let mut stages = Vec::with_capacity(self.stages.len());
        for stage in &mut self.stages {
            let start = Instant::now();
            stage
                .run(&ctx, map)
                .with_context(|| format!("stage '{}' failed", stage.name()))?;
            let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
            debug!(
                target: "civtiles::engine",
                stage = stage.name(),
                duration_ms,
                "stage finished"
            );
            stages.push(StageReport {
                name: stage.name().to_string(),
                duration_ms,
            });
        }

        let report = RunReport {
            stages,
            tiles: map.len(),
            workable: map.workable_count(&config.workability),
            normalization: map.summary.normalization.clone(),
        };
        match &report.normalization {
            Some(NormalizationOutcome::Normalized { average, .. }) => info!(
                target: "civtiles::engine",
                map = %self.settings.map_name,
                tiles = report.tiles,
                workable = report.workable,
                average_raw_score = *average,
                "map scored"
            ),
            Some(outcome) => warn!(
                target: "civtiles::engine",
                map = %self.settings.map_name,
                tiles = report.tiles,
                ?outcome,
                "map scored without a usable baseline; tiers left empty"
            ),
            None => {}
        }
        Ok(report)
    }

    pub fn map_name(&self) -> &str {
        &self.settings.map_name
    }
}

#[derive(Clone, Debug)]
pub struct StageReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
    pub tiles: usize,
    pub workable: usize,
    pub normalization: Option<NormalizationOutcome>,
}

pub struct StageContext<'a> {
    pub config: &'a ScoringConfig,
    pub map_name: &'a str,
    pub progress_every: usize,
}

pub trait Stage {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &StageContext<'_>, map: &mut TileMap) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;

    struct Recorder(&'static str);

    impl Stage for Recorder {
        fn name(&self) -> &str {
            self.0
        }

        fn run(&mut self, _ctx: &StageContext<'_>, map: &mut TileMap) -> Result<()> {
            for tile in map.tiles_mut() {
                tile.continent.get_or_insert_with(String::new).push_str(self.0);
            }
            Ok(())
        }
    }

    #[test]
    fn stages_run_in_insertion_order() {
        let mut map = TileMap::new("order", vec![Tile::new(0, 0, "TERRAIN_GRASS")]);
        let mut engine = EngineBuilder::new(EngineSettings::default())
            .with_stage(Recorder("a"))
            .with_stage(Recorder("b"))
            .build();
        let report = engine.run(&mut map, &ScoringConfig::default()).unwrap();
        assert_eq!(map.tiles()[0].continent.as_deref(), Some("ab"));
        let names: Vec<&str> = report.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn invalid_config_stops_before_any_stage() {
        let mut config = ScoringConfig::default();
        config.tier_percentiles.insert("Z".into(), 2.0);
        let mut map = TileMap::new("invalid", vec![Tile::new(0, 0, "TERRAIN_GRASS")]);
        let mut engine = EngineBuilder::new(EngineSettings::default())
            .with_stage(Recorder("a"))
            .build();
        assert!(engine.run(&mut map, &config).is_err());
        assert_eq!(map.tiles()[0].continent, None);
    }
}
