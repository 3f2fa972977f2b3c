pub mod config;
pub mod engine;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod map;
pub mod stages;
pub mod tile;

pub use config::{ConfigError, ConfigLoader, ScoringConfig};
pub use engine::{Engine, EngineBuilder, EngineSettings, RunReport};
pub use export::{ExportOptions, MapDocument};
pub use map::TileMap;
pub use tile::{Appeal, Tile, Yields};
