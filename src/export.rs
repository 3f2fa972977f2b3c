use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

use crate::map::TileMap;
use crate::stages::TierThresholds;
use crate::tile::Tile;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Emit `base_food`, `base_production` and `base_gold` on every tile.
    pub include_yields: bool,
    /// Keep the export's row order instead of sorting by score.
    pub keep_input_order: bool,
}

#[derive(Debug, Serialize)]
pub struct MapDocument {
    pub metadata: MapMetadata,
    pub tiles: Vec<TileRecord>,
}

#[derive(Debug, Serialize)]
pub struct MapMetadata {
    pub name: String,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub width: i64,
    pub height: i64,
    pub total_tiles: usize,
    pub workable_tiles: usize,
    pub average_raw_score: Option<f64>,
    pub tier_thresholds: TierThresholds,
    #[serde(serialize_with = "serialize_pairs")]
    pub tier_counts: Vec<(String, usize)>,
}

#[derive(Debug, Serialize)]
pub struct TileRecord {
    pub x: i32,
    pub y: i32,
    pub terrain: String,
    pub feature: Option<String>,
    pub resource: Option<String>,
    pub resourcetype: Option<String>,
    pub continent: Option<String>,
    pub rivers: Option<String>,
    pub appeal: Option<f64>,
    pub goodyhut: bool,
    pub startingplot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_food: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_production: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_gold: Option<i32>,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub tier: Option<String>,
}

impl TileRecord {
    fn from_tile(tile: &Tile, include_yields: bool) -> Self {
        let yields = include_yields.then_some(tile.yields);
        Self {
            x: tile.x,
            y: tile.y,
            terrain: tile.terrain.clone(),
            feature: tile.feature.clone(),
            resource: tile.resource.clone(),
            resourcetype: tile.resource_type.clone(),
            continent: tile.continent.clone(),
            rivers: tile.rivers.clone(),
            appeal: tile.appeal.as_ref().and_then(|appeal| appeal.as_number()),
            goodyhut: tile.goody_hut,
            startingplot: tile.starting_plot,
            base_food: yields.map(|y| y.food),
            base_production: yields.map(|y| y.production),
            base_gold: yields.map(|y| y.gold),
            raw_score: tile.raw_score,
            normalized_score: tile.normalized_score,
            tier: tile.tier.clone(),
        }
    }
}

fn serialize_pairs<S: Serializer>(
    pairs: &[(String, usize)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (label, count) in pairs {
        map.serialize_entry(label, count)?;
    }
    map.end()
}

impl MapDocument {
    /// Snapshot of a scored map, best tiles first unless told otherwise.
    pub fn build(map: &TileMap, options: &ExportOptions) -> Self {
        let bounds = map.bounds();
        let normalization = map.summary.normalization.as_ref();
        let metadata = MapMetadata {
            name: map.name().to_string(),
            min_x: bounds.map_or(0, |b| b.min_x),
            max_x: bounds.map_or(0, |b| b.max_x),
            min_y: bounds.map_or(0, |b| b.min_y),
            max_y: bounds.map_or(0, |b| b.max_y),
            width: bounds.map_or(0, |b| b.width()),
            height: bounds.map_or(0, |b| b.height()),
            total_tiles: map.len(),
            workable_tiles: normalization.map_or(0, |outcome| outcome.workable()),
            average_raw_score: normalization.and_then(|outcome| outcome.average()),
            tier_thresholds: map.summary.thresholds.clone(),
            tier_counts: map.tier_counts(),
        };

        let mut ordered: Vec<&Tile> = map.tiles().iter().collect();
        if !options.keep_input_order {
            ordered.sort_by(|a, b| b.normalized_score.total_cmp(&a.normalized_score));
        }
        let tiles = ordered
            .into_iter()
            .map(|tile| TileRecord::from_tile(tile, options.include_yields))
            .collect();

        Self { metadata, tiles }
    }

    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the document, creating parent directories as needed.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json_pretty()?;
        fs::write(path, json)?;
        Ok(path.to_path_buf())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode map document: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::engine::{EngineBuilder, EngineSettings};
    use crate::tile::Appeal;

    fn scored_map() -> TileMap {
        let tiles = vec![
            Tile::new(0, 0, "TERRAIN_DESERT"),
            Tile::new(1, 0, "TERRAIN_GRASS")
                .with_feature("FEATURE_FOREST")
                .with_appeal(Appeal::Label("charming".into())),
            Tile::new(0, 1, "TERRAIN_OCEAN").with_resource("RESOURCE_FISH"),
            Tile::new(1, 1, "TERRAIN_PLAINS").with_appeal(Appeal::Numeric(1.0)),
        ];
        let mut map = TileMap::new("export", tiles);
        EngineBuilder::new(EngineSettings::default())
            .with_standard_stages()
            .build()
            .run(&mut map, &ScoringConfig::civ6_default())
            .unwrap();
        map
    }

    #[test]
    fn document_sorts_best_first_and_hides_yields_by_default() {
        let map = scored_map();
        let doc = MapDocument::build(&map, &ExportOptions::default());
        let scores: Vec<f64> = doc.tiles.iter().map(|t| t.normalized_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(doc.tiles.iter().all(|t| t.base_food.is_none()));

        let json = doc.to_json_pretty().unwrap();
        assert!(!json.contains("base_food"));
        assert!(json.contains("\"tier_thresholds\""));
    }

    #[test]
    fn metadata_describes_the_map() {
        let map = scored_map();
        let doc = MapDocument::build(
            &map,
            &ExportOptions {
                include_yields: true,
                keep_input_order: true,
            },
        );
        let meta = &doc.metadata;
        assert_eq!((meta.min_x, meta.max_x, meta.min_y, meta.max_y), (0, 1, 0, 1));
        assert_eq!((meta.width, meta.height), (2, 2));
        assert_eq!(meta.total_tiles, 4);
        assert_eq!(meta.workable_tiles, 3);
        assert_eq!(meta.tier_thresholds.len(), 7);
        let tiered: usize = meta.tier_counts.iter().map(|(_, n)| n).sum();
        assert_eq!(tiered, 3);

        assert_eq!(doc.tiles[1].base_food, Some(2));
        assert_eq!(doc.tiles[1].base_production, Some(1));
        assert_eq!(doc.tiles[1].appeal, None);
        assert_eq!(doc.tiles[3].appeal, Some(1.0));
        assert_eq!(doc.tiles[2].tier, None);
        assert_eq!(doc.tiles[2].normalized_score, 0.0);
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("map.json");
        let doc = MapDocument::build(&scored_map(), &ExportOptions::default());
        let written = doc.write(&target).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(written).unwrap()).unwrap();
        assert_eq!(value["tiles"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["metadata"]["name"], "export");
    }
}
