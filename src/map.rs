use serde::Serialize;

use crate::config::Workability;
use crate::stages::{NormalizationOutcome, TierThresholds};
use crate::tile::Tile;

/// Inclusive coordinate range covered by a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x) + 1
    }

    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y) + 1
    }
}

/// Population-level results recorded by the pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub normalization: Option<NormalizationOutcome>,
    pub thresholds: TierThresholds,
}

/// The full tile population of one map export.
#[derive(Debug, Clone)]
pub struct TileMap {
    name: String,
    tiles: Vec<Tile>,
    pub summary: RunSummary,
}

impl TileMap {
    pub fn new(name: impl Into<String>, tiles: Vec<Tile>) -> Self {
        Self {
            name: name.into(),
            tiles,
            summary: RunSummary::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.x == x && tile.y == y)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.tiles.first()?;
        let seed = Bounds {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(self.tiles.iter().fold(seed, |bounds, tile| Bounds {
            min_x: bounds.min_x.min(tile.x),
            max_x: bounds.max_x.max(tile.x),
            min_y: bounds.min_y.min(tile.y),
            max_y: bounds.max_y.max(tile.y),
        }))
    }

    pub fn workable_count(&self, rules: &Workability) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.is_workable(rules))
            .count()
    }

    /// Number of tiles carrying each tier label, in threshold order.
    pub fn tier_counts(&self) -> Vec<(String, usize)> {
        self.summary
            .thresholds
            .labels()
            .map(|label| {
                let count = self
                    .tiles
                    .iter()
                    .filter(|tile| tile.tier.as_deref() == Some(label))
                    .count();
                (label.to_string(), count)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_every_tile() {
        let map = TileMap::new(
            "bounds",
            vec![
                Tile::new(3, -1, "TERRAIN_GRASS"),
                Tile::new(-2, 4, "TERRAIN_PLAINS"),
                Tile::new(0, 0, "TERRAIN_OCEAN"),
            ],
        );
        let bounds = map.bounds().unwrap();
        assert_eq!(
            bounds,
            Bounds {
                min_x: -2,
                max_x: 3,
                min_y: -1,
                max_y: 4
            }
        );
        assert_eq!(bounds.width(), 6);
        assert_eq!(bounds.height(), 6);
    }

    #[test]
    fn empty_map_has_no_bounds() {
        assert!(TileMap::new("empty", Vec::new()).bounds().is_none());
    }

    #[test]
    fn workable_count_skips_ocean_and_ice() {
        let map = TileMap::new(
            "count",
            vec![
                Tile::new(0, 0, "TERRAIN_GRASS"),
                Tile::new(1, 0, "TERRAIN_OCEAN"),
                Tile::new(2, 0, "TERRAIN_TUNDRA").with_feature("FEATURE_ICE"),
            ],
        );
        assert_eq!(map.workable_count(&Workability::default()), 1);
        assert_eq!(map.tile_at(1, 0).map(|t| t.terrain.as_str()), Some("TERRAIN_OCEAN"));
    }
}
