use anyhow::Result;

use crate::{
    config::ScoringConfig,
    engine::{Stage, StageContext},
    map::TileMap,
    tile::{Tile, Yields},
};

/// Terrain yields plus feature yields. Unknown codes contribute nothing.
pub fn compute_base_yields(tile: &Tile, config: &ScoringConfig) -> Yields {
    let terrain = config.yield_for(&tile.terrain);
    let feature = tile
        .feature
        .as_deref()
        .map(|feature| config.yield_for(feature))
        .unwrap_or_default();
    terrain + feature
}

pub struct YieldStage;

impl YieldStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for YieldStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for YieldStage {
    fn name(&self) -> &str {
        "yields"
    }

    fn run(&mut self, ctx: &StageContext<'_>, map: &mut TileMap) -> Result<()> {
        for tile in map.tiles_mut() {
            tile.yields = compute_base_yields(tile, ctx.config);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrain_and_feature_are_summed() {
        let config = ScoringConfig::civ6_default();
        let tile = Tile::new(0, 0, "TERRAIN_GRASS").with_feature("FEATURE_FOREST");
        assert_eq!(compute_base_yields(&tile, &config), Yields::new(2, 1, 0));

        let tile = Tile::new(0, 0, "TERRAIN_DESERT").with_feature("FEATURE_OASIS");
        assert_eq!(compute_base_yields(&tile, &config), Yields::new(3, 0, 1));
    }

    #[test]
    fn unknown_codes_yield_zero() {
        let config = ScoringConfig::civ6_default();
        let tile = Tile::new(0, 0, "TERRAIN_LAVA").with_feature("FEATURE_VOLCANO");
        assert_eq!(compute_base_yields(&tile, &config), Yields::ZERO);

        let tile = Tile::new(0, 0, "TERRAIN_PLAINS").with_feature("FEATURE_VOLCANO");
        assert_eq!(compute_base_yields(&tile, &config), Yields::new(1, 1, 0));
    }
}
