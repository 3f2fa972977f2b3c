use anyhow::Result;
use tracing::debug;

use crate::{
    config::ScoringConfig,
    engine::{Stage, StageContext},
    map::TileMap,
    tile::{Appeal, Tile, Yields},
};

pub fn yield_score(yields: Yields, config: &ScoringConfig) -> f64 {
    let weights = &config.scoring_weights.yields;
    f64::from(yields.food) * weights.food
        + f64::from(yields.production) * weights.production
        + f64::from(yields.gold) * weights.gold
}

/// Rewards tiles that produce both food and production.
pub fn balance_bonus(yields: Yields, config: &ScoringConfig) -> f64 {
    if yields.food > 0 && yields.production > 0 {
        f64::from(yields.food.min(yields.production))
            * config.scoring_weights.bonuses.balance_factor
    } else {
        0.0
    }
}

pub fn resource_bonus(tile: &Tile, config: &ScoringConfig) -> f64 {
    let Some(code) = tile.resource.as_deref() else {
        return 0.0;
    };
    match config.resource_class(code) {
        Some((class, value)) => value * config.scoring_weights.bonuses.resource_factor(class),
        None => 0.0,
    }
}

pub fn fresh_water_bonus(tile: &Tile, config: &ScoringConfig) -> f64 {
    if tile.has_fresh_water() {
        config.scoring_weights.bonuses.fresh_water
    } else {
        0.0
    }
}

/// Positive numeric appeal scales; a recognised positive label earns a flat
/// bonus. Negative appeal is never a penalty.
pub fn appeal_bonus(tile: &Tile, config: &ScoringConfig) -> f64 {
    let bonuses = &config.scoring_weights.bonuses;
    match &tile.appeal {
        Some(Appeal::Numeric(value)) if *value > 0.0 => value * bonuses.appeal_positive_factor,
        Some(Appeal::Label(label)) if config.is_positive_appeal_label(label) => {
            bonuses.appeal_high_value
        }
        _ => 0.0,
    }
}

pub fn goody_hut_bonus(tile: &Tile, config: &ScoringConfig) -> f64 {
    if tile.goody_hut {
        config.scoring_weights.bonuses.goody_hut
    } else {
        0.0
    }
}

/// The six score components of one tile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub yield_score: f64,
    pub balance_bonus: f64,
    pub resource_bonus: f64,
    pub fresh_water_bonus: f64,
    pub appeal_bonus: f64,
    pub goody_hut_bonus: f64,
}

impl ScoreBreakdown {
    pub fn evaluate(tile: &Tile, yields: Yields, config: &ScoringConfig) -> Self {
        Self {
            yield_score: yield_score(yields, config),
            balance_bonus: balance_bonus(yields, config),
            resource_bonus: resource_bonus(tile, config),
            fresh_water_bonus: fresh_water_bonus(tile, config),
            appeal_bonus: appeal_bonus(tile, config),
            goody_hut_bonus: goody_hut_bonus(tile, config),
        }
    }

    /// Sum of the components, clamped at zero.
    pub fn total(&self) -> f64 {
        let sum = self.yield_score
            + self.balance_bonus
            + self.resource_bonus
            + self.fresh_water_bonus
            + self.appeal_bonus
            + self.goody_hut_bonus;
        sum.max(0.0)
    }
}

/// Raw desirability of a tile. Non-workable tiles score 0 without evaluation.
pub fn score_tile(tile: &Tile, yields: Yields, config: &ScoringConfig) -> f64 {
    if !tile.is_workable(&config.workability) {
        return 0.0;
    }
    ScoreBreakdown::evaluate(tile, yields, config).total()
}

pub struct ScoreStage;

impl ScoreStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScoreStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for ScoreStage {
    fn name(&self) -> &str {
        "score"
    }

    fn run(&mut self, ctx: &StageContext<'_>, map: &mut TileMap) -> Result<()> {
        let total = map.len();
        for (index, tile) in map.tiles_mut().iter_mut().enumerate() {
            tile.raw_score = score_tile(tile, tile.yields, ctx.config);
            if ctx.progress_every > 0 && (index + 1) % ctx.progress_every == 0 {
                debug!(
                    target: "civtiles::score",
                    map = ctx.map_name,
                    scored = index + 1,
                    total,
                    "scoring progress"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig::civ6_default()
    }

    fn scored(tile: &Tile, config: &ScoringConfig) -> f64 {
        let yields = crate::stages::compute_base_yields(tile, config);
        score_tile(tile, yields, config)
    }

    #[test]
    fn grassland_forest_scores_four() {
        let config = config();
        let tile = Tile::new(0, 0, "TERRAIN_GRASS").with_feature("FEATURE_FOREST");
        let yields = Yields::new(2, 1, 0);
        let breakdown = ScoreBreakdown::evaluate(&tile, yields, &config);
        assert_eq!(breakdown.yield_score, 3.0);
        assert_eq!(breakdown.balance_bonus, 1.0);
        assert_eq!(breakdown.total(), 4.0);
        assert_eq!(scored(&tile, &config), 4.0);
    }

    #[test]
    fn balance_needs_both_food_and_production() {
        let config = config();
        assert_eq!(balance_bonus(Yields::new(3, 0, 0), &config), 0.0);
        assert_eq!(balance_bonus(Yields::new(0, 2, 0), &config), 0.0);
        assert_eq!(balance_bonus(Yields::new(1, 2, 0), &config), 1.0);
    }

    #[test]
    fn resource_bonus_uses_class_factor() {
        let mut config = config();
        config
            .scoring_weights
            .bonuses
            .resource_factors
            .insert("resource_luxury_factor".into(), 2.0);
        let wine = Tile::new(0, 0, "TERRAIN_PLAINS").with_resource("RESOURCE_WINE");
        let wheat = Tile::new(0, 0, "TERRAIN_PLAINS").with_resource("RESOURCE_WHEAT");
        let spice = Tile::new(0, 0, "TERRAIN_PLAINS").with_resource("RESOURCE_SPICE");
        assert_eq!(resource_bonus(&wine, &config), 6.0);
        assert_eq!(resource_bonus(&wheat, &config), 1.5);
        assert_eq!(resource_bonus(&spice, &config), 0.0);
    }

    #[test]
    fn appeal_rules() {
        let config = config();
        let with = |appeal: Appeal| Tile::new(0, 0, "TERRAIN_GRASS").with_appeal(appeal);
        assert_eq!(appeal_bonus(&with(Appeal::Numeric(4.0)), &config), 2.0);
        assert_eq!(appeal_bonus(&with(Appeal::Numeric(-3.0)), &config), 0.0);
        assert_eq!(appeal_bonus(&with(Appeal::Numeric(0.0)), &config), 0.0);
        assert_eq!(
            appeal_bonus(&with(Appeal::Label("Breathtaking".into())), &config),
            2.0
        );
        assert_eq!(
            appeal_bonus(&with(Appeal::Label("uninviting".into())), &config),
            0.0
        );
        assert_eq!(appeal_bonus(&Tile::new(0, 0, "TERRAIN_GRASS"), &config), 0.0);
    }

    #[test]
    fn flat_bonuses() {
        let config = config();
        let tile = Tile::new(0, 0, "TERRAIN_DESERT")
            .with_rivers("NORTHEAST")
            .with_goody_hut(true);
        assert_eq!(fresh_water_bonus(&tile, &config), 3.0);
        assert_eq!(goody_hut_bonus(&tile, &config), 2.0);
        assert_eq!(scored(&tile, &config), 5.0);
    }

    #[test]
    fn ocean_ignores_every_bonus() {
        let config = config();
        let tile = Tile::new(0, 0, "TERRAIN_OCEAN")
            .with_resource("RESOURCE_WHALES")
            .with_appeal(Appeal::Numeric(10.0))
            .with_rivers("WEST")
            .with_goody_hut(true);
        assert_eq!(scored(&tile, &config), 0.0);

        let ice = Tile::new(0, 0, "TERRAIN_SNOW")
            .with_feature("FEATURE_ICE")
            .with_goody_hut(true);
        assert_eq!(scored(&ice, &config), 0.0);
    }

    #[test]
    fn negative_weights_are_clamped_at_zero() {
        let mut config = config();
        config.scoring_weights.yields.food = -10.0;
        let tile = Tile::new(0, 0, "TERRAIN_GRASS");
        assert_eq!(scored(&tile, &config), 0.0);
    }
}
