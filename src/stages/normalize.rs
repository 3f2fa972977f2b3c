use anyhow::Result;
use serde::Serialize;

use crate::{
    config::ScoringConfig,
    engine::{Stage, StageContext},
    map::TileMap,
    tile::Tile,
};

/// How the population baseline came out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NormalizationOutcome {
    Normalized { average: f64, workable: usize },
    /// Every workable tile scored zero, so there is nothing to divide by.
    ZeroAverage { workable: usize },
    NoWorkableTiles,
}

impl NormalizationOutcome {
    pub fn is_normalized(&self) -> bool {
        matches!(self, NormalizationOutcome::Normalized { .. })
    }

    pub fn workable(&self) -> usize {
        match self {
            NormalizationOutcome::Normalized { workable, .. }
            | NormalizationOutcome::ZeroAverage { workable } => *workable,
            NormalizationOutcome::NoWorkableTiles => 0,
        }
    }

    pub fn average(&self) -> Option<f64> {
        match self {
            NormalizationOutcome::Normalized { average, .. } => Some(*average),
            _ => None,
        }
    }
}

/// Rescales raw scores so the workable population averages 100.
///
/// Rounds half to even. Non-workable tiles always end at exactly 0.
pub fn normalize(tiles: &mut [Tile], config: &ScoringConfig) -> NormalizationOutcome {
    let rules = &config.workability;
    let (sum, workable) = tiles
        .iter()
        .filter(|tile| tile.is_workable(rules))
        .fold((0.0_f64, 0_usize), |(sum, count), tile| {
            (sum + tile.raw_score, count + 1)
        });

    if workable == 0 {
        zero_all(tiles);
        return NormalizationOutcome::NoWorkableTiles;
    }

    let average = sum / workable as f64;
    if average == 0.0 {
        zero_all(tiles);
        return NormalizationOutcome::ZeroAverage { workable };
    }

    for tile in tiles.iter_mut() {
        tile.normalized_score = if tile.is_workable(rules) {
            (tile.raw_score / average * 100.0).round_ties_even()
        } else {
            0.0
        };
    }
    NormalizationOutcome::Normalized { average, workable }
}

fn zero_all(tiles: &mut [Tile]) {
    for tile in tiles {
        tile.normalized_score = 0.0;
    }
}

pub struct NormalizeStage;

impl NormalizeStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NormalizeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for NormalizeStage {
    fn name(&self) -> &str {
        "normalize"
    }

    fn run(&mut self, ctx: &StageContext<'_>, map: &mut TileMap) -> Result<()> {
        let outcome = normalize(map.tiles_mut(), ctx.config);
        map.summary.normalization = Some(outcome);
        Ok(())
    }
}
