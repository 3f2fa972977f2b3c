use anyhow::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::{
    config::ScoringConfig,
    engine::{Stage, StageContext},
    map::TileMap,
    tile::Tile,
};

/// Tier label to the normalized score at that tier's upper cutoff, ordered
/// from the lowest tier to the highest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierThresholds(Vec<(String, f64)>);

impl TierThresholds {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, threshold)| *threshold)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, threshold)| (label.as_str(), *threshold))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    /// Position of a label from worst (0) to best.
    pub fn rank_of(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|(known, _)| known == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TierThresholds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, threshold) in &self.0 {
            map.serialize_entry(label, threshold)?;
        }
        map.end()
    }
}

/// Partitions the workable tiles into tiers by rank.
///
/// Tiers are walked in ascending percentile order; a tier with bound `p`
/// ends (exclusively) at rank `floor(n * p)`. Equal scores keep their input
/// order. A tier whose range collapses gets no members. Workable tiles left
/// over once every tier is walked fall into the lowest tier.
pub fn assign_tiers(tiles: &mut [Tile], config: &ScoringConfig) -> TierThresholds {
    for tile in tiles.iter_mut() {
        tile.tier = None;
    }

    let tiers = config.sorted_tiers();
    let mut ranked: Vec<usize> = tiles
        .iter()
        .enumerate()
        .filter(|(_, tile)| tile.is_workable(&config.workability))
        .map(|(index, _)| index)
        .collect();
    if tiers.is_empty() || ranked.is_empty() {
        return TierThresholds::default();
    }

    ranked.sort_by(|a, b| {
        tiles[*a]
            .normalized_score
            .total_cmp(&tiles[*b].normalized_score)
    });
    let n = ranked.len();

    let mut thresholds = Vec::with_capacity(tiers.len());
    let mut start = 0;
    for (label, bound) in &tiers {
        let end = ((n as f64 * bound).floor() as usize).min(n);
        let cutoff_index = end.max(1) - 1;
        thresholds.push((label.to_string(), tiles[ranked[cutoff_index]].normalized_score));

        if end <= start {
            debug!(
                target: "civtiles::tiers",
                tier = label,
                start,
                end,
                "tier range collapsed; no members"
            );
            continue;
        }
        for &index in &ranked[start..end] {
            tiles[index].tier = Some(label.to_string());
        }
        start = end;
    }

    if start < n {
        let lowest = tiers[0].0;
        debug!(
            target: "civtiles::tiers",
            tier = lowest,
            leftover = n - start,
            "untiered tiles assigned to the lowest tier"
        );
        for &index in &ranked[start..] {
            tiles[index].tier = Some(lowest.to_string());
        }
    }

    TierThresholds(thresholds)
}

pub struct TierStage;

impl TierStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TierStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for TierStage {
    fn name(&self) -> &str {
        "tiers"
    }

    fn run(&mut self, ctx: &StageContext<'_>, map: &mut TileMap) -> Result<()> {
        let baseline_usable = map
            .summary
            .normalization
            .as_ref()
            .map_or(true, |outcome| outcome.is_normalized());
        map.summary.thresholds = if baseline_usable {
            assign_tiers(map.tiles_mut(), ctx.config)
        } else {
            for tile in map.tiles_mut() {
                tile.tier = None;
            }
            TierThresholds::default()
        };
        Ok(())
    }
}
