mod normalize;
mod score;
mod tiers;
mod yields;

pub use normalize::{normalize, NormalizationOutcome, NormalizeStage};
pub use score::{
    appeal_bonus, balance_bonus, fresh_water_bonus, goody_hut_bonus, resource_bonus, score_tile,
    yield_score, ScoreBreakdown, ScoreStage,
};
pub use tiers::{assign_tiers, TierStage, TierThresholds};
pub use yields::{compute_base_yields, YieldStage};
