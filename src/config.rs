use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tile::Yields;

fn default_food_weight() -> f64 {
    1.0
}

fn default_production_weight() -> f64 {
    1.0
}

fn default_gold_weight() -> f64 {
    0.5
}

fn default_balance_factor() -> f64 {
    1.0
}

fn default_fresh_water() -> f64 {
    3.0
}

fn default_appeal_positive_factor() -> f64 {
    0.5
}

fn default_appeal_high_value() -> f64 {
    2.0
}

fn default_goody_hut() -> f64 {
    2.0
}

fn default_resource_factor() -> f64 {
    1.0
}

fn default_appeal_labels() -> Vec<String> {
    ["good", "high", "positive", "breathtaking", "charming"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ocean_terrain() -> String {
    "TERRAIN_OCEAN".to_string()
}

fn default_ice_feature() -> String {
    "FEATURE_ICE".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scoring config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse scoring config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse scoring config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scoring config is missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("invalid scoring config: {0}")]
    Invalid(String),
}

/// Weighting and lookup tables for one conversion run.
///
/// Built once, then only ever borrowed immutably by the pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringConfig {
    pub yield_values: BTreeMap<String, Yields>,
    pub resource_values: BTreeMap<String, BTreeMap<String, f64>>,
    pub scoring_weights: ScoringWeights,
    pub tier_percentiles: BTreeMap<String, f64>,
    pub appeal_labels: Vec<String>,
    pub workability: Workability,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default)]
    pub yields: YieldWeights,
    #[serde(default)]
    pub bonuses: BonusWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldWeights {
    #[serde(default = "default_food_weight")]
    pub food: f64,
    #[serde(default = "default_production_weight")]
    pub production: f64,
    #[serde(default = "default_gold_weight")]
    pub gold: f64,
}

impl Default for YieldWeights {
    fn default() -> Self {
        Self {
            food: default_food_weight(),
            production: default_production_weight(),
            gold: default_gold_weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusWeights {
    #[serde(default = "default_balance_factor")]
    pub balance_factor: f64,
    #[serde(default = "default_fresh_water")]
    pub fresh_water: f64,
    #[serde(default = "default_appeal_positive_factor")]
    pub appeal_positive_factor: f64,
    #[serde(default = "default_appeal_high_value")]
    pub appeal_high_value: f64,
    #[serde(default = "default_goody_hut")]
    pub goody_hut: f64,
    /// `resource_<class>_factor` entries, keyed by their full name.
    #[serde(flatten)]
    pub resource_factors: BTreeMap<String, f64>,
}

impl Default for BonusWeights {
    fn default() -> Self {
        Self {
            balance_factor: default_balance_factor(),
            fresh_water: default_fresh_water(),
            appeal_positive_factor: default_appeal_positive_factor(),
            appeal_high_value: default_appeal_high_value(),
            goody_hut: default_goody_hut(),
            resource_factors: BTreeMap::new(),
        }
    }
}

impl BonusWeights {
    pub fn resource_factor(&self, class: &str) -> f64 {
        self.resource_factors
            .get(&resource_factor_key(class))
            .copied()
            .unwrap_or_else(default_resource_factor)
    }
}

fn resource_factor_key(class: &str) -> String {
    format!("resource_{class}_factor")
}

/// Terrain and feature codes that make a tile unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workability {
    #[serde(default = "default_ocean_terrain")]
    pub ocean_terrain: String,
    #[serde(default = "default_ice_feature")]
    pub ice_feature: String,
}

impl Default for Workability {
    fn default() -> Self {
        Self {
            ocean_terrain: default_ocean_terrain(),
            ice_feature: default_ice_feature(),
        }
    }
}

/// On-disk shape. Root keys are optional here so their absence can be
/// reported as [`ConfigError::MissingKey`] rather than a generic parse error.
#[derive(Debug, Deserialize)]
struct RawScoringConfig {
    yield_values: Option<BTreeMap<String, Yields>>,
    #[serde(default)]
    resource_values: Option<BTreeMap<String, BTreeMap<String, f64>>>,
    scoring_weights: Option<ScoringWeights>,
    #[serde(default)]
    tier_percentiles: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    appeal_labels: Option<Vec<String>>,
    #[serde(default)]
    workability: Option<Workability>,
}

impl RawScoringConfig {
    fn into_config(self) -> Result<ScoringConfig, ConfigError> {
        let yield_values = self
            .yield_values
            .ok_or(ConfigError::MissingKey("yield_values"))?;
        let scoring_weights = self
            .scoring_weights
            .ok_or(ConfigError::MissingKey("scoring_weights"))?;
        let config = ScoringConfig {
            yield_values,
            resource_values: self.resource_values.unwrap_or_default(),
            scoring_weights,
            tier_percentiles: self.tier_percentiles.unwrap_or_default(),
            appeal_labels: self.appeal_labels.unwrap_or_else(default_appeal_labels),
            workability: self.workability.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl ScoringConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawScoringConfig = serde_yaml::from_str(text)?;
        raw.into_config()
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawScoringConfig = serde_json::from_str(text)?;
        raw.into_config()
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, bound) in &self.tier_percentiles {
            if !bound.is_finite() || !(0.0..=1.0).contains(bound) {
                return Err(ConfigError::Invalid(format!(
                    "tier `{label}` percentile {bound} must lie within [0, 1]"
                )));
            }
        }

        for (class, table) in &self.resource_values {
            for (code, value) in table {
                if !value.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "resource `{code}` in class `{class}` has non-finite value"
                    )));
                }
            }
        }

        let yields = &self.scoring_weights.yields;
        let bonuses = &self.scoring_weights.bonuses;
        let named = [
            ("yields.food", yields.food),
            ("yields.production", yields.production),
            ("yields.gold", yields.gold),
            ("bonuses.balance_factor", bonuses.balance_factor),
            ("bonuses.fresh_water", bonuses.fresh_water),
            ("bonuses.appeal_positive_factor", bonuses.appeal_positive_factor),
            ("bonuses.appeal_high_value", bonuses.appeal_high_value),
            ("bonuses.goody_hut", bonuses.goody_hut),
        ];
        for (name, weight) in named {
            if !weight.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "weight `{name}` must be finite"
                )));
            }
        }

        for (key, factor) in &bonuses.resource_factors {
            let is_resource_factor = key
                .strip_prefix("resource_")
                .and_then(|rest| rest.strip_suffix("_factor"))
                .is_some_and(|class| !class.is_empty());
            if !is_resource_factor {
                return Err(ConfigError::Invalid(format!(
                    "unknown bonus weight `{key}`"
                )));
            }
            if !factor.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "weight `bonuses.{key}` must be finite"
                )));
            }
        }

        Ok(())
    }

    /// Yield triple for a terrain or feature code; unknown codes yield nothing.
    pub fn yield_for(&self, code: &str) -> Yields {
        self.yield_values.get(code).copied().unwrap_or_default()
    }

    /// Finds the class a resource belongs to and its base value.
    ///
    /// Classes are searched in name order and the first hit wins.
    pub fn resource_class(&self, code: &str) -> Option<(&str, f64)> {
        self.resource_values.iter().find_map(|(class, table)| {
            table.get(code).map(|value| (class.as_str(), *value))
        })
    }

    pub fn is_positive_appeal_label(&self, label: &str) -> bool {
        let label = label.trim();
        self.appeal_labels
            .iter()
            .any(|known| known.eq_ignore_ascii_case(label))
    }

    /// Tier definitions ordered by ascending percentile bound.
    pub fn sorted_tiers(&self) -> Vec<(&str, f64)> {
        let mut tiers: Vec<(&str, f64)> = self
            .tier_percentiles
            .iter()
            .map(|(label, bound)| (label.as_str(), *bound))
            .collect();
        tiers.sort_by(|a, b| a.1.total_cmp(&b.1));
        tiers
    }

    /// Tables of the Civilization VI map exports this tool was written for.
    pub fn civ6_default() -> Self {
        let yield_values = [
            ("TERRAIN_GRASS", [2, 0, 0]),
            ("TERRAIN_GRASS_HILLS", [2, 1, 0]),
            ("TERRAIN_PLAINS", [1, 1, 0]),
            ("TERRAIN_PLAINS_HILLS", [1, 2, 0]),
            ("TERRAIN_DESERT", [0, 0, 0]),
            ("TERRAIN_DESERT_HILLS", [0, 1, 0]),
            ("TERRAIN_TUNDRA", [1, 0, 0]),
            ("TERRAIN_TUNDRA_HILLS", [1, 1, 0]),
            ("TERRAIN_COAST", [1, 0, 1]),
            ("TERRAIN_OCEAN", [1, 0, 0]),
            ("TERRAIN_SNOW", [0, 0, 0]),
            ("TERRAIN_SNOW_HILLS", [0, 1, 0]),
            ("FEATURE_FOREST", [0, 1, 0]),
            ("FEATURE_JUNGLE", [1, 0, 0]),
            ("FEATURE_MARSH", [1, 0, 0]),
            ("FEATURE_FLOODPLAINS", [3, 0, 0]),
            ("FEATURE_OASIS", [3, 0, 1]),
            ("FEATURE_REEF", [1, 1, 0]),
        ]
        .into_iter()
        .map(|(code, triple)| (code.to_string(), Yields::from(triple)))
        .collect();

        let luxury = [
            "WINE", "FURS", "SILK", "SILVER", "SUGAR", "PEARLS", "WHALES", "TRUFFLES", "IVORY",
            "COCOA", "COFFEE", "TEA", "TOBACCO", "CITRUS", "SALT",
        ]
        .map(|name| (name, 3.0));
        let bonus = [
            "BANANAS", "CATTLE", "COPPER", "CRABS", "DEER", "FISH", "MAIZE", "RICE", "SHEEP",
            "STONE", "WHEAT",
        ]
        .map(|name| (name, 1.5));
        let strategic = [
            ("HORSES", 1.0),
            ("IRON", 1.0),
            ("NITER", 0.5),
            ("COAL", 0.5),
            ("OIL", 0.5),
            ("ALUMINUM", 0.5),
            ("URANIUM", 0.5),
        ];

        let mut resource_values = BTreeMap::new();
        for (class, entries) in [
            ("luxury", luxury.as_slice()),
            ("bonus", bonus.as_slice()),
            ("strategic", strategic.as_slice()),
        ] {
            let table = entries
                .iter()
                .map(|(name, value)| (format!("RESOURCE_{name}"), *value))
                .collect();
            resource_values.insert(class.to_string(), table);
        }

        let tier_percentiles = [
            ("F", 0.05),
            ("E", 0.15),
            ("D", 0.35),
            ("C", 0.65),
            ("B", 0.85),
            ("A", 0.95),
            ("S", 1.0),
        ]
        .into_iter()
        .map(|(label, bound)| (label.to_string(), bound))
        .collect();

        Self {
            yield_values,
            resource_values,
            scoring_weights: ScoringWeights::default(),
            tier_percentiles,
            appeal_labels: default_appeal_labels(),
            workability: Workability::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::civ6_default()
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Loads a YAML config, or JSON when the file ends in `.json`.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<ScoringConfig, ConfigError> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            ScoringConfig::from_json_str(&data)
        } else {
            ScoringConfig::from_yaml_str(&data)
        }
    }
}
