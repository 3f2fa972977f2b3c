use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::config::Workability;

/// Food, production and gold produced by a tile before any weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct Yields {
    pub food: i32,
    pub production: i32,
    pub gold: i32,
}

impl Yields {
    pub const ZERO: Yields = Yields::new(0, 0, 0);

    pub const fn new(food: i32, production: i32, gold: i32) -> Self {
        Self {
            food,
            production,
            gold,
        }
    }
}

impl Add for Yields {
    type Output = Yields;

    fn add(self, rhs: Yields) -> Yields {
        Yields::new(
            self.food + rhs.food,
            self.production + rhs.production,
            self.gold + rhs.gold,
        )
    }
}

impl From<[i32; 3]> for Yields {
    fn from([food, production, gold]: [i32; 3]) -> Self {
        Yields::new(food, production, gold)
    }
}

impl From<Yields> for [i32; 3] {
    fn from(value: Yields) -> Self {
        [value.food, value.production, value.gold]
    }
}

/// Appeal as exported by the game: usually a number, occasionally a word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Appeal {
    Numeric(f64),
    Label(String),
}

impl Appeal {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Appeal::Numeric(value),
            _ => Appeal::Label(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Appeal::Numeric(value) => Some(*value),
            Appeal::Label(_) => None,
        }
    }
}

/// One map cell together with everything the pipeline derives for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub terrain: String,
    pub feature: Option<String>,
    pub resource: Option<String>,
    pub resource_type: Option<String>,
    pub continent: Option<String>,
    pub rivers: Option<String>,
    pub appeal: Option<Appeal>,
    pub goody_hut: bool,
    pub starting_plot: bool,

    pub yields: Yields,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub tier: Option<String>,
}

impl Tile {
    pub fn new(x: i32, y: i32, terrain: impl Into<String>) -> Self {
        Self {
            x,
            y,
            terrain: terrain.into(),
            feature: None,
            resource: None,
            resource_type: None,
            continent: None,
            rivers: None,
            appeal: None,
            goody_hut: false,
            starting_plot: false,
            yields: Yields::ZERO,
            raw_score: 0.0,
            normalized_score: 0.0,
            tier: None,
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_rivers(mut self, rivers: impl Into<String>) -> Self {
        self.rivers = Some(rivers.into());
        self
    }

    pub fn with_appeal(mut self, appeal: Appeal) -> Self {
        self.appeal = Some(appeal);
        self
    }

    pub fn with_goody_hut(mut self, goody_hut: bool) -> Self {
        self.goody_hut = goody_hut;
        self
    }

    /// Ocean terrain and ice features can never be settled or worked.
    pub fn is_workable(&self, rules: &Workability) -> bool {
        if self.terrain == rules.ocean_terrain {
            return false;
        }
        !matches!(self.feature.as_deref(), Some(feature) if feature == rules.ice_feature)
    }

    pub fn has_fresh_water(&self) -> bool {
        self.rivers
            .as_deref()
            .is_some_and(|rivers| !rivers.trim().is_empty())
    }
}
