//! Load cases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FEAError;

/// Category a load belongs to; combinations scale loads per category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum LoadCase {
    /// Dead loads (self-weight and permanent loads)
    #[default]
    #[serde(rename = "DL")]
    Dead,
    /// Occupancy live loads
    #[serde(rename = "LL")]
    Live,
    /// Roof live loads
    #[serde(rename = "LLr")]
    RoofLive,
    #[serde(rename = "SL")]
    Snow,
    #[serde(rename = "RL")]
    Rain,
    #[serde(rename = "WL")]
    Wind,
    /// Seismic loads
    #[serde(rename = "EL")]
    Earthquake,
}

impl LoadCase {
    /// Every case, in the factor order used by the standard combination tables
    pub const ALL: [LoadCase; 7] = [
        LoadCase::Dead,
        LoadCase::Live,
        LoadCase::RoofLive,
        LoadCase::Snow,
        LoadCase::Rain,
        LoadCase::Wind,
        LoadCase::Earthquake,
    ];

    /// Short code, e.g. "DL"
    pub fn code(self) -> &'static str {
        match self {
            LoadCase::Dead => "DL",
            LoadCase::Live => "LL",
            LoadCase::RoofLive => "LLr",
            LoadCase::Snow => "SL",
            LoadCase::Rain => "RL",
            LoadCase::Wind => "WL",
            LoadCase::Earthquake => "EL",
        }
    }
}

impl fmt::Display for LoadCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LoadCase {
    type Err = FEAError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoadCase::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| {
                FEAError::InvalidInput(format!(
                    "unknown load case '{s}', expected one of DL, LL, LLr, SL, RL, WL, EL"
                ))
            })
    }
}
