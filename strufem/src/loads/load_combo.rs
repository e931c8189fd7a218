//! Load combinations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LoadCase;

/// Design philosophy selecting a standard combination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesignMethod {
    /// Allowable stress design
    Asd,
    /// Load and resistance factor design
    Lrfd,
}

// Factor rows in LoadCase::ALL order: DL, LL, LLr, SL, RL, WL, EL
#[rustfmt::skip]
const ASD_FACTORS: [[f64; 7]; 16] = [
    [1.0, 0.0,  0.0,  0.0,  0.0,  0.0,  0.0],
    [1.0, 1.0,  0.0,  0.0,  0.0,  0.0,  0.0],
    [1.0, 0.0,  1.0,  0.0,  0.0,  0.0,  0.0],
    [1.0, 0.0,  0.0,  1.0,  0.0,  0.0,  0.0],
    [1.0, 0.0,  0.0,  0.0,  1.0,  0.0,  0.0],
    [1.0, 0.75, 0.75, 0.0,  0.0,  0.0,  0.0],
    [1.0, 0.75, 0.0,  0.75, 0.0,  0.0,  0.0],
    [1.0, 0.75, 0.0,  0.0,  0.75, 0.0,  0.0],
    [1.0, 0.0,  0.0,  0.0,  0.0,  0.6,  0.0],
    [1.0, 0.75, 0.75, 0.0,  0.0,  0.45, 0.0],
    [1.0, 0.75, 0.0,  0.75, 0.0,  0.45, 0.0],
    [1.0, 0.75, 0.0,  0.0,  0.75, 0.45, 0.0],
    [0.6, 0.0,  0.0,  0.0,  0.0,  0.6,  0.0],
    [1.0, 0.0,  0.0,  0.0,  0.0,  0.0,  0.7],
    [1.0, 0.75, 0.0,  0.75, 0.0,  0.0,  0.525],
    [0.6, 0.0,  0.0,  0.0,  0.0,  0.0,  0.7],
];

#[rustfmt::skip]
const LRFD_FACTORS: [[f64; 7]; 16] = [
    [1.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.2, 1.6, 0.5, 0.0, 0.0, 0.0, 0.0],
    [1.2, 1.6, 0.0, 0.5, 0.0, 0.0, 0.0],
    [1.2, 1.6, 0.0, 0.0, 0.5, 0.0, 0.0],
    [1.2, 1.0, 1.6, 0.0, 0.0, 0.0, 0.0],
    [1.2, 1.0, 0.0, 1.6, 0.0, 0.0, 0.0],
    [1.2, 1.0, 0.0, 0.0, 1.6, 0.0, 0.0],
    [1.2, 0.0, 1.6, 0.0, 0.0, 0.5, 0.0],
    [1.2, 0.0, 0.0, 1.6, 0.0, 0.5, 0.0],
    [1.2, 0.0, 0.0, 0.0, 1.6, 0.5, 0.0],
    [1.2, 1.0, 0.5, 0.0, 0.0, 1.0, 0.0],
    [1.2, 1.0, 0.0, 0.5, 0.0, 1.0, 0.0],
    [1.2, 1.0, 0.0, 0.0, 0.5, 1.0, 0.0],
    [0.9, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    [1.2, 1.0, 0.0, 0.2, 0.0, 0.0, 1.0],
    [0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
];

/// A load combination defines how load cases are combined for analysis.
/// Cases without an entry get a factor of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCombination {
    pub name: String,
    pub factors: BTreeMap<LoadCase, f64>,
}

impl LoadCombination {
    /// Create an empty load combination
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            factors: BTreeMap::new(),
        }
    }

    /// Every case at factor 1.0
    pub fn unfactored() -> Self {
        LoadCase::ALL
            .into_iter()
            .fold(Self::new("Unfactored"), |combo, case| combo.with_case(case, 1.0))
    }

    /// A single case at factor 1.0
    pub fn single(case: LoadCase) -> Self {
        Self::new(&format!("1.0{case}")).with_case(case, 1.0)
    }

    /// Add a load case with a factor
    pub fn with_case(mut self, case: LoadCase, factor: f64) -> Self {
        self.factors.insert(case, factor);
        self
    }

    /// Get the factor for a load case
    pub fn factor(&self, case: LoadCase) -> f64 {
        self.factors.get(&case).copied().unwrap_or(0.0)
    }

    /// Check if this combination includes a specific load case
    pub fn includes(&self, case: LoadCase) -> bool {
        self.factor(case).abs() > 1e-10
    }

    /// The 16 standard combinations for the given design method
    pub fn standard(method: DesignMethod) -> Vec<LoadCombination> {
        let (prefix, table) = match method {
            DesignMethod::Asd => ("ASD", &ASD_FACTORS),
            DesignMethod::Lrfd => ("LRFD", &LRFD_FACTORS),
        };
        table
            .iter()
            .enumerate()
            .map(|(row, factors)| {
                let mut combo = LoadCombination::new("");
                for (case, &f) in LoadCase::ALL.iter().zip(factors.iter()) {
                    if f != 0.0 {
                        combo.factors.insert(*case, f);
                    }
                }
                combo.name = format!("{prefix} {}: {}", row + 1, combo.describe());
                combo
            })
            .collect()
    }

    /// Human-readable formula such as "1.2DL + 1.6LL + 0.5LLr"
    pub fn describe(&self) -> String {
        self.factors
            .iter()
            .filter(|(_, f)| **f != 0.0)
            .map(|(case, f)| {
                if f.fract() == 0.0 {
                    format!("{f:.1}{case}")
                } else {
                    format!("{f}{case}")
                }
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Default for LoadCombination {
    fn default() -> Self {
        Self::unfactored()
    }
}
