//! Node - a point in 3D space carrying six degrees of freedom

use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

/// Tolerance under which two nodes are considered coincident
pub const COINCIDENT_TOLERANCE: f64 = 1e-9;

/// A 3D node in the finite element model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Node {
    /// Create a new node at the given coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Get the coordinates as an array
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// True when every coordinate matches `other` within [`COINCIDENT_TOLERANCE`]
    pub fn coincides_with(&self, other: &Node) -> bool {
        (self.x - other.x).abs() <= COINCIDENT_TOLERANCE
            && (self.y - other.y).abs() <= COINCIDENT_TOLERANCE
            && (self.z - other.z).abs() <= COINCIDENT_TOLERANCE
    }

    pub(crate) fn validate(&self) -> FEAResult<()> {
        if self.coords().iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(FEAError::InvalidInput(format!(
                "node coordinates must be finite, got ({}, {}, {})",
                self.x, self.y, self.z
            )))
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}
