//! Section properties shared by truss, beam and shell elements

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{FEAError, FEAResult};

/// Cross-section properties
///
/// Frame elements read `a`, `iy`, `iz` and `j`. Shell elements read
/// `thickness`. A truss only needs `a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Optional display name, e.g. "W12x26"
    #[serde(default)]
    pub name: Option<String>,
    /// Cross-sectional area
    pub a: f64,
    /// Moment of inertia about local y-axis
    pub iy: f64,
    /// Moment of inertia about local z-axis
    pub iz: f64,
    /// Torsional constant
    pub j: f64,
    /// Shell thickness
    #[serde(default)]
    pub thickness: Option<f64>,
}

impl Section {
    /// Create a new frame section with basic properties
    pub fn new(a: f64, iy: f64, iz: f64, j: f64) -> Self {
        Self {
            name: None,
            a,
            iy,
            iz,
            j,
            thickness: None,
        }
    }

    /// Axial-only section for truss elements
    pub fn truss(a: f64) -> Self {
        Self::new(a, 0.0, 0.0, 0.0)
    }

    /// Shell section of uniform thickness
    pub fn shell(thickness: f64) -> Self {
        Self {
            thickness: Some(thickness),
            ..Self::new(0.0, 0.0, 0.0, 0.0)
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Create a rectangular section
    pub fn rectangular(width: f64, depth: f64) -> Self {
        let a = width * depth;
        let iy = width * depth.powi(3) / 12.0;
        let iz = depth * width.powi(3) / 12.0;

        // Saint-Venant approximation for a solid rectangle
        let (long, short) = if width > depth { (width, depth) } else { (depth, width) };
        let j = long * short.powi(3) / 3.0 * (1.0 - 0.63 * short / long);

        Self::new(a, iy, iz, j)
    }

    /// Create a circular section
    pub fn circular(diameter: f64) -> Self {
        let r = diameter / 2.0;
        let i = PI * r.powi(4) / 4.0;
        Self::new(PI * r.powi(2), i, i, 2.0 * i)
    }

    /// Create a hollow circular (pipe) section
    pub fn pipe(outer_diameter: f64, wall_thickness: f64) -> Self {
        let r_o = outer_diameter / 2.0;
        let r_i = r_o - wall_thickness;
        let i = PI * (r_o.powi(4) - r_i.powi(4)) / 4.0;
        Self::new(PI * (r_o.powi(2) - r_i.powi(2)), i, i, 2.0 * i)
    }

    /// Create a wide flange (I-beam) section
    ///
    /// # Arguments
    /// * `depth` - Total depth of section
    /// * `flange_width` - Width of flange
    /// * `flange_thickness` - Thickness of flange
    /// * `web_thickness` - Thickness of web
    pub fn wide_flange(
        depth: f64,
        flange_width: f64,
        flange_thickness: f64,
        web_thickness: f64,
    ) -> Self {
        let bf = flange_width;
        let tf = flange_thickness;
        let tw = web_thickness;
        let hw = depth - 2.0 * tf;

        let a = 2.0 * bf * tf + hw * tw;
        let iy = (bf * depth.powi(3) - (bf - tw) * hw.powi(3)) / 12.0;
        let iz = (2.0 * tf * bf.powi(3) + hw * tw.powi(3)) / 12.0;
        let j = (2.0 * bf * tf.powi(3) + hw * tw.powi(3)) / 3.0;

        Self::new(a, iy, iz, j)
    }

    /// Create a box/tube section
    pub fn box_section(width: f64, depth: f64, wall_thickness: f64) -> Self {
        let t = wall_thickness;
        let bi = width - 2.0 * t;
        let di = depth - 2.0 * t;

        let a = width * depth - bi * di;
        let iy = (width * depth.powi(3) - bi * di.powi(3)) / 12.0;
        let iz = (depth * width.powi(3) - di * bi.powi(3)) / 12.0;

        // Bredt's formula for a closed thin-walled section
        let am = (width - t) * (depth - t);
        let s = 2.0 * (width + depth) - 4.0 * t;
        let j = 4.0 * am.powi(2) * t / s;

        Self::new(a, iy, iz, j)
    }

    /// Radius of gyration about the local y-axis
    pub fn ry(&self) -> f64 {
        (self.iy / self.a).sqrt()
    }

    /// Radius of gyration about the local z-axis
    pub fn rz(&self) -> f64 {
        (self.iz / self.a).sqrt()
    }

    /// Properties must be finite and non-negative; a given thickness must be positive.
    /// Which properties have to be positive depends on the element using the section.
    pub(crate) fn validate(&self) -> FEAResult<()> {
        for (name, v) in [("A", self.a), ("Iy", self.iy), ("Iz", self.iz), ("J", self.j)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(FEAError::InvalidInput(format!(
                    "section {name} must be finite and non-negative, got {v}"
                )));
            }
        }
        match self.thickness {
            Some(t) if !(t.is_finite() && t > 0.0) => Err(FEAError::InvalidInput(format!(
                "shell thickness must be positive, got {t}"
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::rectangular(0.2, 0.2)
    }
}
