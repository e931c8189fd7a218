//! Material properties

use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

/// Linear elastic isotropic material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Optional display name, e.g. "A992"
    #[serde(default)]
    pub name: Option<String>,
    /// Modulus of elasticity (Young's modulus)
    pub e: f64,
    /// Shear modulus
    pub g: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density
    pub rho: f64,
    /// Yield strength, carried for downstream design checks
    #[serde(default)]
    pub fy: Option<f64>,
}

impl Material {
    /// Create a new material with given properties
    pub fn new(e: f64, g: f64, nu: f64, rho: f64) -> Self {
        Self {
            name: None,
            e,
            g,
            nu,
            rho,
            fy: None,
        }
    }

    /// Create a new isotropic material from E and nu
    /// G is calculated as E / (2 * (1 + nu))
    pub fn isotropic(e: f64, nu: f64, rho: f64) -> Self {
        let g = e / (2.0 * (1.0 + nu));
        Self::new(e, g, nu, rho)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_yield_strength(mut self, fy: f64) -> Self {
        self.fy = Some(fy);
        self
    }

    /// Structural steel (A36), SI units
    pub fn steel() -> Self {
        Self::new(200e9, 77e9, 0.3, 7850.0)
            .with_name("Steel")
            .with_yield_strength(250e6)
    }

    /// Normal weight concrete from its compressive strength `fc` in Pa
    pub fn concrete(fc: f64) -> Self {
        // ACI: E = 4700 * sqrt(f'c [MPa]) MPa
        let e = 4700.0 * (fc / 1e6).sqrt() * 1e6;
        Self::isotropic(e, 0.2, 2400.0).with_name("Concrete")
    }

    /// Aluminum 6061-T6, SI units
    pub fn aluminum() -> Self {
        Self::new(68.9e9, 26e9, 0.33, 2700.0)
            .with_name("Aluminum")
            .with_yield_strength(276e6)
    }

    pub(crate) fn validate(&self) -> FEAResult<()> {
        let finite = [self.e, self.g, self.nu, self.rho]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(FEAError::InvalidInput(
                "material properties must be finite".to_string(),
            ));
        }
        if self.e <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "elastic modulus must be positive, got {}",
                self.e
            )));
        }
        if self.g <= 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "shear modulus must be positive, got {}",
                self.g
            )));
        }
        if self.nu <= -1.0 || self.nu >= 0.5 {
            return Err(FEAError::InvalidInput(format!(
                "Poisson's ratio must lie in (-1, 0.5), got {}",
                self.nu
            )));
        }
        if self.rho < 0.0 {
            return Err(FEAError::InvalidInput(format!(
                "density cannot be negative, got {}",
                self.rho
            )));
        }
        if let Some(fy) = self.fy {
            if !(fy.is_finite() && fy > 0.0) {
                return Err(FEAError::InvalidInput(format!(
                    "yield strength must be positive, got {fy}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::steel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isotropic_material() {
        let mat = Material::isotropic(200e9, 0.3, 7850.0);
        let expected_g = 200e9 / (2.0 * 1.3);
        assert!((mat.g - expected_g).abs() < 1.0);
        assert!(mat.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(Material::steel().validate().is_ok());
        assert!(Material::aluminum().validate().is_ok());
        assert!(Material::concrete(30e6).validate().is_ok());
        assert!(Material::steel().fy.is_some());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Material::new(0.0, 1.0, 0.3, 0.0).validate().is_err());
        assert!(Material::new(1.0, 1.0, 0.5, 0.0).validate().is_err());
        assert!(Material::new(1.0, 1.0, 0.3, -1.0).validate().is_err());
        assert!(Material::new(f64::INFINITY, 1.0, 0.3, 0.0).validate().is_err());
    }
}
