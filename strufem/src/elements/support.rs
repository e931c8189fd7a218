//! Support conditions

use serde::{Deserialize, Serialize};

use crate::dof::{Dof, DOFS_PER_NODE};
use crate::error::{FEAError, FEAResult};

/// Boundary condition on a single nodal DOF
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Constraint {
    #[default]
    Free,
    /// Held at zero
    Fixed,
    /// Held at an enforced displacement or rotation
    Prescribed(f64),
}

impl Constraint {
    pub fn is_constrained(self) -> bool {
        !matches!(self, Constraint::Free)
    }

    /// Enforced value, zero for `Fixed`, `None` for `Free`
    pub fn value(self) -> Option<f64> {
        match self {
            Constraint::Free => None,
            Constraint::Fixed => Some(0.0),
            Constraint::Prescribed(v) => Some(v),
        }
    }
}

/// Support conditions at a node, one [`Constraint`] per DOF in
/// `DX, DY, DZ, RX, RY, RZ` order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Support {
    pub constraints: [Constraint; DOFS_PER_NODE],
}

impl Support {
    /// Create a new support with no restraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain one more DOF. Fails if that DOF already carries a constraint.
    pub fn with(mut self, dof: Dof, constraint: Constraint) -> FEAResult<Self> {
        let slot = &mut self.constraints[dof.index()];
        if slot.is_constrained() {
            return Err(FEAError::DuplicateConstraint(dof.to_string()));
        }
        *slot = constraint;
        Ok(self)
    }

    /// Create a fully fixed support (all DOFs restrained)
    pub fn fixed() -> Self {
        Self::from_flags([true; DOFS_PER_NODE])
    }

    /// Create a pinned support (translations restrained, rotations free)
    pub fn pinned() -> Self {
        Self::from_flags([true, true, true, false, false, false])
    }

    /// Roller that only restrains X translation
    pub fn roller_x() -> Self {
        Self::from_flags([true, false, false, false, false, false])
    }

    /// Roller that only restrains Y translation
    pub fn roller_y() -> Self {
        Self::from_flags([false, true, false, false, false, false])
    }

    /// Roller that only restrains Z translation
    pub fn roller_z() -> Self {
        Self::from_flags([false, false, true, false, false, false])
    }

    /// Restraint flags in `(Tx, Ty, Tz, Rx, Ry, Rz)` order, `true` meaning fixed
    pub fn from_flags(flags: [bool; DOFS_PER_NODE]) -> Self {
        let mut constraints = [Constraint::Free; DOFS_PER_NODE];
        for (c, &fixed) in constraints.iter_mut().zip(flags.iter()) {
            if fixed {
                *c = Constraint::Fixed;
            }
        }
        Self { constraints }
    }

    pub fn constraint(&self, dof: Dof) -> Constraint {
        self.constraints[dof.index()]
    }

    /// DOFs carrying a constraint
    pub fn restrained_dofs(&self) -> Vec<Dof> {
        Dof::ALL
            .into_iter()
            .filter(|d| self.constraint(*d).is_constrained())
            .collect()
    }

    /// Check if any DOF is restrained
    pub fn is_supported(&self) -> bool {
        self.constraints.iter().any(|c| c.is_constrained())
    }

    pub(crate) fn validate(&self) -> FEAResult<()> {
        for (dof, c) in Dof::ALL.iter().zip(self.constraints.iter()) {
            if let Constraint::Prescribed(v) = c {
                if !v.is_finite() {
                    return Err(FEAError::InvalidInput(format!(
                        "prescribed value on {dof} must be finite"
                    )));
                }
            }
        }
        Ok(())
    }
}
