//! Nodal forces, line loads on frames and pressure on shells

use serde::{Deserialize, Serialize};

use super::LoadCase;
use crate::dof::Dof;
use crate::elements::{ElementId, ElementKind, NodeId};
use crate::error::{FEAError, FEAResult};

/// Direction of an element line load
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoadDirection {
    /// Member local x (axial)
    Fx,
    /// Member local y
    Fy,
    /// Member local z
    Fz,
    /// Global X
    FX,
    /// Global Y
    FY,
    /// Global Z
    FZ,
}

impl LoadDirection {
    pub fn is_global(self) -> bool {
        matches!(self, LoadDirection::FX | LoadDirection::FY | LoadDirection::FZ)
    }

    /// Axis index 0..3 in whichever frame the direction refers to
    pub fn axis(self) -> usize {
        match self {
            LoadDirection::Fx | LoadDirection::FX => 0,
            LoadDirection::Fy | LoadDirection::FY => 1,
            LoadDirection::Fz | LoadDirection::FZ => 2,
        }
    }
}

/// What a load acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadTarget {
    Node(NodeId),
    Element(ElementId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LoadKind {
    /// Concentrated force or moment on one nodal DOF
    Nodal { dof: Dof, magnitude: f64 },
    /// Uniform force per unit length over a truss or beam
    Distributed { direction: LoadDirection, w: f64 },
    /// Uniform pressure on a shell, positive along local z
    Pressure { p: f64 },
}

/// A load belonging to one load case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub target: LoadTarget,
    pub kind: LoadKind,
    #[serde(default)]
    pub case: LoadCase,
}

impl Load {
    /// Force or moment on a nodal DOF
    pub fn nodal(node: NodeId, dof: Dof, magnitude: f64, case: LoadCase) -> Self {
        Self {
            target: LoadTarget::Node(node),
            kind: LoadKind::Nodal { dof, magnitude },
            case,
        }
    }

    /// Uniform line load over the full length of a truss or beam
    pub fn distributed(
        element: ElementId,
        direction: LoadDirection,
        w: f64,
        case: LoadCase,
    ) -> Self {
        Self {
            target: LoadTarget::Element(element),
            kind: LoadKind::Distributed { direction, w },
            case,
        }
    }

    /// Uniform downward (negative global Y) line load
    pub fn uniform_downward(element: ElementId, w: f64, case: LoadCase) -> Self {
        Self::distributed(element, LoadDirection::FY, -w.abs(), case)
    }

    /// Uniform pressure on a shell
    pub fn pressure(element: ElementId, p: f64, case: LoadCase) -> Self {
        Self {
            target: LoadTarget::Element(element),
            kind: LoadKind::Pressure { p },
            case,
        }
    }

    pub fn magnitude(&self) -> f64 {
        match self.kind {
            LoadKind::Nodal { magnitude, .. } => magnitude,
            LoadKind::Distributed { w, .. } => w,
            LoadKind::Pressure { p } => p,
        }
    }

    /// Check the load kind against the kind of element it targets
    /// (`None` for nodal targets)
    pub(crate) fn validate(&self, element_kind: Option<ElementKind>) -> FEAResult<()> {
        if !self.magnitude().is_finite() {
            return Err(FEAError::InvalidInput(
                "load magnitude must be finite".to_string(),
            ));
        }
        match (self.kind, element_kind) {
            (LoadKind::Nodal { .. }, None) => Ok(()),
            (LoadKind::Distributed { .. }, Some(ElementKind::Truss | ElementKind::Beam)) => Ok(()),
            (LoadKind::Pressure { .. }, Some(ElementKind::Shell)) => Ok(()),
            (kind, Some(ek)) => Err(FEAError::InvalidInput(format!(
                "{kind:?} cannot be applied to a {ek} element"
            ))),
            (kind, None) => Err(FEAError::InvalidInput(format!(
                "{kind:?} must target an element"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_constructors() {
        let load = Load::nodal(NodeId(1), Dof::DY, -10.0, LoadCase::Live);
        assert_eq!(load.target, LoadTarget::Node(NodeId(1)));
        assert_eq!(load.magnitude(), -10.0);

        let udl = Load::uniform_downward(ElementId(0), 5.0, LoadCase::Dead);
        assert_eq!(
            udl.kind,
            LoadKind::Distributed {
                direction: LoadDirection::FY,
                w: -5.0
            }
        );
    }

    #[test]
    fn test_kind_compatibility() {
        let pressure = Load::pressure(ElementId(0), 1.0, LoadCase::Dead);
        assert!(pressure.validate(Some(ElementKind::Shell)).is_ok());
        assert!(pressure.validate(Some(ElementKind::Beam)).is_err());

        let udl = Load::distributed(ElementId(0), LoadDirection::Fz, 1.0, LoadCase::Dead);
        assert!(udl.validate(Some(ElementKind::Truss)).is_ok());
        assert!(udl.validate(Some(ElementKind::Shell)).is_err());

        let bad = Load::nodal(NodeId(0), Dof::DX, f64::NAN, LoadCase::Dead);
        assert!(bad.validate(None).is_err());
    }
}
