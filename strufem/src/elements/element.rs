//! Finite elements: 2-node truss, 2-node beam, 4-node shell

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MaterialId, NodeId, Section, SectionId};
use crate::dof::DOFS_PER_NODE;
use crate::error::{FEAError, FEAResult};
use crate::math;

/// The closed set of element formulations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Two-node axial bar, translations only
    Truss,
    /// Two-node Euler-Bernoulli 3D frame member
    Beam,
    /// Four-node flat MITC4 shell (membrane + plate bending)
    Shell,
}

impl ElementKind {
    pub fn node_count(self) -> usize {
        match self {
            ElementKind::Truss | ElementKind::Beam => 2,
            ElementKind::Shell => 4,
        }
    }

    /// Nodal DOFs this kind contributes stiffness to, `DX..RZ`
    pub fn active_dofs(self) -> [bool; DOFS_PER_NODE] {
        match self {
            ElementKind::Truss => [true, true, true, false, false, false],
            ElementKind::Beam | ElementKind::Shell => [true; DOFS_PER_NODE],
        }
    }

    /// Check that `section` carries the properties this kind reads
    pub fn check_section(self, section: &Section) -> FEAResult<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(FEAError::InvalidInput(format!(
                    "{self} element needs a positive section {name}, got {v}"
                )))
            }
        };
        match self {
            ElementKind::Truss => positive("area", section.a),
            ElementKind::Beam => {
                positive("area", section.a)?;
                positive("Iy", section.iy)?;
                positive("Iz", section.iz)?;
                positive("J", section.j)
            }
            ElementKind::Shell => positive("thickness", section.thickness.unwrap_or(0.0)),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Truss => "Truss",
            ElementKind::Beam => "Beam",
            ElementKind::Shell => "Shell",
        };
        f.write_str(name)
    }
}

/// End releases for a beam (allowing specific DOFs to rotate/translate freely)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EndReleases {
    /// i-node releases [DX, DY, DZ, RX, RY, RZ]
    pub i_node: [bool; 6],
    /// j-node releases [DX, DY, DZ, RX, RY, RZ]
    pub j_node: [bool; 6],
}

impl EndReleases {
    pub fn none() -> Self {
        Self::default()
    }

    /// Moment releases at the i-node
    pub fn pin_i() -> Self {
        Self {
            i_node: [false, false, false, false, true, true],
            j_node: [false; 6],
        }
    }

    /// Moment releases at the j-node
    pub fn pin_j() -> Self {
        Self {
            i_node: [false; 6],
            j_node: [false, false, false, false, true, true],
        }
    }

    pub fn pin_both() -> Self {
        Self {
            i_node: [false, false, false, false, true, true],
            j_node: [false, false, false, false, true, true],
        }
    }

    /// Combined releases as a 12-element array
    pub fn as_array(&self) -> [bool; 12] {
        let mut arr = [false; 12];
        arr[0..6].copy_from_slice(&self.i_node);
        arr[6..12].copy_from_slice(&self.j_node);
        arr
    }

    pub fn is_empty(&self) -> bool {
        !self.as_array().iter().any(|&r| r)
    }

    /// A release pattern is admissible when condensing it out of a frame
    /// stiffness leaves a non-singular released block
    pub fn is_stable(&self) -> bool {
        let k = math::member_local_stiffness(1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        math::apply_releases(&k, &self.as_array()).is_some()
    }
}

/// A finite element connecting an ordered list of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    /// Connectivity; shells list their corners counter-clockwise
    pub nodes: Vec<NodeId>,
    pub material: MaterialId,
    pub section: SectionId,
    /// Roll angle about the member axis in radians (beams)
    #[serde(default)]
    pub rotation: f64,
    /// End releases (beams)
    #[serde(default)]
    pub releases: EndReleases,
}

impl Element {
    fn with_nodes(
        kind: ElementKind,
        nodes: Vec<NodeId>,
        material: MaterialId,
        section: SectionId,
    ) -> Self {
        Self {
            kind,
            nodes,
            material,
            section,
            rotation: 0.0,
            releases: EndReleases::none(),
        }
    }

    pub fn truss(i: NodeId, j: NodeId, material: MaterialId, section: SectionId) -> Self {
        Self::with_nodes(ElementKind::Truss, vec![i, j], material, section)
    }

    pub fn beam(i: NodeId, j: NodeId, material: MaterialId, section: SectionId) -> Self {
        Self::with_nodes(ElementKind::Beam, vec![i, j], material, section)
    }

    /// Quadrilateral shell with corners `[i, j, m, n]`
    pub fn shell(nodes: [NodeId; 4], material: MaterialId, section: SectionId) -> Self {
        Self::with_nodes(ElementKind::Shell, nodes.to_vec(), material, section)
    }

    /// Set the roll angle about the longitudinal axis
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_releases(mut self, releases: EndReleases) -> Self {
        self.releases = releases;
        self
    }

    /// True if both elements are of the same kind and use the same node set
    pub fn same_connectivity(&self, other: &Element) -> bool {
        if self.kind != other.kind || self.nodes.len() != other.nodes.len() {
            return false;
        }
        let mut a = self.nodes.clone();
        let mut b = other.nodes.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }

    /// Structural checks that need nothing but the element itself
    pub(crate) fn validate_shape(&self) -> FEAResult<()> {
        let expected = self.kind.node_count();
        if self.nodes.len() != expected {
            return Err(FEAError::NodeCountMismatch {
                kind: self.kind.to_string(),
                expected,
                actual: self.nodes.len(),
            });
        }
        for (i, n) in self.nodes.iter().enumerate() {
            if self.nodes[i + 1..].contains(n) {
                return Err(FEAError::InvalidInput(format!(
                    "{} element repeats node {n}",
                    self.kind
                )));
            }
        }
        if !self.rotation.is_finite() {
            return Err(FEAError::InvalidInput(
                "element rotation must be finite".to_string(),
            ));
        }
        if !self.releases.is_empty() {
            if self.kind != ElementKind::Beam {
                return Err(FEAError::InvalidInput(format!(
                    "end releases only apply to beams, not {}",
                    self.kind
                )));
            }
            if !self.releases.is_stable() {
                return Err(FEAError::InvalidInput(
                    "end releases leave the beam without stiffness".to_string(),
                ));
            }
        }
        Ok(())
    }
}
