//! Result types for FEA analysis

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::elements::{ElementId, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::loads::LoadCombination;
use crate::model::FEModel;

/// Displacement results at a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    /// Displacement in X direction
    pub dx: f64,
    /// Displacement in Y direction
    pub dy: f64,
    /// Displacement in Z direction
    pub dz: f64,
    /// Rotation about X axis
    pub rx: f64,
    /// Rotation about Y axis
    pub ry: f64,
    /// Rotation about Z axis
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.dx, self.dy, self.dz, self.rx, self.ry, self.rz]
    }

    /// Get translation magnitude
    pub fn translation_magnitude(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }

    /// Get rotation magnitude
    pub fn rotation_magnitude(&self) -> f64 {
        (self.rx.powi(2) + self.ry.powi(2) + self.rz.powi(2)).sqrt()
    }
}

/// Reaction forces at a supported node. Components on unconstrained DOFs are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reactions {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub mx: f64,
    pub my: f64,
    pub mz: f64,
}

impl Reactions {
    /// Create from array [FX, FY, FZ, MX, MY, MZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            fx: arr[0],
            fy: arr[1],
            fz: arr[2],
            mx: arr[3],
            my: arr[4],
            mz: arr[5],
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.fx, self.fy, self.fz, self.mx, self.my, self.mz]
    }

    /// Get total force magnitude
    pub fn force_magnitude(&self) -> f64 {
        (self.fx.powi(2) + self.fy.powi(2) + self.fz.powi(2)).sqrt()
    }

    /// Get total moment magnitude
    pub fn moment_magnitude(&self) -> f64 {
        (self.mx.powi(2) + self.my.powi(2) + self.mz.powi(2)).sqrt()
    }
}

/// Internal forces at one end of a frame member, local axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameForces {
    /// Axial force (positive = tension)
    pub axial: f64,
    /// Shear force in local y direction
    pub shear_y: f64,
    /// Shear force in local z direction
    pub shear_z: f64,
    pub torsion: f64,
    /// Bending moment about local y axis
    pub moment_y: f64,
    /// Bending moment about local z axis
    pub moment_z: f64,
}

impl FrameForces {
    /// Internal forces at the i-node from the 12 local end forces
    pub fn from_i_node_forces(forces: &[f64]) -> Self {
        Self {
            axial: -forces[0],
            shear_y: forces[1],
            shear_z: forces[2],
            torsion: -forces[3],
            moment_y: forces[4],
            moment_z: forces[5],
        }
    }

    /// Internal forces at the j-node from the 12 local end forces
    pub fn from_j_node_forces(forces: &[f64]) -> Self {
        Self {
            axial: forces[6],
            shear_y: -forces[7],
            shear_z: -forces[8],
            torsion: forces[9],
            moment_y: forces[10],
            moment_z: forces[11],
        }
    }
}

/// In-plane stress state with derived equivalent and principal stresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneStress {
    pub sx: f64,
    pub sy: f64,
    pub txy: f64,
    /// Von Mises equivalent stress
    pub von_mises: f64,
    /// Maximum principal stress
    pub s1: f64,
    /// Minimum principal stress
    pub s2: f64,
}

impl PlaneStress {
    pub fn from_components(sx: f64, sy: f64, txy: f64) -> Self {
        let von_mises = (sx.powi(2) - sx * sy + sy.powi(2) + 3.0 * txy.powi(2)).sqrt();

        let s_avg = (sx + sy) / 2.0;
        let r = ((sx - sy).powi(2) / 4.0 + txy.powi(2)).sqrt();
        Self {
            sx,
            sy,
            txy,
            von_mises,
            s1: s_avg + r,
            s2: s_avg - r,
        }
    }
}

/// Shell results at the element centroid, local axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellStress {
    /// Mid-surface membrane stress
    pub membrane: PlaneStress,
    /// Membrane plus bending at the +z surface
    pub top: PlaneStress,
    /// Membrane plus bending at the -z surface
    pub bottom: PlaneStress,
    /// Moments per unit width
    pub mx: f64,
    pub my: f64,
    pub mxy: f64,
    /// Transverse shear per unit width
    pub qx: f64,
    pub qy: f64,
}

impl ShellStress {
    /// Combine membrane stresses `[sx, sy, txy]` with moments `[mx, my, mxy]`
    /// and shears `[qx, qy]` for a shell of thickness `t`
    pub fn from_resultants(membrane: [f64; 3], moments: [f64; 3], shear: [f64; 2], t: f64) -> Self {
        let bending = moments.map(|m| 6.0 * m / (t * t));
        let surface = |sign: f64| {
            PlaneStress::from_components(
                membrane[0] + sign * bending[0],
                membrane[1] + sign * bending[1],
                membrane[2] + sign * bending[2],
            )
        };
        Self {
            membrane: PlaneStress::from_components(membrane[0], membrane[1], membrane[2]),
            top: surface(1.0),
            bottom: surface(-1.0),
            mx: moments[0],
            my: moments[1],
            mxy: moments[2],
            qx: shear[0],
            qy: shear[1],
        }
    }

    /// Largest von Mises stress over both surfaces
    pub fn max_von_mises(&self) -> f64 {
        self.top.von_mises.max(self.bottom.von_mises)
    }
}

/// Recovered forces of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementForces {
    Truss {
        /// Positive = tension
        axial: f64,
    },
    Frame {
        i: FrameForces,
        j: FrameForces,
    },
    Shell(ShellStress),
}

impl ElementForces {
    pub fn axial(&self) -> Option<f64> {
        match self {
            ElementForces::Truss { axial } => Some(*axial),
            ElementForces::Frame { i, .. } => Some(i.axial),
            ElementForces::Shell(_) => None,
        }
    }
}

/// Summary of analysis results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Largest translation magnitude
    pub max_displacement: f64,
    pub max_displacement_node: Option<NodeId>,
    /// Largest reaction force magnitude
    pub max_reaction: f64,
    pub max_reaction_node: Option<NodeId>,
    /// Resultant of applied loads `[FX, FY, FZ, MX, MY, MZ]` about the origin
    pub total_load: [f64; 6],
    /// Resultant of reactions about the origin
    pub total_reaction: [f64; 6],
    /// `|load + reaction| / max(|load|, |reaction|)`
    pub equilibrium_residual: f64,
    pub num_nodes: usize,
    pub num_elements: usize,
    pub total_dofs: usize,
    /// Equations solved for
    pub free_dofs: usize,
    /// Fixed and prescribed DOFs
    pub constrained_dofs: usize,
    /// Free DOFs held at zero because nothing stiffens them
    pub suppressed_dofs: usize,
    /// CG iterations, `None` for the direct solver
    pub iterations: Option<usize>,
}

/// Results of one load combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Model version the solution was computed from
    pub version: u64,
    pub combination: LoadCombination,
    pub displacements: BTreeMap<NodeId, NodeDisplacement>,
    /// Supported nodes only
    pub reactions: BTreeMap<NodeId, Reactions>,
    pub element_forces: BTreeMap<ElementId, ElementForces>,
    pub summary: AnalysisSummary,
}

impl Solution {
    pub fn displacement(&self, node: NodeId) -> Option<&NodeDisplacement> {
        self.displacements.get(&node)
    }

    pub fn reaction(&self, node: NodeId) -> Option<&Reactions> {
        self.reactions.get(&node)
    }

    pub fn element_forces(&self, element: ElementId) -> Option<&ElementForces> {
        self.element_forces.get(&element)
    }

    /// Fails with [`FEAError::StaleResult`] if `model` changed since this was solved
    pub fn check_current(&self, model: &FEModel) -> FEAResult<()> {
        if self.version == model.version() {
            Ok(())
        } else {
            Err(FEAError::StaleResult {
                solved: self.version,
                current: model.version(),
            })
        }
    }
}
