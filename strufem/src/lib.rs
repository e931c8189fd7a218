//! strufem - linear static finite element analysis of 3D structures
//!
//! Models are built from nodes, truss, beam and shell elements, materials,
//! sections, supports and loads. A solve assembles the global stiffness,
//! removes the supported DOFs, solves the reduced system and recovers
//! displacements, reactions and element forces:
//! - 2-node truss and Euler-Bernoulli frame elements with end releases
//! - 4-node MITC4 flat shells
//! - sparse Cholesky or preconditioned conjugate gradient solvers
//! - ASD and LRFD load combinations
//!
//! ## Example
//! ```rust
//! use strufem::prelude::*;
//!
//! let mut model = FEModel::new();
//! let steel = model.add_material(Material::steel()).unwrap();
//! let section = model.add_section(Section::rectangular(0.2, 0.4)).unwrap();
//!
//! let n1 = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
//! let n2 = model.add_node(Node::new(4.0, 0.0, 0.0)).unwrap();
//! model.add_element(Element::beam(n1, n2, steel, section)).unwrap();
//! model.add_support(n1, Support::fixed()).unwrap();
//! model.add_load(Load::nodal(n2, Dof::DY, -10e3, LoadCase::Dead)).unwrap();
//!
//! let solution = model.solve().unwrap();
//! let tip = solution.displacement(n2).unwrap();
//! assert!(tip.dy < 0.0);
//! assert!(model.is_current(&solution));
//! ```

pub mod analysis;
pub mod assembly;
pub mod dof;
pub mod elements;
pub mod error;
pub mod loads;
pub mod math;
pub mod model;
pub mod recovery;
pub mod reduce;
pub mod results;
pub mod solver;
pub mod stiffness;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{AnalysisOptions, SolverKind};
    pub use crate::dof::Dof;
    pub use crate::elements::{
        Constraint, Element, ElementId, ElementKind, EndReleases, LoadId, Material, MaterialId,
        Node, NodeId, Section, SectionId, Support,
    };
    pub use crate::error::{ErrorKind, FEAError, FEAResult};
    pub use crate::loads::{DesignMethod, Load, LoadCase, LoadCombination, LoadDirection};
    pub use crate::model::FEModel;
    pub use crate::results::{
        AnalysisSummary, ElementForces, FrameForces, NodeDisplacement, PlaneStress, Reactions,
        ShellStress, Solution,
    };
}
