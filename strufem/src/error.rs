//! Error types for the structural solver

use thiserror::Error;

use crate::elements::{ElementId, LoadId, MaterialId, NodeId, SectionId};

/// Coarse classification of a failure, used by callers that only need to
/// know which stage of the pipeline rejected the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: unknown references, duplicates, out-of-range values
    Validation,
    /// Degenerate element geometry
    Geometry,
    /// Inconsistent DOF usage found while building the global system
    Assembly,
    /// The structure has a mechanism or no supports at all
    Underconstrained,
    /// The reduced stiffness matrix is not positive definite
    SingularMatrix,
    /// The iterative solver did not converge
    Convergence,
    /// A result set was used against a model that changed since it was solved
    Stale,
    Serialization,
    Io,
}

/// Main error type for solver operations
#[derive(Error, Debug)]
pub enum FEAError {
    #[error("Node {0} not found in model")]
    NodeNotFound(NodeId),

    #[error("Element {0} not found in model")]
    ElementNotFound(ElementId),

    #[error("Material {0} not found in model")]
    MaterialNotFound(MaterialId),

    #[error("Section {0} not found in model")]
    SectionNotFound(SectionId),

    #[error("Load {0} not found in model")]
    LoadNotFound(LoadId),

    #[error("Node {0} has no support")]
    SupportNotFound(NodeId),

    #[error("Node {existing} already exists at ({x}, {y}, {z})")]
    DuplicateNode { existing: NodeId, x: f64, y: f64, z: f64 },

    #[error("Element {0} already connects the same nodes")]
    DuplicateElement(ElementId),

    #[error("Node {0} already has a support")]
    DuplicateSupport(NodeId),

    #[error("DOF {0} is constrained twice in the same support")]
    DuplicateConstraint(String),

    #[error("{kind} element needs {expected} nodes, got {actual}")]
    NodeCountMismatch {
        kind: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid DOF index {0}, expected 0..6")]
    InvalidDof(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{what} is still referenced by element {element}")]
    InUse { what: String, element: ElementId },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Assembly error: {0}")]
    InvalidAssembly(String),

    #[error("Model is underconstrained: {0}")]
    Underconstrained(String),

    #[error("Singular stiffness matrix at node {node} DOF {dof}: {detail}")]
    SingularMatrix {
        node: NodeId,
        dof: String,
        detail: String,
    },

    #[error("Convergence failed after {iterations} iterations (relative residual {residual:e})")]
    ConvergenceFailed { iterations: usize, residual: f64 },

    #[error("Result was computed for model version {solved}, model is now at version {current}")]
    StaleResult { solved: u64, current: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FEAError {
    /// Which part of the pipeline this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            FEAError::NodeNotFound(_)
            | FEAError::ElementNotFound(_)
            | FEAError::MaterialNotFound(_)
            | FEAError::SectionNotFound(_)
            | FEAError::LoadNotFound(_)
            | FEAError::SupportNotFound(_)
            | FEAError::DuplicateNode { .. }
            | FEAError::DuplicateElement(_)
            | FEAError::DuplicateSupport(_)
            | FEAError::DuplicateConstraint(_)
            | FEAError::NodeCountMismatch { .. }
            | FEAError::InvalidDof(_)
            | FEAError::InvalidInput(_)
            | FEAError::InUse { .. } => ErrorKind::Validation,
            FEAError::InvalidGeometry(_) => ErrorKind::Geometry,
            FEAError::InvalidAssembly(_) => ErrorKind::Assembly,
            FEAError::Underconstrained(_) => ErrorKind::Underconstrained,
            FEAError::SingularMatrix { .. } => ErrorKind::SingularMatrix,
            FEAError::ConvergenceFailed { .. } => ErrorKind::Convergence,
            FEAError::StaleResult { .. } => ErrorKind::Stale,
            FEAError::IoError(_) => ErrorKind::Io,
            FEAError::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    /// True for the two failure modes that mean "the structure cannot carry load"
    pub fn is_instability(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Underconstrained | ErrorKind::SingularMatrix
        )
    }
}

/// Result type for solver operations
pub type FEAResult<T> = Result<T, FEAError>;
