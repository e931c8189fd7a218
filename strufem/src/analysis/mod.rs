//! Analysis options and the linear static pipeline

mod linear;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::loads::LoadCombination;
use crate::solver::SolverSettings;

pub use crate::solver::SolverKind;
pub use linear::LinearStatic;

/// Options for linear static analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Linear solver used on the reduced system
    pub solver: SolverKind,
    /// Pivot threshold relative to the largest diagonal of the reduced stiffness
    pub pivot_tolerance: f64,
    /// Relative residual at which CG stops
    pub cg_tolerance: f64,
    /// CG iteration limit
    pub max_iterations: usize,
    /// CG wall-clock limit
    pub timeout: Option<Duration>,
    /// Evaluate elements and recover forces on the rayon pool
    pub parallel: bool,
    /// Renumber equations with reverse Cuthill-McKee before factorizing
    pub reorder: bool,
    /// Hold free DOFs that no element stiffens at zero instead of failing
    pub suppress_unstiffened_dofs: bool,
    /// Check static equilibrium after every solve
    pub check_statics: bool,
    pub statics_tolerance: f64,
    /// Combination solved by [`crate::model::FEModel::solve`]
    pub combination: LoadCombination,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            solver: SolverKind::SparseCholesky,
            pivot_tolerance: 1e-10,
            cg_tolerance: 1e-10,
            max_iterations: 10_000,
            timeout: None,
            parallel: true,
            reorder: true,
            suppress_unstiffened_dofs: true,
            check_statics: true,
            statics_tolerance: 1e-6,
            combination: LoadCombination::unfactored(),
        }
    }
}

impl AnalysisOptions {
    /// Direct sparse Cholesky with default settings
    pub fn linear() -> Self {
        Self::default()
    }

    /// Jacobi-preconditioned conjugate gradient
    pub fn iterative() -> Self {
        Self::default().with_solver(SolverKind::ConjugateGradient)
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    /// Set the CG convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.cg_tolerance = tol;
        self
    }

    pub fn with_pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tolerance = tol;
        self
    }

    /// Set maximum CG iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run every stage on the calling thread
    pub fn serial(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn without_reordering(mut self) -> Self {
        self.reorder = false;
        self
    }

    /// Keep unstiffened DOFs in the system, so they fail in the solver
    pub fn without_suppression(mut self) -> Self {
        self.suppress_unstiffened_dofs = false;
        self
    }

    pub fn without_statics_check(mut self) -> Self {
        self.check_statics = false;
        self
    }

    pub fn with_combination(mut self, combination: LoadCombination) -> Self {
        self.combination = combination;
        self
    }

    pub(crate) fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            kind: self.solver,
            pivot_tolerance: self.pivot_tolerance,
            reorder: self.reorder,
            cg_tolerance: self.cg_tolerance,
            max_iterations: self.max_iterations,
            timeout: self.timeout,
        }
    }
}
