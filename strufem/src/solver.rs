//! Linear solve of the reduced system
//!
//! The reduced stiffness is prepared once per model version: reordered and
//! factorized for the direct path, or checked and kept for CG. Every load
//! combination then reuses the prepared system.

use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::math::sparse::{self, permute_symmetric, skyline_profile};
use crate::math::{
    reverse_cuthill_mckee, solve_pcg, DVec, PcgSettings, PcgStatus, SkylineCholesky,
};

/// Linear solver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverKind {
    /// Skyline LLᵀ factorization with optional RCM reordering
    #[default]
    SparseCholesky,
    /// Jacobi-preconditioned conjugate gradient
    ConjugateGradient,
}

/// Solver settings taken from the analysis options
#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    pub kind: SolverKind,
    pub pivot_tolerance: f64,
    pub reorder: bool,
    pub cg_tolerance: f64,
    pub max_iterations: usize,
    pub timeout: Option<Duration>,
}

/// Why the reduced system could not be solved
#[derive(Debug, Clone, PartialEq)]
pub enum SolveFailure {
    /// No positive pivot at reduced equation `equation`
    Singular { equation: usize, detail: String },
    NotConverged { iterations: usize, residual: f64 },
}

#[derive(Debug, Clone)]
enum Method {
    Cholesky {
        factor: SkylineCholesky,
        /// `perm[new] = old`, `None` when the natural order was kept
        perm: Option<Vec<usize>>,
    },
    Iterative {
        k: CsrMatrix<f64>,
        settings: PcgSettings,
    },
}

/// Reduced stiffness ready for repeated right-hand sides
#[derive(Debug, Clone)]
pub struct PreparedSystem {
    n: usize,
    method: Method,
}

/// Reduced solution of one right-hand side
#[derive(Debug, Clone)]
pub struct Solved {
    pub u: DVec,
    /// CG iterations, `None` for the direct solver
    pub iterations: Option<usize>,
}

/// First equation whose diagonal is not positive relative to the largest one
fn weak_diagonal(k: &CsrMatrix<f64>, tolerance: f64) -> Option<(usize, f64)> {
    let diag = sparse::diagonal(k);
    let max_diag = diag.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    diag.iter()
        .enumerate()
        .find(|&(_, &d)| !(d > tolerance * max_diag))
        .map(|(i, &d)| (i, d))
}

impl PreparedSystem {
    pub fn prepare(k: CsrMatrix<f64>, settings: &SolverSettings) -> Result<Self, SolveFailure> {
        let n = k.nrows();
        if let Some((equation, d)) = weak_diagonal(&k, settings.pivot_tolerance) {
            return Err(SolveFailure::Singular {
                equation,
                detail: format!("diagonal stiffness {d:e}, nothing restrains this DOF"),
            });
        }

        let method = match settings.kind {
            SolverKind::SparseCholesky => {
                let (matrix, perm) = if settings.reorder && n > 2 {
                    let perm = reverse_cuthill_mckee(&k);
                    let reordered = permute_symmetric(&k, &perm);
                    let (before, after) = (skyline_profile(&k), skyline_profile(&reordered));
                    log::debug!("RCM profile {before} -> {after}");
                    if after < before {
                        (reordered, Some(perm))
                    } else {
                        (k, None)
                    }
                } else {
                    (k, None)
                };

                let factor = SkylineCholesky::factorize(&matrix, settings.pivot_tolerance)
                    .map_err(|zero| {
                        let equation = perm.as_ref().map_or(zero.equation, |p| p[zero.equation]);
                        SolveFailure::Singular {
                            equation,
                            detail: format!("pivot {:e} during Cholesky factorization", zero.pivot),
                        }
                    })?;
                log::debug!("factorized {n} equations, profile {}", factor.profile());
                Method::Cholesky { factor, perm }
            }
            SolverKind::ConjugateGradient => Method::Iterative {
                k,
                settings: PcgSettings {
                    tolerance: settings.cg_tolerance,
                    max_iterations: settings.max_iterations,
                    timeout: settings.timeout,
                },
            },
        };

        Ok(Self { n, method })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Solve for one right-hand side in reduced numbering
    pub fn solve(&self, f: &DVec) -> Result<Solved, SolveFailure> {
        match &self.method {
            Method::Cholesky { factor, perm } => {
                let Some(perm) = perm else {
                    return Ok(Solved {
                        u: factor.solve(f),
                        iterations: None,
                    });
                };
                let f_perm = DVec::from_iterator(self.n, perm.iter().map(|&old| f[old]));
                let u_perm = factor.solve(&f_perm);
                let mut u = DVec::zeros(self.n);
                for (new, &old) in perm.iter().enumerate() {
                    u[old] = u_perm[new];
                }
                Ok(Solved {
                    u,
                    iterations: None,
                })
            }
            Method::Iterative { k, settings } => {
                let outcome = solve_pcg(k, f, settings);
                log::debug!(
                    "CG {:?} after {} iterations, relative residual {:e}",
                    outcome.status,
                    outcome.iterations,
                    outcome.residual
                );
                match outcome.status {
                    PcgStatus::Converged => Ok(Solved {
                        u: outcome.solution,
                        iterations: Some(outcome.iterations),
                    }),
                    PcgStatus::Breakdown => {
                        // No single pivot to blame; point at the softest equation
                        let equation = sparse::diagonal(k)
                            .iter()
                            .enumerate()
                            .min_by(|a, b| a.1.total_cmp(b.1))
                            .map_or(0, |(i, _)| i);
                        Err(SolveFailure::Singular {
                            equation,
                            detail: "conjugate gradient breakdown, matrix is not positive definite"
                                .to_string(),
                        })
                    }
                    PcgStatus::MaxIterations | PcgStatus::TimedOut => {
                        Err(SolveFailure::NotConverged {
                            iterations: outcome.iterations,
                            residual: outcome.residual,
                        })
                    }
                }
            }
        }
    }
}
