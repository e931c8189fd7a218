//! Boundary condition reduction
//!
//! Splits the global equations into the free set that is solved for and the
//! held set (fixed, prescribed, inactive and suppressed DOFs), then forms
//! `K_ff u_f = F_f - K_fc u_c`.

use nalgebra_sparse::{CooMatrix, CsrMatrix};

use crate::dof::{DofMap, DofStatus};
use crate::error::{FEAError, FEAResult};
use crate::math::{self, DVec};

/// Free DOFs whose diagonal is at or below this fraction of the largest one
/// count as unstiffened
pub const UNSTIFFENED_RATIO: f64 = 1e-12;

/// Partition of the global equations for one assembled system
#[derive(Debug, Clone)]
pub struct Partition {
    /// Global equations solved for, ascending
    pub free: Vec<usize>,
    /// Fixed and prescribed equations
    pub constrained: Vec<usize>,
    /// Free equations on connected nodes held at zero because nothing stiffens them
    pub suppressed: Vec<usize>,
    /// Values every held equation is kept at, zero on free ones
    held: DVec,
    /// Global equation to position in `free`
    position: Vec<Option<usize>>,
}

impl Partition {
    pub fn new(k: &CsrMatrix<f64>, dofs: &DofMap, suppress_unstiffened: bool) -> Self {
        let n = dofs.n_dofs();
        let diag = math::sparse::diagonal(k);
        let max_diag = diag.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let threshold = UNSTIFFENED_RATIO * max_diag;

        let mut free = Vec::new();
        let mut constrained = Vec::new();
        let mut suppressed = Vec::new();
        let mut held = DVec::zeros(n);
        let mut position = vec![None; n];

        for index in 0..n {
            match dofs.status(index) {
                DofStatus::Free => {
                    let connected = dofs
                        .locate(index)
                        .is_some_and(|(node, _)| dofs.is_connected(node));
                    if suppress_unstiffened && connected && diag[index].abs() <= threshold {
                        suppressed.push(index);
                    } else {
                        position[index] = Some(free.len());
                        free.push(index);
                    }
                }
                DofStatus::Fixed => constrained.push(index),
                DofStatus::Prescribed(v) => {
                    held[index] = v;
                    constrained.push(index);
                }
                DofStatus::Inactive => {}
            }
        }

        if !suppressed.is_empty() {
            log::debug!(
                "holding {} unstiffened DOFs at zero: {:?}",
                suppressed.len(),
                suppressed
                    .iter()
                    .filter_map(|&i| dofs.locate(i))
                    .map(|(node, dof)| format!("{node}.{dof}"))
                    .collect::<Vec<_>>()
            );
        }

        Self {
            free,
            constrained,
            suppressed,
            held,
            position,
        }
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    /// Position of a global equation in the reduced system
    pub fn position(&self, index: usize) -> Option<usize> {
        self.position.get(index).copied().flatten()
    }

    /// `K_ff`
    pub fn reduced_stiffness(&self, k: &CsrMatrix<f64>) -> CsrMatrix<f64> {
        let n = self.n_free();
        let mut coo = CooMatrix::new(n, n);
        for (row, col, &val) in k.triplet_iter() {
            if let (Some(r), Some(c)) = (self.position[row], self.position[col]) {
                coo.push(r, c, val);
            }
        }
        CsrMatrix::from(&coo)
    }

    /// `F_f - K_fc u_c`
    ///
    /// A load on a suppressed DOF has nothing to resist it and fails with
    /// [`FEAError::Underconstrained`].
    pub fn reduced_load(&self, k: &CsrMatrix<f64>, f: &DVec, dofs: &DofMap) -> FEAResult<DVec> {
        for &index in &self.suppressed {
            if f[index] != 0.0 {
                let location = dofs
                    .locate(index)
                    .map(|(node, dof)| format!("{dof} of node {node}"))
                    .unwrap_or_else(|| format!("equation {index}"));
                return Err(FEAError::Underconstrained(format!(
                    "load on {location}, which no element or support resists"
                )));
            }
        }

        let k_held = math::sparse_matvec(k, &self.held);
        Ok(DVec::from_iterator(
            self.n_free(),
            self.free.iter().map(|&g| f[g] - k_held[g]),
        ))
    }

    /// Full displacement vector from the reduced solution
    pub fn expand(&self, u_free: &DVec) -> DVec {
        let mut u = self.held.clone();
        for (&g, &v) in self.free.iter().zip(u_free.iter()) {
            u[g] = v;
        }
        u
    }
}
