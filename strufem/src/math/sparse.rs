//! Sparse storage and solvers for assembled stiffness matrices
//!
//! Stiffness matrices are typically 95-99% sparse. Assembly collects COO
//! triplets, converts once to CSR, and the solvers work from there:
//! a skyline Cholesky for the direct path and Jacobi-preconditioned CG for
//! the iterative one.

use nalgebra::storage::Storage;
use nalgebra::{DMatrix, DVector, Dim, Matrix};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sparse matrix builder using COO format
///
/// Duplicate entries are kept and summed on conversion, so builders can be
/// filled independently and merged afterwards.
#[derive(Debug, Clone)]
pub struct SparseMatrixBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrixBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            entries: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Add a value to the matrix (accumulates if already exists)
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.entries.push((row, col, value));
        }
    }

    /// Scatter a dense element matrix onto the global equations `dofs`
    pub fn add_element_matrix<R, C, S>(&mut self, dofs: &[usize], k_elem: &Matrix<f64, R, C, S>)
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>,
    {
        debug_assert_eq!(dofs.len(), k_elem.nrows());
        for (i, &di) in dofs.iter().enumerate() {
            for (j, &dj) in dofs.iter().enumerate() {
                self.add(di, dj, k_elem[(i, j)]);
            }
        }
    }

    /// Append the triplets of another builder of the same size
    pub fn merge(mut self, mut other: SparseMatrixBuilder) -> Self {
        debug_assert_eq!(self.size, other.size);
        if self.entries.len() < other.entries.len() {
            std::mem::swap(&mut self.entries, &mut other.entries);
        }
        self.entries.append(&mut other.entries);
        self
    }

    /// Convert to CSR, summing duplicates
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CsrMatrix::from(&coo)
    }

    /// Convert to dense matrix (for comparison/debugging)
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.size, self.size);
        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }
        mat
    }

    /// Number of stored triplets, duplicates included
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// Sparse matrix-vector product
pub fn sparse_matvec(csr: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(csr.nrows());
    for (i, row) in csr.row_iter().enumerate() {
        y[i] = row
            .col_indices()
            .iter()
            .zip(row.values())
            .map(|(&j, &v)| v * x[j])
            .sum();
    }
    y
}

/// Diagonal of a square CSR matrix
pub fn diagonal(csr: &CsrMatrix<f64>) -> DVector<f64> {
    let mut diag = DVector::zeros(csr.nrows());
    for (row, col, &val) in csr.triplet_iter() {
        if row == col {
            diag[row] += val;
        }
    }
    diag
}

/// Pivot that fell below tolerance during factorization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroPivot {
    /// Equation index in the factored matrix
    pub equation: usize,
    pub pivot: f64,
}

/// Skyline (variable band) Cholesky factor `L` with `A = L Lᵀ`
///
/// Row `i` of `L` is stored contiguously from its first non-zero column to
/// the diagonal. Fill-in stays inside that profile, which is why the rows
/// should be ordered to keep it narrow (see [`reverse_cuthill_mckee`]).
#[derive(Debug, Clone)]
pub struct SkylineCholesky {
    first: Vec<usize>,
    offsets: Vec<usize>,
    values: Vec<f64>,
}

impl SkylineCholesky {
    /// Factorize a symmetric positive definite matrix
    ///
    /// Only the lower triangle of `csr` is read. A pivot at or below
    /// `pivot_tolerance` times the largest diagonal entry is reported as
    /// [`ZeroPivot`].
    pub fn factorize(csr: &CsrMatrix<f64>, pivot_tolerance: f64) -> Result<Self, ZeroPivot> {
        let n = csr.nrows();
        let mut first: Vec<usize> = (0..n).collect();
        for (row, col, _) in csr.triplet_iter() {
            if col < row {
                first[row] = first[row].min(col);
            }
        }

        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0);
        for i in 0..n {
            offsets.push(offsets[i] + i - first[i] + 1);
        }

        let mut values = vec![0.0; offsets[n]];
        for (row, col, &val) in csr.triplet_iter() {
            if col <= row {
                values[offsets[row] + col - first[row]] += val;
            }
        }

        let max_diag = (0..n)
            .map(|i| values[offsets[i + 1] - 1].abs())
            .fold(0.0, f64::max);
        let threshold = pivot_tolerance * max_diag;

        for i in 0..n {
            let fi = first[i];
            let (head, tail) = values.split_at_mut(offsets[i]);
            let row_i = &mut tail[..offsets[i + 1] - offsets[i]];

            for j in fi..i {
                let fj = first[j];
                let row_j = &head[offsets[j]..offsets[j + 1]];
                let start = fi.max(fj);
                let dot: f64 = row_i[start - fi..j - fi]
                    .iter()
                    .zip(&row_j[start - fj..j - fj])
                    .map(|(a, b)| a * b)
                    .sum();
                let l_jj = row_j[j - fj];
                row_i[j - fi] = (row_i[j - fi] - dot) / l_jj;
            }

            let diag_slot = i - fi;
            let sum_sq: f64 = row_i[..diag_slot].iter().map(|v| v * v).sum();
            let pivot = row_i[diag_slot] - sum_sq;
            if !(pivot > threshold) {
                return Err(ZeroPivot { equation: i, pivot });
            }
            row_i[diag_slot] = pivot.sqrt();
        }

        log::trace!("skyline factor: {n} equations, profile {}", values.len());
        Ok(Self {
            first,
            offsets,
            values,
        })
    }

    pub fn n(&self) -> usize {
        self.first.len()
    }

    /// Stored entries of the factor
    pub fn profile(&self) -> usize {
        self.values.len()
    }

    fn row(&self, i: usize) -> &[f64] {
        &self.values[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Solve `L Lᵀ x = b`
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let n = self.n();
        let mut x = b.clone();

        // L y = b
        for i in 0..n {
            let fi = self.first[i];
            let row = self.row(i);
            let diag_slot = i - fi;
            let dot: f64 = row[..diag_slot]
                .iter()
                .enumerate()
                .map(|(k, l)| l * x[fi + k])
                .sum();
            x[i] = (x[i] - dot) / row[diag_slot];
        }

        // Lᵀ x = y, column sweep over the stored rows
        for i in (0..n).rev() {
            let fi = self.first[i];
            let row = self.row(i);
            let diag_slot = i - fi;
            x[i] /= row[diag_slot];
            let xi = x[i];
            for (k, l) in row[..diag_slot].iter().enumerate() {
                x[fi + k] -= l * xi;
            }
        }
        x
    }
}

/// Settings for [`solve_pcg`]
#[derive(Debug, Clone, Copy)]
pub struct PcgSettings {
    /// Relative residual `|r| / |b|` to stop at
    pub tolerance: f64,
    pub max_iterations: usize,
    pub timeout: Option<Duration>,
}

/// Why a CG run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcgStatus {
    Converged,
    MaxIterations,
    TimedOut,
    /// `pᵀAp <= 0`: the matrix is not positive definite
    Breakdown,
}

#[derive(Debug, Clone)]
pub struct PcgOutcome {
    pub solution: DVector<f64>,
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    pub status: PcgStatus,
}

/// Jacobi-preconditioned conjugate gradient
pub fn solve_pcg(csr: &CsrMatrix<f64>, b: &DVector<f64>, settings: &PcgSettings) -> PcgOutcome {
    let n = csr.nrows();
    let started = Instant::now();
    let b_norm = b.norm();

    let mut x = DVector::zeros(n);
    if b_norm == 0.0 {
        return PcgOutcome {
            solution: x,
            iterations: 0,
            residual: 0.0,
            status: PcgStatus::Converged,
        };
    }

    let inv_diag = diagonal(csr).map(|d| if d > 0.0 { 1.0 / d } else { 1.0 });

    let mut r = b.clone();
    let mut z = r.component_mul(&inv_diag);
    let mut p = z.clone();
    let mut r_dot_z = r.dot(&z);
    let mut residual = 1.0;

    for iteration in 1..=settings.max_iterations {
        let ap = sparse_matvec(csr, &p);
        let p_dot_ap = p.dot(&ap);
        if !(p_dot_ap > 0.0) {
            return PcgOutcome {
                solution: x,
                iterations: iteration,
                residual,
                status: PcgStatus::Breakdown,
            };
        }

        let alpha = r_dot_z / p_dot_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        residual = r.norm() / b_norm;
        if residual <= settings.tolerance {
            return PcgOutcome {
                solution: x,
                iterations: iteration,
                residual,
                status: PcgStatus::Converged,
            };
        }
        if settings.timeout.is_some_and(|limit| started.elapsed() > limit) {
            return PcgOutcome {
                solution: x,
                iterations: iteration,
                residual,
                status: PcgStatus::TimedOut,
            };
        }

        z = r.component_mul(&inv_diag);
        let r_dot_z_new = r.dot(&z);
        let beta = r_dot_z_new / r_dot_z;
        r_dot_z = r_dot_z_new;
        p = &z + beta * &p;
    }

    PcgOutcome {
        solution: x,
        iterations: settings.max_iterations,
        residual,
        status: PcgStatus::MaxIterations,
    }
}

/// Bandwidth reduction using Reverse Cuthill-McKee
///
/// Returns `perm` with `perm[new] = old`. Each connected component starts
/// from its lowest-degree equation.
pub fn reverse_cuthill_mckee(csr: &CsrMatrix<f64>) -> Vec<usize> {
    let n = csr.nrows();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (row, col, &val) in csr.triplet_iter() {
        if row != col && val != 0.0 {
            adj[row].push(col);
        }
    }
    let degrees: Vec<usize> = adj.iter().map(Vec::len).collect();
    for neighbors in &mut adj {
        neighbors.sort_unstable_by_key(|&i| (degrees[i], i));
        neighbors.dedup();
    }

    let mut by_degree: Vec<usize> = (0..n).collect();
    by_degree.sort_by_key(|&i| (degrees[i], i));

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();

    for &seed in &by_degree {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &neighbor in &adj[node] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    order.reverse();
    order
}

/// Create inverse permutation
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (new_idx, &old_idx) in perm.iter().enumerate() {
        inv[old_idx] = new_idx;
    }
    inv
}

/// Symmetric reordering `P A Pᵀ` for `perm[new] = old`
pub fn permute_symmetric(csr: &CsrMatrix<f64>, perm: &[usize]) -> CsrMatrix<f64> {
    let inv = inverse_permutation(perm);
    let mut coo = CooMatrix::new(csr.nrows(), csr.ncols());
    for (row, col, &val) in csr.triplet_iter() {
        coo.push(inv[row], inv[col], val);
    }
    CsrMatrix::from(&coo)
}

/// Entries a skyline factor of `csr` would store
pub fn skyline_profile(csr: &CsrMatrix<f64>) -> usize {
    let mut first: Vec<usize> = (0..csr.nrows()).collect();
    for (row, col, _) in csr.triplet_iter() {
        if col < row {
            first[row] = first[row].min(col);
        }
    }
    first.iter().enumerate().map(|(i, &f)| i - f + 1).sum()
}
