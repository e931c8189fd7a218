//! Element-level math: frame and truss kernels, shell kernels, sparse storage

pub mod shell;
pub mod sparse;

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector, Vector3};

use crate::error::{FEAError, FEAResult};

pub use shell::{ShellGeometry, ShellResultants};
pub use sparse::{
    reverse_cuthill_mckee, solve_pcg, sparse_matvec, PcgOutcome, PcgSettings, PcgStatus,
    SkylineCholesky, SparseMatrixBuilder, ZeroPivot,
};

pub type Mat = DMatrix<f64>;
pub type DVec = DVector<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// 12x12 matrix for frame and truss stiffness
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 12-element vector for frame forces/displacements
pub type Vec12 = SVector<f64, 12>;
/// 24x24 matrix for shell stiffness
pub type Mat24 = SMatrix<f64, 24, 24>;
/// 24-element vector for shell forces/displacements
pub type Vec24 = SVector<f64, 24>;

/// Members shorter than this are rejected as degenerate
pub const MIN_LENGTH: f64 = 1e-10;

/// Direction cosines of a frame member, rows are the local x, y, z axes
///
/// Local axes follow the PyNite convention:
/// - vertical members: y in the XY plane (-X pointing up, +X pointing down), z = global Z
/// - horizontal members: y = global Y, z = x cross y
/// - inclined members: z horizontal and perpendicular to x, y = z cross x
///
/// `rotation` then rolls y and z about the member axis (radians).
pub fn frame_axes(i_node: &[f64; 3], j_node: &[f64; 3], rotation: f64) -> FEAResult<Mat3> {
    let d = Vec3::new(
        j_node[0] - i_node[0],
        j_node[1] - i_node[1],
        j_node[2] - i_node[2],
    );
    let length = d.norm();
    if length < MIN_LENGTH {
        return Err(FEAError::InvalidGeometry(format!(
            "member has zero length between {i_node:?} and {j_node:?}"
        )));
    }
    let x = d / length;

    let (y, z) = if x.x.abs() < 1e-10 && x.z.abs() < 1e-10 {
        let y = if x.y > 0.0 { -Vec3::x() } else { Vec3::x() };
        (y, Vec3::z())
    } else if d.y.abs() < 1e-10 {
        let y = Vec3::y();
        (y, x.cross(&y).normalize())
    } else {
        let proj = Vec3::new(d.x, 0.0, d.z);
        let z = if x.y > 0.0 {
            proj.cross(&x)
        } else {
            x.cross(&proj)
        }
        .normalize();
        (z.cross(&x).normalize(), z)
    };

    let (y, z) = if rotation.abs() > 1e-10 {
        let (s, c) = rotation.sin_cos();
        (y * c + z * s, z * c - y * s)
    } else {
        (y, z)
    };

    Ok(Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
}

/// Repeat a 3x3 direction cosine matrix along the diagonal of an NxN transform
pub fn block_transform<const N: usize>(r: &Mat3) -> SMatrix<f64, N, N> {
    let mut t = SMatrix::<f64, N, N>::zeros();
    for k in 0..N / 3 {
        t.fixed_view_mut::<3, 3>(3 * k, 3 * k).copy_from(r);
    }
    t
}

/// Global-to-local transformation for a 2-node frame or truss
pub fn member_transformation_matrix(
    i_node: &[f64; 3],
    j_node: &[f64; 3],
    rotation: f64,
) -> FEAResult<Mat12> {
    Ok(block_transform::<12>(&frame_axes(i_node, j_node, rotation)?))
}

/// Local stiffness of a 3D Euler-Bernoulli frame element
///
/// DOF order per end: `u, v, w, rx, ry, rz`.
pub fn member_local_stiffness(
    e: f64,
    g: f64,
    a: f64,
    iy: f64,
    iz: f64,
    j: f64,
    length: f64,
) -> Mat12 {
    let l = length;
    let ea = e * a / l;
    let gj = g * j / l;
    let (z1, z2, z3) = (e * iz / l, e * iz / (l * l), e * iz / (l * l * l));
    let (y1, y2, y3) = (e * iy / l, e * iy / (l * l), e * iy / (l * l * l));

    let mut k = Mat12::zeros();
    let mut put = |r: usize, c: usize, v: f64| {
        k[(r, c)] = v;
        k[(c, r)] = v;
    };

    // Axial and torsion
    put(0, 0, ea);
    put(6, 6, ea);
    put(0, 6, -ea);
    put(3, 3, gj);
    put(9, 9, gj);
    put(3, 9, -gj);

    // Bending in the local x-y plane (v, rz)
    put(1, 1, 12.0 * z3);
    put(7, 7, 12.0 * z3);
    put(1, 7, -12.0 * z3);
    put(1, 5, 6.0 * z2);
    put(1, 11, 6.0 * z2);
    put(5, 7, -6.0 * z2);
    put(7, 11, -6.0 * z2);
    put(5, 5, 4.0 * z1);
    put(11, 11, 4.0 * z1);
    put(5, 11, 2.0 * z1);

    // Bending in the local x-z plane (w, ry)
    put(2, 2, 12.0 * y3);
    put(8, 8, 12.0 * y3);
    put(2, 8, -12.0 * y3);
    put(2, 4, -6.0 * y2);
    put(2, 10, -6.0 * y2);
    put(4, 8, 6.0 * y2);
    put(8, 10, 6.0 * y2);
    put(4, 4, 4.0 * y1);
    put(10, 10, 4.0 * y1);
    put(4, 10, 2.0 * y1);

    k
}

/// Local stiffness of a 2-node axial bar embedded in the 12-DOF member layout
pub fn truss_local_stiffness(e: f64, a: f64, length: f64) -> Mat12 {
    let ea = e * a / length;
    let mut k = Mat12::zeros();
    k[(0, 0)] = ea;
    k[(6, 6)] = ea;
    k[(0, 6)] = -ea;
    k[(6, 0)] = -ea;
    k
}

fn partition_releases(releases: &[bool; 12]) -> (Vec<usize>, Vec<usize>) {
    (0..12).partition(|&i| !releases[i])
}

/// Inverse of the released block, or `None` if the release pattern leaves it singular
fn condensation_inverse(k22: &Mat) -> Option<Mat> {
    let scale = k22.diagonal().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let chol = k22.clone().cholesky()?;
    if chol.l().diagonal().iter().any(|d| d * d <= 1e-10 * scale) {
        return None;
    }
    Some(chol.inverse())
}

/// Static condensation of released DOFs out of a member stiffness
///
/// `k_cond = k11 - k12 * inv(k22) * k21`, expanded back to 12x12 with zero
/// rows and columns at the released DOFs. Returns `None` when the released
/// block is singular, i.e. the releases form a mechanism.
pub fn apply_releases(k: &Mat12, releases: &[bool; 12]) -> Option<Mat12> {
    let (kept, released) = partition_releases(releases);
    if released.is_empty() {
        return Some(*k);
    }

    let k11 = k.select_rows(&kept).select_columns(&kept);
    let k12 = k.select_rows(&kept).select_columns(&released);
    let k21 = k.select_rows(&released).select_columns(&kept);
    let k22 = k.select_rows(&released).select_columns(&released);

    let k22_inv = condensation_inverse(&k22)?;
    let condensed = k11 - k12 * k22_inv * k21;

    let mut out = Mat12::zeros();
    for (a, &ia) in kept.iter().enumerate() {
        for (b, &ib) in kept.iter().enumerate() {
            out[(ia, ib)] = condensed[(a, b)];
        }
    }
    Some(out)
}

/// Static condensation of the fixed end reactions for released DOFs
/// (`fer_cond = fer1 - k12 * inv(k22) * fer2`, released entries left at zero)
pub fn apply_fer_releases(fer: &Vec12, k: &Mat12, releases: &[bool; 12]) -> Option<Vec12> {
    let (kept, released) = partition_releases(releases);
    if released.is_empty() {
        return Some(*fer);
    }

    let k12 = k.select_rows(&kept).select_columns(&released);
    let k22 = k.select_rows(&released).select_columns(&released);
    let fer1 = fer.select_rows(&kept);
    let fer2 = fer.select_rows(&released);

    let k22_inv = condensation_inverse(&k22)?;
    let condensed = fer1 - k12 * k22_inv * fer2;

    let mut out = Vec12::zeros();
    for (a, &ia) in kept.iter().enumerate() {
        out[ia] = condensed[a];
    }
    Some(out)
}

/// Fixed end reactions of a fixed-fixed member under a uniform load `w`
/// along local axis `axis` (0 = x, 1 = y, 2 = z)
pub fn fer_uniform_load(w: f64, length: f64, axis: usize) -> Vec12 {
    let l = length;
    let shear = -w * l / 2.0;
    let moment = w * l * l / 12.0;

    let mut fer = Vec12::zeros();
    match axis {
        0 => {
            fer[0] = shear;
            fer[6] = shear;
        }
        1 => {
            fer[1] = shear;
            fer[5] = -moment;
            fer[7] = shear;
            fer[11] = moment;
        }
        2 => {
            fer[2] = shear;
            fer[4] = moment;
            fer[8] = shear;
            fer[10] = -moment;
        }
        _ => {}
    }
    fer
}

/// End reactions of a truss under a uniform load: half the total at each end,
/// no end moments
pub fn truss_fer_uniform_load(w: f64, length: f64, axis: usize) -> Vec12 {
    let mut fer = Vec12::zeros();
    if axis < 3 {
        fer[axis] = -w * length / 2.0;
        fer[6 + axis] = -w * length / 2.0;
    }
    fer
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transformation_matrix_horizontal() {
        let t = member_transformation_matrix(&[0.0, 0.0, 0.0], &[10.0, 0.0, 0.0], 0.0).unwrap();

        // local x = global X, local y = global Y, local z = global Z
        assert_relative_eq!(t[(0, 0)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(1, 1)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(2, 2)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(11, 11)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_transformation_matrix_vertical() {
        let t = member_transformation_matrix(&[0.0, 0.0, 0.0], &[0.0, 10.0, 0.0], 0.0).unwrap();

        // local x = global Y, local y = -global X, local z = global Z
        assert_relative_eq!(t[(0, 1)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(1, 0)], -1.0, epsilon = 1e-10);
        assert_relative_eq!(t[(2, 2)], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_axes_are_orthonormal_and_right_handed() {
        for j in [[3.0, 4.0, 0.0], [1.0, -2.0, 2.0], [0.0, -5.0, 0.0], [2.0, 0.0, -1.0]] {
            let r = frame_axes(&[0.0, 0.0, 0.0], &j, 0.3).unwrap();
            let rrt = r * r.transpose();
            assert_relative_eq!(rrt, Mat3::identity(), epsilon = 1e-12);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_length_is_geometry_error() {
        let err = frame_axes(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0], 0.0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Geometry);
    }

    #[test]
    fn test_local_stiffness_symmetry() {
        let k = member_local_stiffness(200e9, 77e9, 0.01, 1e-4, 2e-4, 1e-5, 10.0);
        assert_relative_eq!(k, k.transpose(), epsilon = 1e-6);
        assert_relative_eq!(k[(1, 1)], 12.0 * 200e9 * 2e-4 / 1000.0, max_relative = 1e-12);
        assert_relative_eq!(k[(2, 4)], -6.0 * 200e9 * 1e-4 / 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_pinned_end_condensation() {
        let e = 1.0;
        let i = 1.0;
        let l = 2.0;
        let k = member_local_stiffness(e, 1.0, 1.0, i, i, 1.0, l);
        let mut releases = [false; 12];
        releases[11] = true;
        let kc = apply_releases(&k, &releases).unwrap();
        // Propped cantilever: transverse stiffness drops from 12EI/L^3 to 3EI/L^3
        assert_relative_eq!(kc[(7, 7)], 3.0 * e * i / l.powi(3), epsilon = 1e-12);
        assert_eq!(kc[(11, 11)], 0.0);
    }

    #[test]
    fn test_fer_condensation_for_pinned_end() {
        let l = 4.0;
        let w = -2.0;
        let k = member_local_stiffness(1.0, 1.0, 1.0, 1.0, 1.0, 1.0, l);
        let fer = fer_uniform_load(w, l, 1);
        let mut releases = [false; 12];
        releases[11] = true;
        let fer_c = apply_fer_releases(&fer, &k, &releases).unwrap();
        // Fixed-pinned beam: end moment wL^2/8 at the fixed end, reactions 5wL/8 and 3wL/8
        assert_relative_eq!(fer_c[5], -w * l * l / 8.0, epsilon = 1e-12);
        assert_relative_eq!(fer_c[1], -5.0 * w * l / 8.0, epsilon = 1e-12);
        assert_relative_eq!(fer_c[7], -3.0 * w * l / 8.0, epsilon = 1e-12);
        assert_eq!(fer_c[11], 0.0);
    }
}
