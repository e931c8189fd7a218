//! Flat 4-node shell: bilinear membrane plus MITC4 Mindlin plate bending
//!
//! References:
//! - "Finite Element Procedures, 2nd Edition", Klaus-Jurgen Bathe, Section 5.4
//! - Dvorkin & Bathe, "A continuum mechanics based four-node shell element" (1984)
//!
//! The element works in a local frame where x runs from node i to node j,
//! z = x cross (n - i) and y = z cross x. Each node carries
//! `u, v, w, rx, ry, rz` in that frame:
//! - membrane: `u, v`, 2x2 Gauss
//! - bending: `w, rx, ry`, 2x2 Gauss for curvature
//! - transverse shear: assumed covariant strains tied at the edge midpoints
//! - drilling `rz`: a weak spring, 1/1000 of the smallest bending rotation diagonal

use nalgebra::{Matrix2, Matrix3, RowSVector, SMatrix, Vector2};

use super::{block_transform, Mat24, Mat3, Vec24, Vec3};
use crate::error::{FEAError, FEAResult};

/// Out-of-plane offset of the fourth node allowed, relative to the element size
pub const WARP_TOLERANCE: f64 = 1e-3;

const SHEAR_CORRECTION: f64 = 5.0 / 6.0;
const DRILLING_RATIO: f64 = 1e-3;

/// Natural coordinates of the corner nodes, counter-clockwise
const CORNERS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

fn gauss_2x2() -> [(f64, f64); 4] {
    let g = 1.0 / 3.0_f64.sqrt();
    [(-g, -g), (g, -g), (g, g), (-g, g)]
}

fn shape(r: f64, s: f64) -> [f64; 4] {
    CORNERS.map(|(ri, si)| 0.25 * (1.0 + r * ri) * (1.0 + s * si))
}

/// Shape function derivatives with respect to r and s
fn shape_derivatives(r: f64, s: f64) -> ([f64; 4], [f64; 4]) {
    (
        CORNERS.map(|(ri, si)| 0.25 * ri * (1.0 + s * si)),
        CORNERS.map(|(ri, si)| 0.25 * si * (1.0 + r * ri)),
    )
}

/// Plane stress constitutive matrix
fn plane_stress_matrix(e: f64, nu: f64) -> Mat3 {
    let c = e / (1.0 - nu * nu);
    Matrix3::new(
        c,      c * nu, 0.0,
        c * nu, c,      0.0,
        0.0,    0.0,    c * (1.0 - nu) / 2.0,
    )
}

/// Jacobian of the isoparametric map at one point
struct Jacobian {
    j: Matrix2<f64>,
    det: f64,
    inv: Matrix2<f64>,
}

/// Geometry of a flat quadrilateral projected into its own frame
#[derive(Debug, Clone)]
pub struct ShellGeometry {
    /// Direction cosines, rows are local x, y, z
    pub axes: Mat3,
    /// Corner coordinates in the local frame, origin at node i
    pub xy: [[f64; 2]; 4],
    pub area: f64,
}

impl ShellGeometry {
    /// Build the local frame from corner coordinates `[i, j, m, n]`
    pub fn new(coords: &[[f64; 3]; 4]) -> FEAResult<Self> {
        let p = coords.map(|c| Vec3::new(c[0], c[1], c[2]));
        let ij = p[1] - p[0];
        let in_ = p[3] - p[0];
        let size = ij.norm().max(in_.norm()).max((p[2] - p[0]).norm());

        if ij.norm() < super::MIN_LENGTH || in_.norm() < super::MIN_LENGTH {
            return Err(FEAError::InvalidGeometry(
                "shell has coincident corner nodes".to_string(),
            ));
        }
        let x = ij.normalize();
        let z_raw = x.cross(&in_);
        if z_raw.norm() <= 1e-8 * in_.norm() {
            return Err(FEAError::InvalidGeometry(
                "shell nodes i, j and n are collinear".to_string(),
            ));
        }
        let z = z_raw.normalize();
        let y = z.cross(&x);

        let warp = (p[2] - p[0]).dot(&z).abs();
        if warp > WARP_TOLERANCE * size {
            return Err(FEAError::InvalidGeometry(format!(
                "shell is warped: node m lies {warp:e} off the element plane"
            )));
        }

        let xy = p.map(|pi| {
            let d = pi - p[0];
            [d.dot(&x), d.dot(&y)]
        });
        let area = 0.5
            * (0..4)
                .map(|k| {
                    let (a, b) = (xy[k], xy[(k + 1) % 4]);
                    a[0] * b[1] - b[0] * a[1]
                })
                .sum::<f64>();

        let geom = Self {
            axes: Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]),
            xy,
            area,
        };
        // Twisted or concave quads show up as a non-positive Jacobian
        for (r, s) in gauss_2x2().into_iter().chain([(0.0, 0.0)]).chain(CORNERS) {
            geom.jacobian(r, s)?;
        }
        Ok(geom)
    }

    /// 24x24 global-to-local transformation
    pub fn transformation(&self) -> Mat24 {
        block_transform::<24>(&self.axes)
    }

    fn jacobian(&self, r: f64, s: f64) -> FEAResult<Jacobian> {
        let (dr, ds) = shape_derivatives(r, s);
        let mut j = Matrix2::zeros();
        for k in 0..4 {
            j[(0, 0)] += dr[k] * self.xy[k][0];
            j[(0, 1)] += dr[k] * self.xy[k][1];
            j[(1, 0)] += ds[k] * self.xy[k][0];
            j[(1, 1)] += ds[k] * self.xy[k][1];
        }
        let det = j.determinant();
        if det <= 1e-10 * self.area.abs() {
            return Err(FEAError::InvalidGeometry(format!(
                "shell Jacobian is not positive at (r, s) = ({r:.3}, {s:.3}); \
                 check that corners are ordered around a convex quad"
            )));
        }
        let inv = j.try_inverse().ok_or_else(|| {
            FEAError::InvalidGeometry("shell Jacobian is singular".to_string())
        })?;
        Ok(Jacobian { j, det, inv })
    }

    /// Shape function derivatives with respect to local x and y
    fn cartesian_derivatives(&self, jac: &Jacobian, r: f64, s: f64) -> ([f64; 4], [f64; 4]) {
        let (dr, ds) = shape_derivatives(r, s);
        let mut dx = [0.0; 4];
        let mut dy = [0.0; 4];
        for k in 0..4 {
            let d = jac.inv * Vector2::new(dr[k], ds[k]);
            dx[k] = d[0];
            dy[k] = d[1];
        }
        (dx, dy)
    }

    /// Membrane strain-displacement matrix, columns `u1, v1, u2, v2, ...`
    fn membrane_b(&self, jac: &Jacobian, r: f64, s: f64) -> SMatrix<f64, 3, 8> {
        let (dx, dy) = self.cartesian_derivatives(jac, r, s);
        let mut b = SMatrix::<f64, 3, 8>::zeros();
        for k in 0..4 {
            b[(0, 2 * k)] = dx[k];
            b[(1, 2 * k + 1)] = dy[k];
            b[(2, 2 * k)] = dy[k];
            b[(2, 2 * k + 1)] = dx[k];
        }
        b
    }

    /// Curvature-displacement matrix, columns `w1, rx1, ry1, w2, ...`
    ///
    /// With u = z*ry and v = -z*rx:
    /// kx = d(ry)/dx, ky = -d(rx)/dy, kxy = d(ry)/dy - d(rx)/dx
    fn bending_b(&self, jac: &Jacobian, r: f64, s: f64) -> SMatrix<f64, 3, 12> {
        let (dx, dy) = self.cartesian_derivatives(jac, r, s);
        let mut b = SMatrix::<f64, 3, 12>::zeros();
        for k in 0..4 {
            b[(0, 3 * k + 2)] = dx[k];
            b[(1, 3 * k + 1)] = -dy[k];
            b[(2, 3 * k + 1)] = -dx[k];
            b[(2, 3 * k + 2)] = dy[k];
        }
        b
    }

    /// Displacement-based covariant transverse shear strain along `r` (axis 0)
    /// or `s` (axis 1) at a point
    fn covariant_shear_row(&self, r: f64, s: f64, axis: usize) -> RowSVector<f64, 12> {
        let n = shape(r, s);
        let (dr, ds) = shape_derivatives(r, s);
        let dn = if axis == 0 { dr } else { ds };
        let (mut dx, mut dy) = (0.0, 0.0);
        for k in 0..4 {
            dx += dn[k] * self.xy[k][0];
            dy += dn[k] * self.xy[k][1];
        }
        // gamma_xz = dw/dx + ry, gamma_yz = dw/dy - rx, projected onto the natural direction
        let mut row = RowSVector::<f64, 12>::zeros();
        for k in 0..4 {
            row[3 * k] = dn[k];
            row[3 * k + 1] = -n[k] * dy;
            row[3 * k + 2] = n[k] * dx;
        }
        row
    }

    /// MITC4 assumed transverse shear strains `[gamma_xz, gamma_yz]`
    ///
    /// gamma_r is tied at A (0, 1) and C (0, -1), gamma_s at B (-1, 0) and
    /// D (1, 0), then mapped to Cartesian components with the inverse Jacobian.
    fn shear_b(&self, jac: &Jacobian, r: f64, s: f64) -> SMatrix<f64, 2, 12> {
        let a = self.covariant_shear_row(0.0, 1.0, 0);
        let c = self.covariant_shear_row(0.0, -1.0, 0);
        let b = self.covariant_shear_row(-1.0, 0.0, 1);
        let d = self.covariant_shear_row(1.0, 0.0, 1);

        let gamma_r = a * (0.5 * (1.0 + s)) + c * (0.5 * (1.0 - s));
        let gamma_s = d * (0.5 * (1.0 + r)) + b * (0.5 * (1.0 - r));
        let covariant = SMatrix::<f64, 2, 12>::from_rows(&[gamma_r, gamma_s]);
        jac.inv * covariant
    }
}

/// Local DOF index of membrane column `c` (u, v per node)
fn membrane_dof(c: usize) -> usize {
    6 * (c / 2) + c % 2
}

/// Local DOF index of bending column `c` (w, rx, ry per node)
fn bending_dof(c: usize) -> usize {
    6 * (c / 3) + 2 + c % 3
}

/// 24x24 local stiffness of the shell
pub fn shell_local_stiffness(geom: &ShellGeometry, e: f64, nu: f64, t: f64) -> FEAResult<Mat24> {
    let dm = plane_stress_matrix(e, nu) * t;
    let db = plane_stress_matrix(e, nu) * (t.powi(2) / 12.0) * t;
    let g = e / (2.0 * (1.0 + nu));
    let ds = Matrix2::identity() * (SHEAR_CORRECTION * g * t);

    let mut km = SMatrix::<f64, 8, 8>::zeros();
    let mut kb = SMatrix::<f64, 12, 12>::zeros();
    for (r, s) in gauss_2x2() {
        let jac = geom.jacobian(r, s)?;
        let bm = geom.membrane_b(&jac, r, s);
        km += bm.transpose() * dm * bm * jac.det;

        let bk = geom.bending_b(&jac, r, s);
        let bs = geom.shear_b(&jac, r, s);
        kb += (bk.transpose() * db * bk + bs.transpose() * ds * bs) * jac.det;
    }

    let mut k = Mat24::zeros();
    for a in 0..8 {
        for b in 0..8 {
            k[(membrane_dof(a), membrane_dof(b))] += km[(a, b)];
        }
    }
    for a in 0..12 {
        for b in 0..12 {
            k[(bending_dof(a), bending_dof(b))] += kb[(a, b)];
        }
    }

    let k_rot_min = (0..4)
        .flat_map(|n| [kb[(3 * n + 1, 3 * n + 1)], kb[(3 * n + 2, 3 * n + 2)]])
        .fold(f64::INFINITY, f64::min);
    let k_drill = DRILLING_RATIO * k_rot_min;
    for n in 0..4 {
        k[(6 * n + 5, 6 * n + 5)] = k_drill;
    }

    Ok(k)
}

/// Fixed end reactions (local) of a uniform pressure along local +z,
/// consistent with the bilinear shape functions
pub fn shell_pressure_fer(geom: &ShellGeometry, pressure: f64) -> FEAResult<Vec24> {
    let mut fer = Vec24::zeros();
    for (r, s) in gauss_2x2() {
        let jac = geom.jacobian(r, s)?;
        let n = shape(r, s);
        for k in 0..4 {
            fer[6 * k + 2] -= n[k] * pressure * jac.det;
        }
    }
    Ok(fer)
}

/// Resultants at the element centroid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellResultants {
    /// Membrane stresses `[sx, sy, txy]`
    pub membrane: [f64; 3],
    /// Moments per unit width `[mx, my, mxy]`
    pub moments: [f64; 3],
    /// Transverse shear per unit width `[qx, qy]`
    pub shear: [f64; 2],
}

/// Recover centroidal resultants from local nodal displacements
pub fn shell_resultants(
    geom: &ShellGeometry,
    e: f64,
    nu: f64,
    t: f64,
    d_local: &Vec24,
) -> FEAResult<ShellResultants> {
    let jac = geom.jacobian(0.0, 0.0)?;
    let dm = plane_stress_matrix(e, nu);
    let db = plane_stress_matrix(e, nu) * (t.powi(3) / 12.0);
    let g = e / (2.0 * (1.0 + nu));

    let dm_vec = SMatrix::<f64, 8, 1>::from_fn(|c, _| d_local[membrane_dof(c)]);
    let db_vec = SMatrix::<f64, 12, 1>::from_fn(|c, _| d_local[bending_dof(c)]);

    let sigma = dm * geom.membrane_b(&jac, 0.0, 0.0) * dm_vec;
    let moments = db * geom.bending_b(&jac, 0.0, 0.0) * db_vec;
    let shear = geom.shear_b(&jac, 0.0, 0.0) * db_vec * (SHEAR_CORRECTION * g * t);

    log::trace!("shell centroid Jacobian {:?}", jac.j);
    Ok(ShellResultants {
        membrane: [sigma[0], sigma[1], sigma[2]],
        moments: [moments[0], moments[1], moments[2]],
        shear: [shear[0], shear[1]],
    })
}
