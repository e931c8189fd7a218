//! Element stiffness evaluation
//!
//! Pure functions from element geometry and properties to local stiffness,
//! transformation and fixed end reactions. The assembler memoizes the results
//! for one solve and recovery reuses them.

use crate::elements::{Element, ElementKind, Material, Node, Section};
use crate::error::{FEAError, FEAResult};
use crate::loads::LoadKind;
use crate::math::shell::{self, ShellGeometry, ShellResultants};
use crate::math::{self, DVec, Mat, Mat12, Mat3, Vec12, Vec24, Vec3};

/// Geometry an element keeps for load and force recovery
#[derive(Debug, Clone)]
pub enum ElementGeometry {
    /// Two-node member with its direction cosines
    Line { length: f64, axes: Mat3 },
    Shell(ShellGeometry),
}

/// Stiffness of one element in local and global axes
#[derive(Debug, Clone)]
pub struct ElementStiffness {
    pub kind: ElementKind,
    /// Local stiffness, end releases already condensed
    pub k_local: Mat,
    /// Global-to-local transformation `T`
    pub transform: Mat,
    /// `Tᵀ k T`
    pub k_global: Mat,
    /// Global equations in connectivity order, filled by the assembler
    pub dofs: Vec<usize>,
    pub geometry: ElementGeometry,
    releases: [bool; 12],
    /// Frame stiffness before condensation, kept only when releases exist
    unreleased: Option<Mat12>,
    e: f64,
    nu: f64,
    thickness: f64,
}

fn to_dynamic<const N: usize>(m: &nalgebra::SMatrix<f64, N, N>) -> Mat {
    Mat::from_column_slice(N, N, m.as_slice())
}

/// Evaluate an element's stiffness from its resolved nodes and properties
pub fn evaluate(
    element: &Element,
    nodes: &[Node],
    material: &Material,
    section: &Section,
) -> FEAResult<ElementStiffness> {
    element.kind.check_section(section)?;
    if nodes.len() != element.kind.node_count() {
        return Err(FEAError::NodeCountMismatch {
            kind: element.kind.to_string(),
            expected: element.kind.node_count(),
            actual: nodes.len(),
        });
    }

    match element.kind {
        ElementKind::Truss | ElementKind::Beam => {
            let (i, j) = (nodes[0].coords(), nodes[1].coords());
            let axes = math::frame_axes(&i, &j, element.rotation)?;
            let length = nodes[0].distance_to(&nodes[1]);
            let releases = element.releases.as_array();

            let (k_local, unreleased) = if element.kind == ElementKind::Truss {
                (math::truss_local_stiffness(material.e, section.a, length), None)
            } else {
                let k = math::member_local_stiffness(
                    material.e, material.g, section.a, section.iy, section.iz, section.j, length,
                );
                if element.releases.is_empty() {
                    (k, None)
                } else {
                    let condensed = math::apply_releases(&k, &releases).ok_or_else(|| {
                        FEAError::InvalidInput(
                            "end releases leave the beam without stiffness".to_string(),
                        )
                    })?;
                    (condensed, Some(k))
                }
            };

            let t = math::block_transform::<12>(&axes);
            let k_global = t.transpose() * k_local * t;
            Ok(ElementStiffness {
                kind: element.kind,
                k_local: to_dynamic(&k_local),
                transform: to_dynamic(&t),
                k_global: to_dynamic(&k_global),
                dofs: Vec::new(),
                geometry: ElementGeometry::Line { length, axes },
                releases,
                unreleased,
                e: material.e,
                nu: material.nu,
                thickness: 0.0,
            })
        }
        ElementKind::Shell => {
            let coords = [
                nodes[0].coords(),
                nodes[1].coords(),
                nodes[2].coords(),
                nodes[3].coords(),
            ];
            let geom = ShellGeometry::new(&coords)?;
            let t_shell = section.thickness.unwrap_or(0.0);
            let k_local = shell::shell_local_stiffness(&geom, material.e, material.nu, t_shell)?;
            let t = geom.transformation();
            let k_global = t.transpose() * k_local * t;
            Ok(ElementStiffness {
                kind: ElementKind::Shell,
                k_local: to_dynamic(&k_local),
                transform: to_dynamic(&t),
                k_global: to_dynamic(&k_global),
                dofs: Vec::new(),
                geometry: ElementGeometry::Shell(geom),
                releases: [false; 12],
                unreleased: None,
                e: material.e,
                nu: material.nu,
                thickness: t_shell,
            })
        }
    }
}

impl ElementStiffness {
    pub fn size(&self) -> usize {
        self.k_local.nrows()
    }

    /// Shell thickness, zero for line elements
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Local fixed end reactions of an element load scaled by `factor`
    pub fn fixed_end_reactions(&self, load: &LoadKind, factor: f64) -> FEAResult<DVec> {
        match (&self.geometry, load) {
            (ElementGeometry::Line { length, axes }, LoadKind::Distributed { direction, w }) => {
                let w = w * factor;
                let w_local = if direction.is_global() {
                    let mut global = Vec3::zeros();
                    global[direction.axis()] = w;
                    axes * global
                } else {
                    let mut local = Vec3::zeros();
                    local[direction.axis()] = w;
                    local
                };

                let mut fer = Vec12::zeros();
                for axis in 0..3 {
                    if w_local[axis] != 0.0 {
                        fer += if self.kind == ElementKind::Truss {
                            math::truss_fer_uniform_load(w_local[axis], *length, axis)
                        } else {
                            math::fer_uniform_load(w_local[axis], *length, axis)
                        };
                    }
                }
                if let Some(k) = &self.unreleased {
                    fer = math::apply_fer_releases(&fer, k, &self.releases).ok_or_else(|| {
                        FEAError::InvalidInput(
                            "end releases leave the beam without stiffness".to_string(),
                        )
                    })?;
                }
                Ok(DVec::from_column_slice(fer.as_slice()))
            }
            (ElementGeometry::Shell(geom), LoadKind::Pressure { p }) => {
                let fer: Vec24 = shell::shell_pressure_fer(geom, p * factor)?;
                Ok(DVec::from_column_slice(fer.as_slice()))
            }
            (_, other) => Err(FEAError::InvalidAssembly(format!(
                "{other:?} cannot load a {} element",
                self.kind
            ))),
        }
    }

    /// Local end forces `k_local (T u) + FER` from global element displacements
    pub fn local_forces(&self, u_global: &DVec, fer_local: Option<&DVec>) -> DVec {
        let mut f = &self.k_local * (&self.transform * u_global);
        if let Some(fer) = fer_local {
            f += fer;
        }
        f
    }

    /// Centroidal shell resultants, `None` for line elements
    pub fn shell_resultants(&self, u_global: &DVec) -> FEAResult<Option<ShellResultants>> {
        let ElementGeometry::Shell(geom) = &self.geometry else {
            return Ok(None);
        };
        let d_local = &self.transform * u_global;
        let d = Vec24::from_column_slice(d_local.as_slice());
        shell::shell_resultants(geom, self.e, self.nu, self.thickness, &d).map(Some)
    }
}
