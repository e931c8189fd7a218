//! Global stiffness and load assembly
//!
//! Elements are evaluated independently, each worker scattering its element
//! matrices into a private COO buffer. The buffers are merged and converted to
//! CSR once, which sums the duplicate entries.

use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::dof::{DofMap, DofStatus};
use crate::elements::{Element, ElementId};
use crate::error::{FEAError, FEAResult};
use crate::loads::{LoadCombination, LoadKind, LoadTarget};
use crate::math::{DVec, SparseMatrixBuilder};
use crate::model::FEModel;
use crate::stiffness::{self, ElementStiffness};

/// Assembled global stiffness plus the per-element results it was built from
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    pub k: CsrMatrix<f64>,
    elements: BTreeMap<ElementId, ElementStiffness>,
}

/// Global load vector of one combination
#[derive(Debug, Clone)]
pub struct LoadVector {
    pub f: DVec,
    /// Summed local fixed end reactions of loaded elements
    pub fer: BTreeMap<ElementId, DVec>,
}

impl GlobalSystem {
    pub fn assemble(model: &FEModel, dofs: &DofMap, parallel: bool) -> FEAResult<Self> {
        let n = dofs.n_dofs();
        let items: Vec<(ElementId, &Element)> = model.elements().collect();

        let evaluate = |&(id, element): &(ElementId, &Element)| -> FEAResult<_> {
            let nodes = model.element_nodes(element)?;
            let material = model
                .material(element.material)
                .ok_or(FEAError::MaterialNotFound(element.material))?;
            let section = model
                .section(element.section)
                .ok_or(FEAError::SectionNotFound(element.section))?;
            let mut k = stiffness::evaluate(element, &nodes, material, section)?;
            k.dofs = dofs.element_dofs(element)?;
            Ok((id, k))
        };

        let evaluated: Vec<(ElementId, ElementStiffness)> = if parallel {
            items.par_iter().map(evaluate).collect::<FEAResult<_>>()?
        } else {
            items.iter().map(evaluate).collect::<FEAResult<_>>()?
        };

        let scatter = |mut builder: SparseMatrixBuilder, (_, k): &(ElementId, ElementStiffness)| {
            builder.add_element_matrix(&k.dofs, &k.k_global);
            builder
        };
        let builder = if parallel {
            evaluated
                .par_iter()
                .fold(|| SparseMatrixBuilder::new(n), scatter)
                .reduce(|| SparseMatrixBuilder::new(n), SparseMatrixBuilder::merge)
        } else {
            evaluated.iter().fold(SparseMatrixBuilder::new(n), scatter)
        };

        let k = builder.to_csr();
        log::debug!(
            "assembled {} elements into {n}x{n} stiffness, {} non-zeros ({})",
            evaluated.len(),
            k.nnz(),
            if parallel { "parallel" } else { "serial" }
        );

        Ok(Self {
            k,
            elements: evaluated.into_iter().collect(),
        })
    }

    pub fn n_dofs(&self) -> usize {
        self.k.nrows()
    }

    pub fn element(&self, id: ElementId) -> Option<&ElementStiffness> {
        self.elements.get(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &ElementStiffness)> {
        self.elements.iter().map(|(id, k)| (*id, k))
    }

    /// True if `|K_ij - K_ji| <= tol * max|K|` for every stored entry
    pub fn is_symmetric(&self, tol: f64) -> bool {
        let scale = self.k.values().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        self.k.triplet_iter().all(|(i, j, &v)| {
            let mirror = self
                .k
                .get_entry(j, i)
                .map(|e| e.into_value())
                .unwrap_or(0.0);
            (v - mirror).abs() <= tol * scale
        })
    }

    /// Build the load vector of a combination
    ///
    /// Each load is scaled by its case factor. Element loads enter as the
    /// negated global fixed end reactions.
    pub fn load_vector(
        &self,
        model: &FEModel,
        dofs: &DofMap,
        combination: &LoadCombination,
    ) -> FEAResult<LoadVector> {
        let mut f = DVec::zeros(dofs.n_dofs());
        let mut fer: BTreeMap<ElementId, DVec> = BTreeMap::new();

        for (load_id, load) in model.loads() {
            let factor = combination.factor(load.case);
            if factor == 0.0 {
                continue;
            }
            match (load.target, load.kind) {
                (LoadTarget::Node(node), LoadKind::Nodal { dof, magnitude }) => {
                    let index = dofs.global_index(node, dof)?;
                    if dofs.status(index) == DofStatus::Inactive {
                        return Err(FEAError::InvalidAssembly(format!(
                            "load {load_id} acts on {dof} of node {node}, which no attached element resists"
                        )));
                    }
                    f[index] += factor * magnitude;
                }
                (LoadTarget::Element(id), kind) => {
                    let k = self.element(id).ok_or(FEAError::ElementNotFound(id))?;
                    let local = k.fixed_end_reactions(&kind, factor)?;
                    let global = k.transform.transpose() * &local;
                    for (a, &index) in k.dofs.iter().enumerate() {
                        f[index] -= global[a];
                    }
                    fer.entry(id)
                        .and_modify(|sum| *sum += &local)
                        .or_insert(local);
                }
                (target, kind) => {
                    return Err(FEAError::InvalidAssembly(format!(
                        "load {load_id}: {kind:?} cannot act on {target:?}"
                    )));
                }
            }
        }

        log::debug!(
            "load vector for '{}': {} loaded elements, |F| = {:e}",
            combination.name,
            fer.len(),
            f.norm()
        );
        Ok(LoadVector { f, fer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::Dof;
    use crate::elements::{Material, Node, Section, Support};
    use crate::loads::{Load, LoadCase, LoadDirection};
    use approx::assert_relative_eq;

    fn portal() -> FEModel {
        let mut model = FEModel::new();
        let m = model.add_material(Material::steel()).unwrap();
        let s = model.add_section(Section::rectangular(0.3, 0.5)).unwrap();
        let n1 = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
        let n2 = model.add_node(Node::new(0.0, 4.0, 0.0)).unwrap();
        let n3 = model.add_node(Node::new(6.0, 4.0, 1.0)).unwrap();
        let n4 = model.add_node(Node::new(6.0, 0.0, 1.0)).unwrap();
        model.add_element(Element::beam(n1, n2, m, s)).unwrap();
        let girder = model.add_element(Element::beam(n2, n3, m, s)).unwrap();
        model.add_element(Element::beam(n3, n4, m, s)).unwrap();
        model.add_support(n1, Support::fixed()).unwrap();
        model.add_support(n4, Support::pinned()).unwrap();
        model
            .add_load(Load::distributed(girder, LoadDirection::FY, -10.0, LoadCase::Dead))
            .unwrap();
        model
            .add_load(Load::nodal(n2, Dof::DX, 5.0, LoadCase::Wind))
            .unwrap();
        model
    }

    #[test]
    fn test_stiffness_symmetric() {
        let model = portal();
        let dofs = DofMap::build(&model).unwrap();
        let system = GlobalSystem::assemble(&model, &dofs, true).unwrap();
        assert_eq!(system.n_dofs(), 24);
        assert!(system.is_symmetric(1e-12));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let model = portal();
        let dofs = DofMap::build(&model).unwrap();
        let par = GlobalSystem::assemble(&model, &dofs, true).unwrap();
        let ser = GlobalSystem::assemble(&model, &dofs, false).unwrap();
        let scale = ser.k.values().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        for (i, j, &v) in ser.k.triplet_iter() {
            let p = par.k.get_entry(i, j).map(|e| e.into_value()).unwrap_or(0.0);
            assert!((v - p).abs() <= 1e-12 * scale);
        }
    }

    #[test]
    fn test_load_vector_factors() {
        let model = portal();
        let dofs = DofMap::build(&model).unwrap();
        let system = GlobalSystem::assemble(&model, &dofs, false).unwrap();

        let combo = LoadCombination::new("1.2D").with_case(LoadCase::Dead, 1.2);
        let loads = system.load_vector(&model, &dofs, &combo).unwrap();
        // Girder length sqrt(37), -10 per unit length along Y
        let total_y: f64 = (0..4).map(|n| loads.f[6 * n + 1]).sum();
        assert_relative_eq!(total_y, -12.0 * 37.0_f64.sqrt(), max_relative = 1e-12);
        assert_eq!(loads.f[6], 0.0);
        assert_eq!(loads.fer.len(), 1);

        let wind = LoadCombination::single(LoadCase::Wind);
        let loads = system.load_vector(&model, &dofs, &wind).unwrap();
        assert_eq!(loads.f[6], 5.0);
        assert!(loads.fer.is_empty());
    }

    #[test]
    fn test_load_on_inactive_dof_rejected() {
        let mut model = FEModel::new();
        let m = model.add_material(Material::steel()).unwrap();
        let s = model.add_section(Section::truss(0.01)).unwrap();
        let n1 = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
        let n2 = model.add_node(Node::new(2.0, 0.0, 0.0)).unwrap();
        model.add_element(Element::truss(n1, n2, m, s)).unwrap();
        model
            .add_load(Load::nodal(n2, Dof::RZ, 1.0, LoadCase::Dead))
            .unwrap();

        let dofs = DofMap::build(&model).unwrap();
        let system = GlobalSystem::assemble(&model, &dofs, false).unwrap();
        let err = system
            .load_vector(&model, &dofs, &LoadCombination::unfactored())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Assembly);
    }
}
