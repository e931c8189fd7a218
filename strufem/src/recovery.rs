//! Result recovery: nodal displacements, reactions, element forces and statics
//!
//! Reactions come from the full residual `R = K U - F`, which keeps loads
//! applied directly on supported DOFs in the balance.

use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::assembly::{GlobalSystem, LoadVector};
use crate::dof::{DofMap, DOFS_PER_NODE};
use crate::elements::{ElementId, ElementKind, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::math::{self, DVec, Vec3};
use crate::model::FEModel;
use crate::reduce::Partition;
use crate::results::{
    AnalysisSummary, ElementForces, FrameForces, NodeDisplacement, Reactions, ShellStress,
};
use crate::stiffness::ElementStiffness;

fn block(v: &DVec, start: usize) -> [f64; DOFS_PER_NODE] {
    std::array::from_fn(|d| v[start + d])
}

pub fn nodal_displacements(dofs: &DofMap, u: &DVec) -> BTreeMap<NodeId, NodeDisplacement> {
    dofs.nodes()
        .iter()
        .enumerate()
        .map(|(i, &node)| {
            (node, NodeDisplacement::from_array(block(u, i * DOFS_PER_NODE)))
        })
        .collect()
}

/// Reactions at supported nodes, zero on components that are not constrained
pub fn reactions(
    model: &FEModel,
    dofs: &DofMap,
    k: &nalgebra_sparse::CsrMatrix<f64>,
    f: &DVec,
    u: &DVec,
) -> FEAResult<BTreeMap<NodeId, Reactions>> {
    let residual = math::sparse_matvec(k, u) - f;
    let mut out = BTreeMap::new();
    for (node, _) in model.supports() {
        let range = dofs.node_dofs(node)?;
        let mut r = [0.0; DOFS_PER_NODE];
        for (d, index) in range.enumerate() {
            if dofs.status(index).is_constrained() {
                r[d] = residual[index];
            }
        }
        out.insert(node, Reactions::from_array(r));
    }
    Ok(out)
}

fn element_result(k: &ElementStiffness, fer: Option<&DVec>, u: &DVec) -> FEAResult<ElementForces> {
    let u_e = DVec::from_iterator(k.dofs.len(), k.dofs.iter().map(|&g| u[g]));
    match k.kind {
        ElementKind::Truss => {
            let f = k.local_forces(&u_e, fer);
            Ok(ElementForces::Truss { axial: f[6] })
        }
        ElementKind::Beam => {
            let f = k.local_forces(&u_e, fer);
            Ok(ElementForces::Frame {
                i: FrameForces::from_i_node_forces(f.as_slice()),
                j: FrameForces::from_j_node_forces(f.as_slice()),
            })
        }
        ElementKind::Shell => {
            let r = k.shell_resultants(&u_e)?.ok_or_else(|| {
                FEAError::InvalidAssembly("shell element lost its geometry".to_string())
            })?;
            Ok(ElementForces::Shell(ShellStress::from_resultants(
                r.membrane,
                r.moments,
                r.shear,
                k.thickness(),
            )))
        }
    }
}

pub fn element_forces(
    system: &GlobalSystem,
    loads: &LoadVector,
    u: &DVec,
    parallel: bool,
) -> FEAResult<BTreeMap<ElementId, ElementForces>> {
    let items: Vec<(ElementId, &ElementStiffness)> = system.elements().collect();
    let recover = |&(id, k): &(ElementId, &ElementStiffness)| -> FEAResult<_> {
        Ok((id, element_result(k, loads.fer.get(&id), u)?))
    };
    if parallel {
        items.par_iter().map(recover).collect()
    } else {
        items.iter().map(recover).collect()
    }
}

/// Force and moment resultant about the origin of nodal 6-vectors
fn resultant(
    model: &FEModel,
    vectors: impl Iterator<Item = (NodeId, [f64; DOFS_PER_NODE])>,
) -> [f64; 6] {
    let mut total = [0.0; 6];
    for (node, v) in vectors {
        let Some(p) = model.node(node) else {
            continue;
        };
        let force = Vec3::new(v[0], v[1], v[2]);
        let moment = Vec3::new(v[3], v[4], v[5]) + Vec3::new(p.x, p.y, p.z).cross(&force);
        for a in 0..3 {
            total[a] += force[a];
            total[3 + a] += moment[a];
        }
    }
    total
}

fn norm6(v: &[f64; 6]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub fn summarize(
    model: &FEModel,
    dofs: &DofMap,
    partition: &Partition,
    f: &DVec,
    displacements: &BTreeMap<NodeId, NodeDisplacement>,
    reactions: &BTreeMap<NodeId, Reactions>,
) -> AnalysisSummary {
    let (max_displacement_node, max_displacement) = displacements
        .iter()
        .map(|(n, d)| (Some(*n), d.translation_magnitude()))
        .fold((None, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    let (max_reaction_node, max_reaction) = reactions
        .iter()
        .map(|(n, r)| (Some(*n), r.force_magnitude()))
        .fold((None, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    let total_load = resultant(
        model,
        dofs.nodes()
            .iter()
            .enumerate()
            .map(|(i, &n)| (n, block(f, i * DOFS_PER_NODE))),
    );
    let total_reaction = resultant(model, reactions.iter().map(|(n, r)| (*n, r.as_array())));

    let imbalance: [f64; 6] = std::array::from_fn(|a| total_load[a] + total_reaction[a]);
    let scale = norm6(&total_load).max(norm6(&total_reaction));
    let equilibrium_residual = if scale > 0.0 {
        norm6(&imbalance) / scale
    } else {
        0.0
    };

    AnalysisSummary {
        max_displacement,
        max_displacement_node,
        max_reaction,
        max_reaction_node,
        total_load,
        total_reaction,
        equilibrium_residual,
        num_nodes: dofs.n_nodes(),
        num_elements: model.element_count(),
        total_dofs: dofs.n_dofs(),
        free_dofs: partition.n_free(),
        constrained_dofs: partition.constrained.len(),
        suppressed_dofs: partition.suppressed.len(),
        iterations: None,
    }
}
