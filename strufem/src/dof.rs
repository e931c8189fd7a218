//! Degree-of-freedom numbering
//!
//! Every node owns a contiguous block of [`DOFS_PER_NODE`] global equations in
//! node-id order. Which of those equations take part in the solve depends on
//! the element kinds attached to the node and on its support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::elements::{Constraint, Element, NodeId};
use crate::error::{FEAError, FEAResult};
use crate::model::FEModel;

/// Number of DOFs carried by every node
pub const DOFS_PER_NODE: usize = 6;

/// Nodal degree of freedom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dof {
    DX,
    DY,
    DZ,
    RX,
    RY,
    RZ,
}

impl Dof {
    pub const ALL: [Dof; DOFS_PER_NODE] = [Dof::DX, Dof::DY, Dof::DZ, Dof::RX, Dof::RY, Dof::RZ];

    /// Position inside the node's block
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> FEAResult<Dof> {
        Dof::ALL.get(i).copied().ok_or(FEAError::InvalidDof(i))
    }

    pub fn is_translation(self) -> bool {
        self.index() < 3
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dof::DX => "DX",
            Dof::DY => "DY",
            Dof::DZ => "DZ",
            Dof::RX => "RX",
            Dof::RY => "RY",
            Dof::RZ => "RZ",
        };
        f.write_str(name)
    }
}

/// How a global equation is treated by the solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DofStatus {
    /// Unknown displacement
    Free,
    /// Held at zero, carries a reaction
    Fixed,
    /// Held at a given value, carries a reaction
    Prescribed(f64),
    /// No attached element gives this DOF meaning; held at zero, no reaction
    Inactive,
}

impl DofStatus {
    pub fn is_constrained(self) -> bool {
        matches!(self, DofStatus::Fixed | DofStatus::Prescribed(_))
    }

    /// Value the DOF is held at, if it is not free
    pub fn held_value(self) -> Option<f64> {
        match self {
            DofStatus::Free => None,
            DofStatus::Fixed | DofStatus::Inactive => Some(0.0),
            DofStatus::Prescribed(v) => Some(v),
        }
    }
}

/// Global DOF numbering plus the status mask derived from elements and supports
#[derive(Debug, Clone)]
pub struct DofMap {
    blocks: BTreeMap<NodeId, usize>,
    order: Vec<NodeId>,
    connected: Vec<bool>,
    status: Vec<DofStatus>,
}

impl DofMap {
    pub fn build(model: &FEModel) -> FEAResult<Self> {
        let order: Vec<NodeId> = model.nodes().map(|(id, _)| id).collect();
        let blocks: BTreeMap<NodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i * DOFS_PER_NODE))
            .collect();

        let n_nodes = order.len();
        let mut connected = vec![false; n_nodes];
        let mut active = vec![[false; DOFS_PER_NODE]; n_nodes];

        for (id, element) in model.elements() {
            let kind_dofs = element.kind.active_dofs();
            for node in &element.nodes {
                let start = *blocks.get(node).ok_or(FEAError::NodeNotFound(*node))?;
                let block = start / DOFS_PER_NODE;
                connected[block] = true;
                for (slot, on) in active[block].iter_mut().zip(kind_dofs.iter()) {
                    *slot |= *on;
                }
            }
            log::trace!("element {id} marks {:?} DOFs on {:?}", element.kind, element.nodes);
        }

        let mut status = Vec::with_capacity(n_nodes * DOFS_PER_NODE);
        for block in 0..n_nodes {
            for d in 0..DOFS_PER_NODE {
                // A node no element touches keeps all six DOFs
                let is_active = !connected[block] || active[block][d];
                status.push(if is_active {
                    DofStatus::Free
                } else {
                    DofStatus::Inactive
                });
            }
        }

        for (node, support) in model.supports() {
            let start = *blocks.get(&node).ok_or(FEAError::NodeNotFound(node))?;
            for (d, constraint) in support.constraints.iter().enumerate() {
                let dof = Dof::from_index(d)?;
                let slot = &mut status[start + d];
                match (*slot, *constraint) {
                    (_, Constraint::Free) => {}
                    (DofStatus::Inactive, Constraint::Fixed) => {}
                    (DofStatus::Inactive, Constraint::Prescribed(v)) => {
                        if v != 0.0 {
                            return Err(FEAError::InvalidAssembly(format!(
                                "prescribed {dof} = {v} on node {node}, but no attached element uses that DOF"
                            )));
                        }
                    }
                    (_, Constraint::Fixed) => *slot = DofStatus::Fixed,
                    (_, Constraint::Prescribed(v)) => *slot = DofStatus::Prescribed(v),
                }
            }
        }

        let map = Self {
            blocks,
            order,
            connected,
            status,
        };
        log::debug!(
            "DOF map: {} nodes, {} DOFs, {} free, {} constrained",
            map.n_nodes(),
            map.n_dofs(),
            map.free_dofs().len(),
            map.constrained_dofs().len()
        );
        Ok(map)
    }

    pub fn n_dofs(&self) -> usize {
        self.status.len()
    }

    pub fn n_nodes(&self) -> usize {
        self.order.len()
    }

    /// Nodes in equation order
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Global equation range of a node's block
    pub fn node_dofs(&self, node: NodeId) -> FEAResult<Range<usize>> {
        let start = *self.blocks.get(&node).ok_or(FEAError::NodeNotFound(node))?;
        Ok(start..start + DOFS_PER_NODE)
    }

    pub fn global_index(&self, node: NodeId, dof: Dof) -> FEAResult<usize> {
        Ok(self.node_dofs(node)?.start + dof.index())
    }

    /// Inverse of [`DofMap::global_index`]
    pub fn locate(&self, index: usize) -> Option<(NodeId, Dof)> {
        let node = *self.order.get(index / DOFS_PER_NODE)?;
        let dof = Dof::ALL[index % DOFS_PER_NODE];
        Some((node, dof))
    }

    pub fn status(&self, index: usize) -> DofStatus {
        self.status[index]
    }

    pub fn statuses(&self) -> &[DofStatus] {
        &self.status
    }

    /// True if at least one element is attached to the node
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.blocks
            .get(&node)
            .map(|start| self.connected[start / DOFS_PER_NODE])
            .unwrap_or(false)
    }

    pub fn free_dofs(&self) -> Vec<usize> {
        (0..self.n_dofs())
            .filter(|&i| self.status[i] == DofStatus::Free)
            .collect()
    }

    /// Fixed and prescribed equations, which carry reactions
    pub fn constrained_dofs(&self) -> Vec<usize> {
        (0..self.n_dofs())
            .filter(|&i| self.status[i].is_constrained())
            .collect()
    }

    /// Global equations of an element, node blocks concatenated in connectivity order
    pub fn element_dofs(&self, element: &Element) -> FEAResult<Vec<usize>> {
        let mut dofs = Vec::with_capacity(element.nodes.len() * DOFS_PER_NODE);
        for node in &element.nodes {
            dofs.extend(self.node_dofs(*node)?);
        }
        Ok(dofs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, Material, Node, Section, Support};

    fn truss_model() -> (FEModel, NodeId, NodeId) {
        let mut model = FEModel::new();
        let m = model.add_material(Material::isotropic(1.0, 0.0, 0.0)).unwrap();
        let s = model.add_section(Section::truss(1.0)).unwrap();
        let n1 = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
        let n2 = model.add_node(Node::new(1.0, 0.0, 0.0)).unwrap();
        model.add_element(Element::truss(n1, n2, m, s)).unwrap();
        (model, n1, n2)
    }

    #[test]
    fn test_contiguous_numbering() {
        let (model, n1, n2) = truss_model();
        let map = DofMap::build(&model).unwrap();
        assert_eq!(map.n_dofs(), 12);
        assert_eq!(map.node_dofs(n1).unwrap(), 0..6);
        assert_eq!(map.global_index(n2, Dof::DZ).unwrap(), 8);
        assert_eq!(map.locate(8), Some((n2, Dof::DZ)));
    }

    #[test]
    fn test_truss_rotations_inactive() {
        let (mut model, n1, _) = truss_model();
        model.add_support(n1, Support::fixed()).unwrap();
        let map = DofMap::build(&model).unwrap();
        assert_eq!(map.status(0), DofStatus::Fixed);
        // Fixing an inactive rotation is ignored
        assert_eq!(map.status(3), DofStatus::Inactive);
        assert_eq!(map.status(9), DofStatus::Inactive);
        assert_eq!(map.free_dofs(), vec![6, 7, 8]);
        assert_eq!(map.constrained_dofs(), vec![0, 1, 2]);
    }

    #[test]
    fn test_prescribed_rotation_on_truss_node_rejected() {
        let (mut model, n1, _) = truss_model();
        let support = Support::pinned()
            .with(Dof::RZ, Constraint::Prescribed(0.01))
            .unwrap();
        model.add_support(n1, support).unwrap();
        let err = DofMap::build(&model).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Assembly);
    }

    #[test]
    fn test_unconnected_node_keeps_all_dofs() {
        let (mut model, _, _) = truss_model();
        let lone = model.add_node(Node::new(5.0, 5.0, 5.0)).unwrap();
        let map = DofMap::build(&model).unwrap();
        assert!(!map.is_connected(lone));
        let range = map.node_dofs(lone).unwrap();
        assert!(range.clone().all(|i| map.status(i) == DofStatus::Free));
    }

    #[test]
    fn test_dof_from_index() {
        assert_eq!(Dof::from_index(4).unwrap(), Dof::RY);
        assert!(matches!(Dof::from_index(6), Err(FEAError::InvalidDof(6))));
    }
}
