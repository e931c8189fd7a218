//! FE Model - Main structural model container

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{AnalysisOptions, LinearStatic};
use crate::elements::{
    Element, ElementId, ElementKind, LoadId, Material, MaterialId, Node, NodeId, Section,
    SectionId, Support,
};
use crate::error::{FEAError, FEAResult};
use crate::loads::{Load, LoadCase, LoadCombination, LoadTarget};
use crate::math::{self, ShellGeometry};
use crate::results::Solution;

/// Next index handed out per entity type. Ids are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct IdCounters {
    node: usize,
    material: usize,
    section: usize,
    element: usize,
    load: usize,
}

/// Next free index: past both the counter and the highest key in use, so a
/// model read back without counters still never collides
fn allocate(counter: &mut usize, last: Option<usize>) -> usize {
    let id = (*counter).max(last.map_or(0, |l| l + 1));
    *counter = id + 1;
    id
}

/// The main 3D finite element model
///
/// Entities live in id-keyed arenas and refer to each other by id only.
/// Every successful mutation bumps [`FEModel::version`], which is how a
/// [`Solution`] knows whether it still describes this model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FEModel {
    nodes: BTreeMap<NodeId, Node>,
    materials: BTreeMap<MaterialId, Material>,
    sections: BTreeMap<SectionId, Section>,
    elements: BTreeMap<ElementId, Element>,
    /// Support conditions, at most one per node
    supports: BTreeMap<NodeId, Support>,
    loads: BTreeMap<LoadId, Load>,
    #[serde(default)]
    next_ids: IdCounters,
    #[serde(default)]
    options: AnalysisOptions,

    #[serde(skip)]
    version: u64,
}

impl FEModel {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a model written by [`FEModel::to_json`], validating it as if it
    /// had been built with the `add_*` methods
    pub fn from_json(json: &str) -> FEAResult<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> FEAResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    // ========================
    // Model Building Methods
    // ========================

    /// Add a node to the model
    pub fn add_node(&mut self, node: Node) -> FEAResult<NodeId> {
        node.validate()?;
        if let Some((existing, _)) = self.nodes.iter().find(|(_, n)| n.coincides_with(&node)) {
            return Err(FEAError::DuplicateNode {
                existing: *existing,
                x: node.x,
                y: node.y,
                z: node.z,
            });
        }
        let last = self.nodes.keys().next_back().map(|id| id.index());
        let id = NodeId(allocate(&mut self.next_ids.node, last));
        self.nodes.insert(id, node);
        self.touch();
        Ok(id)
    }

    /// Add a material to the model
    pub fn add_material(&mut self, material: Material) -> FEAResult<MaterialId> {
        material.validate()?;
        let last = self.materials.keys().next_back().map(|id| id.index());
        let id = MaterialId(allocate(&mut self.next_ids.material, last));
        self.materials.insert(id, material);
        self.touch();
        Ok(id)
    }

    /// Add a section to the model
    pub fn add_section(&mut self, section: Section) -> FEAResult<SectionId> {
        section.validate()?;
        let last = self.sections.keys().next_back().map(|id| id.index());
        let id = SectionId(allocate(&mut self.next_ids.section, last));
        self.sections.insert(id, section);
        self.touch();
        Ok(id)
    }

    /// Add an element after checking its references, its section and its geometry
    pub fn add_element(&mut self, element: Element) -> FEAResult<ElementId> {
        self.check_element(&element, None)?;
        let last = self.elements.keys().next_back().map(|id| id.index());
        let id = ElementId(allocate(&mut self.next_ids.element, last));
        log::trace!("added {} element {id} on {:?}", element.kind, element.nodes);
        self.elements.insert(id, element);
        self.touch();
        Ok(id)
    }

    /// Everything [`FEModel::add_element`] requires. `existing` is the
    /// element's own id when it is already stored.
    fn check_element(&self, element: &Element, existing: Option<ElementId>) -> FEAResult<()> {
        element.validate_shape()?;
        let nodes = self.element_nodes(element)?;
        if !self.materials.contains_key(&element.material) {
            return Err(FEAError::MaterialNotFound(element.material));
        }
        let section = self
            .sections
            .get(&element.section)
            .ok_or(FEAError::SectionNotFound(element.section))?;
        element.kind.check_section(section)?;

        if let Some((other, _)) = self
            .elements
            .iter()
            .find(|(id, e)| Some(**id) != existing && e.same_connectivity(element))
        {
            return Err(FEAError::DuplicateElement(*other));
        }

        match element.kind {
            ElementKind::Truss | ElementKind::Beam => {
                math::frame_axes(&nodes[0].coords(), &nodes[1].coords(), element.rotation)?;
            }
            ElementKind::Shell => {
                let coords = [
                    nodes[0].coords(),
                    nodes[1].coords(),
                    nodes[2].coords(),
                    nodes[3].coords(),
                ];
                ShellGeometry::new(&coords)?;
            }
        }
        Ok(())
    }

    /// Add a support condition. A node takes at most one support; use
    /// [`FEModel::replace_support`] to change it.
    pub fn add_support(&mut self, node: NodeId, support: Support) -> FEAResult<()> {
        if !self.nodes.contains_key(&node) {
            return Err(FEAError::NodeNotFound(node));
        }
        if self.supports.contains_key(&node) {
            return Err(FEAError::DuplicateSupport(node));
        }
        support.validate()?;
        self.supports.insert(node, support);
        self.touch();
        Ok(())
    }

    /// Set the support of a node, returning the one it replaces
    pub fn replace_support(&mut self, node: NodeId, support: Support) -> FEAResult<Option<Support>> {
        if !self.nodes.contains_key(&node) {
            return Err(FEAError::NodeNotFound(node));
        }
        support.validate()?;
        let previous = self.supports.insert(node, support);
        self.touch();
        Ok(previous)
    }

    /// Add a load after checking that its target exists and accepts its kind
    pub fn add_load(&mut self, load: Load) -> FEAResult<LoadId> {
        self.check_load(&load)?;
        let last = self.loads.keys().next_back().map(|id| id.index());
        let id = LoadId(allocate(&mut self.next_ids.load, last));
        self.loads.insert(id, load);
        self.touch();
        Ok(id)
    }

    fn check_load(&self, load: &Load) -> FEAResult<()> {
        let element_kind = match load.target {
            LoadTarget::Node(node) => {
                if !self.nodes.contains_key(&node) {
                    return Err(FEAError::NodeNotFound(node));
                }
                None
            }
            LoadTarget::Element(id) => Some(
                self.elements
                    .get(&id)
                    .ok_or(FEAError::ElementNotFound(id))?
                    .kind,
            ),
        };
        load.validate(element_kind)
    }

    /// Re-run every check the `add_*` methods make, against the whole model.
    ///
    /// Models read through serde skip those methods, so [`FEModel::from_json`]
    /// calls this before handing the model out.
    pub fn validate(&self) -> FEAResult<()> {
        for (id, node) in &self.nodes {
            node.validate()?;
            if let Some((existing, _)) = self
                .nodes
                .range(..*id)
                .find(|(_, other)| other.coincides_with(node))
            {
                return Err(FEAError::DuplicateNode {
                    existing: *existing,
                    x: node.x,
                    y: node.y,
                    z: node.z,
                });
            }
        }
        for material in self.materials.values() {
            material.validate()?;
        }
        for section in self.sections.values() {
            section.validate()?;
        }
        for (&id, element) in &self.elements {
            self.check_element(element, Some(id))?;
        }
        for (node, support) in &self.supports {
            if !self.nodes.contains_key(node) {
                return Err(FEAError::NodeNotFound(*node));
            }
            support.validate()?;
        }
        for load in self.loads.values() {
            self.check_load(load)?;
        }
        log::debug!(
            "validated model: {} nodes, {} elements, {} loads",
            self.nodes.len(),
            self.elements.len(),
            self.loads.len()
        );
        Ok(())
    }

    // ========================
    // Removal
    // ========================

    /// Remove a node with everything attached to it: its elements and their
    /// loads, its nodal loads and its support
    pub fn remove_node(&mut self, id: NodeId) -> FEAResult<Node> {
        let node = self.nodes.remove(&id).ok_or(FEAError::NodeNotFound(id))?;

        let attached: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|(_, e)| e.nodes.contains(&id))
            .map(|(eid, _)| *eid)
            .collect();
        for element in &attached {
            self.elements.remove(element);
        }
        self.loads.retain(|_, load| match load.target {
            LoadTarget::Node(n) => n != id,
            LoadTarget::Element(e) => !attached.contains(&e),
        });
        self.supports.remove(&id);

        log::debug!("removed node {id} and {} attached elements", attached.len());
        self.touch();
        Ok(node)
    }

    /// Remove an element and the loads applied to it
    pub fn remove_element(&mut self, id: ElementId) -> FEAResult<Element> {
        let element = self
            .elements
            .remove(&id)
            .ok_or(FEAError::ElementNotFound(id))?;
        self.loads
            .retain(|_, load| load.target != LoadTarget::Element(id));
        self.touch();
        Ok(element)
    }

    /// Remove a material no element uses
    pub fn remove_material(&mut self, id: MaterialId) -> FEAResult<Material> {
        if !self.materials.contains_key(&id) {
            return Err(FEAError::MaterialNotFound(id));
        }
        if let Some((element, _)) = self.elements.iter().find(|(_, e)| e.material == id) {
            return Err(FEAError::InUse {
                what: format!("Material {id}"),
                element: *element,
            });
        }
        let material = self
            .materials
            .remove(&id)
            .ok_or(FEAError::MaterialNotFound(id))?;
        self.touch();
        Ok(material)
    }

    /// Remove a section no element uses
    pub fn remove_section(&mut self, id: SectionId) -> FEAResult<Section> {
        if let Some((element, _)) = self.elements.iter().find(|(_, e)| e.section == id) {
            return Err(FEAError::InUse {
                what: format!("Section {id}"),
                element: *element,
            });
        }
        let section = self
            .sections
            .remove(&id)
            .ok_or(FEAError::SectionNotFound(id))?;
        self.touch();
        Ok(section)
    }

    pub fn remove_support(&mut self, node: NodeId) -> FEAResult<Support> {
        let support = self
            .supports
            .remove(&node)
            .ok_or(FEAError::SupportNotFound(node))?;
        self.touch();
        Ok(support)
    }

    pub fn remove_load(&mut self, id: LoadId) -> FEAResult<Load> {
        let load = self.loads.remove(&id).ok_or(FEAError::LoadNotFound(id))?;
        self.touch();
        Ok(load)
    }

    // ========================
    // Access
    // ========================

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(&id)
    }

    pub fn support(&self, node: NodeId) -> Option<&Support> {
        self.supports.get(&node)
    }

    pub fn load(&self, id: LoadId) -> Option<&Load> {
        self.loads.get(&id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, n)| (*id, n))
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter().map(|(id, m)| (*id, m))
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &Section)> {
        self.sections.iter().map(|(id, s)| (*id, s))
    }

    pub fn supports(&self) -> impl Iterator<Item = (NodeId, &Support)> {
        self.supports.iter().map(|(id, s)| (*id, s))
    }

    pub fn loads(&self) -> impl Iterator<Item = (LoadId, &Load)> {
        self.loads.iter().map(|(id, l)| (*id, l))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn load_count(&self) -> usize {
        self.loads.len()
    }

    /// Load cases that at least one load belongs to
    pub fn load_cases(&self) -> BTreeSet<LoadCase> {
        self.loads.values().map(|l| l.case).collect()
    }

    /// Copies of an element's nodes in connectivity order
    pub(crate) fn element_nodes(&self, element: &Element) -> FEAResult<Vec<Node>> {
        element
            .nodes
            .iter()
            .map(|id| self.nodes.get(id).copied().ok_or(FEAError::NodeNotFound(*id)))
            .collect()
    }

    /// Generation counter, bumped by every successful mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: AnalysisOptions) {
        self.options = options;
        self.touch();
    }

    // ========================
    // Analysis Methods
    // ========================

    /// Assemble and factorize once with `options`, to solve several
    /// combinations against the same stiffness
    pub fn analysis<'a>(&'a self, options: &'a AnalysisOptions) -> FEAResult<LinearStatic<'a>> {
        LinearStatic::prepare(self, options)
    }

    /// Solve the combination selected in the model's options
    pub fn solve(&self) -> FEAResult<Solution> {
        self.solve_combination(&self.options.combination)
    }

    pub fn solve_combination(&self, combination: &LoadCombination) -> FEAResult<Solution> {
        self.analysis(&self.options)?.solve(combination)
    }

    /// Solve several combinations with a single factorization
    pub fn solve_combinations(&self, combinations: &[LoadCombination]) -> FEAResult<Vec<Solution>> {
        let analysis = self.analysis(&self.options)?;
        combinations.iter().map(|c| analysis.solve(c)).collect()
    }

    /// True if `solution` was computed from this model in its current state
    pub fn is_current(&self, solution: &Solution) -> bool {
        solution.version == self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::Dof;
    use crate::error::ErrorKind;
    use crate::loads::LoadDirection;

    fn two_nodes(model: &mut FEModel) -> (NodeId, NodeId, MaterialId, SectionId) {
        let m = model.add_material(Material::steel()).unwrap();
        let s = model.add_section(Section::rectangular(0.2, 0.4)).unwrap();
        let n1 = model.add_node(Node::new(0.0, 0.0, 0.0)).unwrap();
        let n2 = model.add_node(Node::new(3.0, 0.0, 0.0)).unwrap();
        (n1, n2, m, s)
    }

    #[test]
    fn test_ids_and_lookup() {
        let mut model = FEModel::new();
        let (n1, n2, m, s) = two_nodes(&mut model);
        let e = model.add_element(Element::beam(n1, n2, m, s)).unwrap();

        assert_eq!(model.node(n2).map(|n| n.x), Some(3.0));
        assert_eq!(model.element(e).map(|e| e.kind), Some(ElementKind::Beam));
        assert_eq!(model.nodes().map(|(id, _)| id).collect::<Vec<_>>(), vec![n1, n2]);
        assert!(model.node(NodeId(99)).is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut model = FEModel::new();
        let (n1, n2, m, s) = two_nodes(&mut model);

        let err = model.add_node(Node::new(3.0, 0.0, 1e-12)).unwrap_err();
        assert!(matches!(err, FEAError::DuplicateNode { existing, .. } if existing == n2));

        let e = model.add_element(Element::beam(n1, n2, m, s)).unwrap();
        let err = model.add_element(Element::beam(n2, n1, m, s)).unwrap_err();
        assert!(matches!(err, FEAError::DuplicateElement(id) if id == e));

        model.add_support(n1, Support::fixed()).unwrap();
        let err = model.add_support(n1, Support::pinned()).unwrap_err();
        assert!(matches!(err, FEAError::DuplicateSupport(_)));
        let old = model.replace_support(n1, Support::pinned()).unwrap();
        assert_eq!(old, Some(Support::fixed()));
    }

    #[test]
    fn test_element_validation() {
        let mut model = FEModel::new();
        let (n1, n2, m, s) = two_nodes(&mut model);
        let truss_section = model.add_section(Section::truss(0.01)).unwrap();

        let err = model
            .add_element(Element::beam(n1, NodeId(42), m, s))
            .unwrap_err();
        assert!(matches!(err, FEAError::NodeNotFound(NodeId(42))));

        let err = model
            .add_element(Element::beam(n1, n2, MaterialId(7), s))
            .unwrap_err();
        assert!(matches!(err, FEAError::MaterialNotFound(_)));

        // A beam needs bending properties
        let err = model
            .add_element(Element::beam(n1, n2, m, truss_section))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let n3 = model.add_node(Node::new(6.0, 0.0, 0.0)).unwrap();
        let n4 = model.add_node(Node::new(9.0, 0.0, 0.0)).unwrap();
        let plate = model.add_section(Section::shell(0.01)).unwrap();
        let err = model
            .add_element(Element::shell([n1, n2, n3, n4], m, plate))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
    }

    #[test]
    fn test_load_validation() {
        let mut model = FEModel::new();
        let (n1, n2, m, s) = two_nodes(&mut model);
        let e = model.add_element(Element::beam(n1, n2, m, s)).unwrap();

        assert!(model
            .add_load(Load::distributed(e, LoadDirection::Fy, -2.0, LoadCase::Dead))
            .is_ok());
        assert!(model
            .add_load(Load::pressure(e, 1.0, LoadCase::Dead))
            .is_err());
        assert!(matches!(
            model.add_load(Load::nodal(NodeId(9), Dof::DX, 1.0, LoadCase::Dead)),
            Err(FEAError::NodeNotFound(_))
        ));
        assert_eq!(model.load_count(), 1);
        assert_eq!(model.load_cases(), BTreeSet::from([LoadCase::Dead]));
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut model = FEModel::new();
        let (n1, n2, m, s) = two_nodes(&mut model);
        let n3 = model.add_node(Node::new(3.0, 3.0, 0.0)).unwrap();
        let e1 = model.add_element(Element::beam(n1, n2, m, s)).unwrap();
        let e2 = model.add_element(Element::beam(n2, n3, m, s)).unwrap();
        model.add_support(n2, Support::pinned()).unwrap();
        model
            .add_load(Load::uniform_downward(e1, 1.0, LoadCase::Dead))
            .unwrap();
        let kept = model
            .add_load(Load::nodal(n3, Dof::DY, 1.0, LoadCase::Live))
            .unwrap();
        model
            .add_load(Load::nodal(n2, Dof::DX, 1.0, LoadCase::Live))
            .unwrap();

        model.remove_node(n2).unwrap();
        assert!(model.element(e1).is_none());
        assert!(model.element(e2).is_none());
        assert!(model.support(n2).is_none());
        assert_eq!(model.loads().map(|(id, _)| id).collect::<Vec<_>>(), vec![kept]);
        assert!(model.node(n1).is_some());
    }

    #[test]
    fn test_in_use_and_id_reuse() {
        let mut model = FEModel::new();
        let (n1, n2, m, s) = two_nodes(&mut model);
        let e = model.add_element(Element::beam(n1, n2, m, s)).unwrap();

        assert!(matches!(
            model.remove_material(m),
            Err(FEAError::InUse { element, .. }) if element == e
        ));
        assert!(model.remove_section(s).is_err());

        model.remove_element(e).unwrap();
        model.remove_section(s).unwrap();
        let again = model.add_element(Element::truss(n1, n2, m, SectionId(0)));
        assert!(matches!(again, Err(FEAError::SectionNotFound(_))));

        let s2 = model.add_section(Section::truss(0.01)).unwrap();
        assert_ne!(s2, s);
        let e2 = model.add_element(Element::truss(n1, n2, m, s2)).unwrap();
        assert_ne!(e2, e);
    }

    #[test]
    fn test_version_tracks_mutations() {
        let mut model = FEModel::new();
        assert_eq!(model.version(), 0);
        let (n1, _, _, _) = two_nodes(&mut model);
        assert_eq!(model.version(), 4);

        // Failed mutations leave the version alone
        assert!(model.add_support(NodeId(50), Support::fixed()).is_err());
        assert_eq!(model.version(), 4);

        model.add_support(n1, Support::fixed()).unwrap();
        assert_eq!(model.version(), 5);
    }

    #[test]
    fn test_json_keeps_id_counters() {
        let mut model = FEModel::new();
        let (n1, n2, _, _) = two_nodes(&mut model);
        model.remove_node(n2).unwrap();

        let mut back = FEModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(back.version(), 0);
        assert!(back.node(n1).is_some());
        let n3 = back.add_node(Node::new(0.0, 5.0, 0.0)).unwrap();
        assert_ne!(n3, n2);
    }
}
