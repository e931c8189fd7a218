//! Model entities: nodes, elements, materials, sections and supports

mod element;
mod ids;
mod material;
mod node;
mod section;
mod support;

pub use element::{Element, ElementKind, EndReleases};
pub use ids::{ElementId, LoadId, MaterialId, NodeId, SectionId};
pub use material::Material;
pub use node::{Node, COINCIDENT_TOLERANCE};
pub use section::Section;
pub use support::{Constraint, Support};
