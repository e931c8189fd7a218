//! Copyable handles for model entities

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Raw index of this handle
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Handle to a node
    NodeId, "N"
);
entity_id!(
    /// Handle to an element
    ElementId, "E"
);
entity_id!(
    /// Handle to a material
    MaterialId, "M"
);
entity_id!(
    /// Handle to a section
    SectionId, "S"
);
entity_id!(
    /// Handle to a load
    LoadId, "L"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_serde() {
        assert_eq!(NodeId(4).to_string(), "N4");
        assert_eq!(ElementId(12).to_string(), "E12");
        let json = serde_json::to_string(&MaterialId(2)).unwrap();
        assert_eq!(json, "2");
        let back: MaterialId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MaterialId(2));
    }
}
