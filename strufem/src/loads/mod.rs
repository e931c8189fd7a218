//! Load types and load combinations

mod load;
mod load_case;
mod load_combo;

pub use load::{Load, LoadDirection, LoadKind, LoadTarget};
pub use load_case::LoadCase;
pub use load_combo::{DesignMethod, LoadCombination};
