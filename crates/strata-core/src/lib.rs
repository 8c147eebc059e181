pub mod descriptor;
pub mod editor;
pub mod error;
pub mod id;
pub mod model;
pub mod structure;
pub mod tree;

pub use descriptor::{NodeDescriptor, SceneSnapshot};
pub use editor::{PerElement, ReplaceMode};
pub use error::{SnapshotError, StructureError};
pub use id::{ElementId, ElementKey};
pub use model::*;
pub use structure::ElementStructure;
pub use tree::{SceneTree, StructureNode};

// Re-export geometry types so downstream crates don't need a direct dependency
pub use kurbo::{Point, Rect, Vec2};
