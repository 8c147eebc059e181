pub mod coordinator;
pub mod error;
pub mod input;
pub mod registry;
pub mod resolve;
pub mod session;

pub use coordinator::{DragCoordinator, DropOutcome, ListenerId};
pub use error::{DragError, HandlerError, RegistryError};
pub use input::{DragConfig, DragGesture, GestureOutcome, InputEvent};
pub use registry::{DropCandidate, DropHandler, DropNode, DropTargetRegistry, Droppable, Validation, Validator};
pub use resolve::{BoundsResolver, DropPosition, locate};
pub use session::{DragSession, DragState, ResolvedTarget};

// Re-export geometry types so downstream crates don't need a direct dependency
pub use kurbo::{Point, Rect};
