pub mod commands;
pub mod error;
pub mod panel;
pub mod reorder;
pub mod sync;

pub use commands::{HostBridge, HostCommand};
pub use error::{BridgeError, ReorderError};
pub use panel::LayersPanel;
pub use reorder::{LayerDropValidator, PendingDrop, ReorderConfig, drag_items, drop_item_index};
pub use sync::{DocumentSync, StructureEvent, SubscriptionId};
