//! Error types for the drag-and-drop engine.

use thiserror::Error;

/// Error returned by a drop handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Misuse of the drop-target registry. Affects only the zone named.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unable to remove droppables from empty drop target zone {0}")]
    EmptyZone(String),
}

#[derive(Error, Debug)]
pub enum DragError {
    /// The resolved target's drop handler failed. Session state was already
    /// cleared when this is returned.
    #[error("drop handler for target `{key}` failed: {source}")]
    Handler {
        key: String,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
