//! Error types for the editor layer.

use thiserror::Error;

/// The host refused or failed to accept a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("host bridge is disconnected")]
    Disconnected,

    #[error("host rejected `{command}`: {reason}")]
    Rejected { command: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    /// A drop arrived without a target validated in the current session.
    #[error("no validated drop target for this session")]
    NoPendingDrop,

    #[error("drop target {0} is no longer in the document")]
    TargetGone(strata_core::ElementId),
}
