//! Error types for snapshot parsing and structural edits.

use crate::id::ElementId;
use crate::model::LayerEffectType;
use thiserror::Error;

/// Failure of a structural mutator. The receiver is never modified; the
/// caller keeps the previous structure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    #[error("too many ids in element index: got {given}, structure has {existing}")]
    TooManyIds { given: usize, existing: usize },

    #[error("duplicate element id {0}")]
    DuplicateId(ElementId),

    #[error("unknown element id {0}")]
    UnknownElement(ElementId),

    #[error("unbalanced group brackets at index position {position}")]
    UnbalancedGroups { position: usize },

    #[error("index does not match element map ({index} ids, {elements} elements)")]
    IndexMismatch { index: usize, elements: usize },

    #[error("replace index {index} out of bounds for {len} elements")]
    ReplaceIndexOutOfBounds { index: usize, len: usize },

    #[error("insert index {index} out of bounds for {len} elements")]
    InsertIndexOutOfBounds { index: usize, len: usize },

    #[error("element {id} has no fill at index {index}")]
    MissingFill { id: ElementId, index: usize },

    #[error("element {id} has no stroke at index {index}")]
    MissingStroke { id: ElementId, index: usize },

    #[error("element {id} has no {kind:?} effect at index {index}")]
    MissingLayerEffect {
        id: ElementId,
        kind: LayerEffectType,
        index: usize,
    },

    #[error("element {0} is not a text element")]
    NotTextElement(ElementId),

    #[error("batch has {given} entries for {expected} elements")]
    BatchLengthMismatch { given: usize, expected: usize },

    #[error("no elements selected")]
    NothingSelected,

    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Failure to turn a host snapshot into a structure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("malformed snapshot JSON: {0}")]
    Json(String),

    #[error("node {position} declares {count} children but only {available} follow")]
    ChildCountOverrun {
        position: usize,
        count: usize,
        available: usize,
    },

    #[error("duplicate element id {0} in snapshot")]
    DuplicateId(ElementId),

    #[error("unbalanced group brackets at node {position}")]
    Unbalanced { position: usize },

    #[error("no free implicit id for element {position}")]
    IdOverflow { position: usize },
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e.to_string())
    }
}
