//! Outbound commands to the host application.
//!
//! The editor never mutates its own structure in response to a user
//! gesture. It asks the host through a `HostBridge` and waits for the
//! host's next snapshot or incremental event to arrive through
//! `DocumentSync::apply`.

use crate::error::BridgeError;
use strata_core::{ElementId, ElementProperties};

/// A request to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Move `ids` to host item index `index` of `document`.
    Reorder {
        document: u32,
        ids: Vec<ElementId>,
        index: usize,
    },
    /// Wrap `ids` in a new group.
    Group { document: u32, ids: Vec<ElementId> },
    Delete { document: u32, ids: Vec<ElementId> },
    /// Replace the selection with `ids`.
    Select { document: u32, ids: Vec<ElementId> },
    SetProperties {
        document: u32,
        ids: Vec<ElementId>,
        properties: ElementProperties,
    },
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Reorder { .. } => "reorder",
            HostCommand::Group { .. } => "group",
            HostCommand::Delete { .. } => "delete",
            HostCommand::Select { .. } => "select",
            HostCommand::SetProperties { .. } => "set-properties",
        }
    }

    pub fn document(&self) -> u32 {
        match self {
            HostCommand::Reorder { document, .. }
            | HostCommand::Group { document, .. }
            | HostCommand::Delete { document, .. }
            | HostCommand::Select { document, .. }
            | HostCommand::SetProperties { document, .. } => *document,
        }
    }
}

/// Transport to the host. Injected into `DocumentSync`.
pub trait HostBridge {
    fn send(&self, command: HostCommand) -> Result<(), BridgeError>;
}

impl<F> HostBridge for F
where
    F: Fn(HostCommand) -> Result<(), BridgeError>,
{
    fn send(&self, command: HostCommand) -> Result<(), BridgeError> {
        self(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn closures_are_bridges() {
        let sent = RefCell::new(Vec::new());
        let bridge = |command: HostCommand| {
            sent.borrow_mut().push(command.name());
            Ok::<(), BridgeError>(())
        };
        bridge
            .send(HostCommand::Delete {
                document: 1,
                ids: vec![ElementId(4)],
            })
            .unwrap();
        assert_eq!(*sent.borrow(), vec!["delete"]);
    }

    #[test]
    fn every_command_names_its_document() {
        let command = HostCommand::Reorder {
            document: 9,
            ids: Vec::new(),
            index: 1,
        };
        assert_eq!(command.document(), 9);
        assert_eq!(command.name(), "reorder");
    }
}
