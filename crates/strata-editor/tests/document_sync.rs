//! Integration tests: host events applied through `DocumentSync`.

use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use strata_core::{
    ElementId, ElementProperties, ElementStructure, NodeDescriptor, SceneSnapshot, StructureError,
    Vec2,
};
use strata_editor::{BridgeError, DocumentSync, HostCommand, StructureEvent};

fn snapshot() -> SceneSnapshot {
    SceneSnapshot::from_json(include_str!("fixtures/document.json")).unwrap()
}

fn offline(_: HostCommand) -> Result<(), BridgeError> {
    Err(BridgeError::Disconnected)
}

fn sync() -> DocumentSync {
    DocumentSync::from_snapshot(&snapshot(), offline).unwrap()
}

#[test]
fn snapshot_event_rebuilds_structure() {
    let mut sync = DocumentSync::new(ElementStructure::empty(3), offline);
    let versions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&versions);
    sync.subscribe(move |s| sink.borrow_mut().push(s.len()));

    let s = sync.apply(&StructureEvent::Snapshot(snapshot())).unwrap();
    assert_eq!(s.len(), 8);
    assert_eq!(s.children(ElementId(0)).to_vec(), vec![ElementId(1), ElementId(2)]);
    assert_eq!(*versions.borrow(), vec![8]);
}

#[test]
fn events_apply_in_order_and_failures_are_collected() {
    let mut sync = sync();
    let events = [
        StructureEvent::UpdateSelection(vec![ElementId(1)]),
        StructureEvent::UpdateOrder((0..9).map(ElementId).collect()),
        StructureEvent::TranslateLayers {
            ids: vec![ElementId(1)],
            delta: Vec2::new(5.0, -2.0),
        },
        StructureEvent::SetProperties {
            ids: vec![ElementId(42)],
            properties: ElementProperties::default(),
        },
        StructureEvent::DeleteLayers(vec![ElementId(2)]),
    ];

    let failures = sync.apply_all(&events);
    assert_eq!(
        failures,
        vec![
            (
                1,
                StructureError::TooManyIds {
                    given: 9,
                    existing: 8
                }
            ),
            (3, StructureError::UnknownElement(ElementId(42))),
        ]
    );

    let s = sync.structure();
    assert_eq!(s.selected_ids(), vec![ElementId(1)]);
    let logo = s.by_id(ElementId(1)).unwrap().bounds.unwrap();
    assert_eq!((logo.left, logo.top), (15.0, 8.0));
    assert!(!s.contains(ElementId(2)));
    assert_eq!(s.children(ElementId(0)).to_vec(), vec![ElementId(1)]);
}

#[test]
fn failed_event_does_not_notify() {
    let mut sync = sync();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let id = sync.subscribe(move |_| counter.set(counter.get() + 1));

    let before = sync.structure();
    let result = sync.apply(&StructureEvent::ResetElements(vec![(
        ElementId(77),
        NodeDescriptor::default(),
    )]));
    assert!(result.is_err());
    assert!(Rc::ptr_eq(&before, &sync.structure()));
    assert_eq!(calls.get(), 0);

    sync.apply(&StructureEvent::UpdateSelection(Vec::new())).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(sync.unsubscribe(id));
    sync.apply(&StructureEvent::UpdateSelection(Vec::new())).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn bridge_failures_are_swallowed() {
    let attempts = Rc::new(Cell::new(0));
    let counter = Rc::clone(&attempts);
    let sync = DocumentSync::from_snapshot(&snapshot(), move |_: HostCommand| -> Result<(), BridgeError> {
        counter.set(counter.get() + 1);
        Err(BridgeError::Rejected {
            command: "group",
            reason: "document is read-only".into(),
        })
    })
    .unwrap();

    sync.request(HostCommand::Group {
        document: 3,
        ids: vec![ElementId(1), ElementId(2)],
    });
    assert_eq!(attempts.get(), 1);
    assert_eq!(sync.document_id(), 3);
}
