//! Integration tests: dragging layer rows through the panel and the
//! reorder rules (strata-editor ↔ strata-dnd ↔ strata-core).
//!
//! Fixture positions: 0 Header, 1 Logo, 2 Title, 3 end, 4 Card, 5 Photo,
//! 6 end, 7 Background. Title is selected; Card is collapsed.

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use strata_core::{Element, ElementId, ElementKind, ElementStructure, Rect};
use strata_dnd::{DropOutcome, DropPosition, GestureOutcome, InputEvent};
use strata_editor::{
    BridgeError, DocumentSync, HostBridge, HostCommand, LayerDropValidator, LayersPanel,
    ReorderConfig, StructureEvent, drag_items, drop_item_index,
};

const HEADER: ElementId = ElementId(0);
const LOGO: ElementId = ElementId(1);
const TITLE: ElementId = ElementId(2);
const CARD: ElementId = ElementId(4);
const PHOTO: ElementId = ElementId(5);
const BACKGROUND: ElementId = ElementId(7);

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<HostCommand>>>);

impl HostBridge for Recorder {
    fn send(&self, command: HostCommand) -> Result<(), BridgeError> {
        self.0.borrow_mut().push(command);
        Ok(())
    }
}

fn document() -> Rc<ElementStructure> {
    Rc::new(ElementStructure::from_json(include_str!("fixtures/document.json")).unwrap())
}

/// Panel with one 20px row per visible layer.
fn panel() -> (LayersPanel, Recorder) {
    let recorder = Recorder::default();
    let structure = ElementStructure::from_json(include_str!("fixtures/document.json")).unwrap();
    let sync = Rc::new(RefCell::new(DocumentSync::new(structure, recorder.clone())));
    let mut panel = LayersPanel::new(sync, ReorderConfig::default());
    let rows: Vec<(ElementId, Rect)> = [HEADER, LOGO, TITLE, CARD, BACKGROUND]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let top = i as f64 * 20.0;
            (*id, Rect::new(0.0, top, 200.0, top + 20.0))
        })
        .collect();
    panel.layout_rows(&rows);
    (panel, recorder)
}

fn drive(panel: &mut LayersPanel, layer: ElementId, events: &[InputEvent]) -> Vec<GestureOutcome<ElementId>> {
    events
        .iter()
        .map(|event| panel.pointer(layer, event).unwrap())
        .collect()
}

// ─── Drag payload ────────────────────────────────────────────────────────

#[test]
fn pressed_selection_drags_whole_selection() {
    let s = document();
    assert_eq!(drag_items(&s, TITLE), vec![TITLE]);
    assert_eq!(drag_items(&s, LOGO), vec![LOGO]);

    let s = s.update_selection([LOGO, TITLE, BACKGROUND]);
    assert_eq!(drag_items(&s, TITLE), vec![LOGO, TITLE]);
    assert_eq!(drag_items(&s, CARD), vec![CARD]);
    assert_eq!(drag_items(&s, ElementId(99)), Vec::<ElementId>::new());
}

#[test]
fn drop_index_is_host_item_index() {
    let s = document();
    assert_eq!(drop_item_index(&s, CARD, DropPosition::Above), Some(4));
    assert_eq!(drop_item_index(&s, CARD, DropPosition::Below), Some(3));
    assert_eq!(drop_item_index(&s, BACKGROUND, DropPosition::Above), Some(1));
}

// ─── Validity rules ──────────────────────────────────────────────────────

#[test]
fn layers_cannot_drop_into_themselves() {
    let v = LayerDropValidator::new(ReorderConfig::default(), document());
    assert!(!v.check(LOGO, &[HEADER], DropPosition::Above));
    assert!(!v.check(ElementId(3), &[HEADER], DropPosition::Below));
    assert!(!v.check(HEADER, &[HEADER], DropPosition::Above));
    assert!(v.check(HEADER, &[LOGO], DropPosition::Above));
}

#[test]
fn group_above_row_under_its_end_is_rejected() {
    let v = LayerDropValidator::new(ReorderConfig::default(), document());
    assert!(!v.check(CARD, &[HEADER], DropPosition::Above));
    assert!(v.check(CARD, &[HEADER], DropPosition::Below));
}

#[test]
fn nothing_drops_below_background() {
    let v = LayerDropValidator::new(ReorderConfig::default(), document());
    assert!(!v.check(BACKGROUND, &[LOGO], DropPosition::Below));
    assert!(v.check(BACKGROUND, &[LOGO], DropPosition::Above));
}

#[test]
fn nesting_limit_counts_dragged_subtree() {
    let config = ReorderConfig {
        max_nest_depth: 1,
        ..ReorderConfig::default()
    };
    let v = LayerDropValidator::new(config, document());
    assert!(v.check(PHOTO, &[LOGO], DropPosition::Above));
    assert!(!v.check(PHOTO, &[LOGO], DropPosition::Below));
    assert!(!v.check(LOGO, &[CARD], DropPosition::Below));
}

#[test]
fn artboards_only_nest_one_level() {
    use ElementKind::*;
    let mut artboard = Element::group(1, ElementId(1), "Artboard");
    artboard.is_artboard = true;
    let elements = vec![
        artboard,
        Element::new(1, ElementId(2), Pixel, "Inside"),
        Element::group_end(1, ElementId(3)),
        Element::group(1, ElementId(4), "Group"),
        Element::new(1, ElementId(5), Pixel, "Nested"),
        Element::group_end(1, ElementId(6)),
        Element::new(1, ElementId(7), Pixel, "Loose"),
    ];
    let s = Rc::new(ElementStructure::new(1, elements).unwrap());
    let v = LayerDropValidator::new(ReorderConfig::default(), s);

    assert!(v.check(ElementId(7), &[ElementId(1)], DropPosition::Above));
    assert!(!v.check(ElementId(7), &[ElementId(1)], DropPosition::Below));
    assert!(!v.check(ElementId(5), &[ElementId(1)], DropPosition::Above));
    assert!(v.check(ElementId(5), &[ElementId(2)], DropPosition::Above));
}

// ─── Panel sessions ──────────────────────────────────────────────────────

#[test]
fn dropping_below_a_row_requests_reorder() {
    let (mut panel, recorder) = panel();
    let outcomes = drive(
        &mut panel,
        LOGO,
        &[
            InputEvent::from_pointer_down(10.0, 30.0),
            InputEvent::from_pointer_move(10.0, 75.0),
            InputEvent::from_pointer_up(10.0, 75.0),
            InputEvent::Click { x: 10.0, y: 75.0 },
        ],
    );

    assert_eq!(
        outcomes,
        vec![
            GestureOutcome::Idle,
            GestureOutcome::Started,
            GestureOutcome::Finished(DropOutcome::Dropped {
                key: "layer-4".into(),
                key_object: CARD,
            }),
            GestureOutcome::ClickSuppressed,
        ]
    );
    assert_eq!(
        *recorder.0.borrow(),
        vec![HostCommand::Reorder {
            document: 3,
            ids: vec![LOGO],
            index: 3,
        }]
    );
    assert_eq!(panel.drag_state().past_drag_targets, Some(vec![LOGO]));
    panel.render_complete();
    assert_eq!(panel.drag_state().past_drag_targets, None);
}

#[test]
fn dropping_on_own_child_cancels() {
    let (mut panel, recorder) = panel();
    let outcomes = drive(
        &mut panel,
        HEADER,
        &[
            InputEvent::from_pointer_down(10.0, 10.0),
            InputEvent::from_pointer_move(10.0, 25.0),
            InputEvent::from_pointer_up(10.0, 25.0),
        ],
    );

    assert_eq!(outcomes[2], GestureOutcome::Finished(DropOutcome::Cancelled));
    assert!(recorder.0.borrow().is_empty());
}

#[test]
fn plain_click_selects_layer() {
    let (mut panel, recorder) = panel();
    let outcomes = drive(
        &mut panel,
        TITLE,
        &[
            InputEvent::from_pointer_down(10.0, 50.0),
            InputEvent::from_pointer_up(10.0, 50.0),
            InputEvent::Click { x: 10.0, y: 50.0 },
        ],
    );

    assert_eq!(outcomes[2], GestureOutcome::Click);
    assert_eq!(
        *recorder.0.borrow(),
        vec![HostCommand::Select {
            document: 3,
            ids: vec![TITLE],
        }]
    );
}

#[test]
fn validator_follows_document_updates() {
    let recorder = Recorder::default();
    let structure = ElementStructure::from_json(include_str!("fixtures/document.json")).unwrap();
    let sync = Rc::new(RefCell::new(DocumentSync::new(structure, recorder)));
    let panel = LayersPanel::new(Rc::clone(&sync), ReorderConfig::default());

    let next = sync
        .borrow_mut()
        .apply(&StructureEvent::UpdateSelection(vec![LOGO]))
        .unwrap();
    assert!(Rc::ptr_eq(&panel.validator().structure(), &next));
    assert!(Rc::ptr_eq(&panel.structure(), &next));
}

#[test]
fn teardown_stops_following_the_document() {
    let recorder = Recorder::default();
    let structure = ElementStructure::from_json(include_str!("fixtures/document.json")).unwrap();
    let sync = Rc::new(RefCell::new(DocumentSync::new(structure, recorder)));

    let mut validators = Vec::new();
    for _ in 0..3 {
        let mut panel = LayersPanel::new(Rc::clone(&sync), ReorderConfig::default());
        validators.push(Rc::downgrade(panel.validator()));
        panel.teardown();
    }
    assert!(validators.iter().all(|v| v.upgrade().is_none()));

    let calls = Rc::new(std::cell::Cell::new(0));
    let counter = Rc::clone(&calls);
    let id = sync.borrow_mut().subscribe(move |_| counter.set(counter.get() + 1));
    sync.borrow_mut()
        .apply(&StructureEvent::UpdateSelection(vec![LOGO]))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert!(sync.borrow_mut().unsubscribe(id));
}
