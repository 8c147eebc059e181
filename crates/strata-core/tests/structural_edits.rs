//! Integration tests: structural mutators on whole documents.

use pretty_assertions::assert_eq;
use std::rc::Rc;
use strata_core::{
    Element, ElementId, ElementKind, ElementProperties, ElementStructure, NodeDescriptor,
    ReplaceMode, StructureError,
};

fn el(id: u32, kind: ElementKind) -> Element {
    Element::new(1, ElementId(id), kind, format!("Layer {id}"))
}

fn ids(raw: &[u32]) -> Vec<ElementId> {
    raw.iter().map(|&i| ElementId(i)).collect()
}

fn index_of(s: &ElementStructure) -> Vec<u32> {
    s.index().iter().map(|id| id.0).collect()
}

fn document() -> ElementStructure {
    ElementStructure::from_json(include_str!("fixtures/document.json")).unwrap()
}

// ─── Delete ──────────────────────────────────────────────────────────────

#[test]
fn delete_member_then_query_children() {
    use ElementKind::*;
    let s = ElementStructure::new(1, vec![el(1, Group), el(2, Pixel), el(3, GroupEnd)]).unwrap();
    let next = s.delete_layers(&ids(&[2])).unwrap();

    assert_eq!(index_of(&next), vec![1, 3]);
    assert!(next.by_id(ElementId(2)).is_none());
    assert!(next.children(ElementId(1)).is_empty());
    assert!(next.is_empty_group(ElementId(1)));
}

#[test]
fn delete_preserves_survivor_order() {
    let doc = document();
    let next = doc.delete_layers(&ids(&[1, 5, 42])).unwrap();
    assert_eq!(index_of(&next), vec![0, 2, 3, 4, 6, 7]);
    assert_eq!(next.elements().len(), 6);
}

// ─── Group creation ──────────────────────────────────────────────────────

#[test]
fn create_group_wraps_contiguous_siblings() {
    use ElementKind::*;
    let mut three = el(3, Pixel);
    three.selected = true;
    let mut four = el(4, Text);
    four.selected = true;
    let s = ElementStructure::new(1, vec![el(1, Pixel), el(2, Pixel), three, four, el(5, Background)])
        .unwrap();

    let next = s.create_group(ElementId(10), ElementId(11), "Group 1").unwrap();

    assert_eq!(index_of(&next), vec![1, 2, 10, 3, 4, 11, 5]);
    assert_eq!(next.parent(ElementId(3)).map(|e| e.id), Some(ElementId(10)));
    assert_eq!(next.parent(ElementId(4)).map(|e| e.id), Some(ElementId(10)));
    assert_eq!(&*next.children(ElementId(10)), ids(&[3, 4]).as_slice());
    assert_eq!(next.selected_ids(), ids(&[10]));
    assert_eq!(next.by_id(ElementId(10)).unwrap().name, "Group 1");
}

#[test]
fn create_group_collects_scattered_selection_at_topmost() {
    let doc = document();
    // Select Logo (inside Header) and Card (whole group).
    let selected = doc.update_selection(ids(&[1, 4]));
    let next = selected
        .create_group(ElementId(100), ElementId(101), "Merged")
        .unwrap();

    assert_eq!(index_of(&next), vec![0, 100, 1, 4, 5, 6, 101, 2, 3, 7]);
    assert_eq!(next.parent(ElementId(100)).map(|e| e.id), Some(ElementId(0)));
    assert_eq!(next.depth(ElementId(5)), Some(3));
    assert_eq!(&*next.children(ElementId(0)), ids(&[100, 2]).as_slice());
}

#[test]
fn create_group_rejects_existing_ids() {
    let doc = document();
    assert_eq!(
        doc.create_group(ElementId(2), ElementId(100), "Dup"),
        Err(StructureError::DuplicateId(ElementId(2)))
    );
}

// ─── Reorder ─────────────────────────────────────────────────────────────

#[test]
fn reorder_rejects_oversized_list_and_keeps_prior_value() {
    let current = Rc::new(document());
    let held = Rc::clone(&current);
    let version = current.version();

    let too_many: Vec<ElementId> = (0..20).map(ElementId).collect();
    let result = current.update_order(&too_many);

    assert_eq!(
        result,
        Err(StructureError::TooManyIds {
            given: 20,
            existing: 8
        })
    );
    assert!(Rc::ptr_eq(&current, &held));
    assert_eq!(current.version(), version);
    assert_eq!(current.len(), 8);
}

#[test]
fn reorder_moves_a_group_below_a_layer() {
    let doc = document();
    let next = doc.update_order(&ids(&[4, 5, 6, 0, 1, 2, 3, 7])).unwrap();
    assert_eq!(next.top().iter().map(|e| e.id.0).collect::<Vec<_>>(), vec![4, 0, 7]);
    assert!(!next.shares_tree_with(&doc));
}

#[test]
fn reorder_that_breaks_brackets_is_rejected() {
    let doc = document();
    assert!(matches!(
        doc.update_order(&ids(&[3, 0, 1, 2, 4, 5, 6, 7])),
        Err(StructureError::UnbalancedGroups { position: 0 })
    ));
}

// ─── Selection / properties ──────────────────────────────────────────────

#[test]
fn selection_update_twice_is_equal() {
    let doc = document();
    let once = doc.update_selection(ids(&[1, 7]));
    let twice = once.update_selection(ids(&[1, 7]));
    assert_eq!(once, twice);
    assert!(once.background_selected());
}

#[test]
fn set_properties_merges_without_touching_others() {
    let doc = document();
    let next = doc
        .set_properties(
            &ids(&[1, 2]),
            &ElementProperties {
                visible: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!next.has_visible_descendant(ElementId(0)));
    assert_eq!(next.by_id(ElementId(2)).unwrap().name, "Title");
    assert!(next.by_id(ElementId(2)).unwrap().selected);
}

// ─── Add layers ──────────────────────────────────────────────────────────

#[test]
fn add_layers_above_background() {
    let doc = document();
    let descriptor = NodeDescriptor {
        name: Some("Sketch".into()),
        item_index: Some(2),
        ..Default::default()
    };
    let next = doc
        .add_layers(&ids(&[50]), &[descriptor], true, ReplaceMode::Auto)
        .unwrap();
    assert_eq!(index_of(&next), vec![0, 1, 2, 3, 4, 5, 6, 50, 7]);
    assert_eq!(next.selected_ids(), ids(&[50]));
    assert_eq!(next.parent(ElementId(50)), None);
}

#[test]
fn add_layers_beyond_the_top_fails() {
    let doc = document();
    let descriptor = NodeDescriptor {
        item_index: Some(20),
        ..Default::default()
    };
    assert_eq!(
        doc.add_layers(&ids(&[50]), &[descriptor], false, ReplaceMode::Never),
        Err(StructureError::InsertIndexOutOfBounds { index: 19, len: 8 })
    );
}
