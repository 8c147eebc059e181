//! Host snapshot descriptors.
//!
//! The host describes nesting with a `childCount` annotation on each parent
//! node instead of explicit closing markers. Parsing walks the node list,
//! synthesizes a `GroupEnd` after each counted subtree, and hands back the
//! bracketed element list the structure model works with.

use crate::error::SnapshotError;
use crate::id::ElementId;
use crate::model::{
    Bounds, Element, ElementKind, Fill, LayerEffect, LayerEffectType, Stroke, TextStyle,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Full or partial flat description of a document's elements, front first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    /// Layer or document id that owns the elements; prefixes element keys.
    pub owner_id: u32,
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
}

/// One raw node of a host snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDescriptor {
    pub id: Option<u32>,
    pub name: Option<String>,
    /// Host layer-kind code.
    pub node_type: u32,
    pub sub_type: u32,
    /// Number of direct children that follow this node. Absent when the
    /// snapshot already carries explicit `GroupEnd` nodes.
    pub child_count: Option<usize>,
    pub is_parent: bool,
    pub visible: bool,
    pub locked: bool,
    pub selected: bool,
    pub expanded: bool,
    pub is_background: bool,
    pub is_artboard: bool,
    pub super_selectable: bool,
    pub unsupported: bool,
    pub is_linked: bool,
    pub bounds: Option<Bounds>,
    pub opacity: f32,
    pub proportional: bool,
    pub fills: Vec<Fill>,
    pub strokes: Vec<Stroke>,
    pub effects: BTreeMap<LayerEffectType, Vec<LayerEffect>>,
    pub text: Option<TextStyle>,
    /// 1-based, bottom-up host position; used when inserting new layers.
    pub item_index: Option<usize>,
}

impl Default for NodeDescriptor {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            node_type: ElementKind::Pixel.code(),
            sub_type: 0,
            child_count: None,
            is_parent: false,
            visible: true,
            locked: false,
            selected: false,
            expanded: true,
            is_background: false,
            is_artboard: false,
            super_selectable: true,
            unsupported: false,
            is_linked: false,
            bounds: None,
            opacity: 1.0,
            proportional: false,
            fills: Vec::new(),
            strokes: Vec::new(),
            effects: BTreeMap::new(),
            text: None,
            item_index: None,
        }
    }
}

impl NodeDescriptor {
    pub fn kind(&self) -> ElementKind {
        ElementKind::from(self.node_type)
    }

    /// Whether a `GroupEnd` must be synthesized after this node's children.
    fn counted_opener(&self) -> Option<usize> {
        let count = self.child_count?;
        match self.kind() {
            ElementKind::Group => Some(count),
            _ if self.is_parent && count > 0 => Some(count),
            _ => None,
        }
    }

    /// Build the element for this descriptor under `owner`.
    pub fn to_element(&self, owner: u32, id: ElementId) -> Element {
        let kind = self.kind();
        let name = match &self.name {
            Some(name) => name.clone(),
            None => default_name(kind, id),
        };
        let mut element = Element::new(owner, id, kind, name);
        element.sub_type = self.sub_type;
        // A parent flag without children would open a bracket nobody closes.
        element.is_parent = self.is_parent && self.child_count.is_none_or(|n| n > 0);
        element.visible = self.visible;
        element.locked = self.locked;
        element.selected = self.selected;
        element.expanded = self.expanded;
        element.is_background = self.is_background || kind == ElementKind::Background;
        element.is_artboard = self.is_artboard;
        element.super_selectable = self.super_selectable;
        element.unsupported = self.unsupported;
        element.is_linked = self.is_linked;
        element.bounds = self.bounds;
        element.opacity = self.opacity;
        element.proportional = self.proportional;
        element.fills = self.fills.clone();
        element.strokes = self.strokes.clone();
        element.effects = self.effects.clone();
        element.used_to_have_layer_effect = element.has_layer_effect();
        element.text = self.text.clone();
        element
    }
}

fn default_name(kind: ElementKind, id: ElementId) -> String {
    match kind {
        ElementKind::Group => format!("Group {id}"),
        ElementKind::Background => "Background".to_string(),
        _ => format!("Layer {id}"),
    }
}

// ─── Group-end synthesis ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node(usize),
    End,
}

/// Emit the subtree rooted at `nodes[*pos]`, followed by its synthesized end.
fn emit_subtree(
    nodes: &[NodeDescriptor],
    pos: &mut usize,
    out: &mut Vec<Slot>,
) -> Result<(), SnapshotError> {
    let start = *pos;
    out.push(Slot::Node(start));
    *pos += 1;

    if let Some(count) = nodes[start].counted_opener() {
        for _ in 0..count {
            if *pos >= nodes.len() {
                return Err(SnapshotError::ChildCountOverrun {
                    position: start,
                    count,
                    available: nodes.len() - start - 1,
                });
            }
            emit_subtree(nodes, pos, out)?;
        }
        out.push(Slot::End);
    }
    Ok(())
}

impl SceneSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Bracketed element list in display order, ids assigned.
    ///
    /// Nodes without an explicit id get their position in the bracketed
    /// list, offset past the largest explicit id when any are present.
    pub fn elements(&self) -> Result<Vec<Element>, SnapshotError> {
        let mut slots = Vec::with_capacity(self.nodes.len());
        let mut pos = 0;
        while pos < self.nodes.len() {
            emit_subtree(&self.nodes, &mut pos, &mut slots)?;
        }

        let base = match self.nodes.iter().filter_map(|n| n.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(0),
        };
        let implicit = |position: usize| {
            base.zip(u32::try_from(position).ok())
                .and_then(|(base, offset)| base.checked_add(offset))
                .map(ElementId)
                .ok_or(SnapshotError::IdOverflow { position })
        };

        let mut seen = HashSet::with_capacity(slots.len());
        let mut elements = Vec::with_capacity(slots.len());
        for (position, slot) in slots.iter().enumerate() {
            let element = match *slot {
                Slot::Node(i) => {
                    let node = &self.nodes[i];
                    let id = match node.id {
                        Some(id) => ElementId(id),
                        None => implicit(position)?,
                    };
                    node.to_element(self.owner_id, id)
                }
                Slot::End => Element::group_end(self.owner_id, implicit(position)?),
            };
            if !seen.insert(element.id) {
                return Err(SnapshotError::DuplicateId(element.id));
            }
            elements.push(element);
        }

        log::trace!(
            "snapshot {}: {} nodes -> {} elements",
            self.owner_id,
            self.nodes.len(),
            elements.len()
        );
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: ElementKind, child_count: Option<usize>) -> NodeDescriptor {
        NodeDescriptor {
            node_type: kind.code(),
            child_count,
            ..Default::default()
        }
    }

    fn kinds(elements: &[Element]) -> Vec<ElementKind> {
        elements.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn synthesizes_end_after_counted_children() {
        let snapshot = SceneSnapshot {
            owner_id: 1,
            nodes: vec![
                node(ElementKind::Group, Some(2)),
                node(ElementKind::Pixel, None),
                node(ElementKind::Text, None),
                node(ElementKind::Pixel, None),
            ],
        };
        let elements = snapshot.elements().unwrap();
        assert_eq!(
            kinds(&elements),
            vec![
                ElementKind::Group,
                ElementKind::Pixel,
                ElementKind::Text,
                ElementKind::GroupEnd,
                ElementKind::Pixel,
            ]
        );
        let ids: Vec<u32> = elements.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn counts_skip_nested_subtrees() {
        // Outer has 2 children: an inner group (with 1 child) and a layer.
        let snapshot = SceneSnapshot {
            owner_id: 1,
            nodes: vec![
                node(ElementKind::Group, Some(2)),
                node(ElementKind::Group, Some(1)),
                node(ElementKind::Pixel, None),
                node(ElementKind::Pixel, None),
            ],
        };
        let elements = snapshot.elements().unwrap();
        assert_eq!(
            kinds(&elements),
            vec![
                ElementKind::Group,
                ElementKind::Group,
                ElementKind::Pixel,
                ElementKind::GroupEnd,
                ElementKind::Pixel,
                ElementKind::GroupEnd,
            ]
        );
    }

    #[test]
    fn scene_parent_without_children_is_a_leaf() {
        let mut parent = node(ElementKind::ThreeD, Some(0));
        parent.is_parent = true;
        let snapshot = SceneSnapshot {
            owner_id: 9,
            nodes: vec![parent],
        };
        let elements = snapshot.elements().unwrap();
        assert_eq!(elements.len(), 1);
        assert!(!elements[0].opens_group());
    }

    #[test]
    fn child_count_overrun_is_rejected() {
        let snapshot = SceneSnapshot {
            owner_id: 1,
            nodes: vec![
                node(ElementKind::Group, Some(3)),
                node(ElementKind::Pixel, None),
            ],
        };
        assert_eq!(
            snapshot.elements(),
            Err(SnapshotError::ChildCountOverrun {
                position: 0,
                count: 3,
                available: 1
            })
        );
    }

    #[test]
    fn explicit_ids_are_kept_and_ends_placed_after_them() {
        let mut group = node(ElementKind::Group, Some(1));
        group.id = Some(40);
        let mut child = node(ElementKind::Pixel, None);
        child.id = Some(41);
        let snapshot = SceneSnapshot {
            owner_id: 1,
            nodes: vec![group, child],
        };
        let ids: Vec<u32> = snapshot
            .elements()
            .unwrap()
            .iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, vec![40, 41, 44]);
    }

    #[test]
    fn implicit_ids_past_u32_max_are_rejected() {
        let mut top = node(ElementKind::Pixel, None);
        top.id = Some(u32::MAX);
        let snapshot = SceneSnapshot {
            owner_id: 1,
            nodes: vec![top.clone(), node(ElementKind::Pixel, None)],
        };
        assert_eq!(
            snapshot.elements(),
            Err(SnapshotError::IdOverflow { position: 1 })
        );

        // Only explicit ids: nothing to allocate.
        let alone = SceneSnapshot {
            owner_id: 1,
            nodes: vec![top],
        };
        assert_eq!(alone.elements().unwrap()[0].id, ElementId(u32::MAX));
    }

    #[test]
    fn duplicate_explicit_ids_are_rejected() {
        let mut a = node(ElementKind::Pixel, None);
        a.id = Some(3);
        let b = a.clone();
        let snapshot = SceneSnapshot {
            owner_id: 1,
            nodes: vec![a, b],
        };
        assert_eq!(
            snapshot.elements(),
            Err(SnapshotError::DuplicateId(ElementId(3)))
        );
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "ownerId": 12,
            "nodes": [
                { "nodeType": 7, "childCount": 1, "name": "Hero" },
                { "nodeType": 3, "visible": false,
                  "bounds": { "top": 0, "left": 0, "bottom": 10, "right": 20 } }
            ]
        }"#;
        let snapshot = SceneSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.owner_id, 12);
        let elements = snapshot.elements().unwrap();
        assert_eq!(elements[0].name, "Hero");
        assert!(!elements[1].visible);
        assert_eq!(elements[1].bounds.map(|b| b.width()), Some(20.0));
        assert_eq!(elements[1].key.as_str(), "12.1");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            SceneSnapshot::from_json("{ nodes: "),
            Err(SnapshotError::Json(_))
        ));
    }
}
