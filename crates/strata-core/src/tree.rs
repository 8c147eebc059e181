//! Tree derivation from the bracketed flat order.
//!
//! `SceneTree` is rebuilt from scratch whenever the flat index changes and
//! is never mutated afterwards.

use crate::error::StructureError;
use crate::id::ElementId;
use crate::model::Element;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Derived node of the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureNode {
    pub id: ElementId,
    pub parent: Option<ElementId>,
    /// Direct members in display order, excluding the closing marker.
    pub children: SmallVec<[ElementId; 4]>,
    /// Root = 0.
    pub depth: usize,
    /// Closing marker for group openers, if one was found.
    pub group_end: Option<ElementId>,
}

/// All nodes of a structure plus the ordered root list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneTree {
    nodes: HashMap<ElementId, StructureNode>,
    roots: Vec<ElementId>,
}

impl SceneTree {
    /// Derive the tree by recursive descent over `index`, front to back.
    ///
    /// Derivation is lenient: a stray `GroupEnd` at root level becomes a
    /// plain root, and a group still open at the end of the list closes
    /// implicitly. `validate` reports both conditions.
    pub fn from_elements<'a, I, F>(index: I, lookup: F) -> Self
    where
        I: IntoIterator<Item = &'a ElementId>,
        F: Fn(ElementId) -> Option<&'a Element>,
    {
        let ids: Vec<ElementId> = index.into_iter().copied().collect();
        let mut tree = SceneTree {
            nodes: HashMap::with_capacity(ids.len()),
            roots: Vec::new(),
        };
        let mut pos = 0;
        let (roots, _) = tree.collect(&ids, &lookup, &mut pos, None, 0);
        tree.roots = roots.into_vec();
        tree
    }

    fn collect<'a, F>(
        &mut self,
        ids: &[ElementId],
        lookup: &F,
        pos: &mut usize,
        parent: Option<ElementId>,
        depth: usize,
    ) -> (SmallVec<[ElementId; 4]>, Option<ElementId>)
    where
        F: Fn(ElementId) -> Option<&'a Element>,
    {
        let mut children = SmallVec::new();

        while *pos < ids.len() {
            let id = ids[*pos];
            *pos += 1;
            let element = lookup(id);

            if parent.is_some() && element.is_some_and(Element::is_group_end) {
                self.insert(id, parent, SmallVec::new(), depth, None);
                return (children, Some(id));
            }

            if element.is_some_and(Element::opens_group) {
                let (members, end) = self.collect(ids, lookup, pos, Some(id), depth + 1);
                self.insert(id, parent, members, depth, end);
            } else {
                self.insert(id, parent, SmallVec::new(), depth, None);
            }
            children.push(id);
        }

        (children, None)
    }

    fn insert(
        &mut self,
        id: ElementId,
        parent: Option<ElementId>,
        children: SmallVec<[ElementId; 4]>,
        depth: usize,
        group_end: Option<ElementId>,
    ) {
        self.nodes.insert(
            id,
            StructureNode {
                id,
                parent,
                children,
                depth,
                group_end,
            },
        );
    }

    pub fn node(&self, id: ElementId) -> Option<&StructureNode> {
        self.nodes.get(&id)
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first re-flattening of the whole forest: the flat index again.
    pub fn flatten(&self) -> Vec<ElementId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.flatten_into(root, &mut out);
        }
        out
    }

    pub(crate) fn flatten_into(&self, id: ElementId, out: &mut Vec<ElementId>) {
        out.push(id);
        if let Some(node) = self.nodes.get(&id) {
            for &child in &node.children {
                self.flatten_into(child, out);
            }
            if let Some(end) = node.group_end {
                out.push(end);
            }
        }
    }
}

/// Check that `index` and the element lookup form a consistent structure:
/// every id known and unique, and group brackets balanced.
pub fn validate<'a, I, F>(index: I, element_count: usize, lookup: F) -> Result<(), StructureError>
where
    I: IntoIterator<Item = &'a ElementId>,
    F: Fn(ElementId) -> Option<&'a Element>,
{
    let mut seen = HashSet::with_capacity(element_count);
    let mut open = 0usize;
    let mut len = 0usize;

    for (position, &id) in index.into_iter().enumerate() {
        len += 1;
        if !seen.insert(id) {
            return Err(StructureError::DuplicateId(id));
        }
        let element = lookup(id).ok_or(StructureError::UnknownElement(id))?;
        if element.opens_group() {
            open += 1;
        } else if element.is_group_end() {
            open = open
                .checked_sub(1)
                .ok_or(StructureError::UnbalancedGroups { position })?;
        }
    }

    if open != 0 {
        return Err(StructureError::UnbalancedGroups { position: len });
    }
    if len != element_count {
        return Err(StructureError::IndexMismatch {
            index: len,
            elements: element_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementKind;
    use std::collections::HashMap as Map;

    fn elements(layout: &[(u32, ElementKind)]) -> (Vec<ElementId>, Map<ElementId, Element>) {
        let index = layout.iter().map(|&(id, _)| ElementId(id)).collect();
        let map = layout
            .iter()
            .map(|&(id, kind)| (ElementId(id), Element::new(1, ElementId(id), kind, "")))
            .collect();
        (index, map)
    }

    #[test]
    fn nested_groups_derive_depths_and_ends() {
        use ElementKind::*;
        let (index, map) = elements(&[
            (1, Group),
            (2, Pixel),
            (3, Group),
            (4, Text),
            (5, GroupEnd),
            (6, GroupEnd),
            (7, Background),
        ]);
        let tree = SceneTree::from_elements(&index, |id| map.get(&id));

        assert_eq!(tree.roots(), &[ElementId(1), ElementId(7)]);
        let outer = tree.node(ElementId(1)).unwrap();
        assert_eq!(outer.children.as_slice(), &[ElementId(2), ElementId(3)]);
        assert_eq!(outer.group_end, Some(ElementId(6)));
        assert_eq!(tree.node(ElementId(4)).unwrap().depth, 2);
        assert_eq!(tree.node(ElementId(5)).unwrap().parent, Some(ElementId(3)));
        assert_eq!(tree.node(ElementId(6)).unwrap().depth, 1);
        assert_eq!(tree.flatten(), index);
    }

    #[test]
    fn stray_end_is_a_root_leaf() {
        use ElementKind::*;
        let (index, map) = elements(&[(1, Pixel), (2, GroupEnd)]);
        let tree = SceneTree::from_elements(&index, |id| map.get(&id));
        assert_eq!(tree.roots(), &[ElementId(1), ElementId(2)]);
        assert_eq!(
            validate(&index, map.len(), |id| map.get(&id)),
            Err(StructureError::UnbalancedGroups { position: 1 })
        );
    }

    #[test]
    fn unclosed_group_fails_validation() {
        use ElementKind::*;
        let (index, map) = elements(&[(1, Group), (2, Pixel)]);
        assert_eq!(
            validate(&index, map.len(), |id| map.get(&id)),
            Err(StructureError::UnbalancedGroups { position: 2 })
        );
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        use ElementKind::*;
        let (_, map) = elements(&[(1, Pixel), (2, Pixel)]);
        let index = vec![ElementId(1), ElementId(1)];
        assert_eq!(
            validate(&index, map.len(), |id| map.get(&id)),
            Err(StructureError::DuplicateId(ElementId(1)))
        );
    }
}
