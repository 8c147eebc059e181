//! `ElementStructure`: the immutable flat-index + element-map model and its
//! derived tree queries.
//!
//! The flat `index` is stored in display order (frontmost first). Host item
//! indices are 1-based and count from the bottom of that order. The tree is
//! derived lazily on first hierarchical query and shared between versions
//! whose `index` did not change. Every other derived query is memoized in a
//! cache owned by the structure value, so a new version always starts cold.

use crate::descriptor::SceneSnapshot;
use crate::error::{SnapshotError, StructureError};
use crate::id::ElementId;
use crate::model::{Bounds, Element, ElementKind};
use crate::tree::{self, SceneTree, StructureNode};
use im::{HashMap as ImHashMap, Vector};
use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

// ─── Query cache ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ListQuery {
    Children,
    Siblings,
    Ancestors,
    StrictAncestors,
    LockedAncestors,
    Descendants,
    StrictDescendants,
    LockedDescendants,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FlagQuery {
    CollapsedAncestor,
    LockedAncestor,
    LockedDescendant,
    SelectedAncestor,
    StrictSelectedAncestor,
    InvisibleAncestor,
    VisibleDescendant,
    EmptyGroup,
}

/// Per-version memo table. Borrows are never held across a computation, so
/// recursive queries may re-enter freely.
#[derive(Default)]
struct QueryCache {
    lists: RefCell<HashMap<(ListQuery, ElementId), Rc<[ElementId]>>>,
    flags: RefCell<HashMap<(FlagQuery, ElementId), bool>>,
    bounds: RefCell<HashMap<ElementId, Option<Bounds>>>,
    max_depths: RefCell<HashMap<ElementId, Option<usize>>>,
}

// ─── Structure ───────────────────────────────────────────────────────────

/// Immutable layer / scene-tree structure of one document or 3-D layer.
pub struct ElementStructure {
    owner_id: u32,
    index: Vector<ElementId>,
    elements: ImHashMap<ElementId, Element>,
    version: u64,
    tree: Rc<OnceCell<SceneTree>>,
    cache: QueryCache,
}

impl PartialEq for ElementStructure {
    fn eq(&self, other: &Self) -> bool {
        self.owner_id == other.owner_id
            && self.index == other.index
            && self.elements == other.elements
    }
}

impl fmt::Debug for ElementStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementStructure")
            .field("owner_id", &self.owner_id)
            .field("version", &self.version)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl ElementStructure {
    /// An empty structure for `owner_id`.
    pub fn empty(owner_id: u32) -> Self {
        Self::assemble(owner_id, Vector::new(), ImHashMap::new(), Rc::default())
    }

    /// Build from elements already in bracketed display order.
    pub fn new(
        owner_id: u32,
        elements: impl IntoIterator<Item = Element>,
    ) -> Result<Self, StructureError> {
        let mut index = Vector::new();
        let mut map = ImHashMap::new();
        for element in elements {
            index.push_back(element.id);
            map.insert(element.id, element);
        }
        Self::from_parts(owner_id, index, map)
    }

    /// Build from a host snapshot, synthesizing group-end markers.
    pub fn from_snapshot(snapshot: &SceneSnapshot) -> Result<Self, SnapshotError> {
        let elements = snapshot.elements()?;
        let count = elements.len();
        Self::new(snapshot.owner_id, elements).map_err(|e| match e {
            StructureError::DuplicateId(id) => SnapshotError::DuplicateId(id),
            StructureError::UnbalancedGroups { position } => SnapshotError::Unbalanced { position },
            _ => SnapshotError::Unbalanced { position: count },
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Self::from_snapshot(&SceneSnapshot::from_json(json)?)
    }

    pub(crate) fn from_parts(
        owner_id: u32,
        index: Vector<ElementId>,
        elements: ImHashMap<ElementId, Element>,
    ) -> Result<Self, StructureError> {
        tree::validate(&index, elements.len(), |id| elements.get(&id))?;
        Ok(Self::assemble(owner_id, index, elements, Rc::default()))
    }

    fn assemble(
        owner_id: u32,
        index: Vector<ElementId>,
        elements: ImHashMap<ElementId, Element>,
        tree: Rc<OnceCell<SceneTree>>,
    ) -> Self {
        Self {
            owner_id,
            index,
            elements,
            version: next_version(),
            tree,
            cache: QueryCache::default(),
        }
    }

    /// New version with a changed element map and the same index; the
    /// derived tree is carried over.
    pub(crate) fn with_elements(&self, elements: ImHashMap<ElementId, Element>) -> Self {
        Self::assemble(
            self.owner_id,
            self.index.clone(),
            elements,
            Rc::clone(&self.tree),
        )
    }

    /// New version with a changed index, validated.
    pub(crate) fn with_index(
        &self,
        index: Vector<ElementId>,
        elements: ImHashMap<ElementId, Element>,
    ) -> Result<Self, StructureError> {
        Self::from_parts(self.owner_id, index, elements)
    }

    // ─── Raw access ──────────────────────────────────────────────────────

    pub fn owner_id(&self) -> u32 {
        self.owner_id
    }

    /// Monotonic identity of this value; every mutator produces a new one.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn index(&self) -> &Vector<ElementId> {
        &self.index
    }

    pub fn elements(&self) -> &ImHashMap<ElementId, Element> {
        &self.elements
    }

    /// Number of entries in the flat index, group-end markers included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Derived tree, built on first use.
    pub fn tree(&self) -> &SceneTree {
        self.tree.get_or_init(|| {
            log::trace!("structure v{}: deriving tree", self.version);
            SceneTree::from_elements(&self.index, |id| self.elements.get(&id))
        })
    }

    /// True if `other` shares this value's derived tree.
    pub fn shares_tree_with(&self, other: &ElementStructure) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }

    pub fn roots(&self) -> &[ElementId] {
        self.tree().roots()
    }

    pub fn node(&self, id: ElementId) -> Option<&StructureNode> {
        self.tree().node(id)
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn by_id(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// 0-based position in display order.
    pub fn position_of(&self, id: ElementId) -> Option<usize> {
        self.index.index_of(&id)
    }

    /// 1-based host item index (counted from the bottom).
    pub fn item_index_of(&self, id: ElementId) -> Option<usize> {
        self.position_of(id).map(|pos| self.index.len() - pos)
    }

    pub fn by_item_index(&self, item_index: usize) -> Option<&Element> {
        if item_index == 0 || item_index > self.index.len() {
            return None;
        }
        let id = self.index.get(self.index.len() - item_index)?;
        self.by_id(*id)
    }

    fn elements_of<'a>(&'a self, ids: &'a [ElementId]) -> impl Iterator<Item = &'a Element> {
        ids.iter().filter_map(|id| self.by_id(*id))
    }

    // ─── Whole-structure views ───────────────────────────────────────────

    /// All elements in display order, group-end markers included.
    pub fn all(&self) -> impl Iterator<Item = &Element> + '_ {
        self.index.iter().filter_map(|id| self.elements.get(id))
    }

    /// All elements except group-end markers.
    pub fn all_visible(&self) -> Vec<&Element> {
        self.all().filter(|e| !e.is_group_end()).collect()
    }

    /// Number of real (non-marker) elements.
    pub fn count(&self) -> usize {
        self.all().filter(|e| !e.is_group_end()).count()
    }

    /// Top-level elements.
    pub fn top(&self) -> Vec<&Element> {
        self.top_ids()
            .into_iter()
            .filter_map(|id| self.by_id(id))
            .collect()
    }

    fn top_ids(&self) -> Vec<ElementId> {
        self.roots()
            .iter()
            .copied()
            .filter(|id| self.by_id(*id).is_some_and(|e| !e.is_group_end()))
            .collect()
    }

    pub fn has_artboard(&self) -> bool {
        self.top().iter().any(|e| e.is_artboard)
    }

    /// Some element carries features the editor cannot represent.
    pub fn unsupported(&self) -> bool {
        self.all().any(|e| e.unsupported)
    }

    pub fn has_linked_smart_objects(&self) -> bool {
        self.all().any(|e| e.is_linked)
    }

    /// Top-level elements with each artboard replaced by its members, the
    /// artboards themselves moved after everything else.
    pub fn top_below_artboards(&self) -> Vec<&Element> {
        let mut out: Vec<&Element> = Vec::new();
        for element in self.top() {
            if element.is_artboard {
                let members = self.children(element.id);
                out.extend(members.iter().filter_map(|id| self.by_id(*id)));
            }
            out.push(element);
        }
        out.sort_by_key(|e| e.is_artboard);
        out
    }

    /// Elements a canvas click may pick directly. Starts from
    /// `top_below_artboards`; every ancestor of a selected element is
    /// entered, i.e. swapped for its members. Hidden, locked, empty and
    /// non-super-selectable elements are dropped.
    pub fn selectable(&self) -> Vec<&Element> {
        let mut candidates: Vec<ElementId> =
            self.top_below_artboards().iter().map(|e| e.id).collect();
        let mut entered = HashSet::new();

        for layer in self.selected() {
            let mut ancestor = self.parent(layer.id).map(|p| p.id);
            while let Some(parent) = ancestor.filter(|p| !entered.contains(p)) {
                entered.insert(parent);
                candidates.retain(|id| *id != parent);
                candidates.extend(self.children(parent).iter().copied());
                ancestor = self.parent(parent).map(|p| p.id);
            }
        }

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|id| seen.insert(*id) && !entered.contains(id))
            .filter_map(|id| self.by_id(id))
            .filter(|e| {
                e.super_selectable
                    && self.has_visible_descendant(e.id)
                    && !self.has_invisible_ancestor(e.id)
                    && !self.has_locked_ancestor(e.id)
            })
            .collect()
    }

    pub fn selected(&self) -> Vec<&Element> {
        self.all().filter(|e| e.selected).collect()
    }

    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.all().filter(|e| e.selected).map(|e| e.id).collect()
    }

    /// Selected elements without any selected strict ancestor.
    pub fn selected_normalized(&self) -> Vec<&Element> {
        let selected: HashSet<ElementId> = self.selected_ids().into_iter().collect();
        self.selected()
            .into_iter()
            .filter(|e| {
                !self
                    .strict_ancestors(e.id)
                    .iter()
                    .any(|a| selected.contains(a))
            })
            .collect()
    }

    /// Every selected element plus all of its descendants, in order,
    /// without duplicates.
    pub fn all_selected(&self) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for element in self.selected() {
            for &id in self.descendants(element.id).iter() {
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        out
    }

    pub fn selected_child_bounds(&self) -> Vec<Bounds> {
        self.selected()
            .iter()
            .filter_map(|e| self.child_bounds(e.id))
            .filter(|b| b.area() > 0.0)
            .collect()
    }

    pub fn selected_area_bounds(&self) -> Option<Bounds> {
        Bounds::union(self.selected_child_bounds())
    }

    /// Visible, unlocked, non-group elements.
    pub fn leaves(&self) -> Vec<&Element> {
        self.all()
            .filter(|e| {
                !e.is_group_end()
                    && e.kind != ElementKind::Group
                    && !e.is_parent
                    && e.visible
                    && !self.has_locked_ancestor(e.id)
            })
            .collect()
    }

    /// True when nothing is selected or a selected element is locked or the
    /// background.
    pub fn selected_locked(&self) -> bool {
        let selected = self.selected();
        selected.is_empty() || selected.iter().any(|e| e.is_background || e.locked)
    }

    /// Deleting the selection must leave at least one real layer behind.
    pub fn selected_deletable(&self) -> bool {
        let doomed: HashSet<ElementId> = self.all_selected().into_iter().collect();
        if doomed.is_empty() {
            return false;
        }
        self.all()
            .filter(|e| !doomed.contains(&e.id))
            .any(|e| !e.is_group_end() && e.kind != ElementKind::Group)
    }

    /// True when the bottom-most element is the selected background.
    pub fn background_selected(&self) -> bool {
        self.by_item_index(1)
            .is_some_and(|e| e.is_background && e.selected)
    }

    // ─── Tree queries ────────────────────────────────────────────────────

    pub fn parent(&self, id: ElementId) -> Option<&Element> {
        let parent = self.node(id)?.parent?;
        self.by_id(parent)
    }

    pub fn depth(&self, id: ElementId) -> Option<usize> {
        self.node(id).map(|n| n.depth)
    }

    fn cached_list(
        &self,
        query: ListQuery,
        id: ElementId,
        compute: impl FnOnce() -> Vec<ElementId>,
    ) -> Rc<[ElementId]> {
        if let Some(hit) = self.cache.lists.borrow().get(&(query, id)) {
            return Rc::clone(hit);
        }
        let value: Rc<[ElementId]> = compute().into();
        self.cache
            .lists
            .borrow_mut()
            .insert((query, id), Rc::clone(&value));
        value
    }

    fn cached_flag(&self, query: FlagQuery, id: ElementId, compute: impl FnOnce() -> bool) -> bool {
        if let Some(&hit) = self.cache.flags.borrow().get(&(query, id)) {
            return hit;
        }
        let value = compute();
        self.cache.flags.borrow_mut().insert((query, id), value);
        value
    }

    /// Deepest depth among `id` and its descendants, end markers included.
    pub fn max_descendant_depth(&self, id: ElementId) -> Option<usize> {
        if let Some(&hit) = self.cache.max_depths.borrow().get(&id) {
            return hit;
        }
        let value = self
            .descendants(id)
            .iter()
            .filter_map(|d| self.depth(*d))
            .max();
        self.cache.max_depths.borrow_mut().insert(id, value);
        value
    }

    /// Direct members, excluding the closing marker.
    pub fn children(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::Children, id, || {
            self.node(id)
                .map(|n| n.children.to_vec())
                .unwrap_or_default()
        })
    }

    /// Members of the same parent (the top level for roots), self included.
    pub fn siblings(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::Siblings, id, || match self.parent(id) {
            Some(parent) => self.children(parent.id).to_vec(),
            None => self.top_ids(),
        })
    }

    /// Root first, `id` last.
    pub fn ancestors(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::Ancestors, id, || {
            if !self.contains(id) {
                return Vec::new();
            }
            let mut chain = self.strict_ancestors(id).to_vec();
            chain.push(id);
            chain
        })
    }

    pub fn strict_ancestors(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::StrictAncestors, id, || match self.parent(id) {
            Some(parent) => self.ancestors(parent.id).to_vec(),
            None => Vec::new(),
        })
    }

    pub fn locked_ancestors(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::LockedAncestors, id, || {
            let ancestors = self.ancestors(id);
            self.elements_of(&ancestors)
                .filter(|e| e.locked)
                .map(|e| e.id)
                .collect()
        })
    }

    /// `id`, every nested member in display order, then the closing marker.
    pub fn descendants(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::Descendants, id, || {
            if !self.contains(id) {
                return Vec::new();
            }
            let strict = self.strict_descendants(id);
            let mut all = Vec::with_capacity(strict.len() + 1);
            all.push(id);
            all.extend_from_slice(&strict);
            all
        })
    }

    pub fn strict_descendants(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::StrictDescendants, id, || {
            let Some(node) = self.node(id) else {
                return Vec::new();
            };
            let mut all = Vec::new();
            for &child in &node.children {
                all.extend_from_slice(&self.descendants(child));
            }
            all.extend(node.group_end);
            all
        })
    }

    pub fn locked_descendants(&self, id: ElementId) -> Rc<[ElementId]> {
        self.cached_list(ListQuery::LockedDescendants, id, || {
            let descendants = self.descendants(id);
            self.elements_of(&descendants)
                .filter(|e| e.locked)
                .map(|e| e.id)
                .collect()
        })
    }

    pub fn has_collapsed_ancestor(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::CollapsedAncestor, id, || {
            let ancestors = self.strict_ancestors(id);
            self.elements_of(&ancestors).any(|e| !e.expanded)
        })
    }

    /// Includes `id` itself.
    pub fn has_locked_ancestor(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::LockedAncestor, id, || {
            !self.locked_ancestors(id).is_empty()
        })
    }

    /// Includes `id` itself.
    pub fn has_locked_descendant(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::LockedDescendant, id, || {
            !self.locked_descendants(id).is_empty()
        })
    }

    /// `id` or any ancestor is selected.
    pub fn has_selected_ancestor(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::SelectedAncestor, id, || {
            self.by_id(id).is_some_and(|e| e.selected) || self.has_strict_selected_ancestor(id)
        })
    }

    pub fn has_strict_selected_ancestor(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::StrictSelectedAncestor, id, || {
            self.parent(id)
                .is_some_and(|p| self.has_selected_ancestor(p.id))
        })
    }

    /// `id` or any ancestor is hidden.
    pub fn has_invisible_ancestor(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::InvisibleAncestor, id, || {
            let ancestors = self.ancestors(id);
            self.elements_of(&ancestors).any(|e| !e.visible)
        })
    }

    /// Some non-group element at or below `id` is visible.
    pub fn has_visible_descendant(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::VisibleDescendant, id, || {
            let descendants = self.descendants(id);
            self.elements_of(&descendants)
                .filter(|e| e.kind != ElementKind::Group && !e.is_group_end())
                .any(|e| e.visible)
        })
    }

    /// A group whose members are only adjustments or other empty groups.
    pub fn is_empty_group(&self, id: ElementId) -> bool {
        self.cached_flag(FlagQuery::EmptyGroup, id, || {
            if self.by_id(id).is_none_or(|e| e.kind != ElementKind::Group) {
                return false;
            }
            let children = self.children(id);
            self.elements_of(&children)
                .all(|e| e.kind == ElementKind::Adjustment || self.is_empty_group(e.id))
        })
    }

    /// Visual bounds: own bounds for layers and artboards, the union of
    /// non-empty member bounds for plain groups.
    pub fn child_bounds(&self, id: ElementId) -> Option<Bounds> {
        if let Some(&hit) = self.cache.bounds.borrow().get(&id) {
            return hit;
        }
        let value = self.by_id(id).and_then(|element| match element.kind {
            ElementKind::Group if !element.is_artboard => {
                let children = self.children(id);
                Bounds::union(
                    children
                        .iter()
                        .filter_map(|c| self.child_bounds(*c))
                        .filter(|b| b.area() > 0.0),
                )
            }
            ElementKind::GroupEnd => None,
            _ => element.bounds,
        });
        self.cache.bounds.borrow_mut().insert(id, value);
        value
    }
}
