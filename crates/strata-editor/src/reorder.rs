//! Layer-panel drag reordering: which layers move, where they may land,
//! and the host command a drop produces.
//!
//! Validity of a drop is decided per target row and per half of the row
//! (above / below). Results are memoized for the session because the set
//! of dragged layers cannot change mid-drag.

use crate::commands::HostCommand;
use crate::error::ReorderError;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use strata_core::{ElementId, ElementStructure};
use strata_dnd::{DropCandidate, DropHandler, DropNode, DropPosition, Droppable, Point, Validation, Validator, locate};

/// Nesting limits enforced on drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderConfig {
    /// Deepest nesting a dropped layer tree may reach.
    pub max_nest_depth: usize,
    /// Limit that applies instead when an artboard is among the dragged.
    pub artboard_nest_depth: usize,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            max_nest_depth: 10,
            artboard_nest_depth: 1,
        }
    }
}

/// Layers a drag started on `pressed` moves: the whole selection (minus
/// the background) when `pressed` is selected, else `pressed` alone.
pub fn drag_items(structure: &ElementStructure, pressed: ElementId) -> Vec<ElementId> {
    match structure.by_id(pressed) {
        Some(layer) if layer.selected => structure
            .selected()
            .into_iter()
            .filter(|e| !e.is_background)
            .map(|e| e.id)
            .collect(),
        Some(_) => vec![pressed],
        None => Vec::new(),
    }
}

/// Host item index the dragged layers move to when dropped on `target`.
pub fn drop_item_index(
    structure: &ElementStructure,
    target: ElementId,
    position: DropPosition,
) -> Option<usize> {
    let item = structure.item_index_of(target)?;
    match position {
        DropPosition::Above => Some(item),
        DropPosition::Below => item.checked_sub(1),
    }
}

/// Last drop that passed validation in the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDrop {
    pub target: ElementId,
    pub position: DropPosition,
    pub dragged: Vec<ElementId>,
}

/// Validity predicate shared by every row of one layers panel.
pub struct LayerDropValidator {
    config: ReorderConfig,
    structure: RefCell<Rc<ElementStructure>>,
    above: RefCell<HashMap<ElementId, bool>>,
    below: RefCell<HashMap<ElementId, bool>>,
    pending: RefCell<Option<PendingDrop>>,
    checks: Cell<usize>,
}

impl LayerDropValidator {
    pub fn new(config: ReorderConfig, structure: Rc<ElementStructure>) -> Self {
        Self {
            config,
            structure: RefCell::new(structure),
            above: RefCell::default(),
            below: RefCell::default(),
            pending: RefCell::default(),
            checks: Cell::new(0),
        }
    }

    pub fn config(&self) -> ReorderConfig {
        self.config
    }

    pub fn structure(&self) -> Rc<ElementStructure> {
        Rc::clone(&self.structure.borrow())
    }

    /// Swap in a new document version. Memoized results are dropped.
    pub fn set_structure(&self, structure: Rc<ElementStructure>) {
        *self.structure.borrow_mut() = structure;
        self.clear_cache();
    }

    /// Reset per-session state. Call when a drag starts.
    pub fn begin_session(&self) {
        self.clear_cache();
        self.pending.replace(None);
    }

    fn clear_cache(&self) {
        self.above.borrow_mut().clear();
        self.below.borrow_mut().clear();
    }

    pub fn pending(&self) -> Option<PendingDrop> {
        self.pending.borrow().clone()
    }

    /// Uncached evaluations so far.
    pub fn evaluations(&self) -> usize {
        self.checks.get()
    }

    /// Whether `dragged` may land on the `position` half of `target`.
    pub fn check(&self, target: ElementId, dragged: &[ElementId], position: DropPosition) -> bool {
        let cache = match position {
            DropPosition::Above => &self.above,
            DropPosition::Below => &self.below,
        };
        if let Some(&hit) = cache.borrow().get(&target) {
            return hit;
        }
        let valid = self.evaluate(target, dragged, position);
        cache.borrow_mut().insert(target, valid);
        valid
    }

    fn evaluate(&self, target: ElementId, dragged: &[ElementId], position: DropPosition) -> bool {
        self.checks.set(self.checks.get() + 1);
        let structure = self.structure();
        let Some(target_layer) = structure.by_id(target) else {
            return false;
        };
        let above = position == DropPosition::Above;

        // Nothing goes under the background.
        if target_layer.is_background && !above {
            return false;
        }

        let Some(target_depth) = structure.depth(target) else {
            return false;
        };
        let dragging_artboard = dragged
            .iter()
            .filter_map(|id| structure.by_id(*id))
            .any(|e| e.is_artboard);
        let limit = if dragging_artboard {
            self.config.artboard_nest_depth
        } else {
            self.config.max_nest_depth
        };
        let too_deep = dragged.iter().any(|&id| {
            let depth = structure.depth(id).unwrap_or(0);
            let tree_depth = structure.max_descendant_depth(id).unwrap_or(depth) - depth;
            tree_depth + target_depth + usize::from(!above) > limit
        });
        if too_deep {
            log::trace!("drop on {target} exceeds nesting limit {limit}");
            return false;
        }

        let target_item = structure.item_index_of(target);
        let mut queue: VecDeque<ElementId> = dragged.iter().copied().collect();
        let mut seen = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if id == target {
                return false;
            }
            // A group dropped above the row right under its own end marker
            // lands where it already is.
            if above
                && structure.by_id(id).is_some_and(|e| e.is_group_end())
                && structure
                    .item_index_of(id)
                    .zip(target_item)
                    .is_some_and(|(item, target_item)| item == target_item + 1)
            {
                return false;
            }
            queue.extend(structure.children(id).iter().copied());
            if let Some(end) = structure.node(id).and_then(|n| n.group_end) {
                queue.push_back(end);
            }
        }
        true
    }

    /// Full predicate for a droppable row: geometry first, then `check`.
    pub fn validate(
        &self,
        candidate: &DropCandidate<'_, ElementId>,
        dragged: &[ElementId],
        point: Point,
    ) -> Validation {
        let Some(position) = locate(candidate.bounds, point) else {
            return Validation::INCOMPATIBLE;
        };
        let target = *candidate.key_object;
        if !self.check(target, dragged, position) {
            return Validation::reject();
        }
        self.pending.replace(Some(PendingDrop {
            target,
            position,
            dragged: dragged.to_vec(),
        }));
        Validation::accept()
    }

    /// Reorder request for a drop on `target`, from the last validated
    /// position of this session.
    pub fn reorder_command(&self, target: ElementId) -> Result<HostCommand, ReorderError> {
        let pending = self
            .pending
            .borrow()
            .clone()
            .filter(|p| p.target == target)
            .ok_or(ReorderError::NoPendingDrop)?;
        let structure = self.structure();
        let index = drop_item_index(&structure, target, pending.position)
            .ok_or(ReorderError::TargetGone(target))?;
        Ok(HostCommand::Reorder {
            document: structure.owner_id(),
            ids: pending.dragged,
            index,
        })
    }

    /// Droppable for one layer row. `on_drop` receives the target layer.
    pub fn droppable<N: DropNode + 'static>(
        self: &Rc<Self>,
        node: &Rc<N>,
        layer: ElementId,
        on_drop: DropHandler<ElementId>,
    ) -> Droppable<ElementId> {
        let validator = Rc::clone(self);
        let is_valid: Validator<ElementId> = Rc::new(
            move |candidate: &DropCandidate<'_, ElementId>, dragged: &[ElementId], point: Point| {
                validator.validate(candidate, dragged, point)
            },
        );
        let node: Rc<dyn DropNode> = Rc::clone(node) as Rc<dyn DropNode>;
        Droppable::from_parts(
            layer_key(layer),
            Rc::downgrade(&node),
            layer,
            is_valid,
            on_drop,
        )
    }
}

/// Drop-target key of a layer row.
pub fn layer_key(layer: ElementId) -> String {
    format!("layer-{}", layer.0)
}
