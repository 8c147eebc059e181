//! Drag session state: Idle → Dragging → (Dropped | Cancelled) → Idle.

use crate::registry::Droppable;
use kurbo::Point;

/// Public view of the resolved drop target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget<T> {
    pub key: String,
    pub key_object: T,
}

/// Snapshot handed to change listeners and `DragCoordinator::state`.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState<T> {
    pub drag_targets: Option<Vec<T>>,
    pub pointer: Option<Point>,
    pub resolved_target: Option<ResolvedTarget<T>>,
    /// Targets of the session that just ended, kept for one render cycle.
    pub past_drag_targets: Option<Vec<T>>,
}

impl<T> Default for DragState<T> {
    fn default() -> Self {
        Self {
            drag_targets: None,
            pointer: None,
            resolved_target: None,
            past_drag_targets: None,
        }
    }
}

/// Live session. Owned by the coordinator.
pub struct DragSession<T> {
    drag_targets: Option<Vec<T>>,
    pointer: Option<Point>,
    resolved: Option<Droppable<T>>,
    past_drag_targets: Option<Vec<T>>,
}

impl<T> Default for DragSession<T> {
    fn default() -> Self {
        Self {
            drag_targets: None,
            pointer: None,
            resolved: None,
            past_drag_targets: None,
        }
    }
}

impl<T: Clone> DragSession<T> {
    pub fn is_dragging(&self) -> bool {
        self.drag_targets.is_some()
    }

    pub fn drag_targets(&self) -> Option<&[T]> {
        self.drag_targets.as_deref()
    }

    pub fn resolved(&self) -> Option<&Droppable<T>> {
        self.resolved.as_ref()
    }

    pub(crate) fn start(&mut self, targets: Vec<T>) {
        self.drag_targets = Some(targets);
        self.resolved = None;
    }

    pub(crate) fn moved(&mut self, pointer: Point, resolved: Option<Droppable<T>>) {
        self.pointer = Some(pointer);
        if self.is_dragging() {
            self.resolved = resolved;
        }
    }

    /// End the session: drag targets move to `past_drag_targets` and the
    /// resolved target, if any, is handed back for dropping.
    pub(crate) fn finish(&mut self) -> Option<Droppable<T>> {
        self.past_drag_targets = self.drag_targets.take();
        self.pointer = None;
        self.resolved.take()
    }

    /// Unresolve the current target when `retire` matches it. True when
    /// the target was dropped.
    pub(crate) fn forget_resolved(&mut self, retire: impl Fn(&str) -> bool) -> bool {
        match &self.resolved {
            Some(target) if retire(target.key()) => {
                self.resolved = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear_past(&mut self) {
        self.past_drag_targets = None;
    }

    pub fn state(&self) -> DragState<T> {
        DragState {
            drag_targets: self.drag_targets.clone(),
            pointer: self.pointer,
            resolved_target: self.resolved.as_ref().map(|d| ResolvedTarget {
                key: d.key().to_owned(),
                key_object: d.key_object().clone(),
            }),
            past_drag_targets: self.past_drag_targets.clone(),
        }
    }
}
