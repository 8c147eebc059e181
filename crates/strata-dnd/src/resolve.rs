//! Bounds resolution: point → drop target lookup.
//!
//! Walks a zone's droppables in scan order and picks the first one that is
//! both compatible and valid for the current payload. The match moves to
//! the front of the zone, so a pointer lingering over the same target hits
//! it on the first lookup of the next move.

use crate::registry::Droppable;
use kurbo::{Point, Rect};
use std::collections::{HashMap, VecDeque};

/// Which half of a target the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropPosition {
    Above,
    Below,
}

/// Geometric sub-check shared by validity predicates.
///
/// Returns `None` when `point` lies outside `bounds` (edges count as
/// inside), otherwise whether it is over the upper or lower half.
pub fn locate(bounds: Rect, point: Point) -> Option<DropPosition> {
    if point.x < bounds.x0 || point.x > bounds.x1 || point.y < bounds.y0 || point.y > bounds.y1 {
        return None;
    }
    if bounds.height() / 2.0 < bounds.y1 - point.y {
        Some(DropPosition::Above)
    } else {
        Some(DropPosition::Below)
    }
}

/// Per-session geometry cache plus the move-to-front scan.
#[derive(Debug, Default)]
pub struct BoundsResolver {
    geometry: HashMap<String, Option<Rect>>,
}

impl BoundsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all cached geometry (session start/stop, scroll, zone switch).
    pub fn clear(&mut self) {
        self.geometry.clear();
    }

    /// Forget one target's geometry, e.g. after it was re-registered.
    pub fn forget(&mut self, key: &str) {
        self.geometry.remove(key);
    }

    pub fn cached(&self, key: &str) -> Option<Rect> {
        self.geometry.get(key).copied().flatten()
    }

    fn bounds_of<T>(&mut self, droppable: &Droppable<T>) -> Option<Rect> {
        if let Some(&hit) = self.geometry.get(droppable.key()) {
            return hit;
        }
        let bounds = droppable.node_bounds();
        self.geometry.insert(droppable.key().to_owned(), bounds);
        bounds
    }

    /// Resolve the drop target for `point` and move it to the front of
    /// `targets`. Targets whose node is gone count as incompatible.
    pub fn resolve<T: Clone>(
        &mut self,
        targets: &mut VecDeque<Droppable<T>>,
        drag_targets: &[T],
        point: Point,
    ) -> Option<Droppable<T>> {
        let found = targets.iter().position(|droppable| {
            self.bounds_of(droppable)
                .is_some_and(|bounds| droppable.validate(bounds, drag_targets, point).is_match())
        })?;

        if found > 0 {
            let matched = targets.remove(found)?;
            targets.push_front(matched);
        }
        log::trace!("resolved drop target at scan position {found}");
        targets.front().cloned()
    }
}
