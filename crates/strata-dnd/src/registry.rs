//! Drop-target registry: per-zone ordered droppables.
//!
//! Scan order matters: the resolver walks a zone front to back and moves
//! each match to the front, so the registry keeps a `VecDeque` per zone.

use crate::error::{HandlerError, RegistryError};
use kurbo::{Point, Rect};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

/// A surface that can report its current on-screen bounds.
pub trait DropNode {
    /// `None` once the surface is gone or has no layout.
    fn bounds(&self) -> Option<Rect>;
}

impl DropNode for Rect {
    fn bounds(&self) -> Option<Rect> {
        Some(*self)
    }
}

impl DropNode for std::cell::Cell<Rect> {
    fn bounds(&self) -> Option<Rect> {
        Some(self.get())
    }
}

/// Result of asking a droppable whether it accepts the current payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Validation {
    /// This kind of target could ever accept this kind of payload.
    pub compatible: bool,
    /// Given the current pointer position, accept now.
    pub valid: bool,
}

impl Validation {
    pub const INCOMPATIBLE: Validation = Validation {
        compatible: false,
        valid: false,
    };

    pub const fn accept() -> Self {
        Validation {
            compatible: true,
            valid: true,
        }
    }

    pub const fn reject() -> Self {
        Validation {
            compatible: true,
            valid: false,
        }
    }

    pub const fn is_match(self) -> bool {
        self.compatible && self.valid
    }
}

/// What a validity predicate sees of the droppable it is asked about.
#[derive(Debug)]
pub struct DropCandidate<'a, T> {
    pub key: &'a str,
    pub key_object: &'a T,
    /// Bounds from the session's geometry cache.
    pub bounds: Rect,
}

pub type Validator<T> = Rc<dyn Fn(&DropCandidate<'_, T>, &[T], Point) -> Validation>;
pub type DropHandler<T> = Rc<dyn Fn(&T) -> Result<(), HandlerError>>;

/// One registered drop target. Holds its node weakly; the registry never
/// owns the surface it describes.
pub struct Droppable<T> {
    key: String,
    node: Weak<dyn DropNode>,
    key_object: T,
    is_valid: Validator<T>,
    on_drop: DropHandler<T>,
}

impl<T> Droppable<T> {
    pub fn new<N, V, D>(key: impl Into<String>, node: &Rc<N>, key_object: T, is_valid: V, on_drop: D) -> Self
    where
        N: DropNode + 'static,
        V: Fn(&DropCandidate<'_, T>, &[T], Point) -> Validation + 'static,
        D: Fn(&T) -> Result<(), HandlerError> + 'static,
    {
        let node: Weak<dyn DropNode> = Rc::downgrade(node) as Weak<dyn DropNode>;
        Self::from_parts(key, node, key_object, Rc::new(is_valid), Rc::new(on_drop))
    }

    /// Build from shared predicate and handler, e.g. one validator reused by
    /// every row of a list.
    pub fn from_parts(
        key: impl Into<String>,
        node: Weak<dyn DropNode>,
        key_object: T,
        is_valid: Validator<T>,
        on_drop: DropHandler<T>,
    ) -> Self {
        Self {
            key: key.into(),
            node,
            key_object,
            is_valid,
            on_drop,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn key_object(&self) -> &T {
        &self.key_object
    }

    /// Live bounds of the node, if it still exists.
    pub fn node_bounds(&self) -> Option<Rect> {
        self.node.upgrade()?.bounds()
    }

    pub fn validate(&self, bounds: Rect, drag_targets: &[T], point: Point) -> Validation {
        let candidate = DropCandidate {
            key: &self.key,
            key_object: &self.key_object,
            bounds,
        };
        (self.is_valid)(&candidate, drag_targets, point)
    }

    pub fn drop_on(&self) -> Result<(), HandlerError> {
        (self.on_drop)(&self.key_object)
    }
}

impl<T: Clone> Clone for Droppable<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            node: Weak::clone(&self.node),
            key_object: self.key_object.clone(),
            is_valid: Rc::clone(&self.is_valid),
            on_drop: Rc::clone(&self.on_drop),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Droppable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Droppable")
            .field("key", &self.key)
            .field("key_object", &self.key_object)
            .field("alive", &(self.node.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// All drop targets, partitioned by zone.
pub struct DropTargetRegistry<Z, T> {
    zones: HashMap<Z, VecDeque<Droppable<T>>>,
}

impl<Z, T> Default for DropTargetRegistry<Z, T> {
    fn default() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }
}

impl<Z: Eq + Hash + fmt::Debug, T> DropTargetRegistry<Z, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a droppable, replacing any with the same key in place.
    pub fn register(&mut self, zone: Z, droppable: Droppable<T>) {
        let targets = self.zones.entry(zone).or_default();
        match targets.iter_mut().find(|d| d.key == droppable.key) {
            Some(existing) => *existing = droppable,
            None => targets.push_back(droppable),
        }
    }

    pub fn batch_register(&mut self, zone: Z, droppables: impl IntoIterator<Item = Droppable<T>>) {
        let targets = self.zones.entry(zone).or_default();
        for droppable in droppables {
            match targets.iter_mut().find(|d| d.key == droppable.key) {
                Some(existing) => *existing = droppable,
                None => targets.push_back(droppable),
            }
        }
    }

    /// Remove one droppable. Unknown keys are ignored; an unknown zone is
    /// an error.
    pub fn deregister(&mut self, zone: &Z, key: &str) -> Result<(), RegistryError> {
        self.batch_deregister(zone, [key])
    }

    pub fn batch_deregister<'k>(
        &mut self,
        zone: &Z,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> Result<(), RegistryError> {
        let targets = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| RegistryError::EmptyZone(format!("{zone:?}")))?;
        for key in keys {
            targets.retain(|d| d.key != key);
        }
        Ok(())
    }

    /// Replace a zone's droppables wholesale.
    pub fn reset(&mut self, zone: Z, droppables: impl IntoIterator<Item = Droppable<T>>) {
        self.zones.remove(&zone);
        self.batch_register(zone, droppables);
    }

    /// Droppables of `zone` in scan order.
    pub fn zone(&self, zone: &Z) -> impl Iterator<Item = &Droppable<T>> {
        self.zones.get(zone).into_iter().flatten()
    }

    pub fn keys(&self, zone: &Z) -> Vec<&str> {
        self.zone(zone).map(|d| d.key()).collect()
    }

    pub fn len(&self, zone: &Z) -> usize {
        self.zones.get(zone).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, zone: &Z) -> bool {
        self.len(zone) == 0
    }

    pub(crate) fn zone_mut(&mut self, zone: &Z) -> Option<&mut VecDeque<Droppable<T>>> {
        self.zones.get_mut(zone)
    }
}
