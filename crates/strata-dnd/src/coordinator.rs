//! `DragCoordinator`: owns the registry, resolver and session, and drives
//! the session lifecycle.
//!
//! All registry writes go through the coordinator. Views observe changes
//! through `subscribe` instead of reading the registry.

use crate::error::{DragError, RegistryError};
use crate::registry::{DropTargetRegistry, Droppable};
use crate::resolve::BoundsResolver;
use crate::session::{DragSession, DragState};
use kurbo::Point;
use std::fmt;
use std::hash::Hash;

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome<T> {
    /// The resolved target's handler ran with its key object.
    Dropped { key: String, key_object: T },
    /// No target was resolved; no handler ran.
    Cancelled,
    /// `stop_drag` without an active session.
    NotDragging,
}

/// Handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn Fn(&DragState<T>)>;

pub struct DragCoordinator<Z, T> {
    registry: DropTargetRegistry<Z, T>,
    resolver: BoundsResolver,
    session: DragSession<T>,
    active_zone: Option<Z>,
    listeners: Vec<(ListenerId, Listener<T>)>,
    next_listener: u64,
}

impl<Z, T> Default for DragCoordinator<Z, T> {
    fn default() -> Self {
        Self {
            registry: DropTargetRegistry::default(),
            resolver: BoundsResolver::default(),
            session: DragSession::default(),
            active_zone: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

impl<Z, T> DragCoordinator<Z, T>
where
    Z: Clone + Eq + Hash + fmt::Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DropTargetRegistry<Z, T> {
        &self.registry
    }

    pub fn session(&self) -> &DragSession<T> {
        &self.session
    }

    pub fn state(&self) -> DragState<T> {
        self.session.state()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_dragging()
    }

    // ─── Registration ────────────────────────────────────────────────────

    pub fn register(&mut self, zone: Z, droppable: Droppable<T>) {
        self.resolver.forget(droppable.key());
        self.registry.register(zone, droppable);
    }

    pub fn batch_register(&mut self, zone: Z, droppables: Vec<Droppable<T>>) {
        for droppable in &droppables {
            self.resolver.forget(droppable.key());
        }
        self.registry.batch_register(zone, droppables);
    }

    pub fn deregister(&mut self, zone: &Z, key: &str) -> Result<(), RegistryError> {
        self.resolver.forget(key);
        self.retire_resolved(zone, |resolved| resolved == key);
        self.registry.deregister(zone, key)
    }

    pub fn batch_deregister(&mut self, zone: &Z, keys: &[&str]) -> Result<(), RegistryError> {
        for key in keys {
            self.resolver.forget(key);
        }
        self.retire_resolved(zone, |resolved| keys.contains(&resolved));
        self.registry.batch_deregister(zone, keys.iter().copied())
    }

    /// Replace every droppable of `zone`. A target resolved there is
    /// unresolved until the next pointer move.
    pub fn reset(&mut self, zone: Z, droppables: Vec<Droppable<T>>) {
        if self.active_zone.as_ref() == Some(&zone) {
            self.resolver.clear();
        }
        self.retire_resolved(&zone, |_| true);
        self.registry.reset(zone, droppables);
    }

    /// A removed droppable must not receive the drop.
    fn retire_resolved(&mut self, zone: &Z, retire: impl Fn(&str) -> bool) {
        if self.active_zone.as_ref() == Some(zone) && self.session.forget_resolved(retire) {
            log::debug!("resolved target in {zone:?} removed mid-drag");
            self.notify();
        }
    }

    /// Drop cached geometry, e.g. after the target list scrolled.
    pub fn invalidate_geometry(&mut self) {
        self.resolver.clear();
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Idle → Dragging.
    pub fn start_drag(&mut self, drag_targets: Vec<T>) {
        log::debug!("drag start: {} targets", drag_targets.len());
        self.resolver.clear();
        self.active_zone = None;
        self.session.start(drag_targets);
        self.notify();
    }

    /// Record the pointer and re-resolve the drop target in `zone`.
    pub fn update_drag(&mut self, zone: &Z, point: Point) {
        let resolved = match self.session.drag_targets() {
            Some(drag_targets) => {
                if self.active_zone.as_ref() != Some(zone) {
                    self.resolver.clear();
                    self.active_zone = Some(zone.clone());
                }
                match self.registry.zone_mut(zone) {
                    Some(targets) => self.resolver.resolve(targets, drag_targets, point),
                    None => {
                        log::trace!("drag over unregistered zone {zone:?}");
                        None
                    }
                }
            }
            None => None,
        };
        self.session.moved(point, resolved);
        self.notify();
    }

    /// Dragging → Dropped or Cancelled.
    ///
    /// Session state is cleared before the drop handler runs, so a failing
    /// handler still leaves the coordinator idle. Its error is returned.
    pub fn stop_drag(&mut self) -> Result<DropOutcome<T>, DragError> {
        if !self.session.is_dragging() {
            self.session.clear_past();
            self.notify();
            return Ok(DropOutcome::NotDragging);
        }

        let resolved = self.end_session();
        let outcome = match resolved {
            Some(target) => {
                let key = target.key().to_owned();
                log::debug!("drop on `{key}`");
                let result = target.drop_on();
                self.notify();
                result.map_err(|source| DragError::Handler {
                    key: key.clone(),
                    source,
                })?;
                DropOutcome::Dropped {
                    key,
                    key_object: target.key_object().clone(),
                }
            }
            None => {
                log::debug!("drag cancelled");
                self.notify();
                DropOutcome::Cancelled
            }
        };
        Ok(outcome)
    }

    /// Abandon any active session without dropping, e.g. when the owning
    /// view goes away mid-drag.
    pub fn teardown(&mut self) {
        if self.session.is_dragging() {
            log::debug!("drag torn down");
            self.end_session();
            self.notify();
        }
    }

    /// The view has rendered the post-drop state; forget the past targets.
    pub fn render_complete(&mut self) {
        if self.session.state().past_drag_targets.is_some() {
            self.session.clear_past();
            self.notify();
        }
    }

    fn end_session(&mut self) -> Option<Droppable<T>> {
        self.resolver.clear();
        self.active_zone = None;
        self.session.finish()
    }

    // ─── Change notification ─────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl Fn(&DragState<T>) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let state = self.session.state();
        for (_, listener) in &self.listeners {
            listener(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Validation;
    use kurbo::Rect;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn always(key: &str, node: &Rc<Rect>, object: &'static str) -> Droppable<&'static str> {
        Droppable::new(key, node, object, |_, _, _| Validation::accept(), |_| Ok(()))
    }

    #[test]
    fn move_without_session_only_records_pointer() {
        let node = Rc::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut dnd = DragCoordinator::new();
        dnd.register(1, always("a", &node, "A"));

        dnd.update_drag(&1, Point::new(1.0, 1.0));
        let state = dnd.state();
        assert_eq!(state.pointer, Some(Point::new(1.0, 1.0)));
        assert_eq!(state.resolved_target, None);
    }

    #[test]
    fn listeners_see_every_transition() {
        let node = Rc::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut dnd = DragCoordinator::new();
        dnd.register(1, always("a", &node, "A"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = dnd.subscribe(move |state: &DragState<&'static str>| {
            sink.borrow_mut().push(state.resolved_target.as_ref().map(|t| t.key.clone()));
        });

        dnd.start_drag(vec!["X"]);
        dnd.update_drag(&1, Point::new(5.0, 5.0));
        dnd.stop_drag().unwrap();
        assert!(dnd.unsubscribe(id));
        dnd.render_complete();

        assert_eq!(
            *seen.borrow(),
            vec![None, Some("a".to_string()), None]
        );
    }

    #[test]
    fn removed_target_is_not_dropped_on() {
        let node = Rc::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let dropped = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&dropped);
        let mut dnd = DragCoordinator::new();
        dnd.register(
            1,
            Droppable::new("a", &node, "A", |_, _, _| Validation::accept(), move |_| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
        );
        dnd.register(1, always("b", &node, "B"));

        dnd.start_drag(vec!["X"]);
        dnd.update_drag(&1, Point::new(5.0, 5.0));
        assert_eq!(dnd.state().resolved_target.map(|t| t.key), Some("a".to_string()));

        // Another zone's key of the same name leaves the resolution alone.
        dnd.register(2, always("a", &node, "other"));
        dnd.deregister(&2, "a").unwrap();
        assert!(dnd.state().resolved_target.is_some());

        dnd.deregister(&1, "a").unwrap();
        assert_eq!(dnd.state().resolved_target, None);
        assert_eq!(dnd.stop_drag().unwrap(), DropOutcome::Cancelled);
        assert_eq!(*dropped.borrow(), 0);
    }

    #[test]
    fn reset_zone_unresolves_until_next_move() {
        let node = Rc::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut dnd = DragCoordinator::new();
        dnd.register(1, always("a", &node, "A"));

        dnd.start_drag(vec!["X"]);
        dnd.update_drag(&1, Point::new(5.0, 5.0));
        dnd.reset(1, vec![always("b", &node, "B")]);
        assert_eq!(dnd.state().resolved_target, None);

        dnd.update_drag(&1, Point::new(5.0, 5.0));
        assert_eq!(
            dnd.stop_drag().unwrap(),
            DropOutcome::Dropped {
                key: "b".into(),
                key_object: "B",
            }
        );
    }

    #[test]
    fn teardown_cancels_without_dropping() {
        let node = Rc::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let dropped = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&dropped);
        let mut dnd = DragCoordinator::new();
        dnd.register(
            1,
            Droppable::new("a", &node, "A", |_, _, _| Validation::accept(), move |_| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
        );

        dnd.start_drag(vec!["X"]);
        dnd.update_drag(&1, Point::new(5.0, 5.0));
        dnd.teardown();

        assert_eq!(*dropped.borrow(), 0);
        assert!(!dnd.is_dragging());
        assert_eq!(dnd.state().past_drag_targets, Some(vec!["X"]));
    }
}
