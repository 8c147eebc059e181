//! Input abstraction layer.
//!
//! Normalizes pointer events into a unified `InputEvent` enum, and turns
//! press/move/release sequences on a draggable into coordinator calls.

use crate::coordinator::{DragCoordinator, DropOutcome};
use crate::error::DragError;
use kurbo::Point;
use std::fmt;
use std::hash::Hash;

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pencil contact).
    PointerDown { x: f64, y: f64 },

    /// Pointer moved (mouse move, touch move, pencil move).
    PointerMove { x: f64, y: f64 },

    /// Pointer released. `outside_window` is set when the release was
    /// observed on the window after the pointer left it.
    PointerUp { x: f64, y: f64, outside_window: bool },

    /// Click synthesized by the host after a press/release pair.
    Click { x: f64, y: f64 },

    /// The host lost the pointer (blur, capture lost, view unmounted).
    Cancel,
}

impl InputEvent {
    pub fn from_pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn from_pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn from_pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            outside_window: false,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y, .. }
            | Self::Click { x, y } => Some(Point::new(*x, *y)),
            Self::Cancel => None,
        }
    }
}

/// Gesture tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConfig {
    /// Distance in pixels the pointer travels from the press point before
    /// a drag starts.
    pub threshold: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self { threshold: 3.0 }
    }
}

/// What one event did.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome<T> {
    /// Nothing changed for the drag session.
    Idle,
    /// The threshold was crossed and a session started.
    Started,
    /// The pointer moved during a session.
    Moved,
    /// The session ended.
    Finished(DropOutcome<T>),
    /// A click was swallowed because it ended a drag.
    ClickSuppressed,
    /// A click passed through to the host.
    Click,
    /// The session was abandoned.
    Cancelled,
}

/// Per-draggable gesture state. `zone` names the drop zone this draggable
/// drags over.
#[derive(Debug, Clone)]
pub struct DragGesture<Z> {
    config: DragConfig,
    zone: Z,
    press: Option<Point>,
    dragging: bool,
    suppress_click: bool,
}

impl<Z> DragGesture<Z>
where
    Z: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(zone: Z) -> Self {
        Self::with_config(zone, DragConfig::default())
    }

    pub fn with_config(zone: Z, config: DragConfig) -> Self {
        Self {
            config,
            zone,
            press: None,
            dragging: false,
            suppress_click: false,
        }
    }

    pub fn zone(&self) -> &Z {
        &self.zone
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Feed one event. `drag_items` is asked for the payload only when the
    /// threshold is crossed; an empty payload defers the start to the next
    /// move.
    pub fn handle<T, F>(
        &mut self,
        event: &InputEvent,
        dnd: &mut DragCoordinator<Z, T>,
        drag_items: F,
    ) -> Result<GestureOutcome<T>, DragError>
    where
        T: Clone,
        F: FnOnce() -> Vec<T>,
    {
        match *event {
            InputEvent::PointerDown { x, y } => {
                self.press = Some(Point::new(x, y));
                self.suppress_click = false;
                Ok(GestureOutcome::Idle)
            }
            InputEvent::PointerMove { x, y } => {
                let point = Point::new(x, y);
                if self.dragging {
                    dnd.update_drag(&self.zone, point);
                    return Ok(GestureOutcome::Moved);
                }
                let Some(press) = self.press else {
                    return Ok(GestureOutcome::Idle);
                };
                if press.distance(point) < self.config.threshold {
                    return Ok(GestureOutcome::Idle);
                }
                let items = drag_items();
                if items.is_empty() {
                    return Ok(GestureOutcome::Idle);
                }
                self.dragging = true;
                dnd.start_drag(items);
                dnd.update_drag(&self.zone, point);
                Ok(GestureOutcome::Started)
            }
            InputEvent::PointerUp { outside_window, .. } => {
                self.press = None;
                if !self.dragging {
                    return Ok(GestureOutcome::Idle);
                }
                self.dragging = false;
                // The host emits no click for a release outside the window.
                self.suppress_click = !outside_window;
                dnd.stop_drag().map(GestureOutcome::Finished)
            }
            InputEvent::Click { .. } => {
                if std::mem::take(&mut self.suppress_click) {
                    Ok(GestureOutcome::ClickSuppressed)
                } else {
                    Ok(GestureOutcome::Click)
                }
            }
            InputEvent::Cancel => {
                self.press = None;
                if !self.dragging {
                    return Ok(GestureOutcome::Idle);
                }
                self.dragging = false;
                dnd.teardown();
                Ok(GestureOutcome::Cancelled)
            }
        }
    }

    /// Drop gesture state; tears down a session this gesture started.
    pub fn reset<T: Clone>(&mut self, dnd: &mut DragCoordinator<Z, T>) {
        if self.dragging {
            dnd.teardown();
        }
        self.press = None;
        self.dragging = false;
        self.suppress_click = false;
    }
}
