//! Layers panel: rows of one document as drop targets, pointer input on
//! rows as drag gestures, drops as host reorder requests.

use crate::commands::HostCommand;
use crate::reorder::{LayerDropValidator, ReorderConfig, drag_items, layer_key};
use crate::sync::{DocumentSync, SubscriptionId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use strata_core::{ElementId, ElementStructure, Rect};
use strata_dnd::{
    DragConfig, DragCoordinator, DragError, DragGesture, DragState, DropHandler, GestureOutcome,
    HandlerError, InputEvent,
};

/// Drag-and-drop wiring for one document's layer list. The drop zone is
/// the document id.
pub struct LayersPanel {
    document: Rc<RefCell<DocumentSync>>,
    validator: Rc<LayerDropValidator>,
    dnd: DragCoordinator<u32, ElementId>,
    drag: DragConfig,
    rows: HashMap<ElementId, Rc<Cell<Rect>>>,
    gesture: Option<(ElementId, DragGesture<u32>)>,
    subscription: Option<SubscriptionId>,
}

impl LayersPanel {
    pub fn new(document: Rc<RefCell<DocumentSync>>, config: ReorderConfig) -> Self {
        let validator = Rc::new(LayerDropValidator::new(config, document.borrow().structure()));
        let watcher = Rc::clone(&validator);
        let subscription = document
            .borrow_mut()
            .subscribe(move |structure| watcher.set_structure(Rc::clone(structure)));
        Self {
            document,
            validator,
            dnd: DragCoordinator::new(),
            drag: DragConfig::default(),
            rows: HashMap::new(),
            gesture: None,
            subscription: Some(subscription),
        }
    }

    pub fn with_drag_config(mut self, drag: DragConfig) -> Self {
        self.drag = drag;
        self
    }

    pub fn zone(&self) -> u32 {
        self.document.borrow().document_id()
    }

    pub fn structure(&self) -> Rc<ElementStructure> {
        self.document.borrow().structure()
    }

    pub fn validator(&self) -> &Rc<LayerDropValidator> {
        &self.validator
    }

    pub fn drag_state(&self) -> DragState<ElementId> {
        self.dnd.state()
    }

    pub fn coordinator(&self) -> &DragCoordinator<u32, ElementId> {
        &self.dnd
    }

    /// Record the on-screen rows after a render. Rows already known keep
    /// their registration and only move; the drop zone is rebuilt when the
    /// set of rows changed.
    pub fn layout_rows(&mut self, rows: &[(ElementId, Rect)]) {
        let same_rows =
            rows.len() == self.rows.len() && rows.iter().all(|(id, _)| self.rows.contains_key(id));
        if same_rows {
            for (id, rect) in rows {
                if let Some(cell) = self.rows.get(id) {
                    cell.set(*rect);
                }
            }
            self.dnd.invalidate_geometry();
            return;
        }

        self.rows = rows
            .iter()
            .map(|(id, rect)| (*id, Rc::new(Cell::new(*rect))))
            .collect();
        let droppables = rows
            .iter()
            .filter_map(|(id, _)| {
                let cell = self.rows.get(id)?;
                Some(self.validator.droppable(cell, *id, self.drop_handler()))
            })
            .collect();
        let zone = self.zone();
        log::debug!("layers panel {zone}: {} rows", rows.len());
        self.dnd.reset(zone, droppables);
    }

    fn drop_handler(&self) -> DropHandler<ElementId> {
        let validator = Rc::clone(&self.validator);
        let document = Rc::clone(&self.document);
        Rc::new(move |target: &ElementId| -> Result<(), HandlerError> {
            let command = validator.reorder_command(*target)?;
            document.borrow().request(command);
            Ok(())
        })
    }

    /// Feed pointer input that happened on `layer`'s row (or, during a
    /// drag, anywhere).
    pub fn pointer(
        &mut self,
        layer: ElementId,
        event: &InputEvent,
    ) -> Result<GestureOutcome<ElementId>, DragError> {
        if matches!(event, InputEvent::PointerDown { .. }) {
            if let Some((_, mut previous)) = self.gesture.take() {
                previous.reset(&mut self.dnd);
            }
            self.gesture = Some((layer, DragGesture::with_config(self.zone(), self.drag)));
        }
        let Some((pressed, gesture)) = self.gesture.as_mut() else {
            return Ok(GestureOutcome::Idle);
        };

        let structure = self.document.borrow().structure();
        let validator = &self.validator;
        let pressed = *pressed;
        let outcome = gesture.handle(event, &mut self.dnd, || {
            let items = drag_items(&structure, pressed);
            if !items.is_empty() {
                validator.begin_session();
            }
            items
        })?;

        if outcome == GestureOutcome::Click {
            self.document.borrow().request(HostCommand::Select {
                document: structure.owner_id(),
                ids: vec![pressed],
            });
        }
        Ok(outcome)
    }

    /// The host's post-drop update has been rendered.
    pub fn render_complete(&mut self) {
        self.dnd.render_complete();
    }

    /// Drop all rows, abandon any drag and stop following the document,
    /// e.g. when the panel unmounts.
    pub fn teardown(&mut self) {
        if let Some((_, mut gesture)) = self.gesture.take() {
            gesture.reset(&mut self.dnd);
        }
        let keys: Vec<String> = self.rows.keys().map(|id| layer_key(*id)).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let zone = self.zone();
        if !keys.is_empty()
            && let Err(err) = self.dnd.batch_deregister(&zone, &keys)
        {
            log::warn!("layers panel {zone}: {err}");
        }
        self.rows.clear();
        if let Some(id) = self.subscription.take() {
            self.document.borrow_mut().unsubscribe(id);
        }
    }
}
