//! Document sync: host events in, current structure out.
//!
//! The host owns the document. It reports changes either as a full
//! snapshot or as incremental events that mirror the structural mutators.
//! `DocumentSync` applies each event to the current `ElementStructure`
//! and swaps in the result. A failed event leaves the current structure in
//! place (the same `Rc`), so views keep rendering the last good state
//! until the next snapshot arrives.

use crate::commands::{HostBridge, HostCommand};
use std::rc::Rc;
use strata_core::{
    Bounds, BoundsUpdate, CharacterStyleProperties, ElementId, ElementProperties, ElementStructure,
    Fill, FillProperties, LayerEffectProperties, LayerEffectType, NodeDescriptor, ParagraphStyleProperties,
    PerElement, Point, ReplaceMode, SceneSnapshot, Stroke, StrokeProperties, StructureError, Vec2,
};

/// One host-reported change.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureEvent {
    /// Full rebuild from the host's current document.
    Snapshot(SceneSnapshot),
    AddLayers {
        ids: Vec<ElementId>,
        descriptors: Vec<NodeDescriptor>,
        select: bool,
        replace: ReplaceMode,
    },
    ReplaceByItemIndex(Vec<NodeDescriptor>),
    UpdateOrder(Vec<ElementId>),
    DeleteLayers(Vec<ElementId>),
    CreateGroup {
        group_id: ElementId,
        group_end_id: ElementId,
        name: String,
    },
    ResetElements(Vec<(ElementId, NodeDescriptor)>),
    ResetBounds(Vec<(ElementId, Bounds)>),
    UpdateBounds {
        ids: Vec<ElementId>,
        update: BoundsUpdate,
    },
    RepositionLayers(Vec<(ElementId, Point)>),
    TranslateLayers {
        ids: Vec<ElementId>,
        delta: Vec2,
    },
    ResizeLayers(Vec<(ElementId, BoundsUpdate)>),
    SetProperties {
        ids: Vec<ElementId>,
        properties: ElementProperties,
    },
    SetLayersProportional {
        ids: Vec<ElementId>,
        proportional: bool,
    },
    SetFillProperties {
        ids: Vec<ElementId>,
        index: usize,
        properties: FillProperties,
    },
    AddFill {
        ids: Vec<ElementId>,
        fill: Fill,
    },
    SetStrokeProperties {
        ids: Vec<ElementId>,
        index: usize,
        properties: StrokeProperties,
    },
    AddStroke {
        ids: Vec<ElementId>,
        index: usize,
        strokes: PerElement<Stroke>,
    },
    SetLayerEffectProperties {
        ids: Vec<ElementId>,
        indices: PerElement<Option<usize>>,
        kind: LayerEffectType,
        properties: PerElement<LayerEffectProperties>,
    },
    DeleteLayerEffectProperties {
        ids: Vec<ElementId>,
        index: usize,
        kind: LayerEffectType,
    },
    DeleteAllLayerEffects {
        ids: Vec<ElementId>,
        kind: LayerEffectType,
    },
    SetCharacterStyleProperties {
        ids: Vec<ElementId>,
        properties: CharacterStyleProperties,
    },
    SetParagraphStyleProperties {
        ids: Vec<ElementId>,
        properties: ParagraphStyleProperties,
    },
    UpdateSelection(Vec<ElementId>),
}

impl StructureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StructureEvent::Snapshot(_) => "snapshot",
            StructureEvent::AddLayers { .. } => "add-layers",
            StructureEvent::ReplaceByItemIndex(_) => "replace-by-item-index",
            StructureEvent::UpdateOrder(_) => "update-order",
            StructureEvent::DeleteLayers(_) => "delete-layers",
            StructureEvent::CreateGroup { .. } => "create-group",
            StructureEvent::ResetElements(_) => "reset-elements",
            StructureEvent::ResetBounds(_) => "reset-bounds",
            StructureEvent::UpdateBounds { .. } => "update-bounds",
            StructureEvent::RepositionLayers(_) => "reposition-layers",
            StructureEvent::TranslateLayers { .. } => "translate-layers",
            StructureEvent::ResizeLayers(_) => "resize-layers",
            StructureEvent::SetProperties { .. } => "set-properties",
            StructureEvent::SetLayersProportional { .. } => "set-layers-proportional",
            StructureEvent::SetFillProperties { .. } => "set-fill-properties",
            StructureEvent::AddFill { .. } => "add-fill",
            StructureEvent::SetStrokeProperties { .. } => "set-stroke-properties",
            StructureEvent::AddStroke { .. } => "add-stroke",
            StructureEvent::SetLayerEffectProperties { .. } => "set-layer-effect-properties",
            StructureEvent::DeleteLayerEffectProperties { .. } => "delete-layer-effect-properties",
            StructureEvent::DeleteAllLayerEffects { .. } => "delete-all-layer-effects",
            StructureEvent::SetCharacterStyleProperties { .. } => "set-character-style-properties",
            StructureEvent::SetParagraphStyleProperties { .. } => "set-paragraph-style-properties",
            StructureEvent::UpdateSelection(_) => "update-selection",
        }
    }

    /// The structure that results from applying this event to `current`.
    pub fn apply_to(&self, current: &ElementStructure) -> Result<ElementStructure, StructureError> {
        use StructureEvent::*;
        match self {
            Snapshot(snapshot) => Ok(ElementStructure::from_snapshot(snapshot)?),
            AddLayers {
                ids,
                descriptors,
                select,
                replace,
            } => current.add_layers(ids, descriptors, *select, *replace),
            ReplaceByItemIndex(descriptors) => current.replace_by_item_index(descriptors),
            UpdateOrder(ids) => current.update_order(ids),
            DeleteLayers(ids) => current.delete_layers(ids),
            CreateGroup {
                group_id,
                group_end_id,
                name,
            } => current.create_group(*group_id, *group_end_id, name),
            ResetElements(updates) => current.reset_elements(updates),
            ResetBounds(updates) => current.reset_bounds(updates),
            UpdateBounds { ids, update } => current.update_bounds(ids, *update),
            RepositionLayers(moves) => current.reposition_layers(moves),
            TranslateLayers { ids, delta } => current.translate_layers(ids, *delta),
            ResizeLayers(sizes) => current.resize_layers(sizes),
            SetProperties { ids, properties } => current.set_properties(ids, properties),
            SetLayersProportional { ids, proportional } => {
                current.set_layers_proportional(ids, *proportional)
            }
            SetFillProperties {
                ids,
                index,
                properties,
            } => current.set_fill_properties(ids, *index, properties),
            AddFill { ids, fill } => current.add_fill(ids, fill),
            SetStrokeProperties {
                ids,
                index,
                properties,
            } => current.set_stroke_properties(ids, *index, properties),
            AddStroke {
                ids,
                index,
                strokes,
            } => current.add_stroke(ids, *index, strokes),
            SetLayerEffectProperties {
                ids,
                indices,
                kind,
                properties,
            } => current.set_layer_effect_properties(ids, indices, *kind, properties),
            DeleteLayerEffectProperties { ids, index, kind } => {
                current.delete_layer_effect_properties(ids, *index, *kind)
            }
            DeleteAllLayerEffects { ids, kind } => current.delete_all_layer_effects(ids, *kind),
            SetCharacterStyleProperties { ids, properties } => {
                current.set_character_style_properties(ids, properties)
            }
            SetParagraphStyleProperties { ids, properties } => {
                current.set_paragraph_style_properties(ids, properties)
            }
            UpdateSelection(ids) => Ok(current.update_selection(ids.iter().copied())),
        }
    }
}

/// Handle returned by `DocumentSync::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StructureListener = Box<dyn Fn(&Rc<ElementStructure>)>;

/// Holds the current structure of one document and the bridge to its host.
pub struct DocumentSync {
    structure: Rc<ElementStructure>,
    bridge: Box<dyn HostBridge>,
    listeners: Vec<(SubscriptionId, StructureListener)>,
    next_listener: u64,
}

impl DocumentSync {
    pub fn new(structure: ElementStructure, bridge: impl HostBridge + 'static) -> Self {
        Self {
            structure: Rc::new(structure),
            bridge: Box::new(bridge),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn from_snapshot(
        snapshot: &SceneSnapshot,
        bridge: impl HostBridge + 'static,
    ) -> Result<Self, StructureError> {
        Ok(Self::new(ElementStructure::from_snapshot(snapshot)?, bridge))
    }

    /// The current structure.
    pub fn structure(&self) -> Rc<ElementStructure> {
        Rc::clone(&self.structure)
    }

    pub fn document_id(&self) -> u32 {
        self.structure.owner_id()
    }

    // ─── Host → editor ───────────────────────────────────────────────────

    /// Apply one host event. On failure the error is logged and returned,
    /// and the previous structure stays current.
    pub fn apply(&mut self, event: &StructureEvent) -> Result<Rc<ElementStructure>, StructureError> {
        match event.apply_to(&self.structure) {
            Ok(next) => {
                log::trace!(
                    "{}: version {} -> {}",
                    event.name(),
                    self.structure.version(),
                    next.version()
                );
                self.structure = Rc::new(next);
                self.notify();
                Ok(self.structure())
            }
            Err(err) => {
                log::warn!("{} rejected for document {}: {err}", event.name(), self.document_id());
                Err(err)
            }
        }
    }

    /// Apply events in arrival order. Returns the failures by position;
    /// later events still apply on top of the last good structure.
    pub fn apply_all<'e>(
        &mut self,
        events: impl IntoIterator<Item = &'e StructureEvent>,
    ) -> Vec<(usize, StructureError)> {
        events
            .into_iter()
            .enumerate()
            .filter_map(|(i, event)| self.apply(event).err().map(|err| (i, err)))
            .collect()
    }

    // ─── Editor → host ───────────────────────────────────────────────────

    /// Send a command to the host. Failures are logged and dropped; the
    /// host's next snapshot is authoritative either way.
    pub fn request(&self, command: HostCommand) {
        let name = command.name();
        log::debug!("request {name} for document {}", command.document());
        if let Err(err) = self.bridge.send(command) {
            log::warn!("host did not accept {name}: {err}");
        }
    }

    // ─── Change notification ─────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl Fn(&Rc<ElementStructure>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.structure);
        }
    }
}
