//! Structural editor: pure transformations of an `ElementStructure`.
//!
//! Every mutator takes `&self` and returns a new structure sharing unchanged
//! substructure with the receiver. A failed mutator returns an error and
//! leaves nothing behind; the caller keeps the structure it had.
//!
//! Mutators that change the flat index re-validate the result. Mutators
//! that only touch element fields carry the derived tree over.

use crate::descriptor::NodeDescriptor;
use crate::error::StructureError;
use crate::id::ElementId;
use crate::model::{
    Bounds, BoundsUpdate, CharacterStyleProperties, Element, ElementKind, ElementProperties, Fill,
    FillProperties, LayerEffect, LayerEffectProperties, LayerEffectType, ParagraphStyleProperties,
    Stroke, StrokeProperties,
};
use crate::structure::ElementStructure;
use im::{HashMap as ImHashMap, Vector};
use kurbo::{Point, Vec2};
use std::collections::HashSet;

/// A batch argument shared by every element or given once per element.
#[derive(Debug, Clone, PartialEq)]
pub enum PerElement<T> {
    All(T),
    Each(Vec<T>),
}

impl<T> PerElement<T> {
    pub fn get(&self, i: usize) -> Option<&T> {
        match self {
            PerElement::All(value) => Some(value),
            PerElement::Each(values) => values.get(i),
        }
    }

    fn check_len(&self, expected: usize) -> Result<(), StructureError> {
        match self {
            PerElement::Each(values) if values.len() != expected => {
                Err(StructureError::BatchLengthMismatch {
                    given: values.len(),
                    expected,
                })
            }
            _ => Ok(()),
        }
    }
}

impl<T> From<T> for PerElement<T> {
    fn from(value: T) -> Self {
        PerElement::All(value)
    }
}

/// How `add_layers` treats the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    /// Replace the single selected layer if it is an empty, non-background
    /// pixel layer.
    #[default]
    Auto,
    /// Always insert.
    Never,
    /// Replace the single selected layer unconditionally.
    Force,
    /// Replace this element unconditionally.
    Element(ElementId),
}

impl ElementStructure {
    // ─── Index-changing mutators ─────────────────────────────────────────

    /// Insert new layers at each descriptor's host item index.
    ///
    /// With `select`, the existing selection is cleared and only the last
    /// new layer ends up selected. A single new layer may replace an
    /// existing one per `replace`.
    pub fn add_layers(
        &self,
        ids: &[ElementId],
        descriptors: &[NodeDescriptor],
        select: bool,
        replace: ReplaceMode,
    ) -> Result<Self, StructureError> {
        if ids.len() != descriptors.len() {
            return Err(StructureError::BatchLengthMismatch {
                given: descriptors.len(),
                expected: ids.len(),
            });
        }

        let replaced = self.replace_target(ids.len(), replace)?;
        let mut elements = self.elements().clone();
        if select {
            for element in elements.iter_mut().map(|(_, e)| e) {
                element.selected = false;
            }
        }
        let mut index = self.index().clone();

        for (i, (&id, descriptor)) in ids.iter().zip(descriptors).enumerate() {
            let len = index.len();
            // 0-based, bottom-up; no item index means the top of the stack.
            let layer_index = match descriptor.item_index {
                Some(0) => return Err(StructureError::InsertIndexOutOfBounds { index: 0, len }),
                Some(item) => item - 1,
                None => len,
            };
            let mut element = descriptor.to_element(self.owner_id(), id);
            element.selected = select && i + 1 == ids.len();

            match replaced.filter(|_| i == 0) {
                Some(target) => {
                    let replace_index = self
                        .item_index_of(target)
                        .map(|item| item - 1)
                        .ok_or(StructureError::UnknownElement(target))?;
                    elements.remove(&target);
                    if layer_index == replace_index {
                        index[len - 1 - replace_index] = id;
                    } else if layer_index < len {
                        index.remove(len - 1 - replace_index);
                        index.insert(len - 1 - layer_index, id);
                    } else {
                        return Err(StructureError::ReplaceIndexOutOfBounds {
                            index: layer_index,
                            len,
                        });
                    }
                    log::debug!("add_layers: {id} replaces {target}");
                }
                None => {
                    if layer_index > len {
                        return Err(StructureError::InsertIndexOutOfBounds {
                            index: layer_index,
                            len,
                        });
                    }
                    index.insert(len - layer_index, id);
                }
            }
            elements.insert(id, element);
        }

        self.with_index(index, elements)
    }

    fn replace_target(
        &self,
        count: usize,
        replace: ReplaceMode,
    ) -> Result<Option<ElementId>, StructureError> {
        if count != 1 {
            return Ok(None);
        }
        let single_selected = || {
            let selected = self.selected();
            match selected.as_slice() {
                [only] => Some(*only),
                _ => None,
            }
        };
        let target = match replace {
            ReplaceMode::Never => None,
            ReplaceMode::Element(id) => Some(
                self.by_id(id)
                    .ok_or(StructureError::UnknownElement(id))?,
            ),
            ReplaceMode::Force => single_selected(),
            ReplaceMode::Auto => single_selected().filter(|e| {
                !e.is_background
                    && e.kind == ElementKind::Pixel
                    && e.bounds.is_some_and(|b| b.area() == 0.0)
            }),
        };
        Ok(target.map(|e| e.id))
    }

    /// Swap the elements at the descriptors' host item indices for new ones
    /// built from the descriptors. Each new element keeps the selection
    /// state of the one it replaces, and its id unless the descriptor
    /// carries one.
    pub fn replace_by_item_index(
        &self,
        descriptors: &[NodeDescriptor],
    ) -> Result<Self, StructureError> {
        let len = self.len();
        let mut elements = self.elements().clone();
        let mut index = self.index().clone();

        for descriptor in descriptors {
            let item = descriptor.item_index.unwrap_or(0);
            let previous = self
                .by_item_index(item)
                .ok_or(StructureError::ReplaceIndexOutOfBounds { index: item, len })?;
            let id = descriptor.id.map_or(previous.id, ElementId);
            let mut next = descriptor.to_element(self.owner_id(), id);
            next.selected = previous.selected;

            elements.remove(&previous.id);
            elements.insert(id, next);
            index[len - item] = id;
        }

        self.with_index(index, elements)
    }

    /// Replace the flat order wholesale (display order, front first).
    /// Elements the new order omits are deleted.
    pub fn update_order(&self, ids: &[ElementId]) -> Result<Self, StructureError> {
        if ids.len() > self.elements().len() {
            return Err(StructureError::TooManyIds {
                given: ids.len(),
                existing: self.elements().len(),
            });
        }

        let index: Vector<ElementId> = ids.iter().copied().collect();
        let mut elements = self.elements().clone();
        if ids.len() < self.len() {
            let kept: HashSet<ElementId> = ids.iter().copied().collect();
            for id in self.index().iter().filter(|id| !kept.contains(id)) {
                elements.remove(id);
            }
        }

        log::debug!("update_order: {} -> {} ids", self.len(), ids.len());
        self.with_index(index, elements)
    }

    /// Remove elements, keeping the relative order of the rest. Unknown ids
    /// are ignored.
    pub fn delete_layers(&self, ids: &[ElementId]) -> Result<Self, StructureError> {
        let doomed: HashSet<ElementId> = ids.iter().copied().collect();
        let remaining: Vec<ElementId> = self
            .index()
            .iter()
            .copied()
            .filter(|id| !doomed.contains(id))
            .collect();
        self.update_order(&remaining)
    }

    /// Wrap the normalized selection (with all descendants) in a new group
    /// placed where the topmost selected element was, and select only the
    /// new group.
    pub fn create_group(
        &self,
        group_id: ElementId,
        group_end_id: ElementId,
        name: &str,
    ) -> Result<Self, StructureError> {
        for id in [group_id, group_end_id] {
            if self.contains(id) {
                return Err(StructureError::DuplicateId(id));
            }
        }

        let mut seen = HashSet::new();
        let moving: Vec<ElementId> = self
            .selected_normalized()
            .iter()
            .flat_map(|e| self.descendants(e.id).to_vec())
            .filter(|id| seen.insert(*id))
            .collect();
        if moving.is_empty() {
            return Err(StructureError::NothingSelected);
        }

        let remaining: Vec<ElementId> = self
            .index()
            .iter()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        let head_at = self
            .index()
            .iter()
            .take_while(|id| !seen.contains(id))
            .count();

        let mut index: Vector<ElementId> = remaining[..head_at].iter().copied().collect();
        index.push_back(group_id);
        index.extend(moving.iter().copied());
        index.push_back(group_end_id);
        index.extend(remaining[head_at..].iter().copied());

        let mut elements = self.elements().clone();
        for element in elements.iter_mut().map(|(_, e)| e) {
            element.selected = false;
        }
        let mut head = Element::group(self.owner_id(), group_id, name);
        head.selected = true;
        elements.insert(group_id, head);
        elements.insert(group_end_id, Element::group_end(self.owner_id(), group_end_id));

        log::debug!(
            "create_group: {} elements into {group_id} at position {head_at}",
            moving.len()
        );
        self.with_index(index, elements)
    }

    // ─── Element rebuilds ────────────────────────────────────────────────

    /// Rebuild the listed elements from fresh descriptors, keeping their
    /// ids and selection state.
    pub fn reset_elements(
        &self,
        updates: &[(ElementId, NodeDescriptor)],
    ) -> Result<Self, StructureError> {
        let mut elements = self.elements().clone();
        let mut nesting_changed = false;

        for (id, descriptor) in updates {
            let previous = self.by_id(*id).ok_or(StructureError::UnknownElement(*id))?;
            let mut next = descriptor.to_element(self.owner_id(), *id);
            next.selected = previous.selected;
            nesting_changed |= next.opens_group() != previous.opens_group()
                || next.is_group_end() != previous.is_group_end();
            elements.insert(*id, next);
        }

        if nesting_changed {
            self.with_index(self.index().clone(), elements)
        } else {
            Ok(self.with_elements(elements))
        }
    }

    /// Apply `f` to each listed element in turn. Unknown ids fail the
    /// whole batch.
    fn update_each<F>(&self, ids: &[ElementId], mut f: F) -> Result<Self, StructureError>
    where
        F: FnMut(usize, &mut Element) -> Result<(), StructureError>,
    {
        let mut elements: ImHashMap<ElementId, Element> = self.elements().clone();
        for (i, &id) in ids.iter().enumerate() {
            let element = elements
                .get_mut(&id)
                .ok_or(StructureError::UnknownElement(id))?;
            f(i, element)?;
        }
        Ok(self.with_elements(elements))
    }

    // ─── Bounds ──────────────────────────────────────────────────────────

    /// Apply `f` to the bounds of each listed element that has bounds.
    fn map_bounds<F>(&self, ids: &[ElementId], mut f: F) -> Result<Self, StructureError>
    where
        F: FnMut(usize, &Bounds) -> Bounds,
    {
        self.update_each(ids, |i, element| {
            if let Some(bounds) = element.bounds {
                element.bounds = Some(f(i, &bounds));
            }
            Ok(())
        })
    }

    /// Replace bounds wholesale with freshly reported values.
    pub fn reset_bounds(&self, updates: &[(ElementId, Bounds)]) -> Result<Self, StructureError> {
        let ids: Vec<ElementId> = updates.iter().map(|(id, _)| *id).collect();
        self.map_bounds(&ids, |i, _| updates[i].1)
    }

    /// Move and/or resize every listed element to the same values.
    pub fn update_bounds(
        &self,
        ids: &[ElementId],
        update: BoundsUpdate,
    ) -> Result<Self, StructureError> {
        self.map_bounds(ids, |_, bounds| bounds.update_size_and_position(update))
    }

    /// Move each element's top-left corner to its own position.
    pub fn reposition_layers(&self, moves: &[(ElementId, Point)]) -> Result<Self, StructureError> {
        let ids: Vec<ElementId> = moves.iter().map(|(id, _)| *id).collect();
        self.map_bounds(&ids, |i, bounds| {
            let to = moves[i].1;
            bounds.update_position(Some(to.x), Some(to.y))
        })
    }

    /// Shift every listed element by `delta`.
    pub fn translate_layers(&self, ids: &[ElementId], delta: Vec2) -> Result<Self, StructureError> {
        self.map_bounds(ids, |_, bounds| {
            bounds.update_position(Some(bounds.left + delta.x), Some(bounds.top + delta.y))
        })
    }

    /// Per-element move and resize.
    pub fn resize_layers(
        &self,
        sizes: &[(ElementId, BoundsUpdate)],
    ) -> Result<Self, StructureError> {
        let ids: Vec<ElementId> = sizes.iter().map(|(id, _)| *id).collect();
        self.map_bounds(&ids, |i, bounds| bounds.update_size_and_position(sizes[i].1))
    }

    // ─── Properties ──────────────────────────────────────────────────────

    pub fn set_properties(
        &self,
        ids: &[ElementId],
        properties: &ElementProperties,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            element.apply(properties);
            Ok(())
        })
    }

    pub fn set_layers_proportional(
        &self,
        ids: &[ElementId],
        proportional: bool,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            element.proportional = proportional;
            Ok(())
        })
    }

    pub fn set_fill_properties(
        &self,
        ids: &[ElementId],
        fill_index: usize,
        properties: &FillProperties,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            let id = element.id;
            let fill = element
                .fills
                .get_mut(fill_index)
                .ok_or(StructureError::MissingFill {
                    id,
                    index: fill_index,
                })?;
            fill.apply(properties);
            Ok(())
        })
    }

    /// Append `fill` to every listed element.
    pub fn add_fill(&self, ids: &[ElementId], fill: &Fill) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            element.fills.push(fill.clone());
            Ok(())
        })
    }

    pub fn set_stroke_properties(
        &self,
        ids: &[ElementId],
        stroke_index: usize,
        properties: &StrokeProperties,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            let id = element.id;
            let stroke =
                element
                    .strokes
                    .get_mut(stroke_index)
                    .ok_or(StructureError::MissingStroke {
                        id,
                        index: stroke_index,
                    })?;
            stroke.apply(properties);
            Ok(())
        })
    }

    /// Set the stroke at `stroke_index`, appending when the index equals the
    /// current stroke count.
    pub fn add_stroke(
        &self,
        ids: &[ElementId],
        stroke_index: usize,
        strokes: &PerElement<Stroke>,
    ) -> Result<Self, StructureError> {
        strokes.check_len(ids.len())?;
        self.update_each(ids, |i, element| {
            let id = element.id;
            let stroke = strokes
                .get(i)
                .cloned()
                .ok_or(StructureError::BatchLengthMismatch {
                    given: i,
                    expected: ids.len(),
                })?;
            match stroke_index {
                n if n < element.strokes.len() => element.strokes[n] = stroke,
                n if n == element.strokes.len() => element.strokes.push(stroke),
                n => return Err(StructureError::MissingStroke { id, index: n }),
            }
            Ok(())
        })
    }

    /// Merge effect properties into the effect of `kind` at each element's
    /// index. A `None` index, or one equal to the effect count, appends a
    /// new effect with host defaults.
    pub fn set_layer_effect_properties(
        &self,
        ids: &[ElementId],
        indices: &PerElement<Option<usize>>,
        kind: LayerEffectType,
        properties: &PerElement<LayerEffectProperties>,
    ) -> Result<Self, StructureError> {
        indices.check_len(ids.len())?;
        properties.check_len(ids.len())?;
        self.update_each(ids, |i, element| {
            let id = element.id;
            let mismatch = StructureError::BatchLengthMismatch {
                given: i,
                expected: ids.len(),
            };
            let props = properties.get(i).ok_or(mismatch.clone())?;
            let effects = element.effects.entry(kind).or_default();
            let index = indices.get(i).ok_or(mismatch)?.unwrap_or(effects.len());

            match index {
                n if n < effects.len() => effects[n].apply(props),
                n if n == effects.len() => {
                    let mut effect = LayerEffect::new(kind);
                    effect.apply(props);
                    effects.push(effect);
                }
                n => {
                    return Err(StructureError::MissingLayerEffect { id, kind, index: n });
                }
            }
            element.used_to_have_layer_effect = true;
            Ok(())
        })
    }

    /// Remove the effect of `kind` at `index` from every listed element.
    pub fn delete_layer_effect_properties(
        &self,
        ids: &[ElementId],
        index: usize,
        kind: LayerEffectType,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            let id = element.id;
            let effects = element
                .effects
                .get_mut(&kind)
                .filter(|list| index < list.len())
                .ok_or(StructureError::MissingLayerEffect { id, kind, index })?;
            effects.remove(index);
            Ok(())
        })
    }

    /// Clear every effect of `kind` from the listed elements.
    pub fn delete_all_layer_effects(
        &self,
        ids: &[ElementId],
        kind: LayerEffectType,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            if let Some(effects) = element.effects.get_mut(&kind) {
                effects.clear();
            }
            Ok(())
        })
    }

    pub fn set_character_style_properties(
        &self,
        ids: &[ElementId],
        properties: &CharacterStyleProperties,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            let id = element.id;
            let text = element
                .text
                .as_mut()
                .ok_or(StructureError::NotTextElement(id))?;
            text.character.apply(properties);
            Ok(())
        })
    }

    pub fn set_paragraph_style_properties(
        &self,
        ids: &[ElementId],
        properties: &ParagraphStyleProperties,
    ) -> Result<Self, StructureError> {
        self.update_each(ids, |_, element| {
            let id = element.id;
            let text = element
                .text
                .as_mut()
                .ok_or(StructureError::NotTextElement(id))?;
            text.paragraph.apply(properties);
            Ok(())
        })
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select exactly the given ids. Unknown ids select nothing.
    pub fn update_selection(&self, selected: impl IntoIterator<Item = ElementId>) -> Self {
        let selected: HashSet<ElementId> = selected.into_iter().collect();
        let mut elements = self.elements().clone();
        for (id, element) in elements.iter_mut() {
            element.selected = selected.contains(id);
        }
        self.with_elements(elements)
    }
}
