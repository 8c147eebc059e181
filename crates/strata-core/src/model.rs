//! Element data model for layer and scene-tree structures.
//!
//! An `Element` is one row of the host document's hierarchy: a pixel layer,
//! a text layer, a 3-D scene node, or one of the `Group` / `GroupEnd`
//! brackets that encode nesting in the flat order. Elements are plain
//! values; every change produces a new element through the structural
//! editor, never an in-place write on a shared value.

use crate::id::{ElementId, ElementKey};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

// ─── Bounds ──────────────────────────────────────────────────────────────

/// Element bounds in document pixels, host-style edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

/// Optional position/size overrides applied by `update_size_and_position`.
/// `None` fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundsUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Bounds {
    pub const fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.y0, rect.x0, rect.y1, rect.x1)
    }

    /// Move the top-left corner, keeping the size.
    #[must_use]
    pub fn update_position(&self, x: Option<f64>, y: Option<f64>) -> Self {
        self.update_size_and_position(BoundsUpdate {
            x,
            y,
            ..Default::default()
        })
    }

    /// Move and/or resize; unspecified values are kept.
    #[must_use]
    pub fn update_size_and_position(&self, update: BoundsUpdate) -> Self {
        let left = update.x.unwrap_or(self.left);
        let top = update.y.unwrap_or(self.top);
        let width = update.width.unwrap_or_else(|| self.width());
        let height = update.height.unwrap_or_else(|| self.height());
        Self::new(top, left, top + height, left + width)
    }

    /// Smallest bounds covering all inputs, or `None` for an empty input.
    pub fn union<I: IntoIterator<Item = Bounds>>(all: I) -> Option<Bounds> {
        all.into_iter()
            .map(|b| b.rect())
            .reduce(|acc, r| acc.union(r))
            .map(Bounds::from_rect)
    }
}

// ─── Element kinds ───────────────────────────────────────────────────────

/// Host element kind. Codes follow the host's layer-kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ElementKind {
    #[default]
    Pixel,
    Adjustment,
    Text,
    Vector,
    SmartObject,
    Video,
    /// Opening bracket of a nested span.
    Group,
    ThreeD,
    Gradient,
    Pattern,
    SolidColor,
    Background,
    /// Closing bracket of the innermost open group.
    GroupEnd,
    Other(u32),
}

impl ElementKind {
    pub fn code(self) -> u32 {
        match self {
            ElementKind::Pixel => 1,
            ElementKind::Adjustment => 2,
            ElementKind::Text => 3,
            ElementKind::Vector => 4,
            ElementKind::SmartObject => 5,
            ElementKind::Video => 6,
            ElementKind::Group => 7,
            ElementKind::ThreeD => 8,
            ElementKind::Gradient => 9,
            ElementKind::Pattern => 10,
            ElementKind::SolidColor => 11,
            ElementKind::Background => 12,
            ElementKind::GroupEnd => 13,
            ElementKind::Other(code) => code,
        }
    }
}

impl From<u32> for ElementKind {
    fn from(code: u32) -> Self {
        match code {
            1 => ElementKind::Pixel,
            2 => ElementKind::Adjustment,
            3 => ElementKind::Text,
            4 => ElementKind::Vector,
            5 => ElementKind::SmartObject,
            6 => ElementKind::Video,
            7 => ElementKind::Group,
            8 => ElementKind::ThreeD,
            9 => ElementKind::Gradient,
            10 => ElementKind::Pattern,
            11 => ElementKind::SolidColor,
            12 => ElementKind::Background,
            13 => ElementKind::GroupEnd,
            other => ElementKind::Other(other),
        }
    }
}

impl From<ElementKind> for u32 {
    fn from(kind: ElementKind) -> u32 {
        kind.code()
    }
}

// ─── Fills & strokes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub color: Color,
    #[serde(default = "full")]
    pub opacity: f32,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

/// Partial fill update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillProperties {
    pub color: Option<Color>,
    pub opacity: Option<f32>,
    pub enabled: Option<bool>,
}

impl Fill {
    pub fn apply(&mut self, props: &FillProperties) {
        if let Some(color) = props.color {
            self.color = color;
        }
        if let Some(opacity) = props.opacity {
            self.opacity = opacity;
        }
        if let Some(enabled) = props.enabled {
            self.enabled = enabled;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrokeAlignment {
    Inside,
    #[default]
    Center,
    Outside,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub color: Color,
    #[serde(default = "one_px")]
    pub width: f32,
    #[serde(default = "full")]
    pub opacity: f32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub alignment: StrokeAlignment,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            opacity: 1.0,
            enabled: true,
            alignment: StrokeAlignment::Center,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeProperties {
    pub color: Option<Color>,
    pub width: Option<f32>,
    pub opacity: Option<f32>,
    pub enabled: Option<bool>,
    pub alignment: Option<StrokeAlignment>,
}

impl Stroke {
    pub fn apply(&mut self, props: &StrokeProperties) {
        if let Some(color) = props.color {
            self.color = color;
        }
        if let Some(width) = props.width {
            self.width = width;
        }
        if let Some(opacity) = props.opacity {
            self.opacity = opacity;
        }
        if let Some(enabled) = props.enabled {
            self.enabled = enabled;
        }
        if let Some(alignment) = props.alignment {
            self.alignment = alignment;
        }
    }
}

fn full() -> f32 {
    1.0
}

fn one_px() -> f32 {
    1.0
}

fn enabled() -> bool {
    true
}

// ─── Layer effects ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerEffectType {
    DropShadow,
    InnerShadow,
    ColorOverlay,
    Stroke,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerEffect {
    pub enabled: bool,
    pub color: Color,
    pub opacity: f32,
    pub x: f32,
    pub y: f32,
    pub blur: f32,
    pub spread: f32,
}

impl Default for LayerEffect {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::BLACK,
            opacity: 0.75,
            x: 0.0,
            y: 5.0,
            blur: 5.0,
            spread: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerEffectProperties {
    pub enabled: Option<bool>,
    pub color: Option<Color>,
    pub opacity: Option<f32>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub blur: Option<f32>,
    pub spread: Option<f32>,
}

impl LayerEffect {
    /// A fresh effect of the given type with host defaults.
    pub fn new(kind: LayerEffectType) -> Self {
        match kind {
            LayerEffectType::ColorOverlay => Self {
                opacity: 1.0,
                y: 0.0,
                blur: 0.0,
                ..Default::default()
            },
            LayerEffectType::Stroke => Self {
                opacity: 1.0,
                y: 0.0,
                blur: 0.0,
                spread: 1.0,
                ..Default::default()
            },
            LayerEffectType::DropShadow | LayerEffectType::InnerShadow => Self::default(),
        }
    }

    pub fn apply(&mut self, props: &LayerEffectProperties) {
        if let Some(enabled) = props.enabled {
            self.enabled = enabled;
        }
        if let Some(color) = props.color {
            self.color = color;
        }
        if let Some(opacity) = props.opacity {
            self.opacity = opacity;
        }
        if let Some(x) = props.x {
            self.x = x;
        }
        if let Some(y) = props.y {
            self.y = y;
        }
        if let Some(blur) = props.blur {
            self.blur = blur;
        }
        if let Some(spread) = props.spread {
            self.spread = spread;
        }
    }
}

// ─── Text ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterStyle {
    pub font: Option<String>,
    pub size: f32,
    pub color: Color,
    pub tracking: f32,
    pub leading: Option<f32>,
}

impl Default for CharacterStyle {
    fn default() -> Self {
        Self {
            font: None,
            size: 12.0,
            color: Color::BLACK,
            tracking: 0.0,
            leading: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterStyleProperties {
    pub font: Option<String>,
    pub size: Option<f32>,
    pub color: Option<Color>,
    pub tracking: Option<f32>,
    /// `Some(None)` resets to auto leading.
    pub leading: Option<Option<f32>>,
}

impl CharacterStyle {
    pub fn apply(&mut self, props: &CharacterStyleProperties) {
        if let Some(font) = &props.font {
            self.font = Some(font.clone());
        }
        if let Some(size) = props.size {
            self.size = size;
        }
        if let Some(color) = props.color {
            self.color = color;
        }
        if let Some(tracking) = props.tracking {
            self.tracking = tracking;
        }
        if let Some(leading) = props.leading {
            self.leading = leading;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphStyle {
    pub alignment: TextAlignment,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphStyleProperties {
    pub alignment: Option<TextAlignment>,
}

impl ParagraphStyle {
    pub fn apply(&mut self, props: &ParagraphStyleProperties) {
        if let Some(alignment) = props.alignment {
            self.alignment = alignment;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub character: CharacterStyle,
    pub paragraph: ParagraphStyle,
}

// ─── Elements ────────────────────────────────────────────────────────────

/// Basic element properties that `set_properties` can merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementProperties {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub expanded: Option<bool>,
    pub opacity: Option<f32>,
    pub proportional: Option<bool>,
}

/// One node of the document's layer / scene hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub key: ElementKey,
    pub name: String,
    pub kind: ElementKind,
    pub sub_type: u32,
    /// Scene nodes that own children without being a `Group`.
    pub is_parent: bool,
    pub visible: bool,
    pub selected: bool,
    /// Only meaningful for group openers.
    pub expanded: bool,
    pub locked: bool,
    pub is_background: bool,
    pub is_artboard: bool,
    /// Can be picked directly on the canvas once its ancestors are entered.
    pub super_selectable: bool,
    /// Carries host features the editor cannot represent.
    pub unsupported: bool,
    /// Linked smart object.
    pub is_linked: bool,
    /// `None` for elements without geometry (group brackets).
    pub bounds: Option<Bounds>,
    pub opacity: f32,
    pub proportional: bool,
    pub fills: Vec<Fill>,
    pub strokes: Vec<Stroke>,
    pub effects: BTreeMap<LayerEffectType, Vec<LayerEffect>>,
    pub used_to_have_layer_effect: bool,
    pub text: Option<TextStyle>,
}

impl Element {
    /// A visible, unselected element with no geometry or styling.
    pub fn new(owner: u32, id: ElementId, kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            id,
            key: ElementKey::new(owner, id),
            name: name.into(),
            kind,
            sub_type: 0,
            is_parent: false,
            visible: true,
            selected: false,
            expanded: true,
            locked: false,
            is_background: kind == ElementKind::Background,
            is_artboard: false,
            super_selectable: true,
            unsupported: false,
            is_linked: false,
            bounds: None,
            opacity: 1.0,
            proportional: false,
            fills: Vec::new(),
            strokes: Vec::new(),
            effects: BTreeMap::new(),
            used_to_have_layer_effect: false,
            text: None,
        }
    }

    /// Head of a new group created by the structural editor.
    pub fn group(owner: u32, id: ElementId, name: impl Into<String>) -> Self {
        Self::new(owner, id, ElementKind::Group, name)
    }

    /// Closing marker of a group.
    pub fn group_end(owner: u32, id: ElementId) -> Self {
        Self::new(owner, id, ElementKind::GroupEnd, "</Element group>")
    }

    /// True if this element opens a bracketed span in the flat order.
    pub fn opens_group(&self) -> bool {
        self.kind == ElementKind::Group || self.is_parent
    }

    pub fn is_group_end(&self) -> bool {
        self.kind == ElementKind::GroupEnd
    }

    pub fn is_text(&self) -> bool {
        self.kind == ElementKind::Text
    }

    pub fn has_layer_effect(&self) -> bool {
        self.effects.values().any(|list| !list.is_empty())
    }

    pub fn apply(&mut self, props: &ElementProperties) {
        if let Some(name) = &props.name {
            self.name = name.clone();
        }
        if let Some(visible) = props.visible {
            self.visible = visible;
        }
        if let Some(locked) = props.locked {
            self.locked = locked;
        }
        if let Some(expanded) = props.expanded {
            self.expanded = expanded;
        }
        if let Some(opacity) = props.opacity {
            self.opacity = opacity;
        }
        if let Some(proportional) = props.proportional {
            self.proportional = proportional;
        }
    }
}
