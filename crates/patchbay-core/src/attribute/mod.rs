//! Named, typed attributes and their manager.
//!
//! An [`Attribute`] holds a current value, an immutable default and an
//! optional frozen snapshot, plus [`Behavior`] flags that control visibility,
//! message access, freezing, saving and change notification.
//!
//! The kind of value an attribute accepts is a tagged [`AttrKind`]; each kind
//! validates input its own way and silently ignores what it cannot use:
//!
//! | kind | accepts |
//! |------|---------|
//! | `Bool` | a number, stored as 0/1 |
//! | `Long` | a number, truncated |
//! | `Double` | a number |
//! | `Tag` | a tag |
//! | `Enum` | an index (clipped) or one of the enum tags |
//! | `Color` | 4 channels clipped to \[0, 1\], missing RGB → 0, alpha → 1 |
//! | `Rect` | 4 numbers, missing → 0 |
//! | `Point` | 2 numbers, missing → 0 |

mod manager;

pub use manager::{AttributeEvent, AttributeListener, AttributeManager};

use crate::dico::Dico;
use crate::element::{ElemVector, Element};
use crate::tag::Tag;

/// Attribute behavior flags.
///
/// Use [`union`](Self::union) to combine and [`without`](Self::without) to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Behavior(u8);

impl Behavior {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Hidden from inspectors and category queries.
    pub const INVISIBLE: Self = Self(1 << 0);
    /// Cannot be changed through messages.
    pub const DISABLED: Self = Self(1 << 1);
    /// Cannot be frozen.
    pub const NOT_FREEZABLE: Self = Self(1 << 2);
    /// Skipped when writing a description (unless frozen).
    pub const NOT_SAVEABLE: Self = Self(1 << 3);
    /// Changes are not broadcast to listeners.
    pub const NOT_NOTIFY_CHANGES: Self = Self(1 << 4);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` with the bits of `other` cleared.
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// The value shape an attribute accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    /// Boolean stored as a long 0/1.
    Bool,
    /// Integer.
    Long,
    /// Floating point number.
    Double,
    /// Symbol.
    Tag,
    /// Index into the listed tags.
    Enum(Vec<Tag>),
    /// RGBA, each channel in \[0, 1\].
    Color,
    /// x, y, width, height.
    Rect,
    /// x, y.
    Point,
}

impl AttrKind {
    /// Validates `elements` against this kind.
    ///
    /// Returns the normalised value, or `None` when the input is ignored.
    pub fn coerce(&self, elements: &[Element]) -> Option<ElemVector> {
        let first = elements.first();
        match self {
            Self::Bool => first
                .and_then(Element::as_long)
                .map(|value| vec![Element::Long(i64::from(value != 0))]),
            Self::Long => first
                .and_then(Element::as_long)
                .map(|value| vec![Element::Long(value)]),
            Self::Double => first
                .and_then(Element::as_double)
                .map(|value| vec![Element::Double(value)]),
            Self::Tag => first
                .and_then(Element::as_tag)
                .map(|tag| vec![Element::Tag(tag.clone())]),
            Self::Enum(values) => {
                if values.is_empty() {
                    return None;
                }
                let index = match first? {
                    Element::Tag(tag) => values.iter().position(|value| value == tag)? as i64,
                    other => other.as_long()?.clamp(0, values.len() as i64 - 1),
                };
                Some(vec![Element::Long(index)])
            }
            Self::Color => Some(
                (0..4)
                    .map(|channel| {
                        let value = elements
                            .get(channel)
                            .and_then(Element::as_double)
                            .map_or(if channel < 3 { 0.0 } else { 1.0 }, |v| v.clamp(0.0, 1.0));
                        Element::Double(value)
                    })
                    .collect(),
            ),
            Self::Rect => Some(numbers_or_zero(elements, 4)),
            Self::Point => Some(numbers_or_zero(elements, 2)),
        }
    }
}

fn numbers_or_zero(elements: &[Element], count: usize) -> ElemVector {
    (0..count)
        .map(|i| Element::Double(elements.get(i).and_then(Element::as_double).unwrap_or(0.0)))
        .collect()
}

/// A named, typed, mutable value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: Tag,
    kind: AttrKind,
    value: ElemVector,
    default: ElemVector,
    frozen: ElemVector,
    behavior: Behavior,
    label: String,
    category: String,
}

impl Attribute {
    /// Creates an attribute whose default is `default` coerced by `kind`.
    ///
    /// If `kind` rejects `default`, the default is empty until the first
    /// accepted `set`.
    pub fn new(name: impl Into<Tag>, kind: AttrKind, default: &[Element]) -> Self {
        let value = kind.coerce(default).unwrap_or_default();
        Self {
            name: name.into(),
            kind,
            default: value.clone(),
            value,
            frozen: ElemVector::new(),
            behavior: Behavior::NONE,
            label: String::new(),
            category: String::new(),
        }
    }

    /// Boolean attribute.
    pub fn boolean(name: impl Into<Tag>, default: bool) -> Self {
        Self::new(name, AttrKind::Bool, &[Element::from(default)])
    }

    /// Integer attribute.
    pub fn long(name: impl Into<Tag>, default: i64) -> Self {
        Self::new(name, AttrKind::Long, &[Element::from(default)])
    }

    /// Floating point attribute.
    pub fn double(name: impl Into<Tag>, default: f64) -> Self {
        Self::new(name, AttrKind::Double, &[Element::from(default)])
    }

    /// Symbol attribute.
    pub fn tag(name: impl Into<Tag>, default: &str) -> Self {
        Self::new(name, AttrKind::Tag, &[Element::from(default)])
    }

    /// Enumeration attribute over `values`, starting at index `default`.
    pub fn enumeration(name: impl Into<Tag>, values: &[&str], default: usize) -> Self {
        let values = values.iter().map(|value| Tag::new(value)).collect();
        Self::new(name, AttrKind::Enum(values), &[Element::from(default)])
    }

    /// RGBA color attribute.
    pub fn color(name: impl Into<Tag>, default: [f64; 4]) -> Self {
        Self::new(name, AttrKind::Color, &default.map(Element::from))
    }

    /// Rectangle attribute.
    pub fn rect(name: impl Into<Tag>, default: [f64; 4]) -> Self {
        Self::new(name, AttrKind::Rect, &default.map(Element::from))
    }

    /// Point attribute.
    pub fn point(name: impl Into<Tag>, default: [f64; 2]) -> Self {
        Self::new(name, AttrKind::Point, &default.map(Element::from))
    }

    /// Sets the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the category used for grouping.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the behavior flags.
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Value kind.
    pub fn kind(&self) -> &AttrKind {
        &self.kind
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Category name.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Behavior flags.
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Replaces the behavior flags. Returns `true` if they changed.
    pub fn set_behavior(&mut self, behavior: Behavior) -> bool {
        let changed = self.behavior != behavior;
        self.behavior = behavior;
        changed
    }

    /// Hidden from inspectors.
    pub fn is_invisible(&self) -> bool {
        self.behavior.contains(Behavior::INVISIBLE)
    }

    /// Refuses message-driven changes.
    pub fn is_disabled(&self) -> bool {
        self.behavior.contains(Behavior::DISABLED)
    }

    /// Written to descriptions.
    pub fn is_saveable(&self) -> bool {
        !self.behavior.contains(Behavior::NOT_SAVEABLE)
    }

    /// Can be frozen.
    pub fn is_freezable(&self) -> bool {
        !self.behavior.contains(Behavior::NOT_FREEZABLE)
    }

    /// Broadcasts changes.
    pub fn should_notify_changes(&self) -> bool {
        !self.behavior.contains(Behavior::NOT_NOTIFY_CHANGES)
    }

    /// The logical value: the frozen snapshot when frozen, the live value otherwise.
    pub fn get(&self) -> ElemVector {
        if self.is_frozen() {
            self.frozen.clone()
        } else {
            self.value.clone()
        }
    }

    /// The live value, ignoring any frozen snapshot.
    pub fn current(&self) -> &[Element] {
        &self.value
    }

    /// The default value.
    pub fn default_value(&self) -> &[Element] {
        &self.default
    }

    /// Sets the value. Malformed input is ignored.
    ///
    /// Returns `true` if the live value changed.
    pub fn set(&mut self, elements: &[Element]) -> bool {
        match self.kind.coerce(elements) {
            Some(value) if value != self.value => {
                self.value = value;
                true
            }
            _ => false,
        }
    }

    /// Restores the default value. Returns `true` if the value changed.
    pub fn reset(&mut self) -> bool {
        let default = self.default.clone();
        self.set(&default)
    }

    /// Freezes (snapshots the live value) or unfreezes the attribute.
    ///
    /// Returns `false` when freezing a [`Behavior::NOT_FREEZABLE`] attribute.
    pub fn freeze(&mut self, frozen: bool) -> bool {
        if !frozen {
            self.frozen.clear();
            return true;
        }
        if !self.is_freezable() {
            return false;
        }
        self.frozen = self.value.clone();
        true
    }

    /// Returns `true` while a frozen snapshot exists.
    pub fn is_frozen(&self) -> bool {
        !self.frozen.is_empty()
    }

    /// The frozen snapshot (empty when not frozen).
    pub fn frozen_value(&self) -> &[Element] {
        &self.frozen
    }

    /// Writes the attribute into `dico`.
    ///
    /// Saveable attributes write their live value; a frozen attribute always
    /// writes its snapshot, even when not saveable.
    pub fn write(&self, dico: &mut Dico) {
        if self.is_frozen() {
            dico.set(self.name.clone(), self.frozen.clone());
        } else if self.is_saveable() {
            dico.set(self.name.clone(), self.value.clone());
        }
    }

    /// Reads the attribute from `dico` if it has an entry.
    ///
    /// Returns `true` if the value changed.
    pub fn read(&mut self, dico: &Dico) -> bool {
        match dico.get(self.name.clone()) {
            Some(values) => {
                let values = values.clone();
                self.set(&values)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_ignores_non_numeric_input() {
        let mut attr = Attribute::boolean("hidden", false);
        assert!(!attr.set(&[Element::from("yes")]));
        assert_eq!(attr.get(), vec![Element::Long(0)]);
        assert!(attr.set(&[Element::from(3.7)]));
        assert_eq!(attr.get(), vec![Element::Long(1)]);
    }

    #[test]
    fn color_clips_and_defaults_channels() {
        let mut attr = Attribute::color("bgcolor", [1.0, 1.0, 1.0, 1.0]);
        attr.set(&[Element::from(2.0), Element::from("red"), Element::from(-1)]);
        assert_eq!(
            attr.get(),
            vec![
                Element::Double(1.0),
                Element::Double(0.0),
                Element::Double(0.0),
                Element::Double(1.0),
            ]
        );
    }

    #[test]
    fn enum_accepts_index_or_tag() {
        let mut attr = Attribute::enumeration("face", &["regular", "bold", "italic"], 0);
        attr.set(&[Element::from(9)]);
        assert_eq!(attr.get(), vec![Element::Long(2)]);
        attr.set(&[Element::from("bold")]);
        assert_eq!(attr.get(), vec![Element::Long(1)]);
        assert!(!attr.set(&[Element::from("underline")]));
    }

    #[test]
    fn point_fills_missing_with_zero() {
        let mut attr = Attribute::point("position", [5.0, 5.0]);
        attr.set(&[Element::from(12)]);
        assert_eq!(attr.get(), vec![Element::Double(12.0), Element::Double(0.0)]);
    }

    #[test]
    fn freeze_snapshots_and_unfreeze_clears() {
        let mut attr = Attribute::double("gain", 0.5);
        assert!(!attr.is_frozen());
        assert!(attr.freeze(true));
        assert!(attr.is_frozen());
        attr.set(&[Element::from(0.9)]);
        assert_eq!(attr.get(), vec![Element::Double(0.5)]);
        assert_eq!(attr.current(), &[Element::Double(0.9)]);
        attr.freeze(false);
        assert!(!attr.is_frozen());
        assert!(attr.frozen_value().is_empty());
        assert_eq!(attr.get(), vec![Element::Double(0.9)]);
    }

    #[test]
    fn not_freezable_refuses_freeze() {
        let mut attr = Attribute::long("count", 0).with_behavior(Behavior::NOT_FREEZABLE);
        assert!(!attr.freeze(true));
        assert!(!attr.is_frozen());
    }

    #[test]
    fn write_skips_unsaveable_unless_frozen() {
        let mut attr = Attribute::long("count", 4).with_behavior(Behavior::NOT_SAVEABLE);
        let mut dico = Dico::new();
        attr.write(&mut dico);
        assert!(!dico.has("count"));

        attr.freeze(true);
        attr.set(&[Element::from(8)]);
        attr.write(&mut dico);
        assert_eq!(dico.get_one("count"), Some(&Element::Long(4)));
    }

    #[test]
    fn reset_restores_default() {
        let mut attr = Attribute::long("size", 3);
        attr.set(&[Element::from(10)]);
        assert!(attr.reset());
        assert_eq!(attr.get(), vec![Element::Long(3)]);
    }

    #[test]
    fn behavior_flags_combine() {
        let flags = Behavior::INVISIBLE.union(Behavior::DISABLED);
        assert!(flags.contains(Behavior::INVISIBLE));
        assert!(!flags.without(Behavior::INVISIBLE).contains(Behavior::INVISIBLE));
        assert!(flags.without(Behavior::INVISIBLE).contains(Behavior::DISABLED));
    }
}
