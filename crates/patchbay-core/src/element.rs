//! Message atoms.
//!
//! An [`Element`] is one atom of a message: a long, a double, a [`Tag`] or a
//! nested [`Dico`]. An [`ElemVector`] is the universal payload carried by
//! links, stored by attributes and persisted in descriptions.

use std::fmt;

use crate::dico::Dico;
use crate::tag::Tag;

/// Ordered sequence of elements. The payload of every message.
pub type ElemVector = Vec<Element>;

/// A single message atom.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Signed integer.
    Long(i64),
    /// Floating point number.
    Double(f64),
    /// Interned symbol.
    Tag(Tag),
    /// Nested description.
    Dico(Box<Dico>),
}

impl Element {
    /// Parses a whitespace-free token: long, then double, then tag.
    pub fn parse(token: &str) -> Self {
        if let Ok(value) = token.parse::<i64>() {
            Self::Long(value)
        } else if let Ok(value) = token.parse::<f64>() {
            Self::Double(value)
        } else {
            Self::Tag(Tag::new(token))
        }
    }

    /// Returns `true` for [`Element::Long`].
    #[inline]
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long(_))
    }

    /// Returns `true` for [`Element::Double`].
    #[inline]
    pub fn is_double(&self) -> bool {
        matches!(self, Self::Double(_))
    }

    /// Returns `true` for longs and doubles.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Long(_) | Self::Double(_))
    }

    /// Returns `true` for [`Element::Tag`].
    #[inline]
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag(_))
    }

    /// Returns `true` for [`Element::Dico`].
    #[inline]
    pub fn is_dico(&self) -> bool {
        matches!(self, Self::Dico(_))
    }

    /// Numeric value as a long (doubles are truncated toward zero).
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(value) => Some(*value),
            Self::Double(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// Numeric value as a double.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Long(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// The tag, if this element is one.
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// The nested description, if this element is one.
    pub fn as_dico(&self) -> Option<&Dico> {
        match self {
            Self::Dico(dico) => Some(dico),
            _ => None,
        }
    }

    /// Returns `true` if this element is the tag `name`.
    pub fn is_tag_named(&self, name: &str) -> bool {
        self.as_tag().is_some_and(|tag| tag.as_str() == name)
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<u64> for Element {
    fn from(value: u64) -> Self {
        Self::Long(value as i64)
    }
}

impl From<usize> for Element {
    fn from(value: usize) -> Self {
        Self::Long(value as i64)
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Self::Long(i64::from(value))
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<f32> for Element {
    fn from(value: f32) -> Self {
        Self::Double(f64::from(value))
    }
}

impl From<Tag> for Element {
    fn from(tag: Tag) -> Self {
        Self::Tag(tag)
    }
}

impl From<&str> for Element {
    fn from(name: &str) -> Self {
        Self::Tag(Tag::new(name))
    }
}

impl From<Dico> for Element {
    fn from(dico: Dico) -> Self {
        Self::Dico(Box::new(dico))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value:?}"),
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Dico(dico) => write!(f, "{dico}"),
        }
    }
}

/// Formats a vector as space separated atoms, the way a console prints messages.
pub fn format_elements(elements: &[Element]) -> String {
    elements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
