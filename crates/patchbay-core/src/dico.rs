//! Nested key/value descriptions.
//!
//! A [`Dico`] maps [`Tag`] keys to [`ElemVector`] values; elements may
//! themselves be dicos, which is how a page stores its `boxes` and `links`
//! arrays. Objects, links and pages read and write themselves against the
//! well-known keys in [`keys`].
//!
//! On disk a dico is JSON: objects map to dicos, single-element vectors to
//! scalars, longer vectors to arrays and tags to strings.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Number, Value};

use crate::element::{ElemVector, Element};
use crate::error::DicoError;
use crate::tag::Tag;

/// Well-known description keys.
pub mod keys {
    /// Prototype name of an object.
    pub const NAME: &str = "name";
    /// Inline creation text of an object.
    pub const TEXT: &str = "text";
    /// Object id within its page.
    pub const ID: &str = "id";
    /// Positional creation arguments.
    pub const ARGUMENTS: &str = "arguments";
    /// Number of inlets (written only).
    pub const NINLETS: &str = "ninlets";
    /// Number of outlets (written only).
    pub const NOUTLETS: &str = "noutlets";
    /// Link source `[box id, outlet]`.
    pub const FROM: &str = "from";
    /// Link destination `[box id, inlet]`.
    pub const TO: &str = "to";
    /// Page wrapper.
    pub const PAGE: &str = "page";
    /// Single object wrapper.
    pub const BOX: &str = "box";
    /// Object array.
    pub const BOXES: &str = "boxes";
    /// Single link wrapper.
    pub const LINK: &str = "link";
    /// Link array.
    pub const LINKS: &str = "links";
}

/// Ordered `Tag -> ElemVector` description.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dico {
    entries: BTreeMap<Tag, ElemVector>,
}

impl Dico {
    /// Creates an empty dico.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the values stored under `key`.
    pub fn get(&self, key: impl Into<Tag>) -> Option<&ElemVector> {
        self.entries.get(&key.into())
    }

    /// Returns the first value stored under `key`.
    pub fn get_one(&self, key: impl Into<Tag>) -> Option<&Element> {
        self.get(key).and_then(|values| values.first())
    }

    /// Returns the first value under `key` as a tag.
    pub fn get_tag(&self, key: impl Into<Tag>) -> Option<&Tag> {
        self.get_one(key).and_then(Element::as_tag)
    }

    /// Returns the first value under `key` as a nested dico.
    pub fn get_dico(&self, key: impl Into<Tag>) -> Option<&Dico> {
        self.get_one(key).and_then(Element::as_dico)
    }

    /// Stores `values` under `key`, replacing any previous entry.
    pub fn set(&mut self, key: impl Into<Tag>, values: ElemVector) {
        self.entries.insert(key.into(), values);
    }

    /// Stores a single value under `key`.
    pub fn set_one(&mut self, key: impl Into<Tag>, value: impl Into<Element>) {
        self.set(key, vec![value.into()]);
    }

    /// Returns `true` if `key` has an entry.
    pub fn has(&self, key: impl Into<Tag>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// Removes the entry under `key`, returning its values.
    pub fn remove(&mut self, key: impl Into<Tag>) -> Option<ElemVector> {
        self.entries.remove(&key.into())
    }

    /// Keys in order.
    pub fn keys(&self) -> Vec<Tag> {
        self.entries.keys().cloned().collect()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &ElemVector)> {
        self.entries.iter()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `other` into `self`, overriding existing keys.
    pub fn merge(&mut self, other: &Dico) {
        for (key, values) in other.iter() {
            self.entries.insert(key.clone(), values.clone());
        }
    }

    /// Parses the inline creation text of an object.
    ///
    /// A JSON object is merged key by key. Anything else is read as
    /// `name arg1 arg2 ... @key v1 v2 ...`: the first token goes under
    /// [`keys::NAME`], plain tokens under [`keys::ARGUMENTS`] and every
    /// `@key` group under `key`.
    pub fn parse_text(text: &str) -> Dico {
        let trimmed = text.trim();
        if trimmed.starts_with('{')
            && let Ok(dico) = Self::from_text(trimmed)
        {
            return dico;
        }

        let mut dico = Dico::new();
        let mut tokens = trimmed.split_whitespace();
        let Some(name) = tokens.next() else {
            return dico;
        };
        dico.set_one(keys::NAME, Tag::new(name));

        let mut key = Tag::new(keys::ARGUMENTS);
        let mut values = ElemVector::new();
        for token in tokens {
            match token.strip_prefix('@') {
                Some(attribute) if !attribute.is_empty() => {
                    Self::flush_group(&mut dico, key, std::mem::take(&mut values));
                    key = Tag::new(attribute);
                }
                _ => values.push(Element::parse(token)),
            }
        }
        Self::flush_group(&mut dico, key, values);
        dico
    }

    fn flush_group(dico: &mut Dico, key: Tag, values: ElemVector) {
        if key.as_str() == keys::ARGUMENTS && values.is_empty() {
            return;
        }
        dico.set(key, values);
    }

    /// Reads a dico from JSON text.
    pub fn from_text(text: &str) -> Result<Dico, DicoError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Writes the dico as pretty-printed JSON text.
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }

    /// Converts a JSON object into a dico.
    pub fn from_json(value: &Value) -> Result<Dico, DicoError> {
        let Value::Object(map) = value else {
            return Err(DicoError::NotAnObject);
        };
        let mut dico = Dico::new();
        for (key, value) in map {
            dico.set(key.as_str(), json_to_elements(key, value)?);
        }
        Ok(dico)
    }

    /// Converts the dico into a JSON object.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, values) in &self.entries {
            let value = match values.as_slice() {
                [single] => element_to_json(single),
                many => Value::Array(many.iter().map(element_to_json).collect()),
            };
            map.insert(key.to_string(), value);
        }
        Value::Object(map)
    }
}

impl fmt::Display for Dico {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn element_to_json(element: &Element) -> Value {
    match element {
        Element::Long(value) => Value::from(*value),
        Element::Double(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
        Element::Tag(tag) => Value::String(tag.to_string()),
        Element::Dico(dico) => dico.to_json(),
    }
}

fn json_to_elements(key: &str, value: &Value) -> Result<ElemVector, DicoError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| json_to_element(key, item))
            .collect(),
        Value::Null => Ok(ElemVector::new()),
        scalar => Ok(vec![json_to_element(key, scalar)?]),
    }
}

fn json_to_element(key: &str, value: &Value) -> Result<Element, DicoError> {
    match value {
        Value::Bool(flag) => Ok(Element::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(long) => Ok(Element::Long(long)),
            None => Ok(Element::Double(number.as_f64().unwrap_or_default())),
        },
        Value::String(text) => Ok(Element::Tag(Tag::new(text))),
        Value::Object(_) => Ok(Element::from(Dico::from_json(value)?)),
        Value::Array(_) | Value::Null => Err(DicoError::InvalidValue {
            key: key.to_string(),
        }),
    }
}
