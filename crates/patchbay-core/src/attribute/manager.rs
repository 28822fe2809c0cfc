//! Attribute storage keyed by name.
//!
//! The manager owns its attributes behind one mutex. Listeners are held
//! weakly and are notified after the lock is released, so a listener may
//! read or write attributes from inside its callback.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{Attribute, Behavior};
use crate::dico::Dico;
use crate::element::{ElemVector, Element};
use crate::tag::Tag;

/// What happened to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeEvent {
    /// The attribute was added.
    Created,
    /// The attribute was removed.
    Removed,
    /// The value changed.
    ValueChanged,
    /// The behavior flags changed.
    BehaviorChanged,
}

/// Receives attribute notifications from an [`AttributeManager`].
///
/// Callbacks run synchronously on the thread that made the change.
pub trait AttributeListener: Send + Sync {
    /// Called after `attribute` was created, removed or changed.
    fn attribute_changed(&self, event: AttributeEvent, attribute: &Attribute);
}

/// Mutex-guarded map from attribute name to [`Attribute`].
#[derive(Default)]
pub struct AttributeManager {
    attributes: Mutex<HashMap<Tag, Attribute>>,
    listeners: Mutex<Vec<Weak<dyn AttributeListener>>>,
}

impl AttributeManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager that notifies `listener`.
    pub fn with_listener(listener: Weak<dyn AttributeListener>) -> Self {
        let manager = Self::new();
        manager.listeners.lock().push(listener);
        manager
    }

    /// Adds an attribute. Returns `false` if the name is already taken.
    pub fn add_attribute(&self, attribute: Attribute) -> bool {
        let snapshot = {
            let mut attributes = self.attributes.lock();
            if attributes.contains_key(attribute.name()) {
                tracing::warn!(attribute = %attribute.name(), "attribute already exists");
                return false;
            }
            let snapshot = attribute.clone();
            attributes.insert(attribute.name().clone(), attribute);
            snapshot
        };
        self.notify(AttributeEvent::Created, &snapshot);
        true
    }

    /// Removes an attribute. Returns `false` if it was unknown.
    pub fn remove_attribute(&self, name: impl Into<Tag>) -> bool {
        let removed = self.attributes.lock().remove(&name.into());
        match removed {
            Some(attribute) => {
                self.notify(AttributeEvent::Removed, &attribute);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if an attribute with this name exists (visible or not).
    pub fn has_attribute(&self, name: impl Into<Tag>) -> bool {
        self.attributes.lock().contains_key(&name.into())
    }

    /// Snapshot of a visible attribute. Invisible attributes are not returned.
    pub fn attribute(&self, name: impl Into<Tag>) -> Option<Attribute> {
        self.attributes
            .lock()
            .get(&name.into())
            .filter(|attribute| !attribute.is_invisible())
            .cloned()
    }

    /// Logical value of an attribute, visible or not.
    pub fn attribute_value(&self, name: impl Into<Tag>) -> Option<ElemVector> {
        self.attributes.lock().get(&name.into()).map(Attribute::get)
    }

    /// Sets an attribute value.
    ///
    /// Returns `false` only if the name is unknown. A `true` result does not
    /// mean the value changed: malformed input is ignored silently.
    pub fn set_attribute_value(&self, name: impl Into<Tag>, elements: &[Element]) -> bool {
        let changed = {
            let mut attributes = self.attributes.lock();
            let Some(attribute) = attributes.get_mut(&name.into()) else {
                return false;
            };
            (attribute.set(elements) && attribute.should_notify_changes())
                .then(|| attribute.clone())
        };
        if let Some(snapshot) = changed {
            self.notify(AttributeEvent::ValueChanged, &snapshot);
        }
        true
    }

    /// Replaces an attribute's behavior flags. Returns `false` if unknown.
    pub fn set_attribute_behavior(&self, name: impl Into<Tag>, behavior: Behavior) -> bool {
        let changed = {
            let mut attributes = self.attributes.lock();
            let Some(attribute) = attributes.get_mut(&name.into()) else {
                return false;
            };
            attribute.set_behavior(behavior).then(|| attribute.clone())
        };
        if let Some(snapshot) = changed {
            self.notify(AttributeEvent::BehaviorChanged, &snapshot);
        }
        true
    }

    /// Freezes or unfreezes an attribute.
    ///
    /// Returns `false` if the name is unknown or the attribute refuses to freeze.
    pub fn freeze_attribute(&self, name: impl Into<Tag>, frozen: bool) -> bool {
        self.attributes
            .lock()
            .get_mut(&name.into())
            .is_some_and(|attribute| attribute.freeze(frozen))
    }

    /// Restores an attribute's default value. Returns `false` if unknown.
    pub fn reset_attribute(&self, name: impl Into<Tag>) -> bool {
        let default = {
            let attributes = self.attributes.lock();
            let Some(attribute) = attributes.get(&name.into()) else {
                return false;
            };
            (attribute.name().clone(), attribute.default_value().to_vec())
        };
        self.set_attribute_value(default.0, &default.1)
    }

    /// Message-driven mutation: `[name, values...]`.
    ///
    /// Returns `true` if `elements[0]` names an attribute that accepts
    /// messages (not [`Behavior::DISABLED`]); the remaining elements are then
    /// applied as its new value.
    pub fn receive(&self, elements: &[Element]) -> bool {
        let Some((Element::Tag(name), values)) = elements.split_first() else {
            return false;
        };
        let accepts = self
            .attributes
            .lock()
            .get(name)
            .is_some_and(|attribute| !attribute.is_disabled());
        accepts && self.set_attribute_value(name.clone(), values)
    }

    /// Names of all attributes, sorted.
    pub fn names(&self) -> Vec<Tag> {
        let mut names: Vec<Tag> = self.attributes.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted, de-duplicated categories of visible attributes.
    pub fn categories(&self) -> Vec<String> {
        self.attributes
            .lock()
            .values()
            .filter(|attribute| !attribute.is_invisible())
            .map(|attribute| attribute.category().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted names of the visible attributes in `category`.
    pub fn attributes_in_category(&self, category: &str) -> Vec<Tag> {
        let mut names: Vec<Tag> = self
            .attributes
            .lock()
            .values()
            .filter(|attribute| !attribute.is_invisible() && attribute.category() == category)
            .map(|attribute| attribute.name().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.lock().len()
    }

    /// Returns `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.lock().is_empty()
    }

    /// Reads every attribute that has an entry in `dico`.
    pub fn read(&self, dico: &Dico) {
        let changed: Vec<Attribute> = {
            let mut attributes = self.attributes.lock();
            attributes
                .values_mut()
                .filter_map(|attribute| {
                    (attribute.read(dico) && attribute.should_notify_changes())
                        .then(|| attribute.clone())
                })
                .collect()
        };
        for attribute in &changed {
            self.notify(AttributeEvent::ValueChanged, attribute);
        }
    }

    /// Writes every saveable (or frozen) attribute into `dico`.
    pub fn write(&self, dico: &mut Dico) {
        for attribute in self.attributes.lock().values() {
            attribute.write(dico);
        }
    }

    /// Registers a listener. Dropped listeners are pruned lazily.
    pub fn bind(&self, listener: Weak<dyn AttributeListener>) {
        self.listeners.lock().push(listener);
    }

    /// Unregisters a listener.
    pub fn unbind(&self, listener: &Weak<dyn AttributeListener>) {
        self.listeners
            .lock()
            .retain(|bound| !Weak::ptr_eq(bound, listener));
    }

    fn notify(&self, event: AttributeEvent, attribute: &Attribute) {
        let listeners: Vec<Arc<dyn AttributeListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|listener| listener.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.attribute_changed(event, attribute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(AttributeEvent, String)>>,
    }

    impl AttributeListener for Recorder {
        fn attribute_changed(&self, event: AttributeEvent, attribute: &Attribute) {
            self.events
                .lock()
                .push((event, attribute.name().to_string()));
        }
    }

    fn manager_with_recorder() -> (AttributeManager, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let weak: Weak<dyn AttributeListener> = Arc::downgrade(&recorder) as Weak<dyn AttributeListener>;
        (AttributeManager::with_listener(weak), recorder)
    }

    #[test]
    fn add_rejects_duplicates() {
        let manager = AttributeManager::new();
        assert!(manager.add_attribute(Attribute::long("size", 1)));
        assert!(!manager.add_attribute(Attribute::long("size", 2)));
        assert_eq!(manager.attribute_value("size"), Some(vec![Element::Long(1)]));
    }

    #[test]
    fn set_unknown_returns_false_and_malformed_returns_true() {
        let manager = AttributeManager::new();
        manager.add_attribute(Attribute::long("size", 1));
        assert!(!manager.set_attribute_value("missing", &[Element::from(1)]));
        assert!(manager.set_attribute_value("size", &[Element::from("oops")]));
        assert_eq!(manager.attribute_value("size"), Some(vec![Element::Long(1)]));
    }

    #[test]
    fn events_fire_for_create_change_behavior_and_remove() {
        let (manager, recorder) = manager_with_recorder();
        manager.add_attribute(Attribute::long("size", 1));
        manager.set_attribute_value("size", &[Element::from(2)]);
        manager.set_attribute_value("size", &[Element::from(2)]);
        manager.set_attribute_behavior("size", Behavior::DISABLED);
        manager.remove_attribute("size");

        let events: Vec<AttributeEvent> =
            recorder.events.lock().iter().map(|(event, _)| *event).collect();
        assert_eq!(
            events,
            [
                AttributeEvent::Created,
                AttributeEvent::ValueChanged,
                AttributeEvent::BehaviorChanged,
                AttributeEvent::Removed,
            ]
        );
    }

    #[test]
    fn silent_attributes_do_not_notify_value_changes() {
        let (manager, recorder) = manager_with_recorder();
        manager.add_attribute(
            Attribute::long("quiet", 0).with_behavior(Behavior::NOT_NOTIFY_CHANGES),
        );
        recorder.events.lock().clear();
        manager.set_attribute_value("quiet", &[Element::from(5)]);
        assert!(recorder.events.lock().is_empty());
        assert_eq!(manager.attribute_value("quiet"), Some(vec![Element::Long(5)]));
    }

    #[test]
    fn receive_treats_first_element_as_name() {
        let manager = AttributeManager::new();
        manager.add_attribute(Attribute::point("position", [0.0, 0.0]));
        let handled = manager.receive(&[
            Element::from("position"),
            Element::from(10),
            Element::from(20),
        ]);
        assert!(handled);
        assert_eq!(
            manager.attribute_value("position"),
            Some(vec![Element::Double(10.0), Element::Double(20.0)])
        );
        assert!(!manager.receive(&[Element::from("unknown"), Element::from(1)]));
        assert!(!manager.receive(&[Element::from(1)]));
        assert!(!manager.receive(&[]));
    }

    #[test]
    fn receive_refuses_disabled_attributes() {
        let manager = AttributeManager::new();
        manager.add_attribute(Attribute::long("locked", 1).with_behavior(Behavior::DISABLED));
        assert!(!manager.receive(&[Element::from("locked"), Element::from(7)]));
        assert_eq!(manager.attribute_value("locked"), Some(vec![Element::Long(1)]));
    }

    #[test]
    fn categories_skip_invisible_attributes() {
        let manager = AttributeManager::new();
        manager.add_attribute(Attribute::long("a", 0).with_category("Appearance"));
        manager.add_attribute(Attribute::long("b", 0).with_category("Color"));
        manager.add_attribute(
            Attribute::long("c", 0)
                .with_category("Secret")
                .with_behavior(Behavior::INVISIBLE),
        );
        assert_eq!(manager.categories(), ["Appearance", "Color"]);
        assert!(manager.attributes_in_category("Secret").is_empty());
        assert!(manager.attribute("c").is_none());
        assert!(manager.has_attribute("c"));
    }

    #[test]
    fn write_then_read_restores_values() {
        let source = AttributeManager::new();
        source.add_attribute(Attribute::double("gain", 0.5));
        source.add_attribute(Attribute::long("scratch", 0).with_behavior(Behavior::NOT_SAVEABLE));
        source.set_attribute_value("gain", &[Element::from(0.25)]);
        source.set_attribute_value("scratch", &[Element::from(9)]);

        let mut dico = Dico::new();
        source.write(&mut dico);
        assert!(!dico.has("scratch"));

        let target = AttributeManager::new();
        target.add_attribute(Attribute::double("gain", 0.5));
        target.read(&dico);
        assert_eq!(target.attribute_value("gain"), Some(vec![Element::Double(0.25)]));
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let (manager, recorder) = manager_with_recorder();
        drop(recorder);
        assert!(manager.add_attribute(Attribute::long("x", 0)));
        assert!(manager.listeners.lock().is_empty());
    }
}
