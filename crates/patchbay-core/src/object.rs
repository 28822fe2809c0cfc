//! Boxes: nodes of the patch graph.
//!
//! An [`Object`] is identified on its page by `(name, id)`. It owns its
//! sockets, an [`AttributeManager`] and a kind-specific state implementing
//! [`ObjectKind`]. Objects are created by name through the prototype registry
//! and hold only a weak reference to their page.
//!
//! # Message dispatch
//!
//! [`Object::send`] walks an outlet's connections in registration order and
//! hands the message to each receiver's [`Object::deliver`]. Delivery is
//! guarded by a per-object depth counter: at [`STACK_CEILING`] the message is
//! still delivered and a stack overflow is logged, beyond it delivery is
//! suppressed. This bounds message cycles without crashing.
//!
//! Receiving is a two-step contract: the kind's handler runs first, and if it
//! declines the message, `[name, values...]` is tried as an attribute
//! mutation.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::attribute::{Attribute, AttributeListener, AttributeManager};
use crate::dico::{Dico, keys};
use crate::dsp::Process;
use crate::element::{ElemVector, Element, format_elements};
use crate::error::PrototypeError;
use crate::page::Page;
use crate::prototype;
use crate::socket::{Inlet, IoType, Outlet};
use crate::tag::Tag;

/// Maximum live delivery depth per object.
pub const STACK_CEILING: usize = 256;

/// Kind-specific behavior of an object.
///
/// All methods take `&self`: a kind may be re-entered while it is sending, so
/// mutable state lives behind interior mutability.
pub trait ObjectKind: Any + Send + Sync {
    /// Handles a message arriving on `inlet`. Returns `false` if the message
    /// was not understood, in which case it is tried as an attribute message.
    fn receive(&self, object: &Object, inlet: usize, elements: &[Element]) -> bool {
        let _ = (object, inlet, elements);
        false
    }

    /// Adds kind-specific entries to the object's description.
    fn save(&self, dico: &mut Dico) {
        let _ = dico;
    }

    /// Signal processing capability, if any.
    fn process(&self) -> Option<&dyn Process> {
        None
    }

    /// Called once the object is fully built and shared.
    fn attach(&self, object: &Arc<Object>) {
        let _ = object;
    }
}

/// Collects sockets and attributes while a factory builds an object.
pub struct ObjectBuilder<'a> {
    name: Tag,
    description: &'a Dico,
    page: Weak<Page>,
    inlets: Vec<Inlet>,
    outlets: Vec<Outlet>,
    attributes: Vec<Attribute>,
}

impl<'a> ObjectBuilder<'a> {
    fn new(name: Tag, description: &'a Dico, page: Weak<Page>) -> Self {
        Self {
            name,
            description,
            page,
            inlets: Vec::new(),
            outlets: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Prototype name of the object being built.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Full description, inline text already merged.
    pub fn description(&self) -> &Dico {
        self.description
    }

    /// Positional creation arguments.
    pub fn arguments(&self) -> &[Element] {
        self.description
            .get(keys::ARGUMENTS)
            .map_or(&[], Vec::as_slice)
    }

    /// Positional argument `index`.
    pub fn argument(&self, index: usize) -> Option<&Element> {
        self.arguments().get(index)
    }

    /// Page the object is being created on.
    pub fn page(&self) -> Option<Arc<Page>> {
        self.page.upgrade()
    }

    /// Appends an inlet.
    pub fn add_inlet(&mut self, inlet: Inlet) -> &mut Self {
        self.inlets.push(inlet);
        self
    }

    /// Appends an outlet.
    pub fn add_outlet(&mut self, outlet: Outlet) -> &mut Self {
        self.outlets.push(outlet);
        self
    }

    /// Declares a kind-specific attribute.
    pub fn add_attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }
}

/// Decrements the depth counter on every exit path.
struct StackGuard<'a> {
    counter: &'a AtomicUsize,
    depth: usize,
}

impl<'a> StackGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let depth = counter.fetch_add(1, Ordering::AcqRel) + 1;
        Self { counter, depth }
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A box on a page.
pub struct Object {
    name: Tag,
    id: u64,
    text: String,
    page: Weak<Page>,
    inlets: Vec<Inlet>,
    outlets: Vec<Outlet>,
    attributes: AttributeManager,
    stack_count: AtomicUsize,
    kind: Box<dyn ObjectKind>,
}

impl Object {
    /// Creates an object from a description.
    ///
    /// The description must name a registered prototype. An inline `text`
    /// entry is parsed and merged first; explicit entries take precedence
    /// over the text.
    pub(crate) fn create(
        page: Weak<Page>,
        id: u64,
        description: &Dico,
    ) -> Result<Arc<Object>, PrototypeError> {
        let name = description
            .get_tag(keys::NAME)
            .cloned()
            .ok_or(PrototypeError::InvalidDescription)?;
        let factory =
            prototype::factory(&name).ok_or_else(|| PrototypeError::Unknown(name.to_string()))?;

        let mut merged = Dico::new();
        let text = match description.get(keys::TEXT) {
            Some(text) => {
                let text = format_elements(text);
                let mut parsed = Dico::parse_text(&text);
                parsed.remove(keys::NAME);
                merged.merge(&parsed);
                text
            }
            None => creation_text(&name, description.get(keys::ARGUMENTS)),
        };
        merged.merge(description);
        merged.remove(keys::ID);

        let mut builder = ObjectBuilder::new(name.clone(), &merged, page.clone());
        let kind = factory(&mut builder);
        let ObjectBuilder {
            inlets,
            outlets,
            attributes: kind_attributes,
            ..
        } = builder;

        let attributes = AttributeManager::new();
        for attribute in common_attributes().into_iter().chain(kind_attributes) {
            attributes.add_attribute(attribute);
        }
        attributes.read(&merged);

        let object = Arc::new(Object {
            name,
            id,
            text,
            page,
            inlets,
            outlets,
            attributes,
            stack_count: AtomicUsize::new(0),
            kind,
        });
        object.kind.attach(&object);
        Ok(object)
    }

    /// Prototype name.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Id within the owning page.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Creation text, `name args...`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Owning page, if it is still alive.
    pub fn page(&self) -> Option<Arc<Page>> {
        self.page.upgrade()
    }

    pub(crate) fn page_ref(&self) -> &Weak<Page> {
        &self.page
    }

    /// The object's attributes.
    pub fn attributes(&self) -> &AttributeManager {
        &self.attributes
    }

    /// Shortcut for the logical value of an attribute.
    pub fn attribute_value(&self, name: impl Into<Tag>) -> Option<ElemVector> {
        self.attributes.attribute_value(name)
    }

    /// Registers a listener for attribute changes of this object.
    pub fn bind(&self, listener: Weak<dyn AttributeListener>) {
        self.attributes.bind(listener);
    }

    /// Unregisters an attribute listener.
    pub fn unbind(&self, listener: &Weak<dyn AttributeListener>) {
        self.attributes.unbind(listener);
    }

    /// Number of inlets.
    pub fn inlet_count(&self) -> usize {
        self.inlets.len()
    }

    /// Number of outlets.
    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }

    /// Inlet `index`.
    pub fn inlet(&self, index: usize) -> Option<&Inlet> {
        self.inlets.get(index)
    }

    /// Outlet `index`.
    pub fn outlet(&self, index: usize) -> Option<&Outlet> {
        self.outlets.get(index)
    }

    /// All inlets, in order.
    pub fn inlets(&self) -> &[Inlet] {
        &self.inlets
    }

    /// All outlets, in order.
    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    /// Description of inlet `index`.
    pub fn inlet_description(&self, index: usize) -> Option<&str> {
        self.inlet(index).map(Inlet::description)
    }

    /// Description of outlet `index`.
    pub fn outlet_description(&self, index: usize) -> Option<&str> {
        self.outlet(index).map(Outlet::description)
    }

    /// Signal processing capability of the kind.
    pub fn process(&self) -> Option<&dyn Process> {
        self.kind.process()
    }

    /// Returns `true` if the kind takes part in DSP.
    pub fn is_dsp(&self) -> bool {
        self.kind.process().is_some()
    }

    /// Downcasts the kind-specific state.
    pub fn kind<T: ObjectKind>(&self) -> Option<&T> {
        let kind: &dyn Any = self.kind.as_ref();
        kind.downcast_ref::<T>()
    }

    /// Number of signal-carrying inlets before inlet `index`.
    pub fn signal_inlet_index(&self, index: usize) -> Option<usize> {
        signal_index(self.inlets.iter().map(Inlet::kind), index)
    }

    /// Number of signal-carrying outlets before outlet `index`.
    pub fn signal_outlet_index(&self, index: usize) -> Option<usize> {
        signal_index(self.outlets.iter().map(Outlet::kind), index)
    }

    /// Number of signal-carrying inlets.
    pub fn signal_inlet_count(&self) -> usize {
        self.inlets
            .iter()
            .filter(|inlet| inlet.kind().carries_signal())
            .count()
    }

    /// Number of signal-carrying outlets.
    pub fn signal_outlet_count(&self) -> usize {
        self.outlets
            .iter()
            .filter(|outlet| outlet.kind().carries_signal())
            .count()
    }

    /// Sends `elements` through outlet `index` to every connected receiver,
    /// in connection order.
    pub fn send(&self, index: usize, elements: &[Element]) {
        let Some(outlet) = self.outlets.get(index) else {
            tracing::warn!(object = %self.name, id = self.id, outlet = index, "outlet out of range");
            return;
        };
        for connection in outlet.connections() {
            if let Some(receiver) = connection.object.upgrade() {
                receiver.deliver(connection.index, elements);
            }
        }
    }

    /// Delivers a message under the depth guard.
    ///
    /// Returns `true` if the message was handled.
    pub fn deliver(&self, inlet: usize, elements: &[Element]) -> bool {
        let guard = StackGuard::enter(&self.stack_count);
        if guard.depth < STACK_CEILING {
            self.receive(inlet, elements)
        } else if guard.depth == STACK_CEILING {
            tracing::error!(object = %self.name, id = self.id, inlet, "stack overflow");
            self.receive(inlet, elements)
        } else {
            tracing::debug!(object = %self.name, id = self.id, inlet, "delivery suppressed");
            false
        }
    }

    /// Receives a message without the depth guard.
    ///
    /// The kind's handler runs first; an unhandled message is tried as
    /// `[attribute, values...]`.
    pub fn receive(&self, inlet: usize, elements: &[Element]) -> bool {
        if self.kind.receive(self, inlet, elements) {
            return true;
        }
        self.attributes.receive(elements)
    }

    /// Current delivery depth.
    pub fn stack_depth(&self) -> usize {
        self.stack_count.load(Ordering::Acquire)
    }

    /// Returns `true` if `(from, outlet) -> (to, inlet)` may be connected.
    ///
    /// The boxes must be distinct and live on the same page, both indices must
    /// be in range and the edge must not exist yet.
    pub fn compatible(from: &Arc<Object>, outlet: usize, to: &Arc<Object>, inlet: usize) -> bool {
        if Arc::ptr_eq(from, to) {
            return false;
        }
        if from.page.upgrade().is_none() || !Weak::ptr_eq(&from.page, &to.page) {
            return false;
        }
        let (Some(source), Some(_)) = (from.outlet(outlet), to.inlet(inlet)) else {
            return false;
        };
        !source.has_connection(to, inlet)
    }

    /// Writes the object's description.
    pub fn write(&self, dico: &mut Dico) {
        self.attributes.write(dico);
        self.kind.save(dico);
        dico.set_one(keys::NAME, self.name.clone());
        dico.set_one(keys::ID, self.id);
        dico.set_one(keys::TEXT, Tag::new(&self.text));
        dico.set_one(keys::NINLETS, self.inlets.len());
        dico.set_one(keys::NOUTLETS, self.outlets.len());
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("inlets", &self.inlets.len())
            .field("outlets", &self.outlets.len())
            .finish_non_exhaustive()
    }
}

fn signal_index(kinds: impl Iterator<Item = IoType>, index: usize) -> Option<usize> {
    let kinds: Vec<IoType> = kinds.collect();
    if !kinds.get(index)?.carries_signal() {
        return None;
    }
    Some(
        kinds[..index]
            .iter()
            .filter(|kind| kind.carries_signal())
            .count(),
    )
}

fn creation_text(name: &Tag, arguments: Option<&ElemVector>) -> String {
    match arguments {
        Some(arguments) if !arguments.is_empty() => {
            format!("{name} {}", format_elements(arguments))
        }
        _ => name.to_string(),
    }
}

fn common_attributes() -> Vec<Attribute> {
    vec![
        Attribute::point("position", [0.0, 0.0])
            .with_label("Position")
            .with_category("Appearance"),
        Attribute::point("size", [100.0, 20.0])
            .with_label("Size")
            .with_category("Appearance"),
        Attribute::boolean("hidden", false)
            .with_label("Hide on Lock")
            .with_category("Appearance"),
        Attribute::boolean("presentation", false)
            .with_label("Include in Presentation")
            .with_category("Appearance"),
        Attribute::color("bgcolor", [1.0, 1.0, 1.0, 1.0])
            .with_label("Background Color")
            .with_category("Color"),
        Attribute::color("bdcolor", [0.3, 0.3, 0.3, 1.0])
            .with_label("Border Color")
            .with_category("Color"),
        Attribute::color("textcolor", [0.0, 0.0, 0.0, 1.0])
            .with_label("Text Color")
            .with_category("Color"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_index_counts_only_signal_sockets() {
        let kinds = [IoType::Message, IoType::Signal, IoType::Both, IoType::Signal];
        assert_eq!(signal_index(kinds.into_iter(), 0), None);
        assert_eq!(signal_index(kinds.into_iter(), 1), Some(0));
        assert_eq!(signal_index(kinds.into_iter(), 2), Some(1));
        assert_eq!(signal_index(kinds.into_iter(), 3), Some(2));
        assert_eq!(signal_index(kinds.into_iter(), 4), None);
    }

    #[test]
    fn stack_guard_releases_on_drop() {
        let counter = AtomicUsize::new(0);
        {
            let outer = StackGuard::enter(&counter);
            assert_eq!(outer.depth, 1);
            let inner = StackGuard::enter(&counter);
            assert_eq!(inner.depth, 2);
        }
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }

    #[test]
    fn creation_text_joins_arguments() {
        let name = Tag::new("+");
        assert_eq!(creation_text(&name, None), "+");
        assert_eq!(
            creation_text(&name, Some(&vec![Element::from(5), Element::from(0.5)])),
            "+ 5 0.5"
        );
    }

    #[test]
    fn common_attributes_have_expected_defaults() {
        let size = common_attributes()
            .into_iter()
            .find(|attribute| attribute.name().as_str() == "size")
            .map(|attribute| attribute.get());
        assert_eq!(size, Some(vec![Element::Double(100.0), Element::Double(20.0)]));
    }
}
