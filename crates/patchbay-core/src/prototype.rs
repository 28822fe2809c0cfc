//! Global registry of object prototypes.
//!
//! Each prototype is a factory function plus a descriptor. Objects are created
//! by name: [`Page::create_box`](crate::Page::create_box) looks the name up
//! here and hands the description to the factory through an
//! [`ObjectBuilder`].
//!
//! The first registration of a name wins; later ones are refused.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::error::PrototypeError;
use crate::object::{ObjectBuilder, ObjectKind};
use crate::tag::Tag;

/// Category of object for organization and listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoxCategory {
    /// Message arithmetic and logic.
    Math,
    /// Audio signal processing.
    Signal,
    /// Message routing and control flow.
    Control,
    /// User-interface controllers.
    Interface,
    /// Printing, inspection and editing helpers.
    Utility,
}

impl BoxCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            BoxCategory::Math => "Math",
            BoxCategory::Signal => "Signal",
            BoxCategory::Control => "Control",
            BoxCategory::Interface => "Interface",
            BoxCategory::Utility => "Utility",
        }
    }
}

/// Describes a registered prototype.
#[derive(Debug, Clone)]
pub struct PrototypeDescriptor {
    /// Name used in descriptions and creation text.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for listing.
    pub category: BoxCategory,
}

/// Builds the kind of a new object from its description.
///
/// The factory declares sockets and attributes on the builder and returns the
/// kind-specific state.
pub type ObjectFactory = fn(&mut ObjectBuilder<'_>) -> Box<dyn ObjectKind>;

#[derive(Clone)]
struct PrototypeEntry {
    descriptor: PrototypeDescriptor,
    factory: ObjectFactory,
}

fn registry() -> &'static RwLock<HashMap<Tag, PrototypeEntry>> {
    static REGISTRY: OnceLock<RwLock<HashMap<Tag, PrototypeEntry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a prototype.
///
/// Fails with [`PrototypeError::AlreadyRegistered`] if the name is taken; the
/// existing prototype stays in place.
pub fn register_prototype(
    descriptor: PrototypeDescriptor,
    factory: ObjectFactory,
) -> Result<(), PrototypeError> {
    let name = Tag::new(descriptor.name);
    let mut entries = registry().write();
    if entries.contains_key(&name) {
        tracing::warn!(object = %name, "the box {name} already exists");
        return Err(PrototypeError::AlreadyRegistered(name.to_string()));
    }
    tracing::debug!(object = %name, "prototype registered");
    entries.insert(
        name,
        PrototypeEntry {
            descriptor,
            factory,
        },
    );
    Ok(())
}

/// Returns `true` if a prototype is registered under `name`.
pub fn has_prototype(name: &str) -> bool {
    registry().read().contains_key(&Tag::new(name))
}

/// Descriptor of the prototype registered under `name`.
pub fn prototype(name: &str) -> Option<PrototypeDescriptor> {
    registry()
        .read()
        .get(&Tag::new(name))
        .map(|entry| entry.descriptor.clone())
}

/// Every registered prototype, sorted by name.
pub fn prototypes() -> Vec<PrototypeDescriptor> {
    let mut all: Vec<PrototypeDescriptor> = registry()
        .read()
        .values()
        .map(|entry| entry.descriptor.clone())
        .collect();
    all.sort_by(|a, b| a.name.cmp(b.name));
    all
}

/// Registered prototypes in `category`, sorted by name.
pub fn prototypes_in_category(category: BoxCategory) -> Vec<PrototypeDescriptor> {
    prototypes()
        .into_iter()
        .filter(|descriptor| descriptor.category == category)
        .collect()
}

pub(crate) fn factory(name: &Tag) -> Option<ObjectFactory> {
    registry().read().get(name).map(|entry| entry.factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl ObjectKind for Inert {}

    fn inert(_builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
        Box::new(Inert)
    }

    fn other(_builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
        Box::new(Inert)
    }

    #[test]
    fn first_registration_wins() {
        let descriptor = PrototypeDescriptor {
            name: "prototype.test.first",
            description: "first",
            category: BoxCategory::Utility,
        };
        assert!(register_prototype(descriptor.clone(), inert).is_ok());

        let second = PrototypeDescriptor {
            description: "second",
            ..descriptor
        };
        assert_eq!(
            register_prototype(second, other),
            Err(PrototypeError::AlreadyRegistered(
                "prototype.test.first".to_string()
            ))
        );
        assert_eq!(
            prototype("prototype.test.first").map(|d| d.description),
            Some("first")
        );
    }

    #[test]
    fn unknown_names_have_no_prototype() {
        assert!(!has_prototype("prototype.test.missing"));
        assert!(prototype("prototype.test.missing").is_none());
    }

    #[test]
    fn listing_is_sorted_and_filterable() {
        for name in ["prototype.test.zeta", "prototype.test.alpha"] {
            let _ = register_prototype(
                PrototypeDescriptor {
                    name,
                    description: "listed",
                    category: BoxCategory::Interface,
                },
                inert,
            );
        }
        let names: Vec<&str> = prototypes_in_category(BoxCategory::Interface)
            .into_iter()
            .map(|d| d.name)
            .filter(|name| name.starts_with("prototype.test."))
            .collect();
        assert_eq!(names, ["prototype.test.alpha", "prototype.test.zeta"]);
    }
}
