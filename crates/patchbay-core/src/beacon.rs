//! Named binding points for link-free messaging.
//!
//! A [`Beacon`] is looked up by name in a [`BeaconFactory`]; equal names give
//! the same beacon. Objects bind to it weakly, and [`Beacon::send`] delivers a
//! message to every live bound object through the usual depth guard.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::element::Element;
use crate::object::Object;
use crate::tag::Tag;

/// A named set of weakly bound objects.
#[derive(Debug)]
pub struct Beacon {
    name: Tag,
    objects: Mutex<Vec<Weak<Object>>>,
}

impl Beacon {
    fn new(name: Tag) -> Self {
        Self {
            name,
            objects: Mutex::new(Vec::new()),
        }
    }

    /// The beacon's name.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Binds `object`. Returns `false` if it was already bound.
    pub fn bind(&self, object: &Arc<Object>) -> bool {
        let weak = Arc::downgrade(object);
        let mut objects = self.objects.lock();
        objects.retain(|bound| bound.strong_count() > 0);
        if objects.iter().any(|bound| Weak::ptr_eq(bound, &weak)) {
            return false;
        }
        objects.push(weak);
        true
    }

    /// Unbinds `object`. Returns `false` if it was not bound.
    pub fn unbind(&self, object: &Arc<Object>) -> bool {
        let weak = Arc::downgrade(object);
        let mut objects = self.objects.lock();
        let before = objects.len();
        objects.retain(|bound| !Weak::ptr_eq(bound, &weak));
        objects.len() != before
    }

    /// Live bound objects, in binding order.
    pub fn objects(&self) -> Vec<Arc<Object>> {
        self.objects.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Delivers `elements` to inlet 0 of every live bound object.
    ///
    /// Returns the number of objects that handled the message.
    pub fn send(&self, elements: &[Element]) -> usize {
        self.objects()
            .into_iter()
            .filter(|object| object.deliver(0, elements))
            .count()
    }
}

/// Registry of beacons by name.
#[derive(Debug, Default)]
pub struct BeaconFactory {
    beacons: Mutex<HashMap<Tag, Arc<Beacon>>>,
}

impl BeaconFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The beacon named `name`, created on first use.
    pub fn beacon(&self, name: impl Into<Tag>) -> Arc<Beacon> {
        let name = name.into();
        Arc::clone(
            self.beacons
                .lock()
                .entry(name.clone())
                .or_insert_with(|| Arc::new(Beacon::new(name))),
        )
    }

    /// Names of every beacon created so far, sorted.
    pub fn names(&self) -> Vec<Tag> {
        let mut names: Vec<Tag> = self.beacons.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
