//! `send` and `receive`: wireless messaging through named beacons.
//!
//! Both boxes take the beacon name as their first argument. The beacon comes
//! from the page, so boxes on pages of the same instance share it.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use patchbay_core::{
    Beacon, Element, Inlet, IoType, Object, ObjectBuilder, ObjectKind, Outlet, Tag,
};

fn beacon_name(builder: &ObjectBuilder<'_>) -> Option<Tag> {
    let name = builder.argument(0).and_then(Element::as_tag).cloned();
    if name.is_none() {
        tracing::warn!(object = %builder.name(), "missing beacon name");
    }
    name
}

/// `send`: forwards everything it receives to a beacon.
pub struct Sender {
    name: Option<Tag>,
    beacon: Mutex<Weak<Beacon>>,
}

impl Sender {
    /// Name of the target beacon.
    pub fn beacon_name(&self) -> Option<&Tag> {
        self.name.as_ref()
    }
}

impl ObjectKind for Sender {
    fn receive(&self, _object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        let Some(beacon) = self.beacon.lock().upgrade() else {
            return false;
        };
        beacon.send(elements);
        true
    }

    fn attach(&self, object: &Arc<Object>) {
        if let (Some(name), Some(page)) = (&self.name, object.page()) {
            *self.beacon.lock() = Arc::downgrade(&page.beacon(name.as_str()));
        }
    }
}

pub(crate) fn send(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    let name = beacon_name(builder);
    builder.add_inlet(Inlet::new(IoType::Message, "message to send"));
    Box::new(Sender {
        name,
        beacon: Mutex::new(Weak::new()),
    })
}

/// `receive`: outputs every message sent to its beacon.
///
/// The binding is weak on both sides, so removing the box from its page is
/// enough to stop delivery.
pub struct Receiver {
    name: Option<Tag>,
    beacon: Mutex<Option<Arc<Beacon>>>,
}

impl Receiver {
    /// Name of the source beacon.
    pub fn beacon_name(&self) -> Option<&Tag> {
        self.name.as_ref()
    }
}

impl ObjectKind for Receiver {
    fn receive(&self, object: &Object, _inlet: usize, elements: &[Element]) -> bool {
        object.send(0, elements);
        true
    }

    fn attach(&self, object: &Arc<Object>) {
        let (Some(name), Some(page)) = (&self.name, object.page()) else {
            return;
        };
        let beacon = page.beacon(name.as_str());
        beacon.bind(object);
        *self.beacon.lock() = Some(beacon);
    }
}

pub(crate) fn receive(builder: &mut ObjectBuilder<'_>) -> Box<dyn ObjectKind> {
    let name = beacon_name(builder);
    builder.add_outlet(Outlet::new(IoType::Message, "received message"));
    Box::new(Receiver {
        name,
        beacon: Mutex::new(None),
    })
}
