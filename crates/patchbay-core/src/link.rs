//! Edges between boxes.
//!
//! A [`Link`] names an outlet of one box and an inlet of another. Its
//! endpoints are weak: the page owns both the link and the boxes. A link goes
//! through three states, `Unconnected -> Connected -> Disconnected`, and the
//! last one is terminal.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::dico::{Dico, keys};
use crate::element::Element;
use crate::object::Object;
use crate::page::Page;

/// Connection state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Constructed, not registered with its sockets yet.
    Unconnected,
    /// Registered with both sockets.
    Connected,
    /// Torn down. Terminal.
    Disconnected,
}

#[derive(Debug, Clone)]
struct Endpoint {
    object: Weak<Object>,
    index: usize,
}

impl Endpoint {
    fn new(object: &Arc<Object>, index: usize) -> Self {
        Self {
            object: Arc::downgrade(object),
            index,
        }
    }

    fn is(&self, object: &Arc<Object>) -> bool {
        Weak::ptr_eq(&self.object, &Arc::downgrade(object))
    }
}

/// A directed edge `from.outlet -> to.inlet`.
#[derive(Debug)]
pub struct Link {
    from: Endpoint,
    to: Endpoint,
    state: Mutex<LinkState>,
}

impl Link {
    /// Creates an unconnected link.
    pub fn new(from: &Arc<Object>, outlet: usize, to: &Arc<Object>, inlet: usize) -> Self {
        Self {
            from: Endpoint::new(from, outlet),
            to: Endpoint::new(to, inlet),
            state: Mutex::new(LinkState::Unconnected),
        }
    }

    /// Creates a link from `{"from": [id, outlet], "to": [id, inlet]}`,
    /// resolving ids on `page`.
    ///
    /// Returns `None` (and logs) if the description is malformed, a box is
    /// missing or the link would not be valid.
    pub fn from_dico(page: &Page, dico: &Dico) -> Option<Link> {
        let from = endpoint_pair(dico, keys::FROM);
        let to = endpoint_pair(dico, keys::TO);
        let (Some((from_id, outlet)), Some((to_id, inlet))) = (from, to) else {
            tracing::warn!("invalid link description: {dico}");
            return None;
        };
        let (Some(source), Some(dest)) = (page.box_by_id(from_id), page.box_by_id(to_id)) else {
            tracing::warn!(from = from_id, to = to_id, "link refers to a missing box");
            return None;
        };
        let link = Link::new(&source, outlet, &dest, inlet);
        if !link.is_valid() {
            tracing::warn!(
                from = from_id,
                outlet,
                to = to_id,
                inlet,
                "link description isn't valid"
            );
            return None;
        }
        Some(link)
    }

    /// Builds the replacement of `link` after `old` was swapped for `new`.
    ///
    /// The endpoint that was `old` now points at `new` with the same socket
    /// index; the other endpoint is kept. Returns `None` if `link` does not
    /// touch `old` or `new` lacks the socket.
    pub fn replaced(link: &Link, old: &Arc<Object>, new: &Arc<Object>) -> Option<Link> {
        let (from, to) = if link.from.is(old) {
            if link.from.index >= new.outlet_count() {
                return None;
            }
            (Endpoint::new(new, link.from.index), link.to.clone())
        } else if link.to.is(old) {
            if link.to.index >= new.inlet_count() {
                return None;
            }
            (link.from.clone(), Endpoint::new(new, link.to.index))
        } else {
            return None;
        };
        Some(Link {
            from,
            to,
            state: Mutex::new(LinkState::Unconnected),
        })
    }

    /// Source box, if still alive.
    pub fn from(&self) -> Option<Arc<Object>> {
        self.from.object.upgrade()
    }

    /// Destination box, if still alive.
    pub fn to(&self) -> Option<Arc<Object>> {
        self.to.object.upgrade()
    }

    /// Source outlet index.
    pub fn outlet(&self) -> usize {
        self.from.index
    }

    /// Destination inlet index.
    pub fn inlet(&self) -> usize {
        self.to.index
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Returns `true` while registered with both sockets.
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Returns `true` if either endpoint is `object`.
    pub fn touches(&self, object: &Arc<Object>) -> bool {
        self.from.is(object) || self.to.is(object)
    }

    /// Returns `true` if the endpoints are structurally sound.
    ///
    /// Both boxes alive and distinct, on the same live page, with both socket
    /// indices in range. Independent of connection state.
    pub fn is_valid(&self) -> bool {
        let (Some(from), Some(to)) = (self.from(), self.to()) else {
            return false;
        };
        !Arc::ptr_eq(&from, &to)
            && from.page().is_some()
            && Weak::ptr_eq(from.page_ref(), to.page_ref())
            && self.from.index < from.outlet_count()
            && self.to.index < to.inlet_count()
    }

    /// Returns `true` if [`connect`](Self::connect) would succeed now.
    pub fn is_connectable(&self) -> bool {
        if self.state() != LinkState::Unconnected {
            return false;
        }
        match (self.from(), self.to()) {
            (Some(from), Some(to)) => Object::compatible(&from, self.from.index, &to, self.to.index),
            _ => false,
        }
    }

    /// Registers the link with its outlet, then its inlet.
    ///
    /// If the inlet registration fails the outlet registration is rolled
    /// back, so a failed connect leaves no trace. Only an unconnected link
    /// can connect.
    pub fn connect(&self) -> bool {
        let mut state = self.state.lock();
        if *state != LinkState::Unconnected {
            return false;
        }
        let (Some(from), Some(to)) = (self.from(), self.to()) else {
            return false;
        };
        if !Object::compatible(&from, self.from.index, &to, self.to.index) {
            return false;
        }
        let (Some(outlet), Some(inlet)) = (from.outlet(self.from.index), to.inlet(self.to.index))
        else {
            return false;
        };
        if !outlet.add_connection(&to, self.to.index) {
            return false;
        }
        if !inlet.add_connection(&from, self.from.index) {
            outlet.remove_connection(&to, self.to.index);
            return false;
        }
        *state = LinkState::Connected;
        true
    }

    /// Tears the link down.
    ///
    /// Returns `true` if the link was connected and is now torn down. The
    /// state ends as [`LinkState::Disconnected`] either way.
    pub fn disconnect(&self) -> bool {
        let mut state = self.state.lock();
        let was_connected = *state == LinkState::Connected;
        *state = LinkState::Disconnected;
        if !was_connected {
            return false;
        }
        if let (Some(from), Some(to)) = (self.from(), self.to()) {
            if let Some(outlet) = from.outlet(self.from.index) {
                outlet.remove_connection(&to, self.to.index);
            }
            if let Some(inlet) = to.inlet(self.to.index) {
                inlet.remove_connection(&from, self.from.index);
            }
        }
        true
    }

    /// Writes `{"from": [id, outlet], "to": [id, inlet]}`.
    ///
    /// Nothing is written if an endpoint is gone.
    pub fn write(&self, dico: &mut Dico) {
        if let (Some(from), Some(to)) = (self.from(), self.to()) {
            dico.set(
                keys::FROM,
                vec![Element::from(from.id()), Element::from(self.from.index)],
            );
            dico.set(
                keys::TO,
                vec![Element::from(to.id()), Element::from(self.to.index)],
            );
        }
    }
}

/// Reads a `[box id, socket index]` pair.
pub(crate) fn endpoint_pair(dico: &Dico, key: &str) -> Option<(u64, usize)> {
    match dico.get(key)?.as_slice() {
        [id, index] => {
            let id = id.as_long().filter(|id| *id >= 0)?;
            let index = index.as_long().filter(|index| *index >= 0)?;
            Some((id as u64, index as usize))
        }
        _ => None,
    }
}
