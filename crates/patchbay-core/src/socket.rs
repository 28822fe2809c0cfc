//! Inlets, outlets and the connection records that carry messages.
//!
//! An outlet's connection list is the only place where edge existence lives
//! on the send path. Inlets keep the mirror list so a box can tell who feeds
//! it; both are appended in registration order.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::object::Object;

/// What a socket carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoType {
    /// Control messages only.
    Message,
    /// Audio signal only.
    Signal,
    /// Both messages and signal.
    Both,
}

impl IoType {
    /// Returns `true` if the socket takes part in DSP.
    #[inline]
    pub fn carries_signal(self) -> bool {
        matches!(self, Self::Signal | Self::Both)
    }

    /// Returns `true` if the socket takes part in message dispatch.
    #[inline]
    pub fn carries_messages(self) -> bool {
        matches!(self, Self::Message | Self::Both)
    }

    /// Stable lowercase name, as printed by tools.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Signal => "signal",
            Self::Both => "both",
        }
    }
}

/// Whether a message arriving on an inlet triggers computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Triggers output.
    Hot,
    /// Stores only.
    Cold,
}

/// One end of an edge, seen from the other end.
#[derive(Debug, Clone)]
pub struct Connection {
    /// The box on the other side.
    pub object: Weak<Object>,
    /// Socket index on that box.
    pub index: usize,
}

impl Connection {
    /// Returns `true` if this record points at `object`'s socket `index`.
    pub fn points_to(&self, object: &Arc<Object>, index: usize) -> bool {
        self.index == index && Weak::ptr_eq(&self.object, &Arc::downgrade(object))
    }
}

/// Removes `(object, index)` from `list`. Returns `true` if it was present.
fn remove_connection(list: &Mutex<Vec<Connection>>, object: &Arc<Object>, index: usize) -> bool {
    let mut connections = list.lock();
    let before = connections.len();
    connections.retain(|connection| !connection.points_to(object, index));
    connections.len() != before
}

/// Appends `(object, index)` to `list` unless already present.
fn add_connection(list: &Mutex<Vec<Connection>>, object: &Arc<Object>, index: usize) -> bool {
    let mut connections = list.lock();
    if connections
        .iter()
        .any(|connection| connection.points_to(object, index))
    {
        return false;
    }
    connections.push(Connection {
        object: Arc::downgrade(object),
        index,
    });
    true
}

/// A box input.
#[derive(Debug)]
pub struct Inlet {
    kind: IoType,
    polarity: Polarity,
    description: String,
    connections: Mutex<Vec<Connection>>,
}

impl Inlet {
    /// Creates a hot inlet.
    pub fn new(kind: IoType, description: impl Into<String>) -> Self {
        Self::with_polarity(kind, Polarity::Hot, description)
    }

    /// Creates an inlet with an explicit polarity.
    pub fn with_polarity(kind: IoType, polarity: Polarity, description: impl Into<String>) -> Self {
        Self {
            kind,
            polarity,
            description: description.into(),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// What the inlet carries.
    pub fn kind(&self) -> IoType {
        self.kind
    }

    /// Hot or cold.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sources feeding this inlet, in registration order.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.lock().clone()
    }

    /// Returns `true` if `(object, outlet)` feeds this inlet.
    pub fn has_connection(&self, object: &Arc<Object>, outlet: usize) -> bool {
        self.connections
            .lock()
            .iter()
            .any(|connection| connection.points_to(object, outlet))
    }

    pub(crate) fn add_connection(&self, object: &Arc<Object>, outlet: usize) -> bool {
        add_connection(&self.connections, object, outlet)
    }

    pub(crate) fn remove_connection(&self, object: &Arc<Object>, outlet: usize) -> bool {
        remove_connection(&self.connections, object, outlet)
    }
}

/// A box output.
#[derive(Debug)]
pub struct Outlet {
    kind: IoType,
    description: String,
    connections: Mutex<Vec<Connection>>,
}

impl Outlet {
    /// Creates an outlet.
    pub fn new(kind: IoType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// What the outlet carries.
    pub fn kind(&self) -> IoType {
        self.kind
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Receivers in registration order.
    ///
    /// Returns a snapshot, so receivers may rewire the graph while a message
    /// is being sent.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.lock().clone()
    }

    /// Returns `true` if this outlet already feeds `(object, inlet)`.
    pub fn has_connection(&self, object: &Arc<Object>, inlet: usize) -> bool {
        self.connections
            .lock()
            .iter()
            .any(|connection| connection.points_to(object, inlet))
    }

    pub(crate) fn add_connection(&self, object: &Arc<Object>, inlet: usize) -> bool {
        add_connection(&self.connections, object, inlet)
    }

    pub(crate) fn remove_connection(&self, object: &Arc<Object>, inlet: usize) -> bool {
        remove_connection(&self.connections, object, inlet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_capability() {
        assert!(IoType::Signal.carries_signal());
        assert!(IoType::Both.carries_signal());
        assert!(!IoType::Message.carries_signal());
        assert!(IoType::Both.carries_messages());
        assert!(!IoType::Signal.carries_messages());
    }

    #[test]
    fn inlets_default_to_hot() {
        let inlet = Inlet::new(IoType::Message, "left operand");
        assert_eq!(inlet.polarity(), Polarity::Hot);
        assert_eq!(inlet.description(), "left operand");
        let cold = Inlet::with_polarity(IoType::Message, Polarity::Cold, "right operand");
        assert_eq!(cold.polarity(), Polarity::Cold);
    }
}
