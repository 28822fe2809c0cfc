//! Compiled schedule steps.
//!
//! A compiled [`DspContext`](super::DspContext) holds a flat list of steps
//! that `tick` executes sequentially. Node indices refer to the context's
//! node list; ports are signal sub-indices.

use std::fmt;

/// A single instruction in the compiled schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspStep {
    /// Zero an input buffer before sources accumulate into it.
    Clear {
        /// Node owning the input.
        node: usize,
        /// Signal inlet sub-index.
        port: usize,
    },

    /// Add a source's output buffer into a destination input buffer.
    Accumulate {
        /// Source node.
        from: usize,
        /// Signal outlet sub-index on the source.
        from_port: usize,
        /// Destination node.
        to: usize,
        /// Signal inlet sub-index on the destination.
        to_port: usize,
    },

    /// Run a node's process on its buffers.
    Perform {
        /// Node to run.
        node: usize,
    },
}

impl fmt::Display for DspStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear { node, port } => write!(f, "clear n{node}.in{port}"),
            Self::Accumulate {
                from,
                from_port,
                to,
                to_port,
            } => write!(f, "acc n{from}.out{from_port} -> n{to}.in{to_port}"),
            Self::Perform { node } => write!(f, "perform n{node}"),
        }
    }
}
