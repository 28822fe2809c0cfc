//! Signal processing: the capability objects implement and the compiler that
//! schedules them.
//!
//! A [`DspContext`] is built from a page's current boxes and links every time
//! DSP starts. Objects whose kind exposes a [`Process`] become nodes; links
//! between two such objects whose sockets both carry signal become
//! connections between per-socket buffers. Compilation orders the nodes
//! topologically and flattens the result into a list of [`DspStep`]s that
//! [`DspContext::tick`] runs once per block.

mod context;
mod schedule;

pub use context::DspContext;
pub use schedule::DspStep;

/// Audio sample type.
pub type Sample = f32;

/// Settings handed to every process when a context compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DspInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per block.
    pub block_size: usize,
    /// Number of this node's signal inlets that have at least one source.
    pub connected_inputs: usize,
    /// Number of this node's signal outlets that have at least one receiver.
    pub connected_outputs: usize,
}

/// Signal processing capability of an object kind.
///
/// `inputs` has one buffer per signal inlet, `outputs` one per signal
/// outlet, each `block_size` samples long. Inputs are the sum of every
/// connected source; unconnected inputs are silent.
pub trait Process: Send + Sync {
    /// Called when a context compiles, before the first block.
    fn prepare(&self, info: &DspInfo) {
        let _ = info;
    }

    /// Processes one block.
    fn perform(&self, inputs: &[Vec<Sample>], outputs: &mut [Vec<Sample>]);

    /// Called when the context stops.
    fn release(&self) {}
}
