//! DSP context: node collection, topological compile and block execution.
//!
//! Compilation uses Kahn's algorithm with a min-heap of ready nodes, so
//! independent nodes run in registration (page) order and schedules are
//! reproducible. A feedback loop among signal connections fails the compile
//! with the object found on the loop.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use super::schedule::DspStep;
use super::{DspInfo, Sample};
use crate::error::DspError;
use crate::link::Link;
use crate::object::Object;

/// A directed signal connection between node ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DspConnection {
    from: usize,
    from_port: usize,
    to: usize,
    to_port: usize,
}

struct DspNode {
    object: Arc<Object>,
    inputs: Vec<Vec<Sample>>,
    outputs: Vec<Vec<Sample>>,
}

/// A compiled, runnable signal graph.
pub struct DspContext {
    sample_rate: u32,
    block_size: usize,
    nodes: Vec<DspNode>,
    connections: Vec<DspConnection>,
    order: Vec<usize>,
    steps: Vec<DspStep>,
}

impl DspContext {
    /// Builds and compiles a context from a page's boxes and links.
    ///
    /// `objects` must be in page order: it defines the registration order
    /// used to break ties. Every process is prepared on success.
    pub fn compile(
        sample_rate: u32,
        block_size: usize,
        objects: &[Arc<Object>],
        links: &[Arc<Link>],
    ) -> Result<Self, DspError> {
        if sample_rate == 0 || block_size == 0 {
            return Err(DspError::InvalidSettings {
                sample_rate,
                block_size,
            });
        }

        let nodes: Vec<DspNode> = objects
            .iter()
            .filter(|object| object.is_dsp())
            .map(|object| DspNode {
                object: Arc::clone(object),
                inputs: vec![vec![0.0; block_size]; object.signal_inlet_count()],
                outputs: vec![vec![0.0; block_size]; object.signal_outlet_count()],
            })
            .collect();
        let by_id: HashMap<u64, usize> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.object.id(), index))
            .collect();

        let connections: Vec<DspConnection> = links
            .iter()
            .filter(|link| link.is_connected())
            .filter_map(|link| {
                let (from, to) = (link.from()?, link.to()?);
                Some(DspConnection {
                    from: *by_id.get(&from.id())?,
                    from_port: from.signal_outlet_index(link.outlet())?,
                    to: *by_id.get(&to.id())?,
                    to_port: to.signal_inlet_index(link.inlet())?,
                })
            })
            .collect();

        let mut context = Self {
            sample_rate,
            block_size,
            nodes,
            connections,
            order: Vec::new(),
            steps: Vec::new(),
        };
        context.order = context.kahn_sort()?;
        context.steps = context.emit_steps();
        context.prepare();

        tracing::debug!(
            nodes = context.nodes.len(),
            connections = context.connections.len(),
            steps = context.steps.len(),
            "dsp compiled"
        );
        for step in &context.steps {
            tracing::debug!("  {step}");
        }
        Ok(context)
    }

    /// Kahn's algorithm; ties go to the lowest node index.
    fn kahn_sort(&self) -> Result<Vec<usize>, DspError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for connection in &self.connections {
            in_degree[connection.to] += 1;
            successors[connection.from].push(connection.to);
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
            .filter(|&index| in_degree[index] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for &next in &successors[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }
        let culprit = self.node_on_cycle(&in_degree);
        let object = &self.nodes[culprit].object;
        Err(DspError::Cycle {
            object: object.name().to_string(),
            id: object.id(),
        })
    }

    /// Finds a node that lies on a cycle among the nodes Kahn left unresolved.
    ///
    /// Walking backwards through unresolved predecessors must eventually
    /// revisit a node, and that node is on a loop.
    fn node_on_cycle(&self, in_degree: &[usize]) -> usize {
        let unresolved = |index: usize| in_degree[index] > 0;
        let mut current = (0..in_degree.len()).find(|&i| unresolved(i)).unwrap_or(0);
        let mut visited = vec![false; in_degree.len()];
        while !visited[current] {
            visited[current] = true;
            match self
                .connections
                .iter()
                .find(|connection| connection.to == current && unresolved(connection.from))
            {
                Some(connection) => current = connection.from,
                None => break,
            }
        }
        current
    }

    fn emit_steps(&self) -> Vec<DspStep> {
        let mut steps = Vec::new();
        for &node in &self.order {
            for port in 0..self.nodes[node].inputs.len() {
                let mut feeding = self
                    .connections
                    .iter()
                    .filter(|connection| connection.to == node && connection.to_port == port)
                    .peekable();
                if feeding.peek().is_none() {
                    continue;
                }
                steps.push(DspStep::Clear { node, port });
                steps.extend(feeding.map(|connection| DspStep::Accumulate {
                    from: connection.from,
                    from_port: connection.from_port,
                    to: connection.to,
                    to_port: connection.to_port,
                }));
            }
            steps.push(DspStep::Perform { node });
        }
        steps
    }

    fn prepare(&self) {
        for (index, node) in self.nodes.iter().enumerate() {
            let connected_inputs = (0..node.inputs.len())
                .filter(|&port| {
                    self.connections
                        .iter()
                        .any(|c| c.to == index && c.to_port == port)
                })
                .count();
            let connected_outputs = (0..node.outputs.len())
                .filter(|&port| {
                    self.connections
                        .iter()
                        .any(|c| c.from == index && c.from_port == port)
                })
                .count();
            if let Some(process) = node.object.process() {
                process.prepare(&DspInfo {
                    sample_rate: self.sample_rate,
                    block_size: self.block_size,
                    connected_inputs,
                    connected_outputs,
                });
            }
        }
    }

    /// Runs one block: every step once, in schedule order.
    pub fn tick(&mut self) {
        for step in &self.steps {
            match *step {
                DspStep::Clear { node, port } => {
                    self.nodes[node].inputs[port].fill(0.0);
                }
                DspStep::Accumulate {
                    from,
                    from_port,
                    to,
                    to_port,
                } => {
                    // Signal connections never join a node to itself.
                    let (source, dest) = if from < to {
                        let (left, right) = self.nodes.split_at_mut(to);
                        (&left[from], &mut right[0])
                    } else {
                        let (left, right) = self.nodes.split_at_mut(from);
                        (&right[0], &mut left[to])
                    };
                    let source = &source.outputs[from_port];
                    for (d, s) in dest.inputs[to_port].iter_mut().zip(source) {
                        *d += *s;
                    }
                }
                DspStep::Perform { node } => {
                    let node = &mut self.nodes[node];
                    for output in &mut node.outputs {
                        output.fill(0.0);
                    }
                    if let Some(process) = node.object.process() {
                        process.perform(&node.inputs, &mut node.outputs);
                    }
                }
            }
        }
    }

    /// Releases every process. The context is consumed.
    pub fn stop(self) {
        for node in &self.nodes {
            if let Some(process) = node.object.process() {
                process.release();
            }
        }
        tracing::debug!(nodes = self.nodes.len(), "dsp stopped");
    }

    /// Sample rate the context was compiled for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Block size the context was compiled for.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of processing nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of signal connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Ids of the scheduled objects, in execution order.
    pub fn schedule_order(&self) -> Vec<u64> {
        self.order
            .iter()
            .map(|&index| self.nodes[index].object.id())
            .collect()
    }

    /// The compiled steps.
    pub fn steps(&self) -> &[DspStep] {
        &self.steps
    }

    /// Last block written to signal outlet `port` of the object with `id`.
    pub fn output_buffer(&self, id: u64, port: usize) -> Option<&[Sample]> {
        self.nodes
            .iter()
            .find(|node| node.object.id() == id)?
            .outputs
            .get(port)
            .map(Vec::as_slice)
    }

    /// Last block summed into signal inlet `port` of the object with `id`.
    pub fn input_buffer(&self, id: u64, port: usize) -> Option<&[Sample]> {
        self.nodes
            .iter()
            .find(|node| node.object.id() == id)?
            .inputs
            .get(port)
            .map(Vec::as_slice)
    }
}

impl std::fmt::Debug for DspContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DspContext")
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field("order", &self.schedule_order())
            .field("steps", &self.steps.len())
            .finish()
    }
}
