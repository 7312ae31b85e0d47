//! Partitioned computation graph surface consumed by the worker core.
//!
//! The numeric kernels live behind [`NodeOps`]; the worker only consumes
//! node ordering, ownership, per-node parameter lists and variant tags.

use std::{collections::HashMap, sync::Arc, sync::atomic::AtomicBool, sync::atomic::Ordering};

use parking_lot::Mutex;

use crate::param::Param;

/// Execution phase handed to the numeric layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Val,
    Test,
    /// Positive phase of a generative (contrastive-divergence) pass.
    Positive,
    /// Negative (sampling) phase of a generative pass.
    Negative,
}

/// Closed node variant tag, resolved once at graph construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Plain,
    /// Cross-partition source: its output crosses a partition boundary.
    BridgeSrc,
    /// Cross-partition sink: its input arrives from another partition.
    BridgeDst,
    /// Generative-model visible node.
    Visible,
    /// Generative-model hidden node.
    Hidden,
}

impl NodeKind {
    pub fn is_bridge(self) -> bool {
        matches!(self, NodeKind::BridgeSrc | NodeKind::BridgeDst)
    }

    pub fn is_generative(self) -> bool {
        matches!(self, NodeKind::Visible | NodeKind::Hidden)
    }
}

/// Numeric layer computations, supplied by the graph builder.
pub trait NodeOps: Send {
    /// Computes this node's output for the given phase.
    fn compute_feature(&mut self, phase: Phase);

    /// Computes this node's gradient from the last forward pass.
    fn compute_gradient(&mut self);

    /// Output produced by the last `compute_feature`, for bridge exchange.
    fn output(&self) -> &[f32];

    /// Copies an incoming cross-partition payload into the input buffer.
    fn fill_input(&mut self, payload: &[f32]);

    /// One-line summary for display; empty string suppresses the line.
    fn summary(&self, _debug: bool, _phase: Phase) -> String {
        String::new()
    }
}

/// One node of the partitioned graph.
pub struct Node {
    name: String,
    partition_id: i32,
    kind: NodeKind,
    params: Vec<Arc<Param>>,
    /// Name of the cross-partition counterpart, for bridge nodes.
    peer: Option<String>,
    ready: AtomicBool,
    ops: Mutex<Box<dyn NodeOps>>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        partition_id: i32,
        kind: NodeKind,
        params: Vec<Arc<Param>>,
        peer: Option<String>,
        ops: Box<dyn NodeOps>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_id,
            kind,
            params,
            peer,
            ready: AtomicBool::new(false),
            ops: Mutex::new(ops),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_id(&self) -> i32 {
        self.partition_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn params(&self) -> &[Arc<Param>] {
        &self.params
    }

    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Arrival flag for bridge sinks.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn compute_feature(&self, phase: Phase) {
        self.ops.lock().compute_feature(phase);
    }

    pub fn compute_gradient(&self) {
        self.ops.lock().compute_gradient();
    }

    /// Snapshot of the last computed output.
    pub fn output(&self) -> Vec<f32> {
        self.ops.lock().output().to_vec()
    }

    pub fn fill_input(&self, payload: &[f32]) {
        self.ops.lock().fill_input(payload);
    }

    pub fn summary(&self, debug: bool, phase: Phase) -> String {
        self.ops.lock().summary(debug, phase)
    }
}

/// A partitioned DAG in forward topological order.
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl Graph {
    /// Builds a graph from nodes already in forward topological order.
    pub fn new(nodes: Vec<Node>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), i))
            .collect();
        Self { nodes, index }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Resolves a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// True when any node of this partition crosses a partition boundary.
    pub fn has_bridges(&self, partition_id: i32) -> bool {
        self.nodes
            .iter()
            .any(|n| n.partition_id == partition_id && n.kind.is_bridge())
    }
}

#[cfg(test)]
pub(crate) mod test_ops {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{NodeOps, Phase};

    /// Shared in-order log of compute events, for ordering assertions.
    pub type EventLog = Arc<Mutex<Vec<String>>>;

    /// Records every call into a shared event log.
    pub struct RecordingOps {
        pub name: String,
        pub log: EventLog,
        pub out: Vec<f32>,
    }

    impl RecordingOps {
        pub fn new(name: &str, log: EventLog) -> Self {
            Self {
                name: name.to_string(),
                log,
                out: vec![1.0, 2.0],
            }
        }
    }

    impl NodeOps for RecordingOps {
        fn compute_feature(&mut self, phase: Phase) {
            self.log.lock().push(format!("feature:{}:{:?}", self.name, phase));
        }

        fn compute_gradient(&mut self) {
            self.log.lock().push(format!("gradient:{}", self.name));
        }

        fn output(&self) -> &[f32] {
            &self.out
        }

        fn fill_input(&mut self, payload: &[f32]) {
            self.log
                .lock()
                .push(format!("input:{}:{}", self.name, payload.len()));
        }

        fn summary(&self, _debug: bool, _phase: Phase) -> String {
            format!("{} ok", self.name)
        }
    }
}
