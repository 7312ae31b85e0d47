//! Backpropagation training variant.

use async_trait::async_trait;

use crate::{
    alg::TrainAlg,
    error::Result,
    graph::{Graph, NodeKind, Phase},
    worker::Worker,
};

/// Forward/backward gradient training over the partitioned graph.
pub struct BpAlg;

impl BpAlg {
    pub fn new() -> Self {
        Self
    }

    /// Forward pass in topological order.
    ///
    /// In the training phase every parameter is collected before the node
    /// computes, so the node sees the most recently confirmed values.
    /// Bridge sinks wait for their cross-partition input first; bridge
    /// sources publish their output immediately after computing it.
    async fn forward(
        &mut self,
        worker: &mut Worker,
        step: i64,
        phase: Phase,
        net: &Graph,
    ) -> Result<()> {
        for node in net.nodes() {
            if node.partition_id() != worker.id() {
                continue;
            }

            if node.kind() == NodeKind::BridgeDst {
                worker.receive_blobs(net, node).await;
            }
            if phase == Phase::Train {
                for param in node.params() {
                    worker.collect(step, param).await;
                }
            }

            node.compute_feature(phase);

            if node.kind() == NodeKind::BridgeSrc {
                worker.send_blobs(net, node).await;
            }
            if node.kind() == NodeKind::BridgeDst {
                // Re-arm for the next batch.
                node.set_ready(false);
            }
        }
        Ok(())
    }

    /// Backward pass in reverse topological order: gradient, then one
    /// update per parameter. No additional wait.
    async fn backward(&mut self, worker: &mut Worker, step: i64, net: &Graph) -> Result<()> {
        for node in net.nodes().iter().rev() {
            if node.partition_id() != worker.id() {
                continue;
            }
            node.compute_gradient();
            for param in node.params() {
                worker.update(step, param).await;
            }
        }
        Ok(())
    }
}

impl Default for BpAlg {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrainAlg for BpAlg {
    async fn train_one_batch(
        &mut self,
        worker: &mut Worker,
        step: i64,
        net: &Graph,
    ) -> Result<()> {
        self.forward(worker, step, Phase::Train, net).await?;
        self.backward(worker, step, net).await
    }

    async fn test_one_batch(
        &mut self,
        worker: &mut Worker,
        step: i64,
        phase: Phase,
        net: &Graph,
    ) -> Result<()> {
        self.forward(worker, step, phase, net).await
    }
}
