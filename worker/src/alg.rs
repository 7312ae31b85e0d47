use async_trait::async_trait;

use crate::{
    error::Result,
    graph::{Graph, Phase},
    worker::Worker,
};

/// One-batch training interface implemented by algorithm variants.
///
/// Contract:
/// - `train_one_batch` runs exactly one training batch, using the worker's
///   collect/update primitives per node.
/// - `test_one_batch` never waits on parameters and never publishes updates.
#[async_trait]
pub trait TrainAlg: Send + Sync {
    async fn train_one_batch(&mut self, worker: &mut Worker, step: i64, net: &Graph)
    -> Result<()>;

    async fn test_one_batch(
        &mut self,
        worker: &mut Worker,
        step: i64,
        phase: Phase,
        net: &Graph,
    ) -> Result<()>;
}
