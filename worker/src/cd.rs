//! Contrastive-divergence (generative, Gibbs-sampling) training variant.

use std::num::NonZeroUsize;

use async_trait::async_trait;

use crate::{
    alg::TrainAlg,
    error::Result,
    graph::{Graph, NodeKind, Phase},
    worker::Worker,
};

/// Gibbs-chain training for generative models.
///
/// Only generative-tagged nodes (visible/hidden) run the negative phase and
/// receive updates; plain nodes participate in the positive phase only.
pub struct CdAlg {
    cd_k: NonZeroUsize,
}

impl CdAlg {
    /// # Arguments
    /// * `cd_k` - Gibbs chain length: total number of negative passes.
    pub fn new(cd_k: NonZeroUsize) -> Self {
        Self { cd_k }
    }
}

#[async_trait]
impl TrainAlg for CdAlg {
    async fn train_one_batch(
        &mut self,
        worker: &mut Worker,
        step: i64,
        net: &Graph,
    ) -> Result<()> {
        // Positive phase: wait for confirmed parameters, then compute.
        for node in net.nodes() {
            if node.partition_id() != worker.id() {
                continue;
            }
            for param in node.params() {
                worker.collect(step, param).await;
            }
            node.compute_feature(Phase::Positive);
        }

        // First negative pass with sampling.
        for node in net.nodes() {
            if node.partition_id() == worker.id() && node.kind().is_generative() {
                node.compute_feature(Phase::Negative);
            }
        }

        // Remaining cd_k - 1 steps of the Gibbs chain.
        for _ in 1..self.cd_k.get() {
            for node in net.nodes() {
                if node.partition_id() == worker.id() && node.kind().is_generative() {
                    node.compute_feature(Phase::Negative);
                }
            }
        }

        // Gradients and updates for generative nodes only.
        for node in net.nodes() {
            if node.partition_id() != worker.id() || !node.kind().is_generative() {
                continue;
            }
            node.compute_gradient();
            for param in node.params() {
                worker.update(step, param).await;
            }
        }

        Ok(())
    }

    async fn test_one_batch(
        &mut self,
        worker: &mut Worker,
        _step: i64,
        _phase: Phase,
        net: &Graph,
    ) -> Result<()> {
        for node in net.nodes() {
            if node.partition_id() == worker.id() {
                node.compute_feature(Phase::Positive);
            }
        }
        // One reconstruction pass, visible layer only. No chain, no update.
        for node in net.nodes() {
            if node.partition_id() == worker.id() && node.kind() == NodeKind::Visible {
                node.compute_feature(Phase::Negative);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, sync::Arc};

    use super::*;
    use crate::{
        cluster::Topology,
        config::{AlgConf, JobConf},
        graph::{
            Node,
            test_ops::{EventLog, RecordingOps},
        },
        param::Param,
        registry::AlgRegistry,
    };

    fn rbm_net(log: &EventLog) -> (Arc<Graph>, Vec<Arc<Param>>) {
        let kinds = [
            ("input", NodeKind::Plain),
            ("vis", NodeKind::Visible),
            ("hid", NodeKind::Hidden),
        ];

        let mut params = Vec::new();
        let mut nodes = Vec::new();
        for (i, (name, kind)) in kinds.into_iter().enumerate() {
            let p = Arc::new(Param::new(i as i32, i as i32, None, 2));
            p.set_version(0);
            params.push(Arc::clone(&p));
            nodes.push(Node::new(
                name,
                0,
                kind,
                vec![p],
                None,
                Box::new(RecordingOps::new(name, Arc::clone(log))),
            ));
        }
        (Arc::new(Graph::new(nodes)), params)
    }

    fn worker_for(net: Arc<Graph>) -> Worker {
        let job = JobConf {
            alg: AlgConf {
                name: "cd".into(),
                ..AlgConf::default()
            },
            ..JobConf::default()
        };
        let mut worker = Worker::create(&job, &AlgRegistry::default()).unwrap();
        let topo = Topology {
            nworker_groups_per_server_group: NonZeroUsize::new(1).unwrap(),
            checkpoint_folder: std::env::temp_dir(),
        };
        worker.setup(0, 0, job, topo, net, None, None);
        worker
    }

    fn negative_passes(log: &EventLog, node: &str) -> usize {
        let key = format!("feature:{node}:Negative");
        log.lock().iter().filter(|e| **e == key).count()
    }

    #[tokio::test]
    async fn chain_length_one_runs_one_negative_pass() {
        let log = EventLog::default();
        let (net, params) = rbm_net(&log);
        let mut worker = worker_for(Arc::clone(&net));

        let mut alg = CdAlg::new(NonZeroUsize::new(1).unwrap());
        alg.train_one_batch(&mut worker, 0, &net).await.unwrap();

        assert_eq!(negative_passes(&log, "vis"), 1);
        assert_eq!(negative_passes(&log, "hid"), 1);
        assert_eq!(negative_passes(&log, "input"), 0);

        // Gradient + update only on generative nodes.
        let grads: Vec<_> = log
            .lock()
            .iter()
            .filter(|e| e.starts_with("gradient:"))
            .cloned()
            .collect();
        assert_eq!(grads, vec!["gradient:vis", "gradient:hid"]);
        assert_eq!(params[0].local_version(), -1);
        assert_eq!(params[1].local_version(), 0);
        assert_eq!(params[2].local_version(), 0);
    }

    #[tokio::test]
    async fn chain_length_three_runs_three_negative_passes() {
        let log = EventLog::default();
        let (net, _params) = rbm_net(&log);
        let mut worker = worker_for(Arc::clone(&net));

        let mut alg = CdAlg::new(NonZeroUsize::new(3).unwrap());
        alg.train_one_batch(&mut worker, 0, &net).await.unwrap();

        assert_eq!(negative_passes(&log, "vis"), 3);
        assert_eq!(negative_passes(&log, "hid"), 3);

        // All negative passes happen before any gradient.
        let events = log.lock();
        let first_grad = events.iter().position(|e| e.starts_with("gradient:")).unwrap();
        let last_neg = events
            .iter()
            .rposition(|e| e.contains(":Negative"))
            .unwrap();
        assert!(last_neg < first_grad);
    }

    #[tokio::test]
    async fn test_batch_reconstructs_visible_only() {
        let log = EventLog::default();
        let (net, _params) = rbm_net(&log);
        let mut worker = worker_for(Arc::clone(&net));

        let mut alg = CdAlg::new(NonZeroUsize::new(3).unwrap());
        alg.test_one_batch(&mut worker, 0, Phase::Test, &net)
            .await
            .unwrap();

        assert_eq!(negative_passes(&log, "vis"), 1);
        assert_eq!(negative_passes(&log, "hid"), 0);
        assert!(!log.lock().iter().any(|e| e.starts_with("gradient:")));
    }
}
