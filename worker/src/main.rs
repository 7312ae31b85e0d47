//! In-process demo: one backpropagation worker against a loopback stub.
//!
//! Run with `RUST_LOG=debug cargo run -p worker` to watch the protocol.

use std::{io, num::NonZeroUsize, sync::Arc};

use log::info;

use worker::{
    AlgRegistry, Worker,
    cluster::{LocalRuntime, Topology},
    config::JobConf,
    graph::{Graph, Node, NodeKind, NodeOps, Phase},
    net::LoopbackHub,
    param::Param,
};

/// Toy affine node: output = input scaled by its single weight.
struct DemoOps {
    weight: Arc<Param>,
    input: Vec<f32>,
    out: Vec<f32>,
}

impl DemoOps {
    fn new(weight: Arc<Param>) -> Self {
        Self {
            weight,
            input: vec![1.0; 4],
            out: vec![0.0; 4],
        }
    }
}

impl NodeOps for DemoOps {
    fn compute_feature(&mut self, _phase: Phase) {
        let w = self.weight.values().first().copied().unwrap_or(0.0);
        for (o, i) in self.out.iter_mut().zip(&self.input) {
            *o = w * i;
        }
    }

    fn compute_gradient(&mut self) {
        // The kernel itself is out of scope; nothing to accumulate here.
    }

    fn output(&self) -> &[f32] {
        &self.out
    }

    fn fill_input(&mut self, payload: &[f32]) {
        self.input.clear();
        self.input.extend_from_slice(payload);
    }

    fn summary(&self, _debug: bool, _phase: Phase) -> String {
        format!("out[0]={:.4}", self.out.first().copied().unwrap_or(0.0))
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let mut params = Vec::new();
    let mut nodes = Vec::new();
    for (i, name) in ["input", "dense", "output"].iter().enumerate() {
        let p = Arc::new(Param::new(i as i32, i as i32, None, 4));
        params.push(Arc::clone(&p));
        nodes.push(Node::new(
            *name,
            0,
            NodeKind::Plain,
            vec![Arc::clone(&p)],
            None,
            Box::new(DemoOps::new(p)),
        ));
    }
    let net = Arc::new(Graph::new(nodes));

    let job = JobConf {
        train_steps: 5,
        warmup_steps: 1,
        display_period: 1,
        init_barrier_ms: 50,
        ..JobConf::default()
    };
    let topology = Topology {
        nworker_groups_per_server_group: NonZeroUsize::new(1).unwrap(),
        checkpoint_folder: std::env::temp_dir().join("worker-demo"),
    };

    let registry = AlgRegistry::default();
    let mut worker = Worker::create(&job, &registry)?;
    worker.setup(0, 0, job, topology.clone(), net, None, None);

    let hub = LoopbackHub::new(params);
    worker.run(&hub, &LocalRuntime).await?;

    info!(
        "done; checkpoint under {}",
        topology.checkpoint_folder.display()
    );
    Ok(())
}
