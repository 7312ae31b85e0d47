//! Worker orchestration: the train/validate/test/checkpoint loop and the
//! parameter synchronization primitives it is built from.

use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use comms::{
    MsgChannel,
    msg::{Addr, Msg, MsgKind, Role, Target},
};
use log::{debug, info, warn};
use tokio::time::sleep;

use crate::{
    alg::TrainAlg,
    checkpoint::{self, ParamRecord},
    cluster::{ClusterRuntime, Topology},
    config::JobConf,
    error::{Result, WorkerErr},
    graph::{Graph, Node, NodeKind, Phase},
    net::Hub,
    param::Param,
    registry::AlgRegistry,
};

/// Poll granularity for `collect`. The parameter-server round trip is
/// orders of magnitude larger, so the staleness floor this imposes is
/// bounded and small.
const COLLECT_SLEEP: Duration = Duration::from_millis(5);

/// A worker owning one partition of the computation graph.
///
/// The worker keeps its copy of shared parameters consistent with the
/// sharded server tier through the Put/Get/Update/Collect protocol, and
/// exchanges cross-partition tensors over a second channel when its
/// partition has bridge nodes. Both channels are exclusively owned and
/// released on every exit path of [`Worker::run`].
pub struct Worker {
    grp_id: i32,
    id: i32,
    step: i64,
    job: JobConf,
    topology: Option<Topology>,
    train_net: Option<Arc<Graph>>,
    val_net: Option<Arc<Graph>>,
    test_net: Option<Arc<Graph>>,
    param_channel: Option<MsgChannel>,
    layer_channel: Option<MsgChannel>,
    /// Warm-up mode: updates apply in place instead of going to the servers.
    local_updates: bool,
    alg: Option<Box<dyn TrainAlg>>,
}

impl Worker {
    /// Instantiates a worker with the algorithm variant named by
    /// `job.alg`, resolved through the injected registry.
    ///
    /// # Errors
    /// `WorkerErr::UnknownAlgorithm` when the identifier is unregistered.
    pub fn create(job: &JobConf, registry: &AlgRegistry) -> Result<Self> {
        let alg = registry.create(&job.alg)?;
        Ok(Self {
            grp_id: 0,
            id: 0,
            step: 0,
            job: JobConf::default(),
            topology: None,
            train_net: None,
            val_net: None,
            test_net: None,
            param_channel: None,
            layer_channel: None,
            local_updates: false,
            alg: Some(alg),
        })
    }

    /// Configures identity, job and graphs. Pure assignment, no I/O;
    /// channels stay unset until [`Worker::run`].
    pub fn setup(
        &mut self,
        grp_id: i32,
        id: i32,
        job: JobConf,
        topology: Topology,
        train_net: Arc<Graph>,
        val_net: Option<Arc<Graph>>,
        test_net: Option<Arc<Graph>>,
    ) {
        self.grp_id = grp_id;
        self.id = id;
        self.step = job.step;
        self.job = job;
        self.topology = Some(topology);
        self.train_net = Some(train_net);
        self.val_net = val_net;
        self.test_net = test_net;
    }

    pub fn grp_id(&self) -> i32 {
        self.grp_id
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn job(&self) -> &JobConf {
        &self.job
    }

    fn addr(&self, role: Role) -> Addr {
        Addr::new(self.grp_id, self.id, role)
    }

    /// Runs the training loop to completion.
    ///
    /// Joins the server synchronization group, opens and handshakes the
    /// channel(s), bootstraps parameters, then loops one training batch per
    /// step with periodic validation, testing, checkpointing and display
    /// until the stop predicate holds.
    pub async fn run(&mut self, hub: &dyn Hub, cluster: &dyn ClusterRuntime) -> Result<()> {
        let res = self.run_inner(hub, cluster).await;

        // Channels are released on every exit path, including errors.
        self.param_channel = None;
        self.layer_channel = None;
        res
    }

    async fn run_inner(&mut self, hub: &dyn Hub, cluster: &dyn ClusterRuntime) -> Result<()> {
        let mut alg = self
            .alg
            .take()
            .ok_or(WorkerErr::NotConfigured("algorithm"))?;
        let res = self.drive(alg.as_mut(), hub, cluster).await;
        self.alg = Some(alg);
        res
    }

    async fn drive(
        &mut self,
        alg: &mut dyn TrainAlg,
        hub: &dyn Hub,
        cluster: &dyn ClusterRuntime,
    ) -> Result<()> {
        let topology = self
            .topology
            .clone()
            .ok_or(WorkerErr::NotConfigured("topology"))?;
        let train_net = self
            .train_net
            .clone()
            .ok_or(WorkerErr::NotConfigured("train graph"))?;

        info!(group = self.grp_id, worker = self.id; "worker start");

        let server_grp = topology.server_group(self.grp_id);
        if !cluster.join_sgroup(self.grp_id, self.id, server_grp).await {
            return Err(WorkerErr::JoinGroupFailed {
                group: self.grp_id,
                worker: self.id,
            });
        }

        let mut channel = hub.connect(Role::WorkerParam).await?;
        channel
            .send(&Msg::control(
                self.addr(Role::WorkerParam),
                Addr::stub(),
                MsgKind::Connect,
            ))
            .await?;
        self.param_channel = Some(channel);

        // A second channel only when this partition crosses boundaries.
        if train_net.has_bridges(self.id) {
            let mut channel = hub.connect(Role::WorkerLayer).await?;
            channel
                .send(&Msg::control(
                    self.addr(Role::WorkerLayer),
                    Addr::stub(),
                    MsgKind::Connect,
                ))
                .await?;
            self.layer_channel = Some(channel);
        }

        self.step = self.job.step;
        self.init_net_params(alg, &train_net).await?;

        while !self.job.stop_now(self.step) {
            if self.job.validate_now(self.step) {
                if let Some(net) = self.val_net.clone() {
                    self.collect_all(self.step, &net).await;
                    for step in 0..self.job.validate_steps {
                        alg.test_one_batch(self, step, Phase::Val, &net).await?;
                    }
                    self.display(Phase::Val, &format!("validation @ step {}", self.step), &net);
                }
            }
            if self.job.test_now(self.step) {
                if let Some(net) = self.test_net.clone() {
                    self.collect_all(self.step, &net).await;
                    for step in 0..self.job.test_steps {
                        alg.test_one_batch(self, step, Phase::Test, &net).await?;
                    }
                    self.display(Phase::Test, &format!("test @ step {}", self.step), &net);
                }
            }
            if self.job.checkpoint_now(self.step) && self.grp_id == 0 {
                self.collect_all(self.step, &train_net).await;
                self.checkpoint(self.step, &topology.checkpoint_folder, &train_net)?;
                // Persist progress so a resumed job restarts from here.
                self.job.step = self.step;
            }

            let step = self.step;
            alg.train_one_batch(self, step, &train_net).await?;

            if self.job.display_now(self.step) && self.grp_id == 0 && self.id == 0 {
                self.display(Phase::Train, &format!("train @ step {}", self.step), &train_net);
            }
            self.step += 1;
        }

        // Save the final model state.
        if self.grp_id == 0 {
            self.checkpoint(self.step, &topology.checkpoint_folder, &train_net)?;
        }

        cluster.leave_sgroup(self.grp_id, self.id, server_grp).await;

        let stop = Msg::control(self.addr(Role::WorkerParam), Addr::stub(), MsgKind::Stop);
        if !self.send_param_msg(stop).await {
            warn!(group = self.grp_id, worker = self.id; "stop notification dropped");
        }

        info!(group = self.grp_id, worker = self.id; "worker stop");
        Ok(())
    }

    /// Bootstrap synchronization of model parameters.
    ///
    /// For each server group, its first subscriber worker group performs the
    /// initialization: restore from checkpoint files (later files win),
    /// freshly initialize whatever they did not cover, run the warm-up
    /// batches locally, then publish every owned parameter. Every worker
    /// then waits out a best-effort barrier and pulls the authoritative
    /// initial values.
    pub async fn init_net_params(
        &mut self,
        alg: &mut dyn TrainAlg,
        net: &Arc<Graph>,
    ) -> Result<()> {
        let topology = self
            .topology
            .clone()
            .ok_or(WorkerErr::NotConfigured("topology"))?;

        if topology.is_initializer(self.grp_id) {
            // Only owners fill the memory of parameter values.
            let mut name2param: HashMap<&str, &Arc<Param>> = HashMap::new();
            for node in net.nodes() {
                if node.partition_id() != self.id {
                    continue;
                }
                for param in node.params() {
                    if !param.is_owned_here() {
                        continue;
                    }
                    if name2param.insert(param.name(), param).is_some() {
                        return Err(WorkerErr::DuplicateParamName {
                            name: param.name().to_string(),
                        });
                    }
                }
            }

            // Parameters from earlier checkpoint files are overwritten by
            // same-named parameters in later files.
            for path in &self.job.checkpoint_paths {
                info!("loading checkpoint file {}", path.display());
                let records = checkpoint::read(path)?;
                for rec in records {
                    let Some(param) = name2param.get(rec.name.as_str()) else {
                        continue;
                    };
                    param.restore(&rec.values);
                    if self.job.reset_param_version {
                        // Retrain from a snapshot: version restarts at the
                        // configured step.
                        param.set_version(self.job.step);
                    } else {
                        // Resume: keep the version recorded at save time.
                        param.set_version(rec.version);
                    }
                }
            }

            // Whatever the checkpoints did not cover starts fresh.
            for param in name2param.values() {
                if param.version() < 0 {
                    param.init_values(self.job.step);
                    if !self.job.reset_param_version {
                        warn!(
                            param = param.name();
                            "freshly initialized alongside resumed parameters; \
                             consider reset_param_version to align version epochs"
                        );
                    }
                }
            }

            // The first steps may be unstable; train them locally before
            // publishing anything.
            self.local_updates = true;
            while self.step < self.job.warmup_steps {
                let step = self.step;
                alg.train_one_batch(self, step, net).await?;
                self.step += 1;
            }
            self.local_updates = false;

            for node in net.nodes() {
                if node.partition_id() != self.id {
                    continue;
                }
                for param in node.params() {
                    if param.is_owned_here() {
                        self.put(param.version(), param).await;
                    }
                }
            }
        }

        // Best-effort barrier, not a handshake: give initializers time to
        // publish before anyone queries. A slow initializer can still lose
        // this race.
        sleep(Duration::from_millis(self.job.init_barrier_ms)).await;

        for node in net.nodes() {
            if node.partition_id() != self.id {
                continue;
            }
            for param in node.params() {
                self.get(self.job.warmup_steps, param).await;
            }
        }

        Ok(())
    }

    /// Publishes a parameter's current value to its server shard.
    ///
    /// Fire-and-forget; returns `false` when the message was dropped.
    pub async fn put(&mut self, step: i64, param: &Param) -> bool {
        let msg = Msg::param(
            self.addr(Role::WorkerParam),
            Addr::stub(),
            MsgKind::Put,
            Target::for_param(param.owner(), step),
        );
        self.send_param_msg(msg).await
    }

    /// Requests a parameter refresh targeted at `step`.
    ///
    /// No-op success when the local version already meets the step, which
    /// avoids redundant round trips.
    pub async fn get(&mut self, step: i64, param: &Param) -> bool {
        if param.version() >= step {
            return true;
        }
        let msg = Msg::param(
            self.addr(Role::WorkerParam),
            Addr::stub(),
            MsgKind::Get,
            Target::for_param(param.owner(), step),
        );
        self.send_param_msg(msg).await
    }

    /// Submits a parameter update for this step.
    ///
    /// Stamps the local-observed version first: "this version has been
    /// submitted, not yet confirmed". During warm-up the update applies in
    /// place and nothing is published.
    pub async fn update(&mut self, step: i64, param: &Param) -> bool {
        param.set_local_version(param.version());

        if self.local_updates {
            param.set_version(param.version().max(step + 1));
            return true;
        }

        let msg = Msg::param(
            self.addr(Role::WorkerParam),
            Addr::stub(),
            MsgKind::Update,
            Target::for_param(param.owner(), step),
        );
        self.send_param_msg(msg).await
    }

    async fn send_param_msg(&mut self, msg: Msg) -> bool {
        let Some(channel) = self.param_channel.as_mut() else {
            warn!(
                group = self.grp_id, worker = self.id;
                "parameter channel not open, dropping message"
            );
            return false;
        };
        if let Err(e) = channel.send(&msg).await {
            warn!(group = self.grp_id, worker = self.id; "parameter send failed: {e}");
            return false;
        }
        true
    }

    /// Blocks until the parameter's version exceeds its local-observed
    /// version; returns immediately if it already does.
    pub async fn collect(&self, step: i64, param: &Param) {
        while param.version() <= param.local_version() {
            sleep(COLLECT_SLEEP).await;
        }
        debug!(step = step, param = param.name(); "collected");
    }

    /// Waits for every parameter of every node this worker partitions.
    pub async fn collect_all(&self, step: i64, net: &Graph) {
        for node in net.nodes() {
            if node.partition_id() != self.id {
                continue;
            }
            for param in node.params() {
                self.collect(step, param).await;
            }
        }
    }

    /// Serializes every owned parameter of this partition into one record
    /// set under `{folder}/step{step}-worker{id}`.
    pub fn checkpoint(&self, step: i64, folder: &Path, net: &Graph) -> Result<()> {
        let mut records = Vec::new();
        for node in net.nodes() {
            if node.partition_id() != self.id {
                continue;
            }
            for param in node.params() {
                if param.is_owned_here() {
                    records.push(ParamRecord {
                        name: param.name().to_string(),
                        version: param.version(),
                        values: param.values().clone(),
                    });
                }
            }
        }

        let path = checkpoint::checkpoint_path(folder, step, self.id);
        info!("writing checkpoint to {}", path.display());
        checkpoint::write(&path, &records)?;
        Ok(())
    }

    /// Emits a one-line summary per partitioned node; verbose form when
    /// debug mode is configured. Pure observability, no state effect.
    pub fn display(&self, phase: Phase, prefix: &str, net: &Graph) {
        for node in net.nodes() {
            if node.partition_id() != self.id {
                continue;
            }
            let line = node.summary(false, phase);
            if !line.is_empty() {
                info!("{prefix}: {line}");
            }
            if self.job.debug {
                let verbose = node.summary(true, phase);
                if !verbose.is_empty() {
                    debug!("{prefix}: {verbose}");
                }
            }
        }
    }

    /// Packages a bridge source's output for its cross-partition peer and
    /// sends it on the layer channel.
    pub async fn send_blobs(&mut self, net: &Graph, node: &Node) -> bool {
        let Some(peer) = node.peer() else {
            warn!(node = node.name(); "bridge source has no peer");
            return false;
        };
        let Some(dst) = net.node(peer) else {
            warn!(node = node.name(), peer = peer; "bridge peer not in graph");
            return false;
        };

        let payload = node.output();
        let msg = Msg {
            src: self.addr(Role::WorkerLayer),
            dst: Addr::new(self.grp_id, dst.partition_id(), Role::WorkerLayer),
            kind: MsgKind::Blob,
            target: None,
            frames: vec![
                dst.name().as_bytes().to_vec(),
                bytemuck::cast_slice(&payload).to_vec(),
            ],
        };

        let Some(channel) = self.layer_channel.as_mut() else {
            warn!(group = self.grp_id, worker = self.id; "layer channel not open, dropping blob");
            return false;
        };
        if let Err(e) = channel.send(&msg).await {
            warn!(group = self.grp_id, worker = self.id; "blob send failed: {e}");
            return false;
        }
        true
    }

    /// Blocks on the layer channel until `node` has its input.
    ///
    /// Every received blob is routed by its node-name frame, so arrivals
    /// for other sinks of this partition are delivered along the way.
    pub async fn receive_blobs(&mut self, net: &Graph, node: &Node) {
        while !node.is_ready() {
            let Some(channel) = self.layer_channel.as_mut() else {
                warn!(group = self.grp_id, worker = self.id; "layer channel not open");
                return;
            };

            let msg = match channel.recv().await {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(group = self.grp_id, worker = self.id; "blob receive failed: {e}");
                    return;
                }
            };

            if msg.src.group != self.grp_id {
                warn!(from = msg.src.group; "blob from foreign group, dropping");
                continue;
            }
            let Some(name) = msg.frames.first().and_then(|f| std::str::from_utf8(f).ok()) else {
                warn!("blob without a valid destination frame, dropping");
                continue;
            };
            let Some(dst) = net.node(name) else {
                warn!(node = name; "blob for unknown node, dropping");
                continue;
            };
            let Some(payload) = msg.frames.get(1) else {
                warn!(node = name; "blob without a payload frame, dropping");
                continue;
            };

            let payload: Vec<f32> = bytemuck::pod_collect_to_vec(payload.as_slice());
            dst.fill_input(&payload);
            dst.set_ready(true);
        }
    }
}

#[cfg(test)]
impl Worker {
    pub(crate) fn put_param_channel(&mut self, channel: MsgChannel) {
        self.param_channel = Some(channel);
    }

    pub(crate) fn put_layer_channel(&mut self, channel: MsgChannel) {
        self.layer_channel = Some(channel);
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, sync::Arc, time::Duration};

    use comms::MsgChannel;
    use comms::msg::{Addr, Msg, MsgKind, Role};

    use super::*;
    use crate::graph::test_ops::{EventLog, RecordingOps};

    fn topology() -> Topology {
        Topology {
            nworker_groups_per_server_group: NonZeroUsize::new(1).unwrap(),
            checkpoint_folder: std::env::temp_dir(),
        }
    }

    fn worker_with_net(net: Arc<Graph>) -> Worker {
        let mut worker = Worker::create(&JobConf::default(), &AlgRegistry::default()).unwrap();
        worker.setup(0, 0, JobConf::default(), topology(), net, None, None);
        worker
    }

    fn param(id: i32, owner: i32) -> Arc<Param> {
        Arc::new(Param::new(id, owner, None, 2))
    }

    fn single_node_net(params: Vec<Arc<Param>>) -> Arc<Graph> {
        let log = EventLog::default();
        Arc::new(Graph::new(vec![Node::new(
            "n0",
            0,
            NodeKind::Plain,
            params,
            None,
            Box::new(RecordingOps::new("n0", log)),
        )]))
    }

    fn duplex_channels() -> (MsgChannel, MsgChannel) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let (ar, aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        (MsgChannel::new(ar, aw), MsgChannel::new(br, bw))
    }

    #[tokio::test]
    async fn collect_returns_immediately_when_version_is_ahead() {
        let p = param(0, 0);
        p.set_version(1);
        let worker = worker_with_net(single_node_net(vec![Arc::clone(&p)]));

        // local_version is -1 < 1, so this must not block.
        tokio::time::timeout(Duration::from_millis(50), worker.collect(0, &p))
            .await
            .expect("collect should not block");
    }

    #[tokio::test]
    async fn collect_unblocks_when_a_peer_bumps_the_version() {
        let p = param(0, 0);
        p.set_version(3);
        p.set_local_version(3);
        let worker = worker_with_net(single_node_net(vec![Arc::clone(&p)]));

        let bumper = Arc::clone(&p);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            bumper.set_version(4);
        });

        tokio::time::timeout(Duration::from_secs(2), worker.collect(4, &p))
            .await
            .expect("collect should unblock after the version bump");
    }

    #[tokio::test]
    async fn sync_calls_degrade_to_noop_without_a_channel() {
        let p = param(0, 0);
        let net = single_node_net(vec![Arc::clone(&p)]);
        let mut worker = worker_with_net(net);

        assert!(!worker.put(0, &p).await);
        assert!(!worker.update(0, &p).await);
        assert!(!worker.get(1, &p).await);
    }

    #[tokio::test]
    async fn get_short_circuits_on_a_fresh_version() {
        let p = param(0, 0);
        p.set_version(10);
        let mut worker = worker_with_net(single_node_net(vec![Arc::clone(&p)]));

        // Needs no channel at all: success without a round trip.
        assert!(worker.get(5, &p).await);
    }

    #[tokio::test]
    async fn update_stamps_local_version_and_sends_a_targeted_message() {
        let p = param(7, 7);
        p.set_version(4);
        let net = single_node_net(vec![Arc::clone(&p)]);
        let mut worker = worker_with_net(net);

        let (near, mut far) = duplex_channels();
        worker.put_param_channel(near);

        assert!(worker.update(4, &p).await);
        assert_eq!(p.local_version(), 4);

        let msg = far.recv().await.unwrap();
        assert_eq!(msg.kind, MsgKind::Update);
        assert_eq!(msg.dst, Addr::stub());
        let target = msg.target.unwrap();
        assert_eq!(target.shard, 7);
        assert_eq!(target.step, 4);
    }

    #[tokio::test]
    async fn receive_blobs_routes_by_name_and_marks_ready() {
        let log = EventLog::default();
        let sink = Node::new(
            "sink",
            0,
            NodeKind::BridgeDst,
            Vec::new(),
            Some("src".into()),
            Box::new(RecordingOps::new("sink", Arc::clone(&log))),
        );
        let net = Arc::new(Graph::new(vec![sink]));
        let mut worker = worker_with_net(Arc::clone(&net));

        let (near, mut far) = duplex_channels();
        worker.put_layer_channel(near);

        let payload = [0.5f32, 1.5, 2.5];
        let blob = Msg {
            src: Addr::new(0, 1, Role::WorkerLayer),
            dst: Addr::new(0, 0, Role::WorkerLayer),
            kind: MsgKind::Blob,
            target: None,
            frames: vec![b"sink".to_vec(), bytemuck::cast_slice(&payload).to_vec()],
        };
        tokio::spawn(async move {
            far.send(&blob).await.unwrap();
        });

        let node = net.node("sink").unwrap();
        worker.receive_blobs(&net, node).await;

        assert!(node.is_ready());
        assert_eq!(log.lock().as_slice(), ["input:sink:3".to_string()]);
    }

    #[tokio::test]
    async fn send_blobs_packages_peer_name_and_payload() {
        let log = EventLog::default();
        let src = Node::new(
            "src",
            0,
            NodeKind::BridgeSrc,
            Vec::new(),
            Some("sink".into()),
            Box::new(RecordingOps::new("src", Arc::clone(&log))),
        );
        let sink = Node::new(
            "sink",
            1,
            NodeKind::BridgeDst,
            Vec::new(),
            Some("src".into()),
            Box::new(RecordingOps::new("sink", log)),
        );
        let net = Arc::new(Graph::new(vec![src, sink]));
        let mut worker = worker_with_net(Arc::clone(&net));

        let (near, mut far) = duplex_channels();
        worker.put_layer_channel(near);

        let node = net.node("src").unwrap();
        assert!(worker.send_blobs(&net, node).await);

        let msg = far.recv().await.unwrap();
        assert_eq!(msg.kind, MsgKind::Blob);
        assert_eq!(msg.dst.id, 1);
        assert_eq!(msg.frames[0], b"sink".to_vec());
        // RecordingOps outputs [1.0, 2.0].
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(msg.frames[1].as_slice());
        assert_eq!(floats, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn warm_up_trains_locally_and_publishes_afterwards() {
        let log = EventLog::default();
        let p = param(0, 0);
        let net = Arc::new(Graph::new(vec![Node::new(
            "n0",
            0,
            NodeKind::Plain,
            vec![Arc::clone(&p)],
            None,
            Box::new(RecordingOps::new("n0", Arc::clone(&log))),
        )]));

        let job = JobConf {
            warmup_steps: 2,
            init_barrier_ms: 5,
            ..JobConf::default()
        };
        let mut worker = Worker::create(&job, &AlgRegistry::default()).unwrap();
        worker.setup(0, 0, job, topology(), Arc::clone(&net), None, None);

        let (near, mut far) = duplex_channels();
        worker.put_param_channel(near);

        let mut alg = crate::bp::BpAlg::new();
        worker.init_net_params(&mut alg, &net).await.unwrap();

        // Both warm-up batches ran, each bumping the version in place so
        // the next batch's collect is not left waiting.
        let batches = log
            .lock()
            .iter()
            .filter(|e| e.as_str() == "feature:n0:Train")
            .count();
        assert_eq!(batches, 2);
        assert_eq!(p.version(), 2);
        assert_eq!(p.local_version(), 1);

        // The first thing on the wire is the post-warm-up publish, stamped
        // with the warmed-up version.
        let msg = far.recv().await.unwrap();
        assert_eq!(msg.kind, MsgKind::Put);
        assert_eq!(msg.target.unwrap().step, 2);

        // No warm-up update ever left the process, and the final get
        // short-circuited on the fresh version.
        let silence = tokio::time::timeout(Duration::from_millis(50), far.recv()).await;
        assert!(silence.is_err());
    }

    #[tokio::test]
    async fn checkpoint_persists_only_owned_params() {
        let owned = param(0, 0);
        owned.set_version(6);
        owned.restore(&[1.0, 2.0]);
        let borrowed = param(1, 9);
        let net = single_node_net(vec![Arc::clone(&owned), borrowed]);
        let worker = worker_with_net(Arc::clone(&net));

        let folder = std::env::temp_dir().join(format!("worker-ckpt-{}", std::process::id()));
        worker.checkpoint(6, &folder, &net).unwrap();

        let records = checkpoint::read(&checkpoint::checkpoint_path(&folder, 6, 0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "param-0");
        assert_eq!(records[0].version, 6);
        assert_eq!(records[0].values, vec![1.0, 2.0]);

        std::fs::remove_dir_all(&folder).ok();
    }
}
