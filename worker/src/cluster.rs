//! Cluster topology and membership seam.
//!
//! The worker receives both pieces by injection instead of reaching for
//! process-wide state, so tests can run against [`LocalRuntime`].

use std::{num::NonZeroUsize, path::PathBuf};

use async_trait::async_trait;

/// Static cluster shape a worker needs to place itself.
#[derive(Debug, Clone)]
pub struct Topology {
    /// How many worker groups subscribe to one server group; the first
    /// subscriber group of each server group initializes its parameters.
    pub nworker_groups_per_server_group: NonZeroUsize,
    pub checkpoint_folder: PathBuf,
}

impl Topology {
    /// The server group this worker group shards to.
    pub fn server_group(&self, grp_id: i32) -> i32 {
        grp_id / self.nworker_groups_per_server_group.get() as i32
    }

    /// Whether this worker group is its server group's elected initializer.
    pub fn is_initializer(&self, grp_id: i32) -> bool {
        grp_id % self.nworker_groups_per_server_group.get() as i32 == 0
    }
}

/// External membership service for server-group synchronization.
#[async_trait]
pub trait ClusterRuntime: Send + Sync {
    /// Joins the synchronization group; `false` refuses the worker.
    async fn join_sgroup(&self, grp_id: i32, worker_id: i32, server_grp: i32) -> bool;

    async fn leave_sgroup(&self, grp_id: i32, worker_id: i32, server_grp: i32) -> bool;
}

/// Single-process membership: every join succeeds.
#[derive(Debug, Default)]
pub struct LocalRuntime;

#[async_trait]
impl ClusterRuntime for LocalRuntime {
    async fn join_sgroup(&self, _grp_id: i32, _worker_id: i32, _server_grp: i32) -> bool {
        true
    }

    async fn leave_sgroup(&self, _grp_id: i32, _worker_id: i32, _server_grp: i32) -> bool {
        true
    }
}
