use std::{num::NonZeroUsize, path::PathBuf};

/// Training-algorithm selection and knobs.
#[derive(Debug, Clone)]
pub struct AlgConf {
    /// Built-in algorithm identifier (`"bp"`, `"cd"`).
    pub name: String,
    /// User-supplied identifier; takes precedence over `name` when set.
    pub user_name: Option<String>,
    /// Gibbs chain length for the contrastive-divergence variant.
    pub cd_k: NonZeroUsize,
}

impl Default for AlgConf {
    fn default() -> Self {
        Self {
            name: "bp".to_string(),
            user_name: None,
            cd_k: NonZeroUsize::new(1).unwrap(),
        }
    }
}

impl AlgConf {
    /// The effective algorithm identifier.
    pub fn effective_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.name)
    }
}

/// Opaque job configuration consumed by the worker core.
///
/// Periods of 0 disable the corresponding periodic action; periodic
/// predicates never fire at step 0.
#[derive(Debug, Clone)]
pub struct JobConf {
    /// Starting step; persisted back on checkpoint.
    pub step: i64,
    /// Total training steps; the loop stops once reached.
    pub train_steps: i64,
    /// Batches trained locally before publishing anything to the servers.
    pub warmup_steps: i64,
    pub validate_period: i64,
    pub validate_steps: i64,
    pub test_period: i64,
    pub test_steps: i64,
    pub checkpoint_period: i64,
    pub display_period: i64,
    /// Checkpoint files restored in order; later files win on name clashes.
    pub checkpoint_paths: Vec<PathBuf>,
    /// When set, restored parameters are re-stamped with `step` instead of
    /// the version recorded in the checkpoint.
    pub reset_param_version: bool,
    pub debug: bool,
    /// Best-effort bootstrap barrier between initializer puts and the
    /// first round of gets.
    pub init_barrier_ms: u64,
    pub alg: AlgConf,
}

impl Default for JobConf {
    fn default() -> Self {
        Self {
            step: 0,
            train_steps: 0,
            warmup_steps: 0,
            validate_period: 0,
            validate_steps: 0,
            test_period: 0,
            test_steps: 0,
            checkpoint_period: 0,
            display_period: 0,
            checkpoint_paths: Vec::new(),
            reset_param_version: false,
            debug: false,
            init_barrier_ms: 1000,
            alg: AlgConf::default(),
        }
    }
}

impl JobConf {
    pub fn stop_now(&self, step: i64) -> bool {
        step >= self.train_steps
    }

    pub fn validate_now(&self, step: i64) -> bool {
        due(step, self.validate_period)
    }

    pub fn test_now(&self, step: i64) -> bool {
        due(step, self.test_period)
    }

    pub fn checkpoint_now(&self, step: i64) -> bool {
        due(step, self.checkpoint_period)
    }

    pub fn display_now(&self, step: i64) -> bool {
        due(step, self.display_period)
    }
}

fn due(step: i64, period: i64) -> bool {
    period > 0 && step > 0 && step % period == 0
}
