use std::collections::HashMap;

use crate::{
    alg::TrainAlg,
    bp::BpAlg,
    cd::CdAlg,
    config::AlgConf,
    error::{Result, WorkerErr},
};

type AlgCtor = Box<dyn Fn(&AlgConf) -> Box<dyn TrainAlg> + Send + Sync>;

/// Injected map from algorithm identifier to variant constructor.
///
/// Replaces process-wide factory state: each worker is handed the registry
/// it should resolve its algorithm through.
pub struct AlgRegistry {
    ctors: HashMap<String, AlgCtor>,
}

impl AlgRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// Registers a constructor under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&AlgConf) -> Box<dyn TrainAlg> + Send + Sync + 'static,
    {
        self.ctors.insert(name.to_string(), Box::new(ctor));
    }

    /// Instantiates the variant named by `conf`.
    ///
    /// # Errors
    /// `WorkerErr::UnknownAlgorithm` when the identifier is unregistered.
    pub fn create(&self, conf: &AlgConf) -> Result<Box<dyn TrainAlg>> {
        let name = conf.effective_name();
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| WorkerErr::UnknownAlgorithm(name.to_string()))?;
        Ok(ctor(conf))
    }
}

/// Registry with the built-in variants: `"bp"` and `"cd"`.
impl Default for AlgRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("bp", |_| Box::new(BpAlg::new()));
        registry.register("cd", |conf| Box::new(CdAlg::new(conf.cd_k)));
        registry
    }
}
