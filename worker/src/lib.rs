pub mod alg;
pub mod bp;
pub mod cd;
pub mod checkpoint;
pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod net;
pub mod param;
pub mod registry;
pub mod worker;

pub use alg::TrainAlg;
pub use error::{Result, WorkerErr};
pub use registry::AlgRegistry;
pub use worker::Worker;
