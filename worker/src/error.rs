use std::{error::Error, fmt, io};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    /// The algorithm identifier is not present in the registry.
    UnknownAlgorithm(String),
    /// `run` was invoked before `setup` supplied a required piece of state.
    NotConfigured(&'static str),
    /// Two distinct owned parameters carry the same name during bootstrap.
    DuplicateParamName {
        name: String,
    },
    /// The cluster runtime refused this worker's synchronization group.
    JoinGroupFailed {
        group: i32,
        worker: i32,
    },
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::UnknownAlgorithm(name) => {
                write!(f, "unknown training algorithm: {name}")
            }
            WorkerErr::NotConfigured(what) => {
                write!(f, "worker not configured: missing {what}")
            }
            WorkerErr::DuplicateParamName { name } => {
                write!(f, "duplicate name among owned parameters: {name}")
            }
            WorkerErr::JoinGroupFailed { group, worker } => {
                write!(f, "failed to join sync group: group={group} worker={worker}")
            }
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
