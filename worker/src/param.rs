use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Version value meaning "never initialized".
pub const UNINITIALIZED: i64 = -1;

const INIT_SCALE: f32 = 0.05;

/// A versioned model parameter.
///
/// Exactly one worker owns a parameter's payload memory (`owner == id`);
/// every other worker treats the payload as read-only and refreshes it
/// solely through the Get/Collect protocol. The version counter advances
/// only via confirmed server-side updates, while `local_version` tracks the
/// last version this worker has consumed or submitted.
#[derive(Debug)]
pub struct Param {
    id: i32,
    owner: i32,
    name: String,
    version: AtomicI64,
    local_version: AtomicI64,
    values: RwLock<Vec<f32>>,
}

impl Param {
    /// Creates a parameter with an uninitialized payload of `len` zeros.
    ///
    /// # Arguments
    /// * `id` - The parameter identity.
    /// * `owner` - The id of the owning parameter/shard.
    /// * `name` - Globally unique name; auto-generated when `None`.
    /// * `len` - Payload length in elements.
    pub fn new(id: i32, owner: i32, name: Option<String>, len: usize) -> Self {
        Self {
            id,
            owner,
            name: name.unwrap_or_else(|| format!("param-{id}")),
            version: AtomicI64::new(UNINITIALIZED),
            local_version: AtomicI64::new(UNINITIALIZED),
            values: RwLock::new(vec![0.0; len]),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn owner(&self) -> i32 {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when this worker/shard holds the authoritative payload memory.
    pub fn is_owned_here(&self) -> bool {
        self.owner == self.id
    }

    pub fn version(&self) -> i64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn set_version(&self, version: i64) {
        self.version.store(version, Ordering::Release);
    }

    pub fn local_version(&self) -> i64 {
        self.local_version.load(Ordering::Acquire)
    }

    pub fn set_local_version(&self, version: i64) {
        self.local_version.store(version, Ordering::Release);
    }

    /// Read guard over the payload.
    pub fn values(&self) -> parking_lot::RwLockReadGuard<'_, Vec<f32>> {
        self.values.read()
    }

    /// Overwrites the payload in place, resizing if the source differs.
    pub fn restore(&self, values: &[f32]) {
        let mut guard = self.values.write();
        guard.clear();
        guard.extend_from_slice(values);
    }

    /// Freshly initializes the payload with a seeded uniform fill and stamps
    /// the version with the given starting step.
    ///
    /// # Arguments
    /// * `step` - The configured starting step, also the RNG seed.
    pub fn init_values(&self, step: i64) {
        let mut rng = StdRng::seed_from_u64(step as u64 ^ self.id as u64);
        let mut guard = self.values.write();
        for v in guard.iter_mut() {
            *v = rng.random_range(-INIT_SCALE..INIT_SCALE);
        }
        self.set_version(step);
    }

    /// Shard key derived from the owner id, used to route sync messages.
    pub fn shard(&self) -> u32 {
        self.owner as u32
    }
}
