//! Thread-safe engine handle.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::engine::Engine;

/// Cloneable handle to one engine. Every search, build and cache update
/// runs under the lock, so cache entries and counters are never seen half
/// written.
#[derive(Clone)]
pub struct SharedEngine(Arc<Mutex<Engine>>);

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        self.0.lock()
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.0.lock())
    }
}

impl From<Engine> for SharedEngine {
    fn from(engine: Engine) -> Self {
        Self::new(engine)
    }
}
