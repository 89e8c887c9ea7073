//! Serialized access to the shared navmesh engine.
//!
//! The engine is not reentrant, so it lives behind a single mutex together
//! with the set of loaded maps. Every load and every query takes the lock;
//! path post-processing happens after it is released.

use crate::engine::{EngineResult, NavEngine};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::time::Instant;

struct Inner {
    engine: Box<dyn NavEngine>,
    loaded: BTreeSet<i32>,
}

impl Inner {
    fn ensure_loaded(&mut self, map_id: i32) -> EngineResult<()> {
        if self.loaded.contains(&map_id) {
            return Ok(());
        }

        let start = Instant::now();
        self.engine.load_map(map_id)?;
        self.loaded.insert(map_id);
        info!("Loaded map {:03} in {:?}", map_id, start.elapsed());
        Ok(())
    }
}

/// Owner of the engine and its loaded-map state
pub struct MapAccess {
    inner: Mutex<Inner>,
}

impl MapAccess {
    pub fn new(engine: Box<dyn NavEngine>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                engine,
                loaded: BTreeSet::new(),
            }),
        }
    }

    /// Load `map_id` unless it is already loaded.
    pub fn ensure_loaded(&self, map_id: i32) -> EngineResult<()> {
        self.inner.lock().ensure_loaded(map_id)
    }

    /// Run one engine call against `map_id`, loading the map first if needed.
    pub fn with_map<T, F>(&self, map_id: i32, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut dyn NavEngine) -> EngineResult<T>,
    {
        let mut inner = self.inner.lock();
        inner.ensure_loaded(map_id)?;
        f(inner.engine.as_mut())
    }

    pub fn is_loaded(&self, map_id: i32) -> bool {
        self.inner.lock().loaded.contains(&map_id)
    }

    /// Loaded map ids in ascending order
    pub fn loaded_maps(&self) -> Vec<i32> {
        self.inner.lock().loaded.iter().copied().collect()
    }

    /// Load each id, logging failures. Returns how many are loaded afterwards.
    pub fn preload(&self, map_ids: &[i32]) -> usize {
        let mut count = 0;
        for &map_id in map_ids {
            match self.ensure_loaded(map_id) {
                Ok(()) => count += 1,
                Err(e) => warn!("Preloading map {:03} failed: {}", map_id, e),
            }
        }
        count
    }
}
