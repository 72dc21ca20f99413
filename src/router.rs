//! Router — route table + current volume snapshot.
//!
//! Owned by the composition root and shared (Arc) between the discovery
//! thread and HTTP workers.
//!
//! Invariants:
//! - at most one handler per identifier; once registered a handler is never
//!   replaced or removed (append-only, no unregister API);
//! - the snapshot is replaced as a whole; readers get an `Arc` of either the
//!   old or the new list, never a mix.
//!
//! Both structures sit behind `RwLock`: readers (request routing, page
//! rendering) share the lock, the discovery thread takes it exclusively only
//! for the insert / pointer swap itself.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::consts::ENDPOINT_FILESYSTEM;
use crate::http::{Handler, HttpRequest, Reply};
use crate::metrics;
use crate::volume::Volume;

pub struct Router {
    routes: RwLock<HashMap<String, Arc<dyn Handler>>>,
    snapshot: RwLock<Arc<Vec<Volume>>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    // ---------- route table ----------

    /// Register `handler` under `id` unless a handler is already there.
    /// Returns true if this call inserted it. Safe to call on every poll.
    pub fn register_if_absent(&self, id: &str, handler: Arc<dyn Handler>) -> bool {
        let mut g = self.routes_write();
        if g.contains_key(id) {
            return false;
        }
        g.insert(id.to_string(), handler);
        drop(g);
        metrics::record_route_registered();
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.routes_read().contains_key(id)
    }

    pub fn route(&self, id: &str) -> Option<Arc<dyn Handler>> {
        self.routes_read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prefix dispatch for `/filesystem/{id}[/...]`.
    /// Unknown ids and paths outside the prefix get 404.
    pub fn dispatch(&self, rq: &HttpRequest) -> Reply {
        let id = match volume_id_of(&rq.path) {
            Some(id) => id,
            None => return Reply::not_found(),
        };
        // handler is cloned out so the lock is not held during file I/O
        match self.route(id) {
            Some(h) => h.serve(rq),
            None => Reply::not_found(),
        }
    }

    // ---------- current snapshot ----------

    pub fn snapshot(&self) -> Arc<Vec<Volume>> {
        match self.snapshot.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a fresh snapshot; returns the previous one.
    pub fn replace_snapshot(&self, volumes: Vec<Volume>) -> Arc<Vec<Volume>> {
        let fresh = Arc::new(volumes);
        let mut g = match self.snapshot.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *g, fresh)
    }

    // Таблица только растёт, поэтому после паники писателя данные остаются согласованными.
    fn routes_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Handler>>> {
        match self.routes.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn routes_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Handler>>> {
        match self.routes.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// "/filesystem/{id}" or "/filesystem/{id}/..." -> Some(id).
pub(crate) fn volume_id_of(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(ENDPOINT_FILESYSTEM)?.strip_prefix('/')?;
    let id = match rest.find('/') {
        Some(i) => &rest[..i],
        None => rest,
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
