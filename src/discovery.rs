//! Discovery loop: poll the OS volume list and expose new volumes.
//!
//! Two states: Polling -> Sleeping -> Polling ... (starts in Polling, never terminates).
//!
//! One poll:
//!   1) enumerate volumes; on failure log, count and go straight to sleep
//!      (snapshot and routes stay as they were);
//!   2) for every volume derive its id; if no route exists yet, register a
//!      no-cache file server rooted at the mount point under /filesystem/{id};
//!   3) swap in the fresh snapshot;
//!   4) diff previous vs fresh snapshot and log what appeared (diagnostic only:
//!      registration is driven by route presence, not by the diff).

use anyhow::{Context, Result};
use log::{debug, error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ServeConfig;
use crate::http::volume_handler;
use crate::ident::Salt;
use crate::metrics;
use crate::router::Router;
use crate::volume::{self, Volume, VolumeSource};

/// Outcome of a successful poll.
#[derive(Debug, Clone, Default)]
pub struct PollReport {
    /// Volumes in the fresh snapshot.
    pub volumes: usize,
    /// Identifiers registered by this poll.
    pub registered: Vec<String>,
    /// Volumes whose mount point was absent from the previous snapshot.
    pub appeared: Vec<Volume>,
}

pub struct Discovery {
    router: Arc<Router>,
    source: Arc<dyn VolumeSource>,
    salt: Salt,
    interval: Duration,
    include_pseudo: bool,
}

impl Discovery {
    pub fn new(router: Arc<Router>, source: Arc<dyn VolumeSource>, cfg: &ServeConfig) -> Self {
        Self {
            router,
            source,
            salt: cfg.salt.clone(),
            interval: Duration::from_millis(cfg.poll_interval_ms),
            include_pseudo: cfg.include_pseudo,
        }
    }

    /// One Polling step. Errors come only from enumeration.
    pub fn poll_once(&self) -> Result<PollReport> {
        let fresh = match self.source.list(self.include_pseudo) {
            Ok(v) => v,
            Err(e) => {
                metrics::record_poll_failure();
                return Err(e.context("enumerate mounted volumes"));
            }
        };

        let mut registered = Vec::new();
        for vol in &fresh {
            let id = self.salt.derive(&vol.device, &vol.mount_point);
            if self.router.contains(&id) {
                continue;
            }
            let handler = volume_handler(&vol.mount_point, &id);
            if self.router.register_if_absent(&id, handler) {
                info!("discovery: exposed volume id={} fstype={}", id, vol.fstype);
                debug!("discovery: id={} -> {} on {}", id, vol.device, vol.mount_point);
                registered.push(id);
            }
        }

        let count = fresh.len();
        let previous = self.router.replace_snapshot(fresh);
        let current = self.router.snapshot();
        debug!("discovery: parts={:?}", current);

        let appeared = volume::diff(&previous, &current);
        debug!("discovery: appeared={:?}", appeared);

        metrics::record_poll_ok(count);
        Ok(PollReport {
            volumes: count,
            registered,
            appeared,
        })
    }

    /// Poll forever. Enumeration failures are logged and retried next interval.
    pub fn run(self) {
        loop {
            if let Err(e) = self.poll_once() {
                error!("discovery: {:#}", e);
            }
            thread::sleep(self.interval);
        }
    }

    /// Run the loop on a dedicated thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("partserve-discovery".into())
            .spawn(move || self.run())
            .context("spawn discovery thread")
    }
}
