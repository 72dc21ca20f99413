//! volume — mounted volumes as seen by the OS.
//!
//! - `Volume`: one mounted filesystem at a point in time (immutable, replaced every poll).
//! - `VolumeSource`: the OS enumeration boundary; any backend returning the same shape works.
//! - `ProcMounts`: Linux backend over /proc/self/mounts (see mounts.rs).
//! - `diff`: one-directional snapshot diff keyed by mount point (see diff.rs).

use anyhow::Result;
use serde::Serialize;

mod diff;
mod mounts;

pub use diff::diff;
pub use mounts::ProcMounts;

/// Volume descriptor. `mount_point` is the natural key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
    pub opts: Vec<String>,
}

impl Volume {
    pub fn new<D: Into<String>, M: Into<String>>(device: D, mount_point: M) -> Self {
        Self {
            device: device.into(),
            mount_point: mount_point.into(),
            fstype: String::new(),
            opts: Vec::new(),
        }
    }

    pub fn with_fstype<S: Into<String>>(mut self, fstype: S) -> Self {
        self.fstype = fstype.into();
        self
    }

    pub fn with_opts<I, S>(mut self, opts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.opts = opts.into_iter().map(Into::into).collect();
        self
    }
}

/// Источник списка смонтированных томов. Thread-safe.
pub trait VolumeSource: Send + Sync {
    /// Enumerate mounted volumes in OS order.
    /// `include_pseudo = false` drops virtual filesystems (proc, sysfs, tmpfs, ...).
    fn list(&self, include_pseudo: bool) -> Result<Vec<Volume>>;
}
