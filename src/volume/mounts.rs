//! ProcMounts — Linux mount table backend.
//!
//! /proc/self/mounts (fstab format):
//!   <device> <mount_point> <fstype> <opt1,opt2,...> <dump> <pass>
//! Whitespace inside fields is escaped as 3-digit octal (`\040` = space).
//! The table is parsed as bytes; an entry whose fields are not valid UTF-8
//! after unescaping is skipped with a warning.
//!
//! Pseudo filter (include_pseudo = false):
//!   keep fstypes listed in /proc/filesystems WITHOUT the `nodev` marker and
//!   drop device "none". If /proc/filesystems cannot be read, keep only
//!   entries whose device is an absolute path.

use anyhow::{Context, Result};
use log::warn;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Volume, VolumeSource};
use crate::consts::{PROC_FILESYSTEMS, PROC_MOUNTS};

#[derive(Clone, Debug)]
pub struct ProcMounts {
    mounts_path: PathBuf,
    filesystems_path: PathBuf,
}

impl Default for ProcMounts {
    fn default() -> Self {
        Self {
            mounts_path: PathBuf::from(PROC_MOUNTS),
            filesystems_path: PathBuf::from(PROC_FILESYSTEMS),
        }
    }
}

impl ProcMounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read alternative tables (tests, chroots, /host/proc bind mounts).
    pub fn with_paths<P: Into<PathBuf>, Q: Into<PathBuf>>(mounts: P, filesystems: Q) -> Self {
        Self {
            mounts_path: mounts.into(),
            filesystems_path: filesystems.into(),
        }
    }

    fn physical_fstypes(&self) -> Option<HashSet<String>> {
        let text = fs::read_to_string(&self.filesystems_path).ok()?;
        Some(parse_filesystems(&text))
    }
}

impl VolumeSource for ProcMounts {
    fn list(&self, include_pseudo: bool) -> Result<Vec<Volume>> {
        let table = read_table(&self.mounts_path)?;
        let all = parse_mounts(&table);
        if include_pseudo {
            return Ok(all);
        }
        let out = match self.physical_fstypes() {
            Some(physical) => all
                .into_iter()
                .filter(|v| v.device != "none" && physical.contains(&v.fstype))
                .collect(),
            None => all
                .into_iter()
                .filter(|v| v.device.starts_with('/'))
                .collect(),
        };
        Ok(out)
    }
}

fn read_table(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read mount table {}", path.display()))
}

/// Parse a mount table; lines with fewer than 4 fields are skipped.
pub(crate) fn parse_mounts(table: &[u8]) -> Vec<Volume> {
    let mut out = Vec::new();
    for (no, line) in table.split(|&c| c == b'\n').enumerate() {
        let mut it = line
            .split(|c| c.is_ascii_whitespace())
            .filter(|f| !f.is_empty());
        let (dev, mnt, fst, opts) = match (it.next(), it.next(), it.next(), it.next()) {
            (Some(d), Some(m), Some(f), Some(o)) => (d, m, f, o),
            _ => continue,
        };
        match parse_entry(dev, mnt, fst, opts) {
            Some(v) => out.push(v),
            None => warn!(
                "mounts: line {}: skipping entry that is not valid UTF-8: {}",
                no + 1,
                String::from_utf8_lossy(line)
            ),
        }
    }
    out
}

fn parse_entry(dev: &[u8], mnt: &[u8], fst: &[u8], opts: &[u8]) -> Option<Volume> {
    let field = |f: &[u8]| String::from_utf8(unescape_octal(f)).ok();
    let opts = opts
        .split(|&c| c == b',')
        .filter(|o| !o.is_empty())
        .map(field)
        .collect::<Option<Vec<String>>>()?;
    Some(Volume {
        device: field(dev)?,
        mount_point: field(mnt)?,
        fstype: field(fst)?,
        opts,
    })
}

/// /proc/filesystems: "nodev\tsysfs" | "\text4". Returns fstypes backed by a device.
pub(crate) fn parse_filesystems(text: &str) -> HashSet<String> {
    text.lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let first = cols.next()?;
            if first == "nodev" {
                None
            } else {
                Some(first.to_string())
            }
        })
        .collect()
}

// `\040` -> ' ', `\011` -> '\t', `\012` -> '\n', `\134` -> '\\'
fn unescape_octal(b: &[u8]) -> Vec<u8> {
    if !b.contains(&b'\\') {
        return b.to_vec();
    }
    let mut out = Vec::with_capacity(b.len());
    let mut i = 0usize;
    while i < b.len() {
        if b[i] == b'\\' && i + 3 < b.len() {
            let oct = &b[i + 1..i + 4];
            if oct.iter().all(|c| (b'0'..=b'7').contains(c)) {
                let v = (oct[0] - b'0') as u32 * 64
                    + (oct[1] - b'0') as u32 * 8
                    + (oct[2] - b'0') as u32;
                if v <= 0xFF {
                    out.push(v as u8);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(b[i]);
        i += 1;
    }
    out
}
