use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use partserve::{ProcMounts, VolumeSource};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("pstest-mounts-{prefix}-{pid}-{t}-{id}"))
}

const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
none /mnt/odd ext4 rw 0 0
tmpfs /run tmpfs rw,nosuid,nodev,size=1630516k,mode=755 0 0
/dev/sdb1 /media/USB\\040Drive vfat rw,nosuid,nodev,relatime,uid=1000 0 0
";

const FILESYSTEMS: &str = "nodev\tsysfs\nnodev\ttmpfs\nnodev\tproc\n\text4\n\tvfat\n";

#[test]
fn lists_all_mounts_in_order_when_pseudo_included() -> Result<()> {
    let root = unique_root("all");
    fs::create_dir_all(&root)?;
    fs::write(root.join("mounts"), MOUNTS)?;
    fs::write(root.join("filesystems"), FILESYSTEMS)?;

    let src = ProcMounts::with_paths(root.join("mounts"), root.join("filesystems"));
    let v = src.list(true)?;
    let mounts: Vec<&str> = v.iter().map(|x| x.mount_point.as_str()).collect();
    assert_eq!(
        mounts,
        vec!["/sys", "/proc", "/", "/mnt/odd", "/run", "/media/USB Drive"]
    );
    assert_eq!(v[5].opts.len(), 5);
    Ok(())
}

#[test]
fn physical_only_uses_filesystems_table() -> Result<()> {
    let root = unique_root("phys");
    fs::create_dir_all(&root)?;
    fs::write(root.join("mounts"), MOUNTS)?;
    fs::write(root.join("filesystems"), FILESYSTEMS)?;

    let src = ProcMounts::with_paths(root.join("mounts"), root.join("filesystems"));
    let v = src.list(false)?;
    let devices: Vec<&str> = v.iter().map(|x| x.device.as_str()).collect();
    assert_eq!(devices, vec!["/dev/nvme0n1p2", "/dev/sdb1"]);
    Ok(())
}

#[test]
fn physical_only_falls_back_to_device_paths() -> Result<()> {
    let root = unique_root("fallback");
    fs::create_dir_all(&root)?;
    fs::write(root.join("mounts"), MOUNTS)?;

    let src = ProcMounts::with_paths(root.join("mounts"), root.join("absent"));
    let v = src.list(false)?;
    assert!(v.iter().all(|x| x.device.starts_with('/')));
    assert_eq!(v.len(), 2);
    Ok(())
}

#[test]
fn unreadable_table_is_an_error() {
    let root = unique_root("missing");
    let src = ProcMounts::with_paths(root.join("mounts"), root.join("filesystems"));
    let err = src.list(true).unwrap_err();
    assert!(format!("{:#}", err).contains("read mount table"));
}
