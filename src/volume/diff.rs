use std::collections::HashSet;

use super::Volume;

/// Entries of `new` whose mount point does not appear anywhere in `old`.
///
/// Matching is by mount point only: a different device remounted at a known
/// path is not reported. Removed volumes are not reported either.
/// O(n): one pass to index `old`, one pass to filter `new`.
pub fn diff(old: &[Volume], new: &[Volume]) -> Vec<Volume> {
    let seen: HashSet<&str> = old.iter().map(|v| v.mount_point.as_str()).collect();
    new.iter()
        .filter(|v| !seen.contains(v.mount_point.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vols(mounts: &[&str]) -> Vec<Volume> {
        mounts.iter().map(|m| Volume::new("/dev/x", *m)).collect()
    }

    #[test]
    fn reports_only_new_mount_points() {
        let got = diff(&vols(&["/a", "/b"]), &vols(&["/b", "/c"]));
        assert_eq!(got, vols(&["/c"]));
    }

    #[test]
    fn same_snapshot_yields_nothing() {
        let x = vols(&["/", "/boot", "/data"]);
        assert!(diff(&x, &x).is_empty());
    }

    #[test]
    fn remount_with_other_device_is_not_new() {
        let old = vec![Volume::new("/dev/sda1", "/data")];
        let new = vec![Volume::new("/dev/sdb1", "/data")];
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn empty_old_reports_everything_in_order() {
        let new = vols(&["/z", "/a", "/m"]);
        assert_eq!(diff(&[], &new), new);
    }
}
