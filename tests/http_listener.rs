use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};

use partserve::{HttpService, Router, Salt, Site, Volume};
use partserve::http::volume_handler;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("pstest-http-{prefix}-{pid}-{t}-{id}"))
}

/// Raw HTTP/1.1 GET; returns (status line, headers block, body).
fn http_get(addr: SocketAddr, path: &str) -> Result<(String, String, Vec<u8>)> {
    let mut s = TcpStream::connect(addr)?;
    s.set_read_timeout(Some(Duration::from_secs(10)))?;
    write!(
        s,
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    )?;
    let mut raw = Vec::new();
    s.read_to_end(&mut raw)?;

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| anyhow!("no header terminator"))?;
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();
    let (status, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
    Ok((status.to_string(), headers.to_ascii_lowercase(), body))
}

#[test]
fn serves_registered_volume_over_tcp() -> Result<()> {
    let mnt = unique_root("tcp");
    fs::create_dir_all(&mnt)?;
    fs::write(mnt.join("data.txt"), b"over the wire")?;
    let mount = mnt.to_string_lossy().into_owned();

    let salt = Salt::new("tcp-salt");
    let router = Arc::new(Router::new());
    let id = salt.derive("/dev/loop0", &mount);
    router.register_if_absent(&id, volume_handler(&mount, &id));
    router.replace_snapshot(vec![Volume::new("/dev/loop0", mount.clone())]);

    let site = Arc::new(Site::new(router, salt));
    let svc = HttpService::start(site, "127.0.0.1:0", 2)?;
    let addr = svc.local_addr().ok_or_else(|| anyhow!("no ip listen addr"))?;

    let (status, headers, body) = http_get(addr, &format!("/filesystem/{}/data.txt", id))?;
    assert!(status.contains(" 200"), "{status}");
    assert!(headers.contains("cache-control: no-cache, no-store, must-revalidate"));
    assert!(headers.contains("surrogate-control: no-cache"));
    assert_eq!(body, b"over the wire");

    let (status, _, _) = http_get(addr, "/filesystem/deadbeef/")?;
    assert!(status.contains(" 404"), "{status}");

    let (status, _, body) = http_get(addr, "/health")?;
    assert!(status.contains(" 200"), "{status}");
    assert_eq!(body, b"OK\n");

    let (_, headers, body) = http_get(addr, "/metrics")?;
    assert!(headers.contains("content-type: text/plain; version=0.0.4"));
    let text = String::from_utf8(body)?;
    assert!(text.contains("partserve_routes 1"), "{text}");

    svc.shutdown();
    Ok(())
}
