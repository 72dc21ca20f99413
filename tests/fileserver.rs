use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use partserve::http::{FileServer, Handler, HttpRequest, Reply};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("pstest-fs-{prefix}-{pid}-{t}-{id}"))
}

const PREFIX: &str = "/filesystem/vol";

fn get(fs: &FileServer, url: &str) -> Reply {
    fs.serve(&HttpRequest::get(url))
}

fn body(r: Reply) -> Result<String> {
    Ok(String::from_utf8(r.into_bytes()?)?)
}

#[test]
fn lists_directory_sorted_with_dir_suffix() -> Result<()> {
    let root = unique_root("list");
    fs::create_dir_all(root.join("zeta"))?;
    fs::write(root.join("b.txt"), b"b")?;
    fs::write(root.join("a b.txt"), b"a")?;
    fs::write(root.join("<x>.txt"), b"x")?;

    let srv = FileServer::new(&root, PREFIX);
    let r = get(&srv, "/filesystem/vol/");
    assert_eq!(r.status, 200);
    assert_eq!(r.header("Content-Type"), Some("text/html; charset=utf-8"));
    let html = body(r)?;

    let pa = html.find("a%20b.txt").expect("a b.txt listed");
    let pb = html.find("\"b.txt\"").expect("b.txt listed");
    let pz = html.find("\"zeta/\"").expect("zeta/ listed");
    assert!(html.find("&lt;x&gt;.txt").is_some(), "names must be html-escaped");
    assert!(pa < pb && pb < pz, "entries must be sorted: {html}");
    Ok(())
}

#[test]
fn serves_file_with_type_and_last_modified() -> Result<()> {
    let root = unique_root("file");
    fs::create_dir_all(root.join("docs"))?;
    fs::write(root.join("docs/readme.txt"), b"hello volume")?;
    fs::write(root.join("docs/page.html"), b"<p>x</p>")?;
    fs::write(root.join("docs/blob"), [0u8, 1, 2, 3])?;
    fs::write(root.join("docs/notes"), b"plain words")?;

    let srv = FileServer::new(&root, PREFIX);

    let r = get(&srv, "/filesystem/vol/docs/readme.txt");
    assert_eq!(r.status, 200);
    assert_eq!(r.header("Content-Type"), Some("text/plain; charset=utf-8"));
    assert!(r.header("Last-Modified").is_some());
    assert_eq!(body(r)?, "hello volume");

    let r = get(&srv, "/filesystem/vol/docs/page.html");
    assert_eq!(r.header("Content-Type"), Some("text/html; charset=utf-8"));

    let r = get(&srv, "/filesystem/vol/docs/blob");
    assert_eq!(r.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(r.into_bytes()?, vec![0u8, 1, 2, 3]);

    let r = get(&srv, "/filesystem/vol/docs/notes");
    assert_eq!(r.header("Content-Type"), Some("text/plain; charset=utf-8"));
    assert_eq!(body(r)?, "plain words");
    Ok(())
}

#[test]
fn redirects_follow_directory_conventions() -> Result<()> {
    let root = unique_root("redir");
    fs::create_dir_all(root.join("dir"))?;
    fs::write(root.join("file.txt"), b"f")?;

    let srv = FileServer::new(&root, PREFIX);

    let r = get(&srv, "/filesystem/vol");
    assert_eq!(r.status, 301);
    assert_eq!(r.header("Location"), Some("/filesystem/vol/"));

    let r = get(&srv, "/filesystem/vol/dir?sort=1");
    assert_eq!(r.status, 301);
    assert_eq!(r.header("Location"), Some("/filesystem/vol/dir/?sort=1"));

    let r = get(&srv, "/filesystem/vol/file.txt/");
    assert_eq!(r.status, 301);
    assert_eq!(r.header("Location"), Some("/filesystem/vol/file.txt"));

    let r = get(&srv, "/filesystem/vol/dir/index.html");
    assert_eq!(r.status, 301);
    assert_eq!(r.header("Location"), Some("/filesystem/vol/dir/"));
    Ok(())
}

#[test]
fn index_html_replaces_listing() -> Result<()> {
    let root = unique_root("index");
    fs::create_dir_all(&root)?;
    fs::write(root.join("index.html"), b"<h1>home</h1>")?;
    fs::write(root.join("other.txt"), b"o")?;

    let srv = FileServer::new(&root, PREFIX);
    let r = get(&srv, "/filesystem/vol/");
    assert_eq!(r.status, 200);
    assert_eq!(body(r)?, "<h1>home</h1>");
    Ok(())
}

#[test]
fn missing_paths_and_traversal_stay_inside_root() -> Result<()> {
    let outer = unique_root("trav");
    let root = outer.join("mnt");
    fs::create_dir_all(&root)?;
    fs::write(outer.join("secret.txt"), b"top secret")?;
    fs::write(root.join("inside.txt"), b"ok")?;

    let srv = FileServer::new(&root, PREFIX);
    assert_eq!(get(&srv, "/filesystem/vol/nope.txt").status, 404);
    assert_eq!(get(&srv, "/filesystem/vol/inside.txt/child").status, 404);

    // ".." схлопывается до корня тома
    let r = get(&srv, "/filesystem/vol/../secret.txt");
    assert_eq!(r.status, 404);
    let r = get(&srv, "/filesystem/vol/%2e%2e/secret.txt");
    assert_eq!(r.status, 404);
    let r = get(&srv, "/filesystem/vol/../inside.txt");
    assert_eq!(r.status, 200);
    assert_eq!(body(r)?, "ok");
    Ok(())
}

#[test]
fn percent_encoded_names_resolve() -> Result<()> {
    let root = unique_root("pct");
    fs::create_dir_all(&root)?;
    fs::write(root.join("my file.txt"), b"spaced")?;

    let srv = FileServer::new(&root, PREFIX);
    let r = get(&srv, "/filesystem/vol/my%20file.txt");
    assert_eq!(r.status, 200);
    assert_eq!(body(r)?, "spaced");
    Ok(())
}

#[test]
fn non_utf8_names_are_listed_and_served() -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = unique_root("bytes");
    fs::create_dir_all(&root)?;
    fs::write(root.join(OsStr::from_bytes(b"caf\xe9.txt")), b"latin-1 name")?;

    let srv = FileServer::new(&root, PREFIX);
    let html = body(get(&srv, "/filesystem/vol/"))?;
    assert!(html.contains("href=\"caf%E9.txt\""), "raw bytes must be percent-encoded: {html}");

    // the listed href resolves to the same file
    let r = get(&srv, "/filesystem/vol/caf%E9.txt");
    assert_eq!(r.status, 200);
    assert_eq!(body(r)?, "latin-1 name");
    Ok(())
}

#[test]
fn extensionless_files_are_sniffed_by_magic() -> Result<()> {
    let root = unique_root("sniff");
    fs::create_dir_all(&root)?;
    fs::write(root.join("page"), b"<!doctype html>\n<title>t</title>")?;
    fs::write(root.join("image"), b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR")?;
    fs::write(root.join("doc"), b"%PDF-1.4\n%\xe2\xe3\xcf\xd3")?;
    fs::write(root.join("archive"), b"PK\x03\x04\x14\0\0\0")?;

    let srv = FileServer::new(&root, PREFIX);
    let cases = [
        ("page", "text/html; charset=utf-8"),
        ("image", "image/png"),
        ("doc", "application/pdf"),
        ("archive", "application/zip"),
    ];
    for (name, want) in cases {
        let r = get(&srv, &format!("/filesystem/vol/{name}"));
        assert_eq!(r.status, 200, "{name}");
        assert_eq!(r.header("Content-Type"), Some(want), "{name}");
    }
    // after sniffing the whole file is still served from the start
    let r = get(&srv, "/filesystem/vol/image");
    assert_eq!(r.into_bytes()?, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec());
    Ok(())
}
