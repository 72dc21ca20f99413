//! Static pages: index, partition list, health, Prometheus metrics.

use super::{html_escape, Reply};
use crate::consts::{ENDPOINT_FILESYSTEM, ENDPOINT_PARTS};
use crate::ident::Salt;
use crate::metrics;
use crate::volume::Volume;

pub fn index_page() -> Reply {
    Reply::html(200, format!("<a href=\"{}\">Partitions</a><br />", ENDPOINT_PARTS))
}

/// Anything that is not routed anywhere else.
pub fn root_not_found() -> Reply {
    Reply::text(404, "404: page not found")
}

/// Partition index: one link per volume of the current snapshot.
pub fn parts_page(volumes: &[Volume], salt: &Salt) -> Reply {
    let mut out = String::new();
    out.push_str("<h1>Partitions</h1></ br>");
    out.push_str("<a href=\"/\">Back</a><br /><br />");

    for v in volumes {
        let href = format!("{}/{}/", ENDPOINT_FILESYSTEM, salt.derive(&v.device, &v.mount_point));
        let label = format!("{} -> {}", v.device, v.mount_point);
        // [fstype, opts]
        let details = serde_json::json!([v.fstype, v.opts]).to_string();
        out.push_str(&format!(
            "<a href=\"{}\">{}</a><pre>{}</pre><br />",
            href,
            html_escape(&label),
            html_escape(&details)
        ));
    }
    Reply::html(200, out)
}

pub fn health_page() -> Reply {
    Reply::text(200, "OK\n")
}

pub fn metrics_page(routes: usize) -> Reply {
    let m = metrics::snapshot();
    let mut out = String::new();

    let ver = env!("CARGO_PKG_VERSION");
    out.push_str("# HELP partserve_build_info Build info.\n");
    out.push_str("# TYPE partserve_build_info gauge\n");
    out.push_str(&format!("partserve_build_info{{version=\"{}\"}} 1\n", ver));

    // --- Discovery ---
    out.push_str("# HELP partserve_polls_total Discovery polls (successful and failed).\n");
    out.push_str("# TYPE partserve_polls_total counter\n");
    out.push_str(&format!("partserve_polls_total {}\n", m.polls_total));

    out.push_str("# HELP partserve_poll_failures_total Discovery polls where enumeration failed.\n");
    out.push_str("# TYPE partserve_poll_failures_total counter\n");
    out.push_str(&format!("partserve_poll_failures_total {}\n", m.poll_failures_total));

    out.push_str("# HELP partserve_volumes Volumes in the current snapshot.\n");
    out.push_str("# TYPE partserve_volumes gauge\n");
    out.push_str(&format!("partserve_volumes {}\n", m.volumes_current));

    // --- Routes ---
    out.push_str("# HELP partserve_routes Registered volume routes.\n");
    out.push_str("# TYPE partserve_routes gauge\n");
    out.push_str(&format!("partserve_routes {}\n", routes));

    out.push_str("# HELP partserve_routes_registered_total Route registrations since start.\n");
    out.push_str("# TYPE partserve_routes_registered_total counter\n");
    out.push_str(&format!("partserve_routes_registered_total {}\n", m.routes_registered_total));

    // --- HTTP ---
    out.push_str("# HELP partserve_requests_total HTTP requests handled.\n");
    out.push_str("# TYPE partserve_requests_total counter\n");
    out.push_str(&format!("partserve_requests_total {}\n", m.requests_total));

    out.push_str("# HELP partserve_requests_not_found_total HTTP requests answered with 404.\n");
    out.push_str("# TYPE partserve_requests_not_found_total counter\n");
    out.push_str(&format!("partserve_requests_not_found_total {}\n", m.requests_not_found_total));

    Reply::new(200)
        .with_header("Content-Type", "text/plain; version=0.0.4")
        .with_body(out.into_bytes())
}
