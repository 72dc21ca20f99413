//! server — tiny_http listener + worker pool in front of `Site`.
//!
//! `Site` is the request entry point: fixed pages first, then the volume
//! route table. Workers share one `tiny_http::Server` and each blocks in
//! `recv()`; a reply is converted to a tiny_http response only at the edge.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::io::{self, Cursor, Read};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, ResponseBox, Server, StatusCode};

use crate::consts::{ENDPOINT_FILESYSTEM, ENDPOINT_HEALTH, ENDPOINT_METRICS, ENDPOINT_PARTS};
use crate::http::{pages, Body, HttpRequest, Reply};
use crate::ident::Salt;
use crate::metrics;
use crate::router::Router;

/// Request dispatch for the whole HTTP surface.
pub struct Site {
    router: Arc<Router>,
    salt: Salt,
}

impl Site {
    pub fn new(router: Arc<Router>, salt: Salt) -> Self {
        Self { router, salt }
    }

    pub fn handle(&self, rq: &HttpRequest) -> Reply {
        let reply = self.route(rq);
        metrics::record_request(reply.status);
        reply
    }

    fn route(&self, rq: &HttpRequest) -> Reply {
        let path = rq.path.as_str();
        let under_fs = path
            .strip_prefix(ENDPOINT_FILESYSTEM)
            .map_or(false, |r| r.is_empty() || r.starts_with('/'));
        if under_fs {
            return self.router.dispatch(rq);
        }
        match path {
            "/" => pages::index_page(),
            ENDPOINT_PARTS => pages::parts_page(&self.router.snapshot(), &self.salt),
            ENDPOINT_HEALTH => pages::health_page(),
            ENDPOINT_METRICS => pages::metrics_page(self.router.len()),
            _ => pages::root_not_found(),
        }
    }
}

/// Running HTTP service: bound listener + worker threads.
pub struct HttpService {
    server: Arc<Server>,
    workers: Vec<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl HttpService {
    /// Bind `addr` and start `workers` threads serving `site`.
    pub fn start(site: Arc<Site>, addr: &str, workers: usize) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
        let server = Arc::new(server);
        let stop = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers.max(1));
        for n in 0..workers.max(1) {
            let server = server.clone();
            let site = site.clone();
            let stop = stop.clone();
            let h = thread::Builder::new()
                .name(format!("partserve-http-{}", n))
                .spawn(move || worker_loop(&server, &site, &stop))
                .with_context(|| format!("spawn http worker {}", n))?;
            handles.push(h);
        }

        Ok(Self {
            server,
            workers: handles,
            stop,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Block until every worker exits (i.e. forever, unless `shutdown` is called).
    pub fn join(self) {
        for h in self.workers {
            let _ = h.join();
        }
    }

    /// Stop workers and wait for them.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
        self.join();
    }
}

fn worker_loop(server: &Server, site: &Site, stop: &AtomicBool) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                warn!("http recv error: {}", e);
                continue;
            }
        };
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let req = HttpRequest::new(rq.method().as_str(), rq.url());
        let reply = site.handle(&req);
        debug!("http {} {} -> {}", req.method, req.raw_path, reply.status);

        if let Err(e) = rq.respond(into_response(reply)) {
            warn!("http respond error: {}", e);
        }
    }
}

/// Blocking convenience: start the service and serve forever.
pub fn serve(site: Arc<Site>, addr: &str, workers: usize) -> Result<()> {
    let svc = HttpService::start(site, addr, workers)?;
    info!("http srv addr={}", addr);
    svc.join();
    Ok(())
}

fn into_response(reply: Reply) -> ResponseBox {
    let headers: Vec<Header> = reply
        .headers
        .iter()
        .filter_map(|(k, v)| Header::from_bytes(k.as_bytes(), v.as_bytes()).ok())
        .collect();
    let (data, len): (Box<dyn Read + Send>, usize) = match reply.body {
        Body::Empty => (Box::new(io::empty()), 0),
        Body::Bytes(b) => {
            let n = b.len();
            (Box::new(Cursor::new(b)), n)
        }
        Body::File { file, len } => (Box::new(file), len as usize),
    };
    Response::new(StatusCode(reply.status), headers, data, Some(len), None)
}
