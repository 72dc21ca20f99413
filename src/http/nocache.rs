use std::sync::Arc;

use super::{Handler, HttpRequest, Reply};
use crate::consts::NOCACHE_HEADERS;

/// Wraps a handler so that browsers, proxies and CDNs never store or reuse
/// its replies: volume contents may change between two requests.
///
/// Headers are forced on every reply, whatever the inner handler set.
/// Without an inner handler the wrapper answers 200 with an empty body.
#[derive(Clone, Default)]
pub struct NoCache {
    inner: Option<Arc<dyn Handler>>,
}

impl NoCache {
    pub fn new(inner: Arc<dyn Handler>) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn empty() -> Self {
        Self { inner: None }
    }
}

impl Handler for NoCache {
    fn serve(&self, rq: &HttpRequest) -> Reply {
        let mut reply = match &self.inner {
            Some(h) => h.serve(rq),
            None => Reply::new(200),
        };
        for (name, value) in NOCACHE_HEADERS {
            reply.set_header(name, value);
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forces_headers_over_inner_values() {
        let inner: Arc<dyn Handler> = Arc::new(|_: &HttpRequest| {
            Reply::text(200, "hi").with_header("Cache-Control", "max-age=3600")
        });
        let h = NoCache::new(inner);
        let r = h.serve(&HttpRequest::get("/x"));
        assert_eq!(r.status, 200);
        assert_eq!(r.header("Cache-Control"), Some("no-cache, no-store, must-revalidate"));
        assert_eq!(r.header("Pragma"), Some("no-cache"));
        assert_eq!(r.header("Expires"), Some("0"));
        assert_eq!(r.header("Surrogate-Control"), Some("no-cache"));
        assert_eq!(r.into_bytes().unwrap(), b"hi");
    }

    #[test]
    fn empty_wrapper_is_a_noop() {
        let r = NoCache::empty().serve(&HttpRequest::get("/"));
        assert_eq!(r.status, 200);
        assert_eq!(r.header("Pragma"), Some("no-cache"));
        assert!(r.into_bytes().unwrap().is_empty());
    }
}
