use clap::Parser;

use partserve::ServeConfig;

/// Read-only HTTP exposure of mounted volumes
#[derive(Parser, Debug)]
#[command(name = "partserve", version, about = "Expose mounted volumes over HTTP under anonymized ids")]
pub struct Cli {
    /// HMAC salt for volume identifiers (overrides PS_SALT)
    #[arg(long)]
    pub salt: Option<String>,
    /// Listen address, e.g. 0.0.0.0:9080 (overrides PS_HTTP_ADDR)
    #[arg(long = "http-addr")]
    pub http_addr: Option<String>,
    /// Delay between discovery polls in milliseconds, at least 100 (overrides PS_POLL_MS)
    #[arg(long)]
    pub poll_ms: Option<u64>,
    /// Skip pseudo filesystems (proc, sysfs, tmpfs, ...)
    #[arg(long, default_value_t = false)]
    pub physical_only: bool,
    /// HTTP worker threads (overrides PS_HTTP_WORKERS)
    #[arg(long)]
    pub workers: Option<usize>,
}

impl Cli {
    /// Env config first, flags on top.
    pub fn into_config(self) -> ServeConfig {
        let mut cfg = ServeConfig::from_env();
        if let Some(s) = self.salt {
            cfg = cfg.with_salt(s);
        }
        if let Some(a) = self.http_addr {
            cfg = cfg.with_http_addr(a);
        }
        if let Some(ms) = self.poll_ms {
            cfg = cfg.with_poll_interval_ms(ms);
        }
        if self.physical_only {
            cfg = cfg.with_include_pseudo(false);
        }
        if let Some(n) = self.workers {
            cfg = cfg.with_http_workers(n);
        }
        cfg.build()
    }
}
