//! Centralized configuration for partserve.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - ServeConfig::from_env() reads PS_* variables; CLI flags override on top.
//! - Read once at startup and shared immutably (Arc) afterwards.
//!
//! The salt never appears in `Display`/`Debug` output.

use std::fmt;

use crate::consts::{
    DEFAULT_HTTP_ADDR, DEFAULT_HTTP_WORKERS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SALT,
    MIN_POLL_INTERVAL_MS,
};
use crate::ident::Salt;

#[derive(Clone)]
pub struct ServeConfig {
    /// HMAC key for volume identifiers.
    /// Env: PS_SALT (default "BUZZINGA")
    pub salt: Salt,

    /// Listen address for the HTTP server.
    /// Env: PS_HTTP_ADDR (default "0.0.0.0:9080")
    pub http_addr: String,

    /// Delay between two discovery polls, in milliseconds.
    /// Env: PS_POLL_MS (default 10000, never below 100)
    pub poll_interval_ms: u64,

    /// Expose pseudo filesystems (proc, sysfs, tmpfs, ...) as well.
    /// Env: PS_INCLUDE_PSEUDO (default true; "1|true|on|yes" => true)
    pub include_pseudo: bool,

    /// Number of HTTP worker threads.
    /// Env: PS_HTTP_WORKERS (default 4, min 1)
    pub http_workers: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            salt: Salt::new(DEFAULT_SALT),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            include_pseudo: true,
            http_workers: DEFAULT_HTTP_WORKERS,
        }
    }
}

impl ServeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PS_SALT") {
            if !v.is_empty() {
                cfg.salt = Salt::new(v);
            }
        }

        if let Ok(v) = std::env::var("PS_HTTP_ADDR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.http_addr = normalize_addr(s);
            }
        }

        if let Ok(v) = std::env::var("PS_POLL_MS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg = cfg.with_poll_interval_ms(n);
            }
        }

        if let Ok(v) = std::env::var("PS_INCLUDE_PSEUDO") {
            cfg.include_pseudo = parse_flag(&v);
        }

        if let Ok(v) = std::env::var("PS_HTTP_WORKERS") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.http_workers = n.max(1);
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_salt<S: Into<Vec<u8>>>(mut self, salt: S) -> Self {
        self.salt = Salt::new(salt);
        self
    }

    pub fn with_http_addr<S: Into<String>>(mut self, addr: S) -> Self {
        self.http_addr = normalize_addr(&addr.into());
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms.max(MIN_POLL_INTERVAL_MS);
        self
    }

    pub fn with_include_pseudo(mut self, on: bool) -> Self {
        self.include_pseudo = on;
        self
    }

    pub fn with_http_workers(mut self, n: usize) -> Self {
        self.http_workers = n.max(1);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }

    pub fn salt_is_default(&self) -> bool {
        self.salt.as_bytes() == DEFAULT_SALT.as_bytes()
    }
}

// ":9080" (port only) -> "0.0.0.0:9080"
fn normalize_addr(addr: &str) -> String {
    let a = addr.trim();
    if a.starts_with(':') {
        format!("0.0.0.0{}", a)
    } else {
        a.to_string()
    }
}

fn parse_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl fmt::Display for ServeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ServeConfig {{ \
             salt: {}, \
             http_addr: {}, \
             poll_interval_ms: {}, \
             include_pseudo: {}, \
             http_workers: {} \
             }}",
            if self.salt_is_default() { "<default>" } else { "<custom>" },
            self.http_addr,
            self.poll_interval_ms,
            self.include_pseudo,
            self.http_workers,
        )
    }
}

impl fmt::Debug for ServeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
