//! Lightweight global metrics for partserve.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Discovery (polls, failures, current volume count)
//! - Route table (registrations)
//! - HTTP (requests, 404s)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Discovery -----
static POLLS_TOTAL: AtomicU64 = AtomicU64::new(0);
static POLL_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static VOLUMES_CURRENT: AtomicU64 = AtomicU64::new(0);

// ----- Route table -----
static ROUTES_REGISTERED_TOTAL: AtomicU64 = AtomicU64::new(0);

// ----- HTTP -----
static REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static REQUESTS_NOT_FOUND_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Discovery
    pub polls_total: u64,
    pub poll_failures_total: u64,
    pub volumes_current: u64,

    // Route table
    pub routes_registered_total: u64,

    // HTTP
    pub requests_total: u64,
    pub requests_not_found_total: u64,
}

// ----- Recorders (Discovery) -----

pub fn record_poll_ok(volumes: usize) {
    POLLS_TOTAL.fetch_add(1, Ordering::Relaxed);
    VOLUMES_CURRENT.store(volumes as u64, Ordering::Relaxed);
}

// Снапшот не трогаем: gauge остаётся прежним.
pub fn record_poll_failure() {
    POLLS_TOTAL.fetch_add(1, Ordering::Relaxed);
    POLL_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Route table) -----

pub fn record_route_registered() {
    ROUTES_REGISTERED_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (HTTP) -----

pub fn record_request(status: u16) {
    REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed);
    if status == 404 {
        REQUESTS_NOT_FOUND_TOTAL.fetch_add(1, Ordering::Relaxed);
    }
}

// ----- Snapshot / Reset -----

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        polls_total: POLLS_TOTAL.load(Ordering::Relaxed),
        poll_failures_total: POLL_FAILURES_TOTAL.load(Ordering::Relaxed),
        volumes_current: VOLUMES_CURRENT.load(Ordering::Relaxed),
        routes_registered_total: ROUTES_REGISTERED_TOTAL.load(Ordering::Relaxed),
        requests_total: REQUESTS_TOTAL.load(Ordering::Relaxed),
        requests_not_found_total: REQUESTS_NOT_FOUND_TOTAL.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    POLLS_TOTAL.store(0, Ordering::Relaxed);
    POLL_FAILURES_TOTAL.store(0, Ordering::Relaxed);
    VOLUMES_CURRENT.store(0, Ordering::Relaxed);
    ROUTES_REGISTERED_TOTAL.store(0, Ordering::Relaxed);
    REQUESTS_TOTAL.store(0, Ordering::Relaxed);
    REQUESTS_NOT_FOUND_TOTAL.store(0, Ordering::Relaxed);
}
