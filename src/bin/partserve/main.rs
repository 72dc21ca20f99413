use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::{info, warn};
use std::sync::Arc;

use partserve::server::{self, Site};
use partserve::{Discovery, ProcMounts, Router, VolumeSource};

mod cli;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    // Пример: RUST_LOG=debug ./partserve --salt ...
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cfg = cli::Cli::parse().into_config();
    info!("starting: {}", cfg);
    if cfg.salt_is_default() {
        warn!("using the default salt: identifiers are predictable, pass --salt");
    }

    let router = Arc::new(Router::new());
    let source: Arc<dyn VolumeSource> = Arc::new(ProcMounts::new());

    Discovery::new(router.clone(), source, &cfg).spawn()?;

    let site = Arc::new(Site::new(router, cfg.salt.clone()));
    server::serve(site, &cfg.http_addr, cfg.http_workers)
}
