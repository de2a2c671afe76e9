//! Binary entry point: wires configuration and logging, then hands the
//! thread to the reactor.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kvikk::{Config, Reactor};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = Config::default();
    let mut args = std::env::args().skip(1);
    if let Some(addr) = args.next() {
        config.addr = addr.parse().context("listen address")?;
    }
    if let Some(root) = args.next() {
        config.doc_root = PathBuf::from(root);
    }

    info!(addr = %config.addr, doc_root = %config.doc_root.display(), workers = config.workers, "starting");
    let mut reactor = Reactor::new(config).context("starting reactor")?;
    reactor.run();
    Ok(())
}
