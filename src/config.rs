//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration for a [`Reactor`](crate::listener::Reactor).
///
/// Per-connection buffer capacities are compile-time constants in their
/// owning modules; everything an operator may reasonably vary lives here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listening socket binds to.
    pub addr: SocketAddr,
    /// Directory request paths are resolved under.
    pub doc_root: PathBuf,
    /// Number of worker threads in the pool.
    pub workers: usize,
    /// Upper bound on queued-but-unclaimed work items; events arriving while
    /// the queue is full get their connection dropped.
    pub max_queued: usize,
    /// Capacity of the event batch handed back by each poll call.
    pub max_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            doc_root: PathBuf::from("./public"),
            workers: 8,
            max_queued: 10_000,
            max_events: 1024,
        }
    }
}
