#![deny(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unused_imports
)]

//! kvikk is a small concurrent HTTP/1.1 file server.
//!
//! One reactor thread owns the listening socket and an edge-triggered poll
//! set; a bounded pool of workers drives each connection's transaction:
//! incremental parse, target resolution under a single document root, and a
//! vectored write of the response head plus a memory-mapped file body.
//! Connections are kept alive across requests when asked to.
//!
//! Only `GET` over `HTTP/1.1` is honoured; there is no TLS, no pipelining,
//! and no timeouts.

pub mod config;
pub mod connection;
pub mod listener;
pub mod parser;
pub mod resolver;
pub mod response;
pub mod worker;

mod sync;

pub use config::Config;
pub use listener::Reactor;
