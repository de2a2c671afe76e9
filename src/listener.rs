//! The readiness reactor: owns the listening socket, the poll set, and the
//! slab of connection slots.
//!
//! Client sockets are effectively one-shot: a slot is disarmed when its
//! event is handed to the pool and nothing further is delivered for it until
//! a worker reports back and the reactor re-registers it. Re-registration
//! re-reports any readiness that accrued in between, so no edge is lost.

use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use slab::Slab;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::connection::{Connection, Readiness};
use crate::worker::{Task, WorkerPool};

const LISTEN_TOKEN: Token = Token(usize::MAX);
const WAKE_TOKEN: Token = Token(usize::MAX - 1);

/// Handle a worker uses to hand a slot back to the reactor once
/// [`process`](Connection::process) has run.
#[derive(Debug, Clone)]
pub struct ReactorHandle {
    completions: Sender<Token>,
    waker: Arc<Waker>,
}

impl ReactorHandle {
    fn complete(&self, token: Token) {
        if self.completions.send(token).is_ok() {
            let _ = self.waker.wake();
        }
    }
}

/// A readiness event bound to its slot, queued for the worker pool.
#[derive(Debug)]
pub struct ConnEvent {
    slot: Arc<Mutex<Connection>>,
    readiness: Readiness,
    token: Token,
    reactor: ReactorHandle,
}

impl Task for ConnEvent {
    fn process(&self) {
        if let Ok(mut conn) = self.slot.lock() {
            conn.process(self.readiness);
        }
        // A poisoned slot still completes; the reactor tears it down.
        self.reactor.complete(self.token);
    }
}

#[derive(Debug)]
struct SlotEntry {
    conn: Arc<Mutex<Connection>>,
    armed: bool,
}

/// The reactor: accepts connections, watches all client sockets, feeds
/// readiness to the worker pool, and re-arms or tears down slots as workers
/// finish with them.
#[derive(Debug)]
pub struct Reactor {
    listener: TcpListener,
    poll: Poll,
    slots: Slab<SlotEntry>,
    pool: WorkerPool<ConnEvent>,
    handle: ReactorHandle,
    completions: Receiver<Token>,
    users: Arc<AtomicUsize>,
    doc_root: Arc<PathBuf>,
    max_events: usize,
}

impl Reactor {
    /// Binds the listening socket, starts the worker pool, and wires the
    /// completion channel and waker.
    pub fn new(config: Config) -> io::Result<Self> {
        let mut listener = TcpListener::bind(config.addr)?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTEN_TOKEN, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        let (completions_tx, completions_rx) = channel();

        Ok(Self {
            listener,
            poll,
            slots: Slab::new(),
            pool: WorkerPool::new(config.workers, config.max_queued),
            handle: ReactorHandle {
                completions: completions_tx,
                waker,
            },
            completions: completions_rx,
            users: Arc::new(AtomicUsize::new(0)),
            doc_root: Arc::new(config.doc_root),
            max_events: config.max_events,
        })
    }

    /// Address the listening socket actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the event loop. Never returns except on a poll failure.
    pub fn run(&mut self) {
        let mut events = Events::with_capacity(self.max_events);

        loop {
            if let Err(err) = self.poll.poll(&mut events, None) {
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                error!(%err, "poll failed");
                return;
            }

            for event in events.iter() {
                match event.token() {
                    LISTEN_TOKEN => self.accept(),
                    WAKE_TOKEN => self.drain_completions(),
                    _ => self.dispatch(event),
                }
            }
        }
    }

    /// Accepts until the kernel runs dry, allocating a slot per peer.
    fn accept(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let entry = self.slots.vacant_entry();
                    let token = Token(entry.key());
                    let mut conn = Connection::new(stream, peer, token, self.doc_root.clone());
                    if let Err(err) = conn.register(self.poll.registry()) {
                        warn!(%peer, %err, "could not register accepted socket");
                        continue;
                    }
                    entry.insert(SlotEntry {
                        conn: Arc::new(Mutex::new(conn)),
                        armed: true,
                    });
                    let users = self.users.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(%peer, users, "accepted connection");
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!(%err, "accept failed");
                    return;
                }
            }
        }
    }

    /// Routes one client-socket event: drops it if the slot is owned by a
    /// worker, tears down on error or peer half-close, otherwise disarms the
    /// slot and queues it for the pool.
    fn dispatch(&mut self, event: &Event) {
        let token = event.token();
        let armed = match self.slots.get(token.0) {
            Some(slot) => slot.armed,
            None => return,
        };
        if !armed {
            return;
        }
        if event.is_error() || event.is_read_closed() {
            self.teardown(token);
            return;
        }

        let readiness = if event.is_writable() {
            Readiness::Writable
        } else {
            Readiness::Readable
        };
        let task = {
            let Some(slot) = self.slots.get_mut(token.0) else {
                return;
            };
            slot.armed = false;
            ConnEvent {
                slot: slot.conn.clone(),
                readiness,
                token,
                reactor: self.handle.clone(),
            }
        };
        if !self.pool.append(task) {
            warn!("worker queue full, dropping connection");
            self.teardown(token);
        }
    }

    fn drain_completions(&mut self) {
        loop {
            match self.completions.try_recv() {
                Ok(token) => self.event_complete(token),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
            }
        }
    }

    /// A worker is done with the slot: re-arm it with its one requested
    /// interest, or tear it down if the transaction ended.
    fn event_complete(&mut self, token: Token) {
        let closed = {
            let Some(slot) = self.slots.get_mut(token.0) else {
                return;
            };
            match slot.conn.lock() {
                Ok(mut conn) => {
                    if conn.is_closed() {
                        true
                    } else {
                        match conn.reregister(self.poll.registry()) {
                            Ok(()) => {
                                drop(conn);
                                slot.armed = true;
                                false
                            }
                            Err(err) => {
                                warn!(%err, "could not re-arm connection");
                                true
                            }
                        }
                    }
                }
                Err(_) => true,
            }
        };
        if closed {
            self.teardown(token);
        }
    }

    /// Unregisters and drops the slot; dropping the connection closes the
    /// socket and releases any mapping.
    fn teardown(&mut self, token: Token) {
        if !self.slots.contains(token.0) {
            return;
        }
        let slot = self.slots.remove(token.0);
        let users = self.users.fetch_sub(1, Ordering::Relaxed) - 1;
        match slot.conn.lock() {
            Ok(mut conn) => {
                let _ = conn.deregister(self.poll.registry());
                debug!(peer = %conn.peer(), users, "closing connection");
            }
            Err(_) => {
                debug!(users, "closing connection with poisoned slot");
            }
        };
    }
}
