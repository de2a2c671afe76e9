//! The per-connection transaction engine.
//!
//! A [`Connection`] owns one client socket plus the fixed read and response
//! buffers, the parser state, and any mapped file body for the transaction
//! in flight. Workers drive it through [`process`](Connection::process); the
//! reactor consults [`interest`](Connection::interest) and
//! [`is_closed`](Connection::is_closed) afterwards to re-arm or tear the
//! slot down.

use std::io::{self, ErrorKind, IoSlice, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use memmap2::Mmap;
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use tracing::{debug, warn};

use crate::parser::{ParseStatus, RequestParser};
use crate::resolver::{self, FileBody, ResolveError};
use crate::response::{ResponseBuffer, Status};

/// Capacity of a connection's read buffer.
pub const READ_BUFFER_SIZE: usize = 2048;

/// The readiness kind a dispatched event carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The socket has bytes (or a close) to read.
    Readable,
    /// The socket can accept more of the queued response.
    Writable,
}

enum WriteOutcome {
    /// The socket would block; the response stays queued.
    Blocked,
    /// The response is fully sent and the slot has been reset for the next
    /// request on the same socket.
    KeepAlive,
    /// The transaction is over and the socket must close.
    Close,
}

/// One pooled connection slot.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    token: Token,
    doc_root: Arc<PathBuf>,

    read_buf: [u8; READ_BUFFER_SIZE],
    read_end: usize,
    parser: RequestParser,

    response: ResponseBuffer,
    body: Option<Mmap>,
    body_len: usize,
    bytes_sent: usize,
    linger: bool,

    interest: Interest,
    closed: bool,
}

impl Connection {
    /// Wraps a freshly accepted socket. The slot starts with readable
    /// interest and must be registered by the reactor before events arrive.
    pub fn new(stream: TcpStream, peer: SocketAddr, token: Token, doc_root: Arc<PathBuf>) -> Self {
        Self {
            stream,
            peer,
            token,
            doc_root,
            read_buf: [0; READ_BUFFER_SIZE],
            read_end: 0,
            parser: RequestParser::new(),
            response: ResponseBuffer::new(),
            body: None,
            body_len: 0,
            bytes_sent: 0,
            linger: false,
            interest: Interest::READABLE,
            closed: false,
        }
    }

    /// The slot's poll token.
    pub fn token(&self) -> Token {
        self.token
    }

    /// Peer address captured at accept.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The single interest the reactor should arm next.
    pub fn interest(&self) -> Interest {
        self.interest
    }

    /// Whether the slot has finished (or failed) and must be torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Registers the socket with the reactor's poll set.
    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        registry.register(&mut self.stream, self.token, self.interest)
    }

    /// Re-arms the socket with the currently requested interest.
    pub fn reregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.reregister(&mut self.stream, self.token, self.interest)
    }

    /// Removes the socket from the poll set ahead of teardown.
    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    /// Entry point for the worker that dequeued this slot. Every path
    /// through here either leaves a single requested interest behind or
    /// marks the slot closed.
    pub fn process(&mut self, readiness: Readiness) {
        match readiness {
            Readiness::Readable => self.on_readable(),
            Readiness::Writable => self.on_writable(),
        }
    }

    fn on_readable(&mut self) {
        if !self.fill() {
            self.closed = true;
            return;
        }
        let status = match self.parser.advance(&self.read_buf, self.read_end) {
            ParseStatus::Incomplete => {
                self.interest = Interest::READABLE;
                return;
            }
            ParseStatus::Complete => self.resolve_target(),
            ParseStatus::Malformed => Status::BadRequest,
        };
        self.assemble(status);
    }

    fn on_writable(&mut self) {
        match self.flush() {
            WriteOutcome::Blocked => self.interest = Interest::WRITABLE,
            WriteOutcome::KeepAlive => {
                self.reset();
                self.interest = Interest::READABLE;
            }
            WriteOutcome::Close => self.closed = true,
        }
    }

    /// Drains the socket into the read buffer until it would block.
    ///
    /// Returns false on peer close, read error, or an already-full buffer;
    /// the caller tears the slot down in all three cases.
    fn fill(&mut self) -> bool {
        if self.read_end >= READ_BUFFER_SIZE {
            return false;
        }
        loop {
            match self.stream.read(&mut self.read_buf[self.read_end..]) {
                Ok(0) => {
                    debug!(peer = %self.peer, "peer closed");
                    return false;
                }
                Ok(n) => {
                    self.read_end += n;
                    if self.read_end == READ_BUFFER_SIZE {
                        return true;
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return true,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!(peer = %self.peer, %err, "read failed");
                    return false;
                }
            }
        }
    }

    /// Resolves the parsed target against the document root, taking
    /// ownership of the mapping for successful non-empty files.
    fn resolve_target(&mut self) -> Status {
        let Some(target) = self.parser.target(&self.read_buf) else {
            return Status::BadRequest;
        };
        match resolver::resolve(self.doc_root.as_path(), target) {
            Ok(FileBody::Mapped(map)) => {
                self.body_len = map.len();
                self.body = Some(map);
                Status::Ok
            }
            Ok(FileBody::Empty) => {
                self.body = None;
                self.body_len = 0;
                Status::Ok
            }
            Err(ResolveError::NotFound) => Status::NotFound,
            Err(ResolveError::Forbidden) => Status::Forbidden,
            Err(ResolveError::NotFile) => Status::BadRequest,
            Err(ResolveError::Map(_)) => Status::InternalError,
        }
    }

    /// Builds the response for `status` and requests writable interest.
    ///
    /// Error responses always close: a malformed stream makes the parsed
    /// keep-alive flag untrustworthy. If the head overflows the response
    /// buffer the slot falls back to a bare 500.
    fn assemble(&mut self, status: Status) {
        if status != Status::Ok {
            self.body = None;
            self.body_len = 0;
        }
        self.linger = self.parser.keep_alive() && status == Status::Ok;
        if !self.build_response(status) {
            self.body = None;
            self.body_len = 0;
            self.linger = false;
            if !self.build_response(Status::InternalError) {
                self.closed = true;
                return;
            }
        }
        self.bytes_sent = 0;
        self.interest = Interest::WRITABLE;
    }

    fn build_response(&mut self, status: Status) -> bool {
        self.response.clear();
        if status == Status::Ok && self.body.is_some() {
            self.response.status_line(status) && self.response.headers(self.body_len, self.linger)
        } else {
            let body = status.body();
            self.response.status_line(status)
                && self.response.headers(body.len(), self.linger)
                && self.response.content(body)
        }
    }

    /// Sends the queued head and body with vectored writes, resuming from
    /// wherever a previous would-block left off.
    fn flush(&mut self) -> WriteOutcome {
        let head_len = self.response.len();
        let total = head_len + self.body_len;
        if total == 0 {
            return WriteOutcome::KeepAlive;
        }

        while self.bytes_sent < total {
            let written = if self.bytes_sent < head_len {
                let head = &self.response.as_slice()[self.bytes_sent..];
                match &self.body {
                    Some(map) => self.stream.write_vectored(&[
                        IoSlice::new(head),
                        IoSlice::new(&map[..self.body_len]),
                    ]),
                    None => self.stream.write_vectored(&[IoSlice::new(head)]),
                }
            } else {
                let Some(map) = &self.body else { break };
                self.stream
                    .write_vectored(&[IoSlice::new(&map[self.bytes_sent - head_len..self.body_len])])
            };

            match written {
                Ok(0) => {
                    self.body = None;
                    return WriteOutcome::Close;
                }
                Ok(n) => self.bytes_sent += n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return WriteOutcome::Blocked,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!(peer = %self.peer, %err, "write failed");
                    self.body = None;
                    return WriteOutcome::Close;
                }
            }
        }

        self.body = None;
        if self.linger {
            WriteOutcome::KeepAlive
        } else {
            WriteOutcome::Close
        }
    }

    /// Returns the slot to its accept-time state for the next keep-alive
    /// transaction. Any mapping is released before this point.
    fn reset(&mut self) {
        self.read_end = 0;
        self.parser.reset();
        self.response.clear();
        self.body = None;
        self.body_len = 0;
        self.bytes_sent = 0;
        self.linger = false;
    }
}
