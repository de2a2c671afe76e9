//! Response head assembly: status codes, canned bodies, and the fixed-size
//! buffer the head (and any inline body) is formatted into.

use std::fmt::{self, Write};

/// Capacity of a connection's response buffer.
pub const WRITE_BUFFER_SIZE: usize = 1024;

/// Status codes the server emits.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The target resolved to a readable file.
    Ok = 200,
    /// Malformed request, unsupported method or version, or a directory
    /// target.
    BadRequest = 400,
    /// The target exists but is not world-readable.
    Forbidden = 403,
    /// The target does not resolve to a file.
    NotFound = 404,
    /// The server could not produce the response it intended to.
    InternalError = 500,
}

impl Status {
    /// Reason phrase for the status line.
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalError => "Internal Error",
        }
    }

    /// Body sent when no file is mapped: the canonical error text, or a
    /// placeholder document for a 200 over an empty file.
    pub fn body(self) -> &'static str {
        match self {
            Status::Ok => "<html><body>hello</body></html>",
            Status::BadRequest => {
                "Your request has bad syntax or is inherently impossible to satisfy.\n"
            }
            Status::Forbidden => "You do not have permission to get file from this server.\n",
            Status::NotFound => "The requested file was not found on this server.\n",
            Status::InternalError => "There was an unusual problem serving the requested file.\n",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u16)
    }
}

/// Fixed-capacity append buffer holding a response head and, for error or
/// placeholder responses, the inline body.
///
/// Appends are atomic: formatting that would overrun the capacity leaves the
/// buffer untouched and reports failure, which the connection surfaces as an
/// internal error.
#[derive(Debug)]
pub struct ResponseBuffer {
    buf: [u8; WRITE_BUFFER_SIZE],
    end: usize,
}

impl ResponseBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: [0; WRITE_BUFFER_SIZE],
            end: 0,
        }
    }

    /// Discards all appended bytes.
    pub fn clear(&mut self) {
        self.end = 0;
    }

    /// Number of bytes appended so far.
    pub fn len(&self) -> usize {
        self.end
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// The appended bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.end]
    }

    /// Appends formatted output, failing without partial commit when it does
    /// not fit in the remaining capacity.
    pub fn append(&mut self, args: fmt::Arguments<'_>) -> bool {
        let start = self.end;
        let mut cursor = Cursor {
            buf: &mut self.buf,
            end: &mut self.end,
        };
        if cursor.write_fmt(args).is_err() {
            self.end = start;
            return false;
        }
        true
    }

    /// Appends the status line `HTTP/1.1 <code> <reason>\r\n`.
    pub fn status_line(&mut self, status: Status) -> bool {
        self.append(format_args!("HTTP/1.1 {} {}\r\n", status, status.reason()))
    }

    /// Appends the header block and the blank line terminating the head.
    pub fn headers(&mut self, content_length: usize, keep_alive: bool) -> bool {
        self.append(format_args!("Content-Length: {}\r\n", content_length))
            && self.append(format_args!(
                "Connection: {}\r\n",
                if keep_alive { "keep-alive" } else { "close" }
            ))
            && self.append(format_args!("\r\n"))
    }

    /// Appends an inline body.
    pub fn content(&mut self, body: &str) -> bool {
        self.append(format_args!("{}", body))
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

struct Cursor<'a> {
    buf: &'a mut [u8; WRITE_BUFFER_SIZE],
    end: &'a mut usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if s.len() > WRITE_BUFFER_SIZE - *self.end {
            return Err(fmt::Error);
        }
        self.buf[*self.end..*self.end + s.len()].copy_from_slice(s.as_bytes());
        *self.end += s.len();
        Ok(())
    }
}
