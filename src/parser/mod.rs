//! Incremental HTTP/1.1 request parsing.
//!
//! Parsing is split in two: [`line`] walks the read buffer looking for
//! CRLF-terminated lines, and [`request`] feeds those lines through the
//! request-line → headers → content state machine. Both operate on indices
//! into the connection's read buffer; recognised pieces of the request
//! (target, host) are recorded as ranges that stay valid until the slot is
//! reset.

mod line;
mod request;

pub use request::{ParseStatus, Phase, RequestParser};

use std::fmt::Display;

/// The request method. Only `GET` is honoured; anything else is rejected
/// while parsing the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// The one supported method.
    #[default]
    Get,
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
        })
    }
}
