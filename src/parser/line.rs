//! CRLF line extraction over the read buffer.

/// Outcome of scanning for the next line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Scan {
    /// A full line is available; its content ends at `line_end` (the CR
    /// position) and the check index now sits one past the LF.
    Complete {
        /// Exclusive end of the line's content.
        line_end: usize,
    },
    /// The terminator is broken: a CR followed by something other than LF,
    /// or a LF with no CR before it.
    Malformed,
    /// No terminator within `[*check, end)`; more bytes are needed.
    Incomplete,
}

/// Scans `buf[*check..end]` for a CRLF, advancing `*check` as it goes.
///
/// A CR sitting on the last buffered byte leaves `*check` on the CR so the
/// next pass, after more bytes arrive, resumes on the terminator itself.
pub(super) fn scan(buf: &[u8], check: &mut usize, end: usize) -> Scan {
    while *check < end {
        match buf[*check] {
            b'\r' => {
                if *check + 1 == end {
                    return Scan::Incomplete;
                }
                if buf[*check + 1] == b'\n' {
                    let line_end = *check;
                    *check += 2;
                    return Scan::Complete { line_end };
                }
                return Scan::Malformed;
            }
            b'\n' => {
                // Reachable when an earlier pass stopped between the CR and
                // the LF; a LF with anything else before it is bogus.
                if *check > 0 && buf[*check - 1] == b'\r' {
                    let line_end = *check - 1;
                    *check += 1;
                    return Scan::Complete { line_end };
                }
                return Scan::Malformed;
            }
            _ => *check += 1,
        }
    }
    Scan::Incomplete
}

#[cfg(test)]
mod test {
    use super::{scan, Scan};

    #[test]
    fn scan_finds_complete_line() {
        let buf = b"GET / HTTP/1.1\r\nrest";
        let mut check = 0;
        assert_eq!(Scan::Complete { line_end: 14 }, scan(buf, &mut check, buf.len()));
        assert_eq!(16, check);
    }

    #[test]
    fn scan_finds_empty_line() {
        let buf = b"\r\n";
        let mut check = 0;
        assert_eq!(Scan::Complete { line_end: 0 }, scan(buf, &mut check, buf.len()));
        assert_eq!(2, check);
    }

    #[test]
    fn scan_without_terminator_is_incomplete() {
        let buf = b"GET / HTTP/1.1";
        let mut check = 0;
        assert_eq!(Scan::Incomplete, scan(buf, &mut check, buf.len()));
        assert_eq!(buf.len(), check);
    }

    #[test]
    fn scan_with_cr_on_last_byte_resumes_on_the_cr() {
        let buf = b"GET / HTTP/1.1\r\n";
        let mut check = 0;

        // Only the CR has arrived so far.
        assert_eq!(Scan::Incomplete, scan(buf, &mut check, 15));
        assert_eq!(14, check);

        // The LF lands; the same position now completes.
        assert_eq!(Scan::Complete { line_end: 14 }, scan(buf, &mut check, 16));
        assert_eq!(16, check);
    }

    #[test]
    fn scan_rejects_cr_followed_by_junk() {
        let buf = b"GET\rX\n";
        let mut check = 0;
        assert_eq!(Scan::Malformed, scan(buf, &mut check, buf.len()));
    }

    #[test]
    fn scan_rejects_bare_lf() {
        let buf = b"GET / HTTP/1.1\n";
        let mut check = 0;
        assert_eq!(Scan::Malformed, scan(buf, &mut check, buf.len()));
    }

    #[test]
    fn scan_accepts_lf_when_resumed_past_its_cr() {
        let buf = b"abc\r\n";
        let mut check = 4;
        assert_eq!(Scan::Complete { line_end: 3 }, scan(buf, &mut check, buf.len()));
        assert_eq!(5, check);
    }
}
