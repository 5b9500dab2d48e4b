//! The incremental HTTP/1.x response parser: the core state machine of
//! this crate.
//!
//! A `Parser` is fed bytes through `inject()` and `inject_eof()` as they
//! arrive from the transport, in arbitrarily small or large pieces. It
//! never blocks and never allocates more than it needs to hold the
//! current message's headers and body. Once a message is `Complete`, the
//! same `Parser` can be handed the next message's bytes directly — it
//! resets its per-message state on the next call to `inject()`.

use chunked;
use body::BodyMode;
use error::{ErrorKind, ParseError};
use headers::{self, HeaderCollection};
use line::{take_line, trim_ows};
use status;
use version::Version;

/// Hard cap on a single header line's length, guarding against an
/// unbounded buffer growth while a line terminator never arrives.
const MAX_HEADER_LINE_LEN: usize = 8 * 1024;
/// Hard cap on header count per message, guarding against pathological
/// input.
const MAX_HEADERS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    StatusLine,
    Headers,
    Body,
    Complete,
    Error,
}

/// Lifecycle hooks fired as a message is parsed. Default methods are
/// no-ops, so implementors only override what they need — mirrors a
/// small listener interface rather than open recursion into the parser.
pub trait Listener {
    /// Fires once, when the first non-blank byte of a new message
    /// arrives.
    fn message_begin(&mut self) {}
    /// Fires once, at end-of-headers, with the status and headers
    /// parsed so far.
    fn headers_complete(&mut self, _status_code: u16, _headers: &HeaderCollection) {}
    /// Fires once, when the body framing is satisfied (or on EOF for an
    /// EOF-terminated message).
    fn message_complete(&mut self) {}
}

impl Listener for () {}

/// A snapshot of a completed (or in-progress) message, matching the
/// "Parsed Response" shape of the data model.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub http_major: u16,
    pub http_minor: u16,
    pub status_code: u16,
    pub headers: HeaderCollection,
    pub content: Vec<u8>,
    pub should_keep_alive: bool,
    pub completes_on_eof: bool,
    pub error: Option<ErrorKind>,
}

impl ParsedResponse {
    /// `(http_major, http_minor)` bundled as a `Version`, for callers that
    /// want to compare versions rather than match on the two fields.
    pub fn version(&self) -> Version {
        Version::new(self.http_major, self.http_minor)
    }
}

pub struct Parser<L: Listener = ()> {
    phase: Phase,
    message_begun: bool,
    line_buf: Vec<u8>,

    http_major: u16,
    http_minor: u16,
    status_code: u16,
    headers: HeaderCollection,
    content: Vec<u8>,
    body: BodyMode,
    should_keep_alive: bool,
    completes_on_eof: bool,

    seen_content_length: Option<u64>,
    seen_chunked: bool,
    connection_close: bool,
    connection_keep_alive: bool,

    sticky_error: Option<ErrorKind>,
    parse_error: Option<ParseError>,

    listener: L,
}

impl Parser<()> {
    pub fn new() -> Parser<()> {
        Parser::with_listener(())
    }
}

impl<L: Listener> Parser<L> {
    pub fn with_listener(listener: L) -> Parser<L> {
        Parser {
            phase: Phase::Idle,
            message_begun: false,
            line_buf: Vec::new(),
            http_major: 0,
            http_minor: 0,
            status_code: 0,
            headers: HeaderCollection::new(),
            content: Vec::new(),
            body: BodyMode::None,
            should_keep_alive: false,
            completes_on_eof: false,
            seen_content_length: None,
            seen_chunked: false,
            connection_close: false,
            connection_keep_alive: false,
            sticky_error: None,
            parse_error: None,
            listener,
        }
    }

    /// Feeds `data` to the parser. Returns the number of bytes consumed;
    /// once a message completes, any remaining bytes in `data` are left
    /// unconsumed so the caller can re-deliver them as the start of the
    /// next message. Once `has_error()` is true, always returns 0 without
    /// touching any state until `clear()`.
    pub fn inject(&mut self, data: &[u8]) -> usize {
        if self.sticky_error.is_some() {
            return 0;
        }
        if self.phase == Phase::Complete {
            self.reset_message();
        }
        let mut pos = 0;
        while pos < data.len() {
            let step_result = match self.phase {
                Phase::Idle | Phase::StatusLine => {
                    self.phase = Phase::StatusLine;
                    self.step_status_line(&data[pos..])
                }
                Phase::Headers => self.step_headers(&data[pos..]),
                Phase::Body => self.step_body(&data[pos..]),
                Phase::Complete | Phase::Error => break,
            };
            match step_result {
                Ok(consumed) => {
                    pos += consumed;
                    if consumed == 0 || self.phase == Phase::Complete {
                        break;
                    }
                }
                Err(e) => {
                    self.fail(e);
                    break;
                }
            }
        }
        pos
    }

    /// Signals that the transport reached EOF. Completes an
    /// EOF-terminated message in progress; otherwise, if a message was
    /// only partially parsed, sets a sticky error. A no-op when idle or
    /// already complete.
    pub fn inject_eof(&mut self) {
        if self.sticky_error.is_some() {
            return;
        }
        match self.phase {
            Phase::Idle | Phase::Complete => {}
            Phase::Body if self.body.finish_on_eof() => {
                self.phase = Phase::Complete;
                self.listener.message_complete();
            }
            _ => self.fail(ParseError::UnexpectedEof),
        }
    }

    /// Fully resets the parser, including any sticky error.
    pub fn clear(&mut self) {
        self.reset_message();
        self.phase = Phase::Idle;
        self.sticky_error = None;
        self.parse_error = None;
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn http_major(&self) -> u16 {
        self.http_major
    }

    pub fn http_minor(&self) -> u16 {
        self.http_minor
    }

    pub fn version(&self) -> Version {
        Version::new(self.http_major, self.http_minor)
    }

    pub fn should_keep_alive(&self) -> bool {
        self.should_keep_alive
    }

    pub fn completes_on_eof(&self) -> bool {
        self.completes_on_eof
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.sticky_error
    }

    /// The finer-grained diagnostic behind `error()`, if any.
    pub fn error_detail(&self) -> Option<ParseError> {
        self.parse_error
    }

    pub fn has_error(&self) -> bool {
        self.sticky_error.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// True once end-of-headers has been reached — `status_code()` and
    /// `headers()` are final from this point even if the body is still
    /// arriving.
    pub fn headers_done(&self) -> bool {
        matches!(self.phase, Phase::Body | Phase::Complete)
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// A plain-data snapshot of the message parsed so far.
    pub fn response(&self) -> ParsedResponse {
        ParsedResponse {
            http_major: self.http_major,
            http_minor: self.http_minor,
            status_code: self.status_code,
            headers: self.headers.clone(),
            content: self.content.clone(),
            should_keep_alive: self.should_keep_alive,
            completes_on_eof: self.completes_on_eof,
            error: self.sticky_error,
        }
    }

    fn fail(&mut self, e: ParseError) {
        debug!("response parser entering sticky error state: {}", e);
        self.parse_error = Some(e);
        self.sticky_error = Some(e.into());
        self.phase = Phase::Error;
    }

    fn reset_message(&mut self) {
        self.phase = Phase::StatusLine;
        self.message_begun = false;
        self.line_buf.clear();
        self.http_major = 0;
        self.http_minor = 0;
        self.status_code = 0;
        self.headers.clear();
        self.content.clear();
        self.body = BodyMode::None;
        self.should_keep_alive = false;
        self.completes_on_eof = false;
        self.seen_content_length = None;
        self.seen_chunked = false;
        self.connection_close = false;
        self.connection_keep_alive = false;
    }

    fn step_status_line(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut pos = 0;
        match take_line(&mut self.line_buf, data, &mut pos) {
            None => Ok(pos),
            Some(line) => {
                if line.is_empty() {
                    // A leading blank line between pipelined messages; skip it.
                    return Ok(pos);
                }
                if !self.message_begun {
                    self.listener.message_begin();
                    self.message_begun = true;
                }
                if line.starts_with(b"HTTP/") {
                    self.parse_status_line(&line)?;
                    self.phase = Phase::Headers;
                } else {
                    // No recognizable status line: treat the stream as
                    // HTTP/0.9, where the "line" we just buffered was in
                    // fact the start of the (headerless) body.
                    self.http_major = 0;
                    self.http_minor = 9;
                    self.status_code = 200;
                    self.should_keep_alive = false;
                    self.completes_on_eof = true;
                    self.body = BodyMode::UntilEof;
                    self.content.extend_from_slice(&line);
                    self.content.push(b'\n');
                    self.phase = Phase::Body;
                }
                Ok(pos)
            }
        }
    }

    fn parse_status_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let rest = line.get(5..).ok_or(ParseError::InvalidStatusLine)?;
        let dot = rest.iter().position(|&b| b == b'.')
            .ok_or(ParseError::InvalidStatusLine)?;
        let major = parse_digits(&rest[..dot]).ok_or(ParseError::InvalidStatusLine)?;
        let after_dot = &rest[dot + 1..];
        let sp = after_dot.iter().position(|&b| b == b' ')
            .ok_or(ParseError::InvalidStatusLine)?;
        let minor = parse_digits(&after_dot[..sp]).ok_or(ParseError::InvalidStatusLine)?;
        let remainder = trim_ows(&after_dot[sp + 1..]);
        let code_part = match remainder.iter().position(|&b| b == b' ') {
            Some(i) => &remainder[..i],
            None => remainder,
        };
        let code = parse_digits(code_part).ok_or(ParseError::InvalidStatusLine)?;
        self.http_major = major;
        self.http_minor = minor;
        self.status_code = code;
        Ok(())
    }

    fn step_headers(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut pos = 0;
        match take_line(&mut self.line_buf, data, &mut pos) {
            None => {
                if self.line_buf.len() > MAX_HEADER_LINE_LEN {
                    return Err(ParseError::HeaderTooLong);
                }
                Ok(pos)
            }
            Some(line) => {
                if line.is_empty() {
                    self.finish_headers();
                } else {
                    if self.headers.len() >= MAX_HEADERS {
                        return Err(ParseError::TooManyHeaders);
                    }
                    self.record_header_line(&line)?;
                }
                Ok(pos)
            }
        }
    }

    fn record_header_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let colon = line.iter().position(|&b| b == b':')
            .ok_or(ParseError::InvalidHeaderLine)?;
        let name = &line[..colon];
        if name.is_empty() {
            return Err(ParseError::InvalidHeaderLine);
        }
        let value = trim_ows(&line[colon + 1..]);

        if name.eq_ignore_ascii_case(b"content-length") {
            if self.seen_content_length.is_some() {
                return Err(ParseError::DuplicateContentLength);
            }
            self.seen_content_length = Some(parse_content_length(value)?);
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            if headers::is_chunked(value) {
                self.seen_chunked = true;
            }
        } else if name.eq_ignore_ascii_case(b"connection") {
            if headers::is_close(value) {
                self.connection_close = true;
            }
            if is_keep_alive_token(value) {
                self.connection_keep_alive = true;
            }
        }
        self.headers.append(name.to_vec(), value.to_vec());
        Ok(())
    }

    fn finish_headers(&mut self) {
        let permits_body = !status::is_bodyless_status(self.status_code);
        let (body, completes_on_eof) = if !permits_body {
            (BodyMode::None, false)
        } else if self.seen_chunked {
            (BodyMode::Chunked(chunked::State::new()), false)
        } else if let Some(n) = self.seen_content_length {
            (BodyMode::Fixed(n), false)
        } else {
            let http_10 = self.http_major == 1 && self.http_minor == 0;
            if self.connection_close || http_10 {
                (BodyMode::UntilEof, true)
            } else {
                (BodyMode::None, true)
            }
        };
        self.body = body;
        self.completes_on_eof = completes_on_eof;
        self.should_keep_alive = if completes_on_eof {
            // A message whose framing depends on EOF cannot safely have
            // its connection reused, regardless of what Connection said.
            false
        } else if self.http_major == 1 && self.http_minor >= 1 {
            !self.connection_close
        } else if self.http_major == 1 && self.http_minor == 0 {
            self.connection_keep_alive
        } else {
            false
        };
        trace!("headers complete: status={} keep_alive={} completes_on_eof={}",
               self.status_code, self.should_keep_alive, self.completes_on_eof);
        self.listener.headers_complete(self.status_code, &self.headers);
        if matches!(self.body, BodyMode::None) {
            // No body at all: the message is complete the instant
            // headers end, without waiting for (or consuming) anything
            // further.
            self.phase = Phase::Complete;
            self.listener.message_complete();
        } else {
            self.phase = Phase::Body;
        }
    }

    fn step_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut body = ::std::mem::replace(&mut self.body, BodyMode::None);
        let result = body.feed(data, &mut self.content);
        self.body = body;
        let (consumed, done) = result?;
        if done {
            self.phase = Phase::Complete;
            self.listener.message_complete();
        }
        Ok(consumed)
    }
}

fn parse_digits(buf: &[u8]) -> Option<u16> {
    if buf.is_empty() {
        return None;
    }
    let mut value: u32 = 0;
    for &b in buf {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as u32;
        if value > u16::max_value() as u32 {
            return None;
        }
    }
    Some(value as u16)
}

fn parse_content_length(value: &[u8]) -> Result<u64, ParseError> {
    if value.is_empty() {
        return Err(ParseError::BadContentLength);
    }
    let mut n: u64 = 0;
    for &b in value {
        if !b.is_ascii_digit() {
            return Err(ParseError::BadContentLength);
        }
        n = n.checked_mul(10)
            .and_then(|n| n.checked_add((b - b'0') as u64))
            .ok_or(ParseError::BadContentLength)?;
    }
    Ok(n)
}

fn is_keep_alive_token(val: &[u8]) -> bool {
    let trimmed = trim_ows(val);
    trimmed.eq_ignore_ascii_case(b"keep-alive")
}

#[cfg(test)]
mod test {
    use super::{Listener, ParsedResponse, Parser};
    use headers::HeaderCollection;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_simple_content_length_response() {
        let mut p = Parser::new();
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world";
        let consumed = p.inject(data);
        assert_eq!(consumed, data.len());
        assert!(p.is_complete());
        assert_eq!(p.status_code(), 200);
        assert_eq!(p.content(), b"hello world");
        assert!(p.should_keep_alive());
        assert!(!p.completes_on_eof());
    }

    #[test]
    fn test_no_body_status_with_no_framing_headers() {
        let mut p = Parser::new();
        let data = b"HTTP/1.1 404 Not Found\r\n\r\n";
        let consumed = p.inject(data);
        assert_eq!(consumed, data.len());
        assert!(p.is_complete());
        assert_eq!(p.status_code(), 404);
        assert_eq!(p.content(), b"");
        assert!(!p.should_keep_alive());
        assert!(p.completes_on_eof());
    }

    #[test]
    fn test_chunked_body_with_trailing_whitespace_in_size_line() {
        let mut p = Parser::new();
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                     25  \r\nThis is the data in the first chunk\r\n\r\n\
                     1C\r\nand this is the second one\r\n\r\n\
                     0  \r\n\r\n";
        let consumed = p.inject(&data[..]);
        assert_eq!(consumed, data.len());
        assert!(p.is_complete());
        assert_eq!(p.content().len(), 65);
        assert_eq!(
            p.content(),
            &b"This is the data in the first chunk\r\nand this is the second one\r\n"[..]
        );
    }

    #[test]
    fn test_malformed_status_line_is_sticky_until_clear() {
        let mut p = Parser::new();
        let consumed = p.inject(b"HTTP/1.1 BADBAD\r\n\r\n");
        assert!(consumed > 0);
        assert!(p.has_error());

        let consumed2 = p.inject(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(consumed2, 0);
        assert!(p.has_error());

        p.clear();
        assert!(!p.has_error());
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
        let consumed3 = p.inject(data);
        assert_eq!(consumed3, data.len());
        assert_eq!(p.status_code(), 200);
    }

    #[test]
    fn test_three_keep_alive_zero_length_responses_in_one_buffer() {
        let r1 = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
        let r2 = b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n";
        let r3 = b"HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\n\r\n";
        let mut all = Vec::new();
        all.extend_from_slice(r1);
        all.extend_from_slice(r2);
        all.extend_from_slice(r3);

        let mut p = Parser::new();
        let consumed1 = p.inject(&all);
        assert_eq!(consumed1, r1.len());
        assert_eq!(p.status_code(), 200);

        let consumed2 = p.inject(&all[consumed1..]);
        assert_eq!(consumed2, r2.len());
        assert_eq!(p.status_code(), 201);

        let consumed3 = p.inject(&all[consumed1 + consumed2..]);
        assert_eq!(consumed3, r3.len());
        assert_eq!(p.status_code(), 202);
    }

    #[test]
    fn test_over_delivery_stops_exactly_at_content_length() {
        let mut p = Parser::new();
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhelloEXTRA";
        let consumed = p.inject(data);
        assert_eq!(consumed, data.len() - "EXTRA".len());
        assert_eq!(p.content(), b"hello");
        assert!(p.is_complete());
    }

    #[test]
    fn test_lifecycle_callbacks_fire_once_each() {
        struct Counters {
            begin: u32,
            headers: u32,
            complete: u32,
        }
        struct CountingListener(Rc<RefCell<Counters>>);
        impl Listener for CountingListener {
            fn message_begin(&mut self) {
                self.0.borrow_mut().begin += 1;
            }
            fn headers_complete(&mut self, _status_code: u16, _headers: &HeaderCollection) {
                self.0.borrow_mut().headers += 1;
            }
            fn message_complete(&mut self) {
                self.0.borrow_mut().complete += 1;
            }
        }
        let counters = Rc::new(RefCell::new(Counters { begin: 0, headers: 0, complete: 0 }));
        let mut p = Parser::with_listener(CountingListener(counters.clone()));
        p.inject(b"HTTP/1.1 204 No Content\r\n\r\n");
        let c = counters.borrow();
        assert_eq!(c.begin, 1);
        assert_eq!(c.headers, 1);
        assert_eq!(c.complete, 1);
    }

    #[test]
    fn test_eof_terminated_body_completes_on_inject_eof() {
        let mut p = Parser::new();
        p.inject(b"HTTP/1.0 200 OK\r\nConnection: keep-alive\r\n\r\npartial body");
        assert!(!p.is_complete());
        assert!(p.completes_on_eof());
        assert!(!p.should_keep_alive());
        p.inject_eof();
        assert!(p.is_complete());
        assert_eq!(p.content(), b"partial body");
    }

    #[test]
    fn test_response_snapshot_matches_getters() {
        let mut p = Parser::new();
        p.inject(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
        let snap: ParsedResponse = p.response();
        assert_eq!(snap.status_code, p.status_code());
        assert_eq!(snap.content, p.content());
        assert_eq!(snap.should_keep_alive, p.should_keep_alive());
    }

    #[test]
    fn test_too_many_headers_is_sticky_error() {
        let mut p = Parser::new();
        let mut data = b"HTTP/1.1 200 OK\r\n".to_vec();
        for i in 0..super::MAX_HEADERS + 1 {
            data.extend_from_slice(format!("X-{}: v\r\n", i).as_bytes());
        }
        data.extend_from_slice(b"\r\n");
        p.inject(&data);
        assert!(p.has_error());
        assert_eq!(p.error_detail(), Some(super::ParseError::TooManyHeaders));
    }

    #[test]
    fn test_overlong_header_line_is_sticky_error() {
        let mut p = Parser::new();
        let mut data = b"HTTP/1.1 200 OK\r\nX-Long: ".to_vec();
        data.extend(::std::iter::repeat(b'a').take(super::MAX_HEADER_LINE_LEN + 1));
        p.inject(&data);
        assert!(p.has_error());
        assert_eq!(p.error_detail(), Some(super::ParseError::HeaderTooLong));
    }
}
