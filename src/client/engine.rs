//! The single-slot HTTP client engine: issues one request at a time over
//! a reused `Transport`, feeding inbound bytes to a `Parser` and
//! surfacing completion, streaming, and failure to a `ClientListener`.
//!
//! This engine owns no reactor: the embedder calls `on_readable`/
//! `on_writable`/`on_disconnected` whenever its own event loop reports
//! those conditions on the transport it is holding.

use std::io;

use url::Url;

use client::transport::Transport;
use error::ErrorKind;
use headers::HeaderCollection;
use parser::{ParsedResponse, Parser};
use request::{self, RequestSpec};

const READ_CHUNK: usize = 8192;

/// Observer for a single client's request lifecycle. All methods default
/// to no-ops so callers only implement what they need.
pub trait ClientListener {
    /// Fires once, as soon as the status line and headers are known.
    fn headers_received(&mut self, _status_code: u16, _headers: &HeaderCollection) {}
    /// Fires every time new body bytes arrive, with just the new slice.
    fn content_received(&mut self, _chunk: &[u8]) {}
    /// Fires exactly once per `request()` call, with the final outcome.
    fn finished(&mut self, _result: &Result<ParsedResponse, ErrorKind>) {}
}

impl ClientListener for () {}

/// A single-slot HTTP client: at most one request is ever in flight.
/// A second `request()` call while one is pending is refused outright
/// rather than queued — this engine deliberately refuses to pipeline.
pub struct Client<T: Transport + Default, L: ClientListener = ()> {
    transport: Option<T>,
    current_host: Option<(String, u16)>,
    parser: Parser<()>,
    response_pending: bool,
    last_error: Option<ErrorKind>,
    last_response: Option<ParsedResponse>,
    pending_write: Vec<u8>,
    write_offset: usize,
    reported_headers: bool,
    reported_content_len: usize,
    listener: L,
}

impl<T: Transport + Default> Client<T, ()> {
    pub fn new() -> Client<T, ()> {
        Client::with_listener(())
    }
}

impl<T: Transport + Default, L: ClientListener> Client<T, L> {
    pub fn with_listener(listener: L) -> Client<T, L> {
        Client {
            transport: None,
            current_host: None,
            parser: Parser::new(),
            response_pending: false,
            last_error: None,
            last_response: None,
            pending_write: Vec::new(),
            write_offset: 0,
            reported_headers: false,
            reported_content_len: 0,
            listener,
        }
    }

    pub fn response_pending(&self) -> bool {
        self.response_pending
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn last_response(&self) -> Option<&ParsedResponse> {
        self.last_response.as_ref()
    }

    pub fn get(&mut self, url: &Url) -> bool {
        self.request(&b"GET"[..], url, HeaderCollection::new(), Vec::new())
    }

    pub fn head(&mut self, url: &Url) -> bool {
        self.request(&b"HEAD"[..], url, HeaderCollection::new(), Vec::new())
    }

    pub fn post(&mut self, url: &Url, body: Vec<u8>) -> bool {
        self.request(&b"POST"[..], url, HeaderCollection::new(), body)
    }

    pub fn put(&mut self, url: &Url, body: Vec<u8>) -> bool {
        self.request(&b"PUT"[..], url, HeaderCollection::new(), body)
    }

    pub fn delete(&mut self, url: &Url) -> bool {
        self.request(&b"DELETE"[..], url, HeaderCollection::new(), Vec::new())
    }

    /// Issues a request. Returns `false` with no state change if a
    /// response is already pending: this engine refuses to pipeline.
    pub fn request(&mut self, method: &[u8], url: &Url, mut headers: HeaderCollection, body: Vec<u8>) -> bool {
        if self.response_pending {
            return false;
        }
        self.last_error = None;
        self.last_response = None;
        self.parser.clear();
        self.reported_headers = false;
        self.reported_content_len = 0;

        let host = match url.host_str() {
            Some(h) => h.to_string(),
            None => {
                self.fail(ErrorKind::NetworkError);
                return false;
            }
        };
        let port = url.port_or_known_default().unwrap_or(80);

        let reuse = match (&self.transport, &self.current_host) {
            (Some(t), Some(&(ref h, p))) => t.is_connected() && *h == host && p == port,
            _ => false,
        };
        if !reuse {
            if let Some(mut old) = self.transport.take() {
                debug!("closing transport, target changed to {}:{}", host, port);
                old.close();
            }
            let mut fresh = T::default();
            if fresh.connect(&host, port).is_err() {
                self.fail(ErrorKind::NetworkError);
                return false;
            }
            self.transport = Some(fresh);
            self.current_host = Some((host, port));
        } else {
            trace!("reusing connection to {}:{}", host, port);
        }

        if !headers.contains(b"accept") {
            headers.append(&b"Accept"[..], &b"*"[..]);
        }
        let spec = RequestSpec {
            method: method.to_vec(),
            target: request_target(url),
            headers,
            body,
        };
        self.pending_write.clear();
        self.write_offset = 0;
        request::write(&spec, &mut self.pending_write);

        self.response_pending = true;
        self.flush_pending_write();
        true
    }

    /// Drives any request bytes that couldn't be written synchronously
    /// at issue time. Call when the embedder's event loop reports the
    /// transport writable.
    pub fn on_writable(&mut self) {
        if self.response_pending {
            self.flush_pending_write();
        }
    }

    fn flush_pending_write(&mut self) {
        let transport = match self.transport.as_mut() {
            Some(t) => t,
            None => return,
        };
        while self.write_offset < self.pending_write.len() {
            match transport.write(&self.pending_write[self.write_offset..]) {
                Ok(0) => break,
                Ok(n) => self.write_offset += n,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => {
                    self.fail(ErrorKind::NetworkError);
                    return;
                }
            }
        }
    }

    /// Reads whatever is available and feeds it to the parser. Call when
    /// the embedder's event loop reports the transport readable.
    pub fn on_readable(&mut self) {
        if !self.response_pending {
            return;
        }
        loop {
            let read = match self.transport.as_mut() {
                Some(t) => {
                    let mut buf = [0u8; READ_CHUNK];
                    let result = t.read(&mut buf);
                    result.map(|n| { let mut v = buf.to_vec(); v.truncate(n); v })
                }
                None => return,
            };
            match read {
                Ok(ref chunk) if chunk.is_empty() => {
                    self.on_disconnected();
                    return;
                }
                Ok(chunk) => {
                    let mut pos = 0;
                    while pos < chunk.len() {
                        let consumed = self.parser.inject(&chunk[pos..]);
                        pos += consumed;
                        self.report_progress();
                        if self.parser.has_error() {
                            self.fail(ErrorKind::ResponseInvalidError);
                            return;
                        }
                        if self.parser.is_complete() {
                            self.succeed();
                            return;
                        }
                        if consumed == 0 {
                            break;
                        }
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(_) => {
                    self.fail(ErrorKind::NetworkError);
                    return;
                }
            }
        }
    }

    /// Call when the embedder's event loop reports the transport closed.
    pub fn on_disconnected(&mut self) {
        if !self.response_pending {
            return;
        }
        self.parser.inject_eof();
        if self.parser.has_error() {
            self.fail(ErrorKind::RemoteHostClosedError);
        } else if self.parser.is_complete() {
            self.succeed();
        } else {
            self.fail(ErrorKind::RemoteHostClosedError);
        }
    }

    /// Aborts the in-flight request, if any, closing the transport and
    /// surfacing `AbortedError`. A no-op when nothing is pending.
    pub fn abort(&mut self) {
        if !self.response_pending {
            return;
        }
        if let Some(t) = self.transport.as_mut() {
            t.close();
        }
        self.fail(ErrorKind::AbortedError);
    }

    fn report_progress(&mut self) {
        if !self.reported_headers && self.parser.headers_done() {
            self.listener.headers_received(self.parser.status_code(), self.parser.headers());
            self.reported_headers = true;
        }
        let content = self.parser.content();
        if content.len() > self.reported_content_len {
            let start = self.reported_content_len;
            self.reported_content_len = content.len();
            self.listener.content_received(&content[start..]);
        }
    }

    fn succeed(&mut self) {
        self.report_progress();
        let response = self.parser.response();
        self.response_pending = false;
        if !response.should_keep_alive {
            debug!("closing transport: response not keep-alive (status {})", response.status_code);
            if let Some(t) = self.transport.as_mut() {
                t.close();
            }
            self.transport = None;
            self.current_host = None;
        }
        self.last_response = Some(response.clone());
        self.last_error = Some(ErrorKind::NoError);
        self.listener.finished(&Ok(response));
    }

    fn fail(&mut self, kind: ErrorKind) {
        warn!("request failed: {}", kind);
        self.response_pending = false;
        self.last_error = Some(kind);
        self.last_response = None;
        if let Some(t) = self.transport.as_mut() {
            t.close();
        }
        self.transport = None;
        self.current_host = None;
        self.listener.finished(&Err(kind));
    }
}

fn request_target(url: &Url) -> Vec<u8> {
    let mut target = url.path().to_string();
    if let Some(q) = url.query() {
        target.push('?');
        target.push_str(q);
    }
    if target.is_empty() {
        target.push('/');
    }
    target.into_bytes()
}
