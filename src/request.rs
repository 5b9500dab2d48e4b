//! Serializes a method, target, headers and optional body onto a byte
//! sink in HTTP/1.1 wire format. No chunked request bodies, no trailers,
//! no response-specific states — just the request-only subset this crate
//! needs.

use headers::HeaderCollection;

/// A fully-specified outgoing request, ready to be written.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Vec<u8>,
    pub target: Vec<u8>,
    pub headers: HeaderCollection,
    pub body: Vec<u8>,
}

impl RequestSpec {
    pub fn new<M, T>(method: M, target: T) -> RequestSpec
        where M: Into<Vec<u8>>, T: Into<Vec<u8>>
    {
        RequestSpec {
            method: method.into(),
            target: target.into(),
            headers: HeaderCollection::new(),
            body: Vec::new(),
        }
    }

    pub fn get<T: Into<Vec<u8>>>(target: T) -> RequestSpec {
        RequestSpec::new(&b"GET"[..], target)
    }

    pub fn head<T: Into<Vec<u8>>>(target: T) -> RequestSpec {
        RequestSpec::new(&b"HEAD"[..], target)
    }

    pub fn post<T: Into<Vec<u8>>>(target: T, body: Vec<u8>) -> RequestSpec {
        let mut r = RequestSpec::new(&b"POST"[..], target);
        r.body = body;
        r
    }

    pub fn put<T: Into<Vec<u8>>>(target: T, body: Vec<u8>) -> RequestSpec {
        let mut r = RequestSpec::new(&b"PUT"[..], target);
        r.body = body;
        r
    }

    pub fn delete<T: Into<Vec<u8>>>(target: T) -> RequestSpec {
        RequestSpec::new(&b"DELETE"[..], target)
    }

    pub fn header<N, V>(mut self, name: N, value: V) -> RequestSpec
        where N: Into<Vec<u8>>, V: Into<Vec<u8>>
    {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> RequestSpec {
        self.body = body;
        self
    }
}

/// Serializes `spec` in wire format onto `out`, appending a
/// `Content-Length` header when `spec.body` is non-empty and the caller
/// didn't already supply one.
///
/// Emits: `METHOD SP TARGET SP "HTTP/1.1" CRLF (HEADER CRLF)* CRLF [BODY]`.
/// No `Host` header is added here — that is a transport-level concern
/// owned by the client engine.
pub fn write(spec: &RequestSpec, out: &mut Vec<u8>) {
    out.extend_from_slice(&spec.method);
    out.push(b' ');
    out.extend_from_slice(&spec.target);
    out.extend_from_slice(b" HTTP/1.1\r\n");

    for header in spec.headers.iter() {
        write_header_line(&header.name, &header.value, out);
    }
    if !spec.body.is_empty() && !spec.headers.contains(b"content-length") {
        write_header_line(b"Content-Length", spec.body.len().to_string().as_bytes(), out);
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&spec.body);
}

fn write_header_line(name: &[u8], value: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(name);
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
}
