//! Error taxonomy: fine-grained parser diagnostics and the coarse,
//! client-facing `ErrorKind` they collapse into.

quick_error! {
    /// Diagnostic detail for a parser failure.
    ///
    /// The client engine only ever surfaces `ErrorKind::ResponseInvalidError`
    /// for any of these; they are kept on the parser itself for callers that
    /// want to log or assert on the exact cause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ParseError {
        InvalidStatusLine {
            display("invalid HTTP status line")
        }
        InvalidHeaderLine {
            display("invalid header line")
        }
        HeaderTooLong {
            display("header line exceeds the maximum accepted length")
        }
        TooManyHeaders {
            display("too many headers in a single message")
        }
        DuplicateContentLength {
            display("duplicate Content-Length header")
        }
        BadContentLength {
            display("Content-Length value is not a valid non-negative integer")
        }
        InvalidChunkSize {
            display("invalid chunked transfer-encoding chunk size")
        }
        ChunkTooLarge {
            display("chunk size exceeds the accepted limit")
        }
        UnexpectedEof {
            display("connection closed before the message was complete")
        }
    }
}

quick_error! {
    /// Client-facing error taxonomy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ErrorKind {
        NoError {
            display("no error")
        }
        NetworkError {
            display("transport-level failure")
        }
        ResponseInvalidError {
            display("the response could not be parsed")
        }
        RemoteHostClosedError {
            display("the remote host closed the connection before the response completed")
        }
        AbortedError {
            display("the request was aborted")
        }
    }
}

impl From<ParseError> for ErrorKind {
    fn from(_: ParseError) -> ErrorKind {
        ErrorKind::ResponseInvalidError
    }
}
