//! Minimal reason-phrase lookup, used only to synthesize the router's
//! 404/405 responses — the parser itself never needs to know a status
//! code's name, only whether one belongs to the bodyless set.

/// Returns the standard reason phrase for well-known status codes, or
/// `"Unknown"` for anything else.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

/// Status codes which never carry a body.
pub fn is_bodyless_status(code: u16) -> bool {
    (100..200).contains(&code) || code == 204 || code == 304
}

#[cfg(test)]
mod test {
    use super::{is_bodyless_status, reason_phrase};

    #[test]
    fn test_reason_phrase() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(999), "Unknown");
    }

    #[test]
    fn test_bodyless_statuses() {
        assert!(is_bodyless_status(100));
        assert!(is_bodyless_status(101));
        assert!(is_bodyless_status(204));
        assert!(is_bodyless_status(304));
        assert!(!is_bodyless_status(200));
        assert!(!is_bodyless_status(404));
    }
}
