//! Body-framing state, decided once at end-of-headers and then driven
//! chunk-by-chunk (or byte-by-byte) as more input arrives.

use chunked;
use error::ParseError;

/// How the remainder of the message body is framed.
#[derive(Debug, Clone)]
pub enum BodyMode {
    /// No body at all (1xx/204/304, or HTTP/1.1 default with no framing).
    None,
    /// Exactly this many bytes remain.
    Fixed(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked(chunked::State),
    /// No declared length; the body runs until the transport reports EOF.
    UntilEof,
}

impl BodyMode {
    /// Feeds `input` into the body decoder, appending any decoded content
    /// bytes to `out`. Returns `(consumed, done)`: `consumed` is how many
    /// bytes of `input` were used, `done` is whether the body is now
    /// complete (not applicable to `UntilEof`, which only completes on
    /// explicit EOF notification).
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>)
        -> Result<(usize, bool), ParseError>
    {
        match *self {
            BodyMode::None => Ok((0, true)),
            BodyMode::Fixed(remaining) => {
                let take = (input.len() as u64).min(remaining) as usize;
                out.extend_from_slice(&input[..take]);
                let left = remaining - take as u64;
                *self = BodyMode::Fixed(left);
                Ok((take, left == 0))
            }
            BodyMode::Chunked(ref mut state) => {
                let consumed = state.parse(input, out)?;
                Ok((consumed, state.is_done()))
            }
            BodyMode::UntilEof => {
                out.extend_from_slice(input);
                Ok((input.len(), false))
            }
        }
    }

    /// Called when the transport reports EOF. Only `UntilEof` bodies
    /// complete this way; anything else means the message was cut short.
    pub fn finish_on_eof(&self) -> bool {
        matches!(*self, BodyMode::UntilEof)
    }
}

#[cfg(test)]
mod test {
    use super::BodyMode;

    #[test]
    fn fixed_body_stops_exactly_at_length() {
        let mut mode = BodyMode::Fixed(5);
        let mut out = Vec::new();
        let (consumed, done) = mode.feed(b"hello world", &mut out).unwrap();
        assert_eq!(consumed, 5);
        assert!(done);
        assert_eq!(out, b"hello".to_vec());
    }

    #[test]
    fn until_eof_body_never_self_completes() {
        let mut mode = BodyMode::UntilEof;
        let mut out = Vec::new();
        let (consumed, done) = mode.feed(b"partial", &mut out).unwrap();
        assert_eq!(consumed, 7);
        assert!(!done);
        assert!(mode.finish_on_eof());
    }
}
