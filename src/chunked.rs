//! Chunked transfer-encoding decoder.
//!
//! Operates on plain byte slices rather than a shared connection buffer:
//! `State::parse` is handed whatever bytes are available and appends
//! decoded chunk data directly to the caller's content buffer, returning
//! how many input bytes it consumed. Chunk-size lines and trailers may be
//! split arbitrarily across calls; the partial line is held in `line_buf`
//! between calls.

use error::ParseError;
use line::take_line;

#[derive(Debug, Clone)]
pub struct State {
    mode: Mode,
    line_buf: Vec<u8>,
    done: bool,
}

#[derive(Debug, Clone)]
enum Mode {
    Size,
    Data(u64),
    DataCrlf,
    Trailer,
}

impl State {
    pub fn new() -> State {
        State { mode: Mode::Size, line_buf: Vec::new(), done: false }
    }

    /// Consumes a prefix of `input`, appending decoded chunk bytes to
    /// `out`. Returns the number of bytes of `input` consumed; the
    /// remainder (if any) was not enough to complete the next step and
    /// must be re-delivered (with more data) in a later call.
    pub fn parse(&mut self, input: &[u8], out: &mut Vec<u8>)
        -> Result<usize, ParseError>
    {
        let mut pos = 0;
        loop {
            if self.done {
                break;
            }
            match self.mode {
                Mode::Size => {
                    match take_line(&mut self.line_buf, input, &mut pos) {
                        None => break,
                        Some(line) => {
                            let size = parse_chunk_size(&line)?;
                            self.mode = if size == 0 { Mode::Trailer } else { Mode::Data(size) };
                        }
                    }
                }
                Mode::Data(remaining) => {
                    let avail = (input.len() - pos) as u64;
                    if avail == 0 {
                        break;
                    }
                    let take = avail.min(remaining) as usize;
                    out.extend_from_slice(&input[pos..pos + take]);
                    pos += take;
                    let left = remaining - take as u64;
                    self.mode = if left == 0 { Mode::DataCrlf } else { Mode::Data(left) };
                    if left != 0 {
                        break;
                    }
                }
                Mode::DataCrlf => {
                    match take_line(&mut self.line_buf, input, &mut pos) {
                        None => break,
                        Some(_) => self.mode = Mode::Size,
                    }
                }
                Mode::Trailer => {
                    match take_line(&mut self.line_buf, input, &mut pos) {
                        None => break,
                        Some(line) => {
                            if line.is_empty() {
                                self.done = true;
                            }
                            // non-empty lines are trailer headers; discarded
                        }
                    }
                }
            }
        }
        Ok(pos)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Parses a chunk-size line: hex digits, optionally followed by
/// `;chunk-extension`, with trailing whitespace tolerated (e.g. `"25  "`).
fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let hex_part = match line.iter().position(|&b| b == b';') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let trimmed = trim_ascii_whitespace(hex_part);
    if trimmed.is_empty() {
        return Err(ParseError::InvalidChunkSize);
    }
    let mut value: u64 = 0;
    for &b in trimmed {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => return Err(ParseError::InvalidChunkSize),
        };
        value = value.checked_mul(16)
            .and_then(|v| v.checked_add(digit as u64))
            .ok_or(ParseError::ChunkTooLarge)?;
    }
    Ok(value)
}

fn trim_ascii_whitespace(buf: &[u8]) -> &[u8] {
    let start = buf.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(buf.len());
    let end = buf.iter().rposition(|b| !b.is_ascii_whitespace()).map(|i| i + 1).unwrap_or(start);
    &buf[start..end]
}

#[cfg(test)]
mod test {
    use super::{parse_chunk_size, State};

    #[test]
    fn test_parse_chunk_size_tolerates_trailing_space() {
        assert_eq!(parse_chunk_size(b"25").unwrap(), 0x25);
        assert_eq!(parse_chunk_size(b"25  ").unwrap(), 0x25);
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b"1C").unwrap(), 0x1C);
        assert!(parse_chunk_size(b"zz").is_err());
    }

    #[test]
    fn test_decodes_two_chunks_and_trailer() {
        let input = b"25  \r\nThis is the data in the first chunk\r\n\r\n\
                      1C\r\nand this is the second one\r\n\r\n\
                      0  \r\n\r\n";
        let mut state = State::new();
        let mut out = Vec::new();
        let consumed = state.parse(&input[..], &mut out).unwrap();
        assert_eq!(consumed, input.len());
        assert!(state.is_done());
        assert_eq!(out.len(), 65);
        assert_eq!(
            out,
            b"This is the data in the first chunk\r\nand this is the second one\r\n"
                .to_vec()
        );
    }

    #[test]
    fn test_handles_fragmented_input() {
        let input = b"5\r\nhello\r\n0\r\n\r\n";
        let mut state = State::new();
        let mut out = Vec::new();
        let mut total_consumed = 0;
        for byte in input.iter() {
            total_consumed += state.parse(&[*byte], &mut out).unwrap();
        }
        assert_eq!(total_consumed, input.len());
        assert!(state.is_done());
        assert_eq!(out, b"hello".to_vec());
    }
}
