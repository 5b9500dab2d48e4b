//! The byte-stream contract the client engine is built on.
//!
//! This crate is sans-io: it never opens a socket itself. The embedder
//! supplies a `Transport` impl (a TCP stream, a Unix socket, an in-memory
//! test double) and drives it with `Client::on_readable`/`on_writable`/
//! `on_disconnected` from whatever event loop it runs.

use std::io;

pub trait Transport {
    /// Opens a connection to `host:port`. The engine only calls this on
    /// a fresh, just-constructed (`Default::default()`) value: it never
    /// reconnects a `Transport` it has already used for a different
    /// host, it discards it (via `close`) and builds a new one instead.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Non-blocking write. An `io::ErrorKind::WouldBlock` result means
    /// zero bytes were accepted; the caller should retry once the
    /// transport signals writable again.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Non-blocking read. `Ok(0)` means the peer closed the connection.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self);

    fn is_connected(&self) -> bool;
}
