//! The HTTP client engine.

mod engine;
mod transport;

pub use self::engine::{Client, ClientListener};
pub use self::transport::Transport;
