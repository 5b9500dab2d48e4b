//! An embeddable, sans-io HTTP/1.x toolkit.
//!
//! Five pieces, usable independently or together:
//!
//! - [`HeaderCollection`] — an ordered, case-insensitive header collection.
//! - [`Parser`] — an incremental response parser fed byte slices as they
//!   arrive, with sticky errors and full keep-alive/body-framing
//!   determination.
//! - [`write_request`] — a request-line-and-headers writer.
//! - [`client`] — a single-slot client engine built on the above, driven
//!   by an embedder-supplied [`client::Transport`].
//! - [`router`] — a path-pattern dispatcher for servers built on this
//!   toolkit.
//!
//! Nothing here opens a socket or spawns a thread: callers own the event
//! loop and hand this crate bytes.

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate log;
extern crate regex;
extern crate url;

mod body;
mod chunked;
pub mod client;
mod error;
mod headers;
mod line;
mod parser;
mod request;
pub mod router;
mod status;
mod version;

pub use error::{ErrorKind, ParseError};
pub use headers::{Header, HeaderCollection};
pub use parser::{Listener, ParsedResponse, Parser};
pub use request::{write as write_request, RequestSpec};
pub use status::{is_bodyless_status, reason_phrase};
pub use version::Version;
