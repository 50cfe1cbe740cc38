//! Server-list file loading for atoll continuums.
//!
//! The on-disk format is one record per line, `"<address>\t<weight>"`,
//! with `#`-prefixed comment lines. [`load_continuum`] turns such a file
//! into a ready ring and remembers the file's modification time, so a
//! caller can later ask [`is_stale`] whether to rebuild and swap.

mod error;
mod loader;

pub use error::SourceError;
pub use loader::{is_stale, load_continuum, load_entries, parse_server_list};
