//! Infohash identifiers and magnet links.
//!
//! Everything that crosses a component boundary carries an [`InfoHash`]
//! rather than a raw string, so malformed identifiers are rejected once,
//! at the edge.

mod hash;
mod magnet;

pub use hash::{InfoHash, InfoHashError};
pub use magnet::{build_magnet_uri, parse_magnet_link, MagnetLink};
