//! # ferric-proto
//!
//! Wire-protocol primitives for the ferricd IRC server: line tokenizing
//! and serialization, RFC 1459 case mapping, identifier validation,
//! numeric reply codes and wildcard mask matching.
//!
//! The server core consumes [`Line`] values and emits serialized lines;
//! everything here is synchronous and allocation-light so it can sit on
//! the hot path of a single-threaded event loop.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod message;
pub mod response;
pub mod util;
pub mod validation;

pub use self::casemap::{irc_eq, irc_to_lower, Folded};
pub use self::message::{Line, LineParseError};
pub use self::response::Response;
pub use self::util::{match_mask, truncate_bytes, LINE_MAX, MAX_PARA};
pub use self::validation::{
    channel_check_name, is_chan_prefix, valid_hostname, valid_nickname, valid_sid, valid_uid,
};
