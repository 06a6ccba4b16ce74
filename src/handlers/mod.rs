//! Command handlers and the dispatch table.

pub mod channel;
pub mod connection;
pub mod messaging;
pub mod mode;
pub mod nick;
pub mod registry;
pub mod server;
pub mod svsnick;
pub mod user;
pub mod watch;
pub mod webirc;
pub mod whois;

pub use registry::{CommandEntry, HandlerFn, Registry, Slot};
