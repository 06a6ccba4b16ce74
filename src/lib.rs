//! # ferricd
//!
//! The protocol state engine of a TS6 IRC server: session state
//! machines, the channel/membership/mode engine, the command dispatcher,
//! timestamp-based state reconciliation, and the case-folded global
//! indexes everything hangs off.
//!
//! The engine is sans-I/O. The embedding event loop accepts sockets,
//! frames lines, and drives the engine through three touch points:
//!
//! - [`state::Network::new_local_client`] on accept;
//! - [`state::Network::dispatch_raw`] per inbound line;
//! - draining [`state::Network::outbox`] for outbound envelopes.
//!
//! Time is injected through [`clock::Clock`]: wall-clock seconds feed the
//! TS6 protocol, monotonic seconds feed throttles. All state lives in one
//! [`state::Network`] on one thread; there are no locks and no tasks.

pub mod channel_engine;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod security;
pub mod send;
pub mod shutdown;
pub mod state;
pub mod watch;

pub use channel_engine::CanSend;
pub use clock::Clock;
pub use config::Config;
pub use error::{HandlerError, HandlerResult};
pub use send::{Envelope, Recipient};
pub use state::Network;
