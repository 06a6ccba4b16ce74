//! Client records.
//!
//! A [`Client`] is any connected entity: a local user mid-registration, a
//! registered user (local or remote), a server link, or a remote server
//! learned from a burst. Local connections additionally carry a
//! [`Connection`] sub-record with the throttling counters and watch
//! subscriptions that only make sense for a directly attached socket.

use std::collections::HashSet;
use std::net::IpAddr;

use ferric_proto::Folded;

use crate::state::modes::{Capab, Caps, ClientFlags, UserModes};

/// Unique client key: a TS6 UID for users, a SID for servers. Local
/// clients that have not identified yet already have their UID assigned.
pub type Uid = String;

/// Session kind; selects the dispatch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Connection accepted, registration incomplete.
    Unregistered,
    /// Registered user.
    Client,
    /// Server link or remote server.
    Server,
}

/// A connected entity.
#[derive(Debug)]
pub struct Client {
    /// TS6 UID (users) or SID (servers).
    pub uid: Uid,
    /// Nickname or server name, display casing.
    pub name: String,
    /// Ident/username.
    pub username: String,
    /// Visible host, possibly spoofed.
    pub host: String,
    /// Real host behind any spoof.
    pub realhost: String,
    /// Textual IP of the connection.
    pub sockhost: String,
    /// Parsed IP, if known.
    pub ip: Option<IpAddr>,
    /// GECOS / real name, or server description.
    pub info: String,
    /// Services account; `"*"` when unauthenticated.
    pub account: String,
    /// Away message; empty when present.
    pub away: String,
    /// TS6 timestamp: nick TS for users, link time for servers.
    pub tsinfo: i64,
    /// User mode bits.
    pub umodes: UserModes,
    /// Non-mode flags.
    pub flags: ClientFlags,
    /// IRCv3 capabilities (users).
    pub caps: Caps,
    /// Link capabilities (servers).
    pub capab: Capab,
    /// TLS certificate fingerprint, empty when none.
    pub certfp: String,
    /// Services-attached WHOIS tags, in application order.
    pub svstags: Vec<ServicesTag>,
    /// Channels this client is in, by folded name.
    pub channels: HashSet<Folded>,
    /// Session kind.
    pub status: Status,
    /// UID/SID of the server this client is attached to.
    pub servptr: Uid,
    /// UID of the local link this client is reached through. For locally
    /// connected clients this is their own UID.
    pub from: Uid,
    /// Dedup marker for common-channel walks.
    pub serial: u64,
    /// Local-connection sub-record; `None` for remote clients.
    pub conn: Option<Connection>,
}

/// Per-socket state for locally attached clients.
#[derive(Debug, Default)]
pub struct Connection {
    /// PASS argument, held until registration completes.
    pub password: Option<String>,
    /// NICK received.
    pub got_nick: bool,
    /// USER received.
    pub got_user: bool,
    /// CAP negotiation opened and not yet ended.
    pub cap_negotiating: bool,
    /// Monotonic second the connection was accepted.
    pub created_monotonic: u64,
    /// Wall-clock second the connection was accepted.
    pub created_real: i64,
    /// Monotonic second of the last command, for idle reporting.
    pub last_active: u64,
    /// Join/leave spambot counters.
    pub last_join_time: u64,
    pub last_leave_time: u64,
    pub join_leave_count: u32,
    pub oper_warn_count_down: u32,
    /// Names this client watches, folded.
    pub watches: HashSet<Folded>,
    /// TS6 handshake state for server links.
    pub ts6_pass: Option<(String, String)>,
}

/// One services-attached WHOIS line.
#[derive(Debug, Clone)]
pub struct ServicesTag {
    /// Numeric the tag is rendered under.
    pub numeric: u16,
    /// Only shown to requesters holding one of these umodes; zero-valued
    /// set means everyone.
    pub umodes: UserModes,
    /// The tag text.
    pub tag: String,
}

impl Client {
    /// Fresh record; callers fill in what they know.
    pub fn new(uid: Uid, status: Status) -> Self {
        Client {
            uid,
            name: String::new(),
            username: String::new(),
            host: String::new(),
            realhost: String::new(),
            sockhost: String::new(),
            ip: None,
            info: String::new(),
            account: "*".to_owned(),
            away: String::new(),
            tsinfo: 0,
            umodes: UserModes::empty(),
            flags: ClientFlags::default(),
            caps: Caps::empty(),
            capab: Capab::empty(),
            certfp: String::new(),
            svstags: Vec::new(),
            channels: HashSet::new(),
            status,
            servptr: Uid::new(),
            from: Uid::new(),
            serial: 0,
            conn: None,
        }
    }

    /// Locally connected?
    #[inline]
    pub fn my_connect(&self) -> bool {
        self.conn.is_some()
    }

    /// Registered user?
    #[inline]
    pub fn is_client(&self) -> bool {
        self.status == Status::Client
    }

    /// Server link or remote server?
    #[inline]
    pub fn is_server(&self) -> bool {
        self.status == Status::Server
    }

    /// Still in registration?
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.status == Status::Unregistered
    }

    /// Network service?
    #[inline]
    pub fn is_service(&self) -> bool {
        self.flags.has(ClientFlags::SERVICE)
    }

    /// Marked for reaping?
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.flags.has(ClientFlags::DEAD)
    }

    /// `nick!user@host` with the visible host.
    pub fn nuh(&self) -> String {
        format!("{}!{}@{}", self.name, self.username, self.host)
    }

    /// Authenticated to services?
    #[inline]
    pub fn has_account(&self) -> bool {
        self.account != "*"
    }
}
