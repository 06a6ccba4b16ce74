//! Global state: registries, indexes and the membership graph.
//!
//! [`Network`] is the single context struct threaded through every
//! handler. All mutation happens from handler context on one thread, so
//! there is no interior locking anywhere; the invariants in this module
//! hold between (not within) command dispatches.

pub mod channel;
pub mod client;
pub mod modes;
pub mod whowas;

use std::collections::{HashMap, VecDeque};

use ferric_proto::{valid_uid, Folded};
use tracing::debug;

use crate::clock::Clock;
use crate::config::Config;
use crate::send::Envelope;
use crate::state::channel::Channel;
use crate::state::client::{Client, Connection, Status, Uid};
use crate::state::modes::{ClientFlags, MemberFlags, UserModes};
use crate::state::whowas::{WhowasEntry, WhowasHistory};
use crate::watch::WatchEntry;

/// Our own identity on the network.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub sid: String,
    pub info: String,
}

/// The process-wide protocol state.
pub struct Network {
    /// Configuration snapshot.
    pub config: Config,
    /// Event-loop supplied time; updated between messages.
    pub clock: Clock,
    /// This server.
    pub me: ServerInfo,
    /// Every known entity by UID (users) / SID (servers).
    pub clients: HashMap<Uid, Client>,
    /// Registered users and services by folded nick.
    pub nicks: HashMap<Folded, Uid>,
    /// Known server SIDs.
    pub sids: HashMap<String, Uid>,
    /// Channels by folded name.
    pub channels: HashMap<Folded, Channel>,
    /// Locally connected non-server clients, in accept order.
    pub local_clients: Vec<Uid>,
    /// Directly linked servers, in link order.
    pub local_servers: Vec<Uid>,
    /// Watch table: folded name to entry.
    pub watch: HashMap<Folded, WatchEntry>,
    /// Departed-nick history.
    pub whowas: WhowasHistory,
    /// Outbound envelopes for the I/O layer to drain.
    pub outbox: VecDeque<Envelope>,
    /// The command table.
    pub registry: crate::handlers::Registry,
    /// Walk serial for common-channel dedup.
    pub(crate) serial: u64,
    /// WHOIS remote-query pacing gate, monotonic seconds.
    pub(crate) whois_last_used: u64,
    /// Guard against a restart within a restart.
    pub(crate) restart_in_progress: bool,
    uid_counter: u64,
    reaper: Vec<Uid>,
}

impl Network {
    /// Build an empty network from a config.
    pub fn new(config: Config) -> Self {
        let me = ServerInfo {
            name: config.server.name.clone(),
            sid: config.server.sid.clone(),
            info: config.server.description.clone(),
        };
        Network {
            config,
            clock: Clock::default(),
            me,
            clients: HashMap::new(),
            nicks: HashMap::new(),
            sids: HashMap::new(),
            channels: HashMap::new(),
            local_clients: Vec::new(),
            local_servers: Vec::new(),
            watch: HashMap::new(),
            whowas: WhowasHistory::default(),
            outbox: VecDeque::new(),
            registry: crate::handlers::Registry::new(),
            serial: 0,
            whois_last_used: 0,
            restart_in_progress: false,
            uid_counter: 0,
            reaper: Vec::new(),
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    #[inline]
    pub fn client(&self, uid: &str) -> Option<&Client> {
        self.clients.get(uid)
    }

    #[inline]
    pub fn client_mut(&mut self, uid: &str) -> Option<&mut Client> {
        self.clients.get_mut(uid)
    }

    /// Find a registered user or service by UID or nickname.
    pub fn find_person(&self, name: &str) -> Option<&Client> {
        let client = if valid_uid(name) {
            self.clients.get(name)
        } else {
            self.nicks
                .get(Folded::new(name).as_str())
                .and_then(|uid| self.clients.get(uid))
        };
        client.filter(|c| c.is_client())
    }

    /// Find any client (user or server) by UID, SID, nick or server name.
    pub fn find_any(&self, name: &str) -> Option<&Client> {
        if let Some(c) = self.clients.get(name) {
            return Some(c);
        }
        if let Some(uid) = self.nicks.get(Folded::new(name).as_str()) {
            return self.clients.get(uid);
        }
        self.clients
            .values()
            .find(|c| c.is_server() && ferric_proto::irc_eq(&c.name, name))
    }

    #[inline]
    pub fn channel(&self, name: &Folded) -> Option<&Channel> {
        self.channels.get(name.as_str())
    }

    #[inline]
    pub fn channel_mut(&mut self, name: &Folded) -> Option<&mut Channel> {
        self.channels.get_mut(name.as_str())
    }

    /// Resolve the server name a client sits on, for extbans and WHOIS.
    pub fn server_name_of(&self, client: &Client) -> String {
        if client.my_connect() || client.servptr.is_empty() {
            return self.me.name.clone();
        }
        self.clients
            .get(&client.servptr)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| self.me.name.clone())
    }

    // ========================================================================
    // Client lifecycle
    // ========================================================================

    /// Mint the next local UID: our SID plus a six-character counter.
    pub fn generate_uid(&mut self) -> Uid {
        let mut tail = [b'A'; 6];
        let mut n = self.uid_counter;
        self.uid_counter += 1;
        for slot in tail.iter_mut().rev() {
            *slot = b'A' + (n % 26) as u8;
            n /= 26;
        }
        let mut uid = self.me.sid.clone();
        uid.push_str(std::str::from_utf8(&tail).expect("ASCII"));
        uid
    }

    /// Accept a new local connection in the unregistered state.
    pub fn new_local_client(&mut self) -> Uid {
        let uid = self.generate_uid();
        let mut client = Client::new(uid.clone(), Status::Unregistered);
        client.from = uid.clone();
        client.servptr = self.me.sid.clone();
        client.conn = Some(Connection {
            created_monotonic: self.clock.sec_monotonic,
            created_real: self.clock.sec_real,
            last_active: self.clock.sec_monotonic,
            ..Connection::default()
        });
        self.clients.insert(uid.clone(), client);
        self.local_clients.push(uid.clone());
        uid
    }

    /// Insert a registered user into the nick index. The rename path is
    /// remove-old / assign / insert-new, never a partial state.
    pub fn hash_add_client(&mut self, uid: &str) {
        let name = match self.clients.get(uid) {
            Some(c) => c.name.clone(),
            None => return,
        };
        self.nicks.insert(Folded::new(&name), uid.to_owned());
    }

    /// Remove a user from the nick index.
    pub fn hash_del_client(&mut self, uid: &str) {
        if let Some(c) = self.clients.get(uid) {
            let key = Folded::new(&c.name);
            if self.nicks.get(key.as_str()).map(String::as_str) == Some(uid) {
                self.nicks.remove(key.as_str());
            }
        }
    }

    /// Tear a client down: cascade out of every channel and watch entry,
    /// record history, propagate the quit, and leave the record flagged
    /// DEAD for the dispatcher to reap after the current handler returns.
    pub fn exit_client(&mut self, uid: &str, reason: &str) {
        let (was_client, nuh, name, from, channels) = match self.clients.get_mut(uid) {
            Some(c) if !c.is_dead() => {
                c.flags.set(ClientFlags::DEAD);
                (
                    c.is_client(),
                    c.nuh(),
                    c.name.clone(),
                    c.from.clone(),
                    c.channels.iter().cloned().collect::<Vec<_>>(),
                )
            }
            _ => return,
        };

        debug!(uid, name = %name, reason, "exiting client");

        if was_client {
            // One QUIT to everyone sharing a channel, before memberships go.
            let line = format!(":{nuh} QUIT :{reason}");
            self.sendto_common_channels_local(uid, false, modes::Caps::empty(), modes::Caps::empty(), &line);

            self.watch_check_hash(uid, ferric_proto::Response::RPL_LOGOFF);

            // KILLs were already announced by the killer.
            let killed = self
                .clients
                .get(uid)
                .is_some_and(|c| c.flags.has(ClientFlags::KILLED));
            if !killed {
                let quit = format!(":{uid} QUIT :{reason}");
                self.sendto_server(Some(&from), modes::Capab::empty(), modes::Capab::empty(), &quit);
            }

            self.whowas_add_history(uid);
        }

        for chan in channels {
            self.remove_user_from_channel(&chan, uid);
        }

        self.watch_del_all(uid);
        self.hash_del_client(uid);
        self.local_clients.retain(|u| u != uid);
        self.reaper.push(uid.to_owned());
    }

    /// Remove a server and everything behind it. `reason` propagates as
    /// the quit text of every lost client.
    pub fn exit_server(&mut self, sid: &str, reason: &str) {
        let lost: Vec<Uid> = self
            .clients
            .values()
            .filter(|c| c.is_client() && (c.servptr == sid || c.from == sid))
            .map(|c| c.uid.clone())
            .collect();
        let sub_servers: Vec<Uid> = self
            .clients
            .values()
            .filter(|c| c.is_server() && c.uid != sid && c.from == sid)
            .map(|c| c.uid.clone())
            .collect();

        for uid in lost {
            self.exit_client(&uid, reason);
        }
        for sub in sub_servers {
            self.sids.remove(&sub);
            self.reaper.push(sub);
        }

        self.sids.remove(sid);
        self.local_servers.retain(|u| u != sid);
        if let Some(c) = self.clients.get_mut(sid) {
            c.flags.set(ClientFlags::DEAD);
        }
        self.reaper.push(sid.to_owned());
    }

    /// Drop records flagged DEAD. Called by the dispatcher after every
    /// handler; sends queued to a dead client between flag and reap are
    /// suppressed by the send layer.
    pub fn reap(&mut self) {
        for uid in std::mem::take(&mut self.reaper) {
            self.clients.remove(&uid);
        }
    }

    /// Record a history entry for `uid` under its current nick.
    pub fn whowas_add_history(&mut self, uid: &str) {
        let Some(c) = self.clients.get(uid) else { return };
        let server = self.server_name_of(c);
        self.whowas.add(WhowasEntry {
            name: c.name.clone(),
            username: c.username.clone(),
            host: c.host.clone(),
            info: c.info.clone(),
            server,
            logoff: self.clock.sec_real,
        });
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Create and index a channel. The caller must have checked that no
    /// channel of that name exists.
    pub fn channel_make(&mut self, name: &str) -> Folded {
        let key = Folded::new(name);
        let channel = Channel::new(name, self.clock.sec_real, self.clock.sec_monotonic);
        let prev = self.channels.insert(key.clone(), channel);
        assert!(prev.is_none(), "channel_make over an existing channel");
        key
    }

    /// Link `uid` into `chan` with `flags`. `flood_ctrl` feeds the
    /// join-flood accumulator (false for netburst joins).
    pub fn add_user_to_channel(
        &mut self,
        chan: &Folded,
        uid: &str,
        flags: MemberFlags,
        flood_ctrl: bool,
    ) {
        self.channel_join_flood(chan, uid, flood_ctrl);

        let Some(channel) = self.channels.get_mut(chan.as_str()) else {
            return;
        };
        let prev = channel.members.insert(uid.to_owned(), flags);
        assert!(prev.is_none(), "duplicate membership");

        if let Some(client) = self.clients.get_mut(uid) {
            client.channels.insert(chan.clone());
        }
    }

    /// Unlink `uid` from `chan`, destroying the channel when it empties.
    pub fn remove_user_from_channel(&mut self, chan: &Folded, uid: &str) {
        if let Some(client) = self.clients.get_mut(uid) {
            client.channels.remove(chan);
        }

        let Some(channel) = self.channels.get_mut(chan.as_str()) else {
            return;
        };
        channel.members.remove(uid);

        if channel.members.is_empty() {
            self.channels.remove(chan.as_str());
        }
    }

    /// Member flags if `uid` is on `chan`.
    pub fn find_channel_link(&self, chan: &Folded, uid: &str) -> Option<MemberFlags> {
        self.channels.get(chan.as_str()).and_then(|c| c.member(uid))
    }

    /// Clear the ban cache in every channel `uid` occupies. Used by nick
    /// changes: a rename can change which masks match.
    pub fn clear_ban_cache_on_channels(&mut self, uid: &str) {
        let channels: Vec<Folded> = self
            .clients
            .get(uid)
            .map(|c| c.channels.iter().cloned().collect())
            .unwrap_or_default();
        for chan in channels {
            if let Some(channel) = self.channels.get_mut(chan.as_str()) {
                if let Some(flags) = channel.members.get_mut(uid) {
                    flags.clear(MemberFlags::BAN_CHECKED);
                    flags.clear(MemberFlags::BAN_SILENCED);
                }
            }
        }
    }

    /// Local opers (or any umode class) for oper notices.
    pub(crate) fn local_clients_with_umode(&self, umode: UserModes) -> Vec<Uid> {
        self.local_clients
            .iter()
            .filter(|uid| {
                self.clients
                    .get(*uid)
                    .is_some_and(|c| c.is_client() && c.umodes.has(umode))
            })
            .cloned()
            .collect()
    }
}
