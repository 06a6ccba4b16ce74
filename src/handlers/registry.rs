//! The command table and dispatcher.
//!
//! Every command is a [`CommandEntry`] with a five-slot handler array
//! indexed by the source's session kind: unregistered, client, server,
//! encap, oper. A slot is either a handler function or one of the stock
//! refusals (`Ignore`, `Unregistered`, `Registered`, `NotOper`). The table
//! is built once at startup; `register_command` / `unregister_command`
//! exist for embedders that add their own verbs.

use std::collections::HashMap;

use ferric_proto::{Line, Response, MAX_PARA};
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::state::client::{Status, Uid};
use crate::state::modes::UserModes;
use crate::state::Network;

/// A handler function: full network access, the resolved source, and the
/// tokenized line.
pub type HandlerFn = fn(&mut Network, &str, &Line) -> HandlerResult;

/// Slot indexes into [`CommandEntry::handlers`].
pub const UNREGISTERED_HANDLER: usize = 0;
pub const CLIENT_HANDLER: usize = 1;
pub const SERVER_HANDLER: usize = 2;
pub const ENCAP_HANDLER: usize = 3;
pub const OPER_HANDLER: usize = 4;

/// What to do when a command arrives in a given session state.
#[derive(Clone, Copy)]
pub enum Slot {
    /// Silently do nothing.
    Ignore,
    /// Tell the source it has not registered (451).
    Unregistered,
    /// Tell the source it may not reregister (462).
    Registered,
    /// Tell the source it lacks oper privileges (481).
    NotOper,
    /// Run a handler.
    Handler(HandlerFn),
}

/// One command's dispatch row.
#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub name: &'static str,
    /// Minimum parameter count after the command word.
    pub args_min: usize,
    /// Maximum parameters; the tokenizer already caps at [`MAX_PARA`].
    pub args_max: usize,
    /// Handler slots by session kind.
    pub handlers: [Slot; 5],
}

impl CommandEntry {
    /// Row with sensible defaults: no minimum, every slot ignored.
    pub const fn new(name: &'static str) -> Self {
        CommandEntry {
            name,
            args_min: 0,
            args_max: MAX_PARA,
            handlers: [Slot::Ignore; 5],
        }
    }
}

/// The command table.
pub struct Registry {
    table: HashMap<&'static str, CommandEntry>,
}

impl Registry {
    /// Look up a command by (already uppercased) name.
    pub fn find(&self, name: &str) -> Option<CommandEntry> {
        self.table.get(name).copied()
    }

    /// Add or replace a command.
    pub fn register_command(&mut self, entry: CommandEntry) {
        self.table.insert(entry.name, entry);
    }

    /// Remove a command; returns whether it existed.
    pub fn unregister_command(&mut self, name: &str) -> bool {
        self.table.remove(name).is_some()
    }

    /// Build the standard table.
    pub fn new() -> Self {
        use crate::handlers::{
            channel, connection, messaging, mode, nick, server, svsnick, user, watch, webirc,
            whois,
        };

        let mut registry = Registry {
            table: HashMap::new(),
        };
        let mut add = |name: &'static str, args_min: usize, handlers: [Slot; 5]| {
            registry.register_command(CommandEntry {
                name,
                args_min,
                args_max: MAX_PARA,
                handlers,
            });
        };

        use Slot::{Handler, Ignore, NotOper, Registered, Unregistered};

        // Registration and connection upkeep. NICK takes no minimum so
        // the handler can answer an empty form with 431 rather than 461.
        add("NICK", 0, [
            Handler(connection::mr_nick),
            Handler(nick::m_nick),
            Handler(nick::ms_nick),
            Ignore,
            Handler(nick::m_nick),
        ]);
        add("USER", 4, [
            Handler(connection::mr_user),
            Registered,
            Ignore,
            Ignore,
            Registered,
        ]);
        add("PASS", 1, [
            Handler(connection::mr_pass),
            Registered,
            Ignore,
            Ignore,
            Registered,
        ]);
        add("CAP", 1, [
            Handler(connection::m_cap),
            Handler(connection::m_cap),
            Ignore,
            Ignore,
            Handler(connection::m_cap),
        ]);
        add("WEBIRC", 4, [
            Handler(webirc::mr_webirc),
            Registered,
            Ignore,
            Ignore,
            Registered,
        ]);
        add("QUIT", 0, [
            Handler(connection::m_quit),
            Handler(connection::m_quit),
            Handler(connection::ms_quit),
            Ignore,
            Handler(connection::m_quit),
        ]);
        add("PING", 1, [
            Handler(connection::m_ping),
            Handler(connection::m_ping),
            Handler(connection::m_ping),
            Ignore,
            Handler(connection::m_ping),
        ]);
        add("PONG", 0, [
            Handler(connection::m_pong),
            Handler(connection::m_pong),
            Handler(connection::m_pong),
            Ignore,
            Handler(connection::m_pong),
        ]);
        add("ERROR", 0, [
            Handler(connection::mr_error),
            Ignore,
            Handler(connection::mr_error),
            Ignore,
            Ignore,
        ]);

        // Channels.
        add("JOIN", 1, [
            Unregistered,
            Handler(channel::m_join),
            Handler(channel::ms_join),
            Ignore,
            Handler(channel::m_join),
        ]);
        add("PART", 1, [
            Unregistered,
            Handler(channel::m_part),
            Handler(channel::ms_part),
            Ignore,
            Handler(channel::m_part),
        ]);
        add("TOPIC", 1, [
            Unregistered,
            Handler(channel::m_topic),
            Handler(channel::ms_topic),
            Ignore,
            Handler(channel::m_topic),
        ]);
        add("NAMES", 0, [
            Unregistered,
            Handler(channel::m_names),
            Ignore,
            Ignore,
            Handler(channel::m_names),
        ]);
        add("INVITE", 2, [
            Unregistered,
            Handler(channel::m_invite),
            Handler(channel::ms_invite),
            Ignore,
            Handler(channel::m_invite),
        ]);
        add("MODE", 1, [
            Unregistered,
            Handler(mode::m_mode),
            Handler(mode::ms_mode),
            Ignore,
            Handler(mode::m_mode),
        ]);

        // Messaging.
        add("PRIVMSG", 2, [
            Unregistered,
            Handler(messaging::m_privmsg),
            Handler(messaging::m_privmsg),
            Ignore,
            Handler(messaging::m_privmsg),
        ]);
        add("NOTICE", 2, [
            Ignore,
            Handler(messaging::m_notice),
            Handler(messaging::m_notice),
            Ignore,
            Handler(messaging::m_notice),
        ]);

        // Queries and presence.
        // WHOIS answers its own empty form with 431.
        add("WHOIS", 0, [
            Unregistered,
            Handler(whois::m_whois),
            Handler(whois::mo_whois),
            Ignore,
            Handler(whois::mo_whois),
        ]);
        add("WATCH", 0, [
            Unregistered,
            Handler(watch::m_watch),
            Ignore,
            Ignore,
            Handler(watch::m_watch),
        ]);
        add("AWAY", 0, [
            Unregistered,
            Handler(user::m_away),
            Handler(user::ms_away),
            Ignore,
            Handler(user::m_away),
        ]);

        // Server-to-server.
        add("CAPAB", 1, [
            Handler(server::mr_capab),
            Ignore,
            Ignore,
            Ignore,
            Ignore,
        ]);
        add("SERVER", 3, [
            Handler(server::mr_server),
            Registered,
            Ignore,
            Ignore,
            Registered,
        ]);
        add("SVINFO", 4, [
            Ignore,
            Ignore,
            Handler(server::ms_svinfo),
            Ignore,
            Ignore,
        ]);
        add("SID", 4, [Ignore, Ignore, Handler(server::ms_sid), Ignore, Ignore]);
        add("UID", 9, [Ignore, Ignore, Handler(server::ms_uid), Ignore, Ignore]);
        add("EUID", 11, [Ignore, Ignore, Handler(server::ms_uid), Ignore, Ignore]);
        add("SJOIN", 4, [Ignore, Ignore, Handler(server::ms_sjoin), Ignore, Ignore]);
        add("TMODE", 3, [Ignore, Ignore, Handler(mode::ms_tmode), Ignore, Ignore]);
        add("BMASK", 4, [Ignore, Ignore, Handler(server::ms_bmask), Ignore, Ignore]);
        add("ENCAP", 2, [Ignore, Ignore, Handler(server::ms_encap), Ignore, Ignore]);
        add("KILL", 2, [
            Ignore,
            NotOper,
            Handler(server::ms_kill),
            Ignore,
            Handler(server::mo_kill),
        ]);
        add("SQUIT", 1, [
            Ignore,
            NotOper,
            Handler(server::ms_squit),
            Ignore,
            Handler(server::ms_squit),
        ]);
        add("SVSNICK", 3, [
            Ignore,
            Ignore,
            Handler(svsnick::ms_svsnick),
            Handler(svsnick::ms_svsnick),
            Ignore,
        ]);

        registry
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Network {
    /// Parse and dispatch one raw line arriving on `link_uid`.
    pub fn dispatch_raw(&mut self, link_uid: &str, raw: &str) {
        match raw.parse::<Line>() {
            Ok(line) => self.dispatch(link_uid, &line),
            Err(err) => debug!(link = link_uid, %err, "unparsable line"),
        }
    }

    /// Dispatch one tokenized line arriving on `link_uid`.
    ///
    /// Resolves the source from the prefix (server links only; client
    /// prefixes are ignored), enforces the per-entry argument minimum,
    /// selects the handler slot for the source's session kind, and reaps
    /// any clients the handler killed.
    pub fn dispatch(&mut self, link_uid: &str, line: &Line) {
        let Some(link) = self.clients.get(link_uid) else {
            return;
        };
        if link.is_dead() {
            return;
        }
        let link_is_server = link.is_server();

        if let Some(c) = self.clients.get_mut(link_uid) {
            if let Some(conn) = c.conn.as_mut() {
                conn.last_active = self.clock.sec_monotonic;
            }
        }

        // Resolve the true source. Prefixes from clients are ignored; a
        // prefix from a server must name an entity reached through that
        // same link, or the message is going the wrong way.
        let source_uid: Uid = if link_is_server {
            match &line.prefix {
                Some(prefix) => match self.find_any(prefix) {
                    Some(source) => {
                        if source.uid != *link_uid && source.from != *link_uid {
                            let text = format!(
                                "Message for {} from wrong direction ({})",
                                prefix, line.command
                            );
                            self.sendto_realops(UserModes::DEBUG, &text);
                            return;
                        }
                        source.uid.clone()
                    }
                    None => {
                        debug!(prefix = %prefix, command = %line.command, "unknown prefix, dropping");
                        return;
                    }
                },
                None => link_uid.to_owned(),
            }
        } else {
            link_uid.to_owned()
        };

        let command = line.command.to_ascii_uppercase();
        let Some(source) = self.clients.get(&source_uid) else {
            return;
        };
        let source_status = source.status;

        // The slot follows the LINK's session kind: everything arriving
        // on a server link runs the server handler, whatever entity the
        // prefix resolves to. Locally, oper status refines the slot.
        let (link_status, link_is_oper) = match self.clients.get(link_uid) {
            Some(l) => (l.status, l.umodes.has(UserModes::OPER)),
            None => return,
        };

        let entry = self.registry.find(&command);
        let Some(entry) = entry else {
            match source_status {
                Status::Server => {
                    debug!(command = %command, "unknown command from server")
                }
                _ => self.sendto_one_numeric(
                    &source_uid,
                    Response::ERR_UNKNOWNCOMMAND,
                    &[&command, "Unknown command"],
                ),
            }
            return;
        };

        if line.params.len() < entry.args_min {
            self.underargued(&source_uid, source_status, &command);
            self.reap();
            return;
        }

        let slot = match link_status {
            Status::Unregistered => entry.handlers[UNREGISTERED_HANDLER],
            Status::Client if link_is_oper => entry.handlers[OPER_HANDLER],
            Status::Client => entry.handlers[CLIENT_HANDLER],
            Status::Server => entry.handlers[SERVER_HANDLER],
        };

        let result = self.run_slot(slot, &source_uid, line);

        if let Err(err) = result {
            match err {
                HandlerError::NeedMoreParams => {
                    self.underargued(&source_uid, source_status, &command)
                }
                HandlerError::NotRegistered => self.sendto_one_numeric(
                    &source_uid,
                    Response::ERR_NOTREGISTERED,
                    &["You have not registered"],
                ),
                HandlerError::AlreadyRegistered => self.sendto_one_numeric(
                    &source_uid,
                    Response::ERR_ALREADYREGISTERED,
                    &["You may not reregister"],
                ),
                HandlerError::Dropped(why) => {
                    debug!(command = %command, why, "message dropped")
                }
            }
        }

        self.reap();
    }

    /// Run a slot against a source; used by dispatch and by ENCAP.
    pub(crate) fn run_slot(&mut self, slot: Slot, source_uid: &str, line: &Line) -> HandlerResult {
        match slot {
            Slot::Ignore => Ok(()),
            Slot::Unregistered => Err(HandlerError::NotRegistered),
            Slot::Registered => Err(HandlerError::AlreadyRegistered),
            Slot::NotOper => {
                self.sendto_one_numeric(
                    source_uid,
                    Response::ERR_NOPRIVILEGES,
                    &["Permission Denied - You're not an IRC operator"],
                );
                Ok(())
            }
            Slot::Handler(f) => f(self, source_uid, line),
        }
    }

    fn underargued(&mut self, source_uid: &str, status: Status, command: &str) {
        match status {
            Status::Server => {
                let text = format!("Dropping {command} from server: not enough parameters");
                self.sendto_realops(UserModes::DEBUG, &text);
            }
            _ => self.sendto_one_numeric(
                source_uid,
                Response::ERR_NEEDMOREPARAMS,
                &[command, "Not enough parameters"],
            ),
        }
    }
}
