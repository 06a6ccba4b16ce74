//! Nick changes and TS collision policy.
//!
//! A nick change is the one rename in the system and it must be atomic
//! against the nick index: remove-old, assign, insert-new, with watch
//! LOGOFF/LOGON around it. Collisions between servers are settled by the
//! TS rule: the older nick (lower TS) survives, ties kill both sides.

use ferric_proto::{valid_nickname, Folded, Line, Response};
use tracing::debug;

use crate::error::HandlerResult;
use crate::state::modes::{Capab, Caps};
use crate::state::Network;

impl Network {
    /// Kill a client network-wide: a KILL toward the peers, a QUIT at
    /// home.
    pub fn kill_client(&mut self, uid: &str, reason: &str) {
        let from = self.client(uid).map(|c| c.from.clone());
        let line = format!(":{} KILL {} :{}", self.me.sid, uid, reason);
        self.sendto_server(from.as_deref(), Capab::empty(), Capab::empty(), &line);
        if let Some(client) = self.client_mut(uid) {
            client.flags.set(crate::state::modes::ClientFlags::KILLED);
        }
        self.exit_client(uid, reason);
    }

    /// The common rename: retime, recache, announce, rehash, re-watch.
    /// `except` suppresses propagation toward the link a remote change
    /// arrived on.
    pub(crate) fn change_nick(
        &mut self,
        uid: &str,
        new_nick: &str,
        new_ts: i64,
        except: Option<&str>,
    ) {
        let (old_nuh, old_name) = match self.client(uid) {
            Some(c) => (c.nuh(), c.name.clone()),
            None => return,
        };
        debug!(uid, from = %old_name, to = %new_nick, "nick change");

        if let Some(client) = self.client_mut(uid) {
            client.tsinfo = new_ts;
        }
        self.clear_ban_cache_on_channels(uid);
        self.watch_check_hash(uid, Response::RPL_LOGOFF);

        let line = format!(":{old_nuh} NICK :{new_nick}");
        self.sendto_common_channels_local(uid, true, Caps::empty(), Caps::empty(), &line);

        self.whowas_add_history(uid);

        let prop = format!(":{uid} NICK {new_nick} :{new_ts}");
        self.sendto_server(except, Capab::empty(), Capab::empty(), &prop);

        self.hash_del_client(uid);
        if let Some(client) = self.client_mut(uid) {
            client.name = new_nick.to_owned();
        }
        self.hash_add_client(uid);

        self.watch_check_hash(uid, Response::RPL_LOGON);
    }

    /// TS collision between an established nick holder and a newcomer.
    /// Returns whether the newcomer may proceed; the loser (or both, on a
    /// tie) is killed here.
    pub(crate) fn resolve_collision(
        &mut self,
        existing_uid: &str,
        incoming_uid: &str,
        incoming_ts: i64,
    ) -> bool {
        let existing_ts = match self.client(existing_uid) {
            Some(c) => c.tsinfo,
            None => return true,
        };

        if incoming_ts < existing_ts {
            self.kill_client(existing_uid, "Nick collision (older nick overruled)");
            true
        } else if incoming_ts > existing_ts {
            self.kill_client(incoming_uid, "Nick collision (newer nick)");
            false
        } else {
            self.kill_client(existing_uid, "Nick collision (same TS)");
            self.kill_client(incoming_uid, "Nick collision (same TS)");
            false
        }
    }
}

/// NICK from a registered local client.
pub fn m_nick(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let nick = line.arg(0).unwrap_or("");
    if nick.is_empty() {
        net.sendto_one_numeric(source, Response::ERR_NONICKNAMEGIVEN, &["No nickname given"]);
        return Ok(());
    }
    if !valid_nickname(nick, true) {
        net.sendto_one_numeric(
            source,
            Response::ERR_ERRONEUSNICKNAME,
            &[nick, "Erroneous nickname"],
        );
        return Ok(());
    }

    let current = net.client(source).map(|c| c.name.clone()).unwrap_or_default();
    if current == nick {
        return Ok(());
    }

    if let Some(holder) = net.nicks.get(Folded::new(nick).as_str()) {
        if holder != source {
            net.sendto_one_numeric(
                source,
                Response::ERR_NICKNAMEINUSE,
                &[nick, "Nickname is already in use"],
            );
            return Ok(());
        }
        // Same client, different casing: plain rename.
    }

    let now = net.clock.sec_real;
    net.change_nick(source, nick, now, None);
    Ok(())
}

/// NICK from a server: a remote client changing nick, with its new TS.
pub fn ms_nick(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let Some(client) = net.client(source) else {
        return Ok(());
    };
    if client.is_server() {
        // TS5-style introductions are not accepted; peers speak UID.
        return Err(crate::error::HandlerError::Dropped("NICK from server"));
    }
    let arrived = client.from.clone();

    let nick = line.arg(0).unwrap_or("");
    if !valid_nickname(nick, false) {
        return Err(crate::error::HandlerError::Dropped("invalid remote nick"));
    }
    let ts: i64 = line.arg(1).and_then(|s| s.parse().ok()).unwrap_or(0);

    if let Some(holder) = net
        .nicks
        .get(Folded::new(nick).as_str())
        .map(String::to_owned)
    {
        if holder != source && !net.resolve_collision(&holder, source, ts) {
            return Ok(());
        }
        if net.client(source).is_none() {
            // Lost a same-TS collision; nothing left to rename.
            return Ok(());
        }
    }

    net.change_nick(source, nick, ts, Some(&arrived));
    Ok(())
}
