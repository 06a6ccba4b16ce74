//! Server-to-server protocol: the link handshake, the burst, and the TS6
//! state messages UID/EUID, SID, SJOIN, BMASK, ENCAP, KILL, SQUIT.

use ferric_proto::{
    channel_check_name, match_mask, valid_nickname, valid_sid, valid_uid, Folded, Line, Response,
};
use tracing::{debug, info, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::channel::announce_join;
use crate::handlers::registry::ENCAP_HANDLER;
use crate::security::ban::ban_make;
use crate::state::channel::MaskList;
use crate::state::client::{Client, Status};
use crate::state::modes::{Capab, Caps, ChannelModes, ClientFlags, MemberFlags, UserModes};
use crate::state::Network;

/// Allowed wall-clock skew between linked servers, seconds.
const MAX_TS_DELTA: i64 = 300;

/// Batch size for member-mode change lines.
const MAX_MODE_PARAMS: usize = 4;

/// CAPAB from a linking peer: accumulate known tokens, ignore the rest.
pub fn mr_capab(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let tokens = line.arg(0).unwrap_or("").to_owned();
    if let Some(client) = net.client_mut(source) {
        for token in tokens.split_whitespace() {
            if let Some(cap) = Capab::find(token) {
                client.capab.set(cap);
            }
        }
    }
    Ok(())
}

/// SERVER from an unregistered connection: completes the TS6 handshake
/// staged by `PASS <pw> TS 6 <sid>` and establishes the link.
pub fn mr_server(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let name = line.arg(0).unwrap_or("").to_owned();
    let info = line.arg(2).unwrap_or("").to_owned();

    let ts6 = net
        .client(source)
        .and_then(|c| c.conn.as_ref())
        .and_then(|conn| conn.ts6_pass.clone());
    let Some((_password, sid)) = ts6 else {
        net.exit_client(source, "Non-TS server");
        return Ok(());
    };
    if !valid_sid(&sid) {
        net.exit_client(source, "Bogus server ID");
        return Ok(());
    }
    if net.sids.contains_key(&sid) {
        warn!(sid = %sid, name = %name, "SID collision on link");
        net.exit_client(source, "SID collision");
        return Ok(());
    }
    if net
        .clients
        .values()
        .any(|c| c.is_server() && ferric_proto::irc_eq(&c.name, &name))
    {
        net.exit_client(source, "Server name collision");
        return Ok(());
    }

    server_estab(net, source, &sid, &name, &info);
    Ok(())
}

/// Promote an unregistered connection to a server link and burst our
/// side of the network at it.
fn server_estab(net: &mut Network, old_uid: &str, sid: &str, name: &str, info: &str) {
    // Re-key the record under its SID.
    let Some(mut client) = net.clients.remove(old_uid) else {
        return;
    };
    client.uid = sid.to_owned();
    client.name = name.to_owned();
    client.info = info.to_owned();
    client.status = Status::Server;
    client.from = sid.to_owned();
    client.servptr = net.me.sid.clone();
    client.tsinfo = net.clock.sec_real;
    net.clients.insert(sid.to_owned(), client);

    net.local_clients.retain(|u| u != old_uid);
    net.local_servers.push(sid.to_owned());
    net.sids.insert(sid.to_owned(), sid.to_owned());

    info!(sid = %sid, name = %name, "server link established");

    // Our half of the handshake, then the burst.
    let tokens: Vec<&str> = Capab::our_tokens().collect();
    let capab = format!("CAPAB :{}", tokens.join(" "));
    net.sendto_one(sid, &capab);
    let server = format!("SERVER {} 1 :{}", net.me.name, net.me.info);
    net.sendto_one(sid, &server);
    let svinfo = format!(":{} SVINFO 6 6 0 :{}", net.me.sid, net.clock.sec_real);
    net.sendto_one(sid, &svinfo);

    burst_to(net, sid);
}

/// Send everything we know to a fresh link: servers, users, channels.
fn burst_to(net: &mut Network, link: &str) {
    let my_sid = net.me.sid.clone();

    let servers: Vec<(String, String, String)> = net
        .clients
        .values()
        .filter(|c| c.is_server() && c.uid != link && c.uid != my_sid)
        .map(|c| (c.uid.clone(), c.name.clone(), c.info.clone()))
        .collect();
    for (sid, name, info) in servers {
        let line = format!(":{my_sid} SID {name} 2 {sid} :{info}");
        net.sendto_one(link, &line);
    }

    let users: Vec<String> = net
        .clients
        .values()
        .filter(|c| c.is_client())
        .map(euid_line)
        .collect();
    for line in users {
        net.sendto_one(link, &line);
    }

    let channels: Vec<Folded> = net.channels.keys().map(|k| k.clone()).collect();
    for chan in channels {
        net.channel_send_modes(link, &chan);
    }
}

/// Render one EUID introduction for a user.
fn euid_line(client: &Client) -> String {
    let ip = if client.sockhost.is_empty() {
        "0"
    } else {
        client.sockhost.as_str()
    };
    let realhost = if client.realhost.is_empty() {
        client.host.as_str()
    } else {
        client.realhost.as_str()
    };
    format!(
        ":{} EUID {} 1 {} {} {} {} {} {} {} {} :{}",
        client.servptr,
        client.name,
        client.tsinfo,
        client.umodes.letters(),
        client.username,
        client.host,
        ip,
        client.uid,
        realhost,
        client.account,
        client.info
    )
}

/// SVINFO: TS version and clock agreement, or the link dies.
pub fn ms_svinfo(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    if line.arg(0) != Some("6") {
        net.exit_server(source, "Incompatible TS version");
        return Ok(());
    }
    let theirs: i64 = line.arg(3).and_then(|s| s.parse().ok()).unwrap_or(0);
    if theirs != 0 && (theirs - net.clock.sec_real).abs() > MAX_TS_DELTA {
        warn!(source, theirs, ours = net.clock.sec_real, "excessive TS delta");
        net.exit_server(source, "Excessive TS delta");
    }
    Ok(())
}

/// SID: a server behind our peer is introduced.
pub fn ms_sid(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let name = line.arg(0).unwrap_or("").to_owned();
    let sid = line.arg(2).unwrap_or("").to_owned();
    let info = line.arg(3).unwrap_or("").to_owned();

    if !valid_sid(&sid) {
        return Err(HandlerError::Dropped("bogus SID"));
    }
    if net.sids.contains_key(&sid) {
        let text = format!("Duplicate SID {sid} ({name}) introduced, dropping");
        net.sendto_realops(UserModes::DEBUG, &text);
        return Err(HandlerError::Dropped("duplicate SID"));
    }
    let (from, servptr) = match net.client(source) {
        Some(c) => (c.from.clone(), c.uid.clone()),
        None => return Ok(()),
    };

    let mut server = Client::new(sid.clone(), Status::Server);
    server.name = name;
    server.info = info;
    server.from = from.clone();
    server.servptr = servptr;
    server.tsinfo = net.clock.sec_real;
    net.clients.insert(sid.clone(), server);
    net.sids.insert(sid.clone(), sid.clone());

    net.sendto_server(Some(&from), Capab::empty(), Capab::empty(), &line.to_string());
    Ok(())
}

/// UID / EUID: a user behind a server is introduced. Nick conflicts are
/// settled by the TS rule before the record is created.
pub fn ms_uid(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let extended = line.params.len() >= 11;

    let nick = line.arg(0).unwrap_or("");
    let ts: i64 = line.arg(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    let umodes = line.arg(3).unwrap_or("+");
    let username = line.arg(4).unwrap_or("");
    let host = line.arg(5).unwrap_or("");
    let ip = line.arg(6).unwrap_or("0");
    let uid = line.arg(7).unwrap_or("");
    let (realhost, account, gecos) = if extended {
        (
            line.arg(8).unwrap_or(""),
            line.arg(9).unwrap_or("*"),
            line.arg(10).unwrap_or(""),
        )
    } else {
        ("", "*", line.arg(8).unwrap_or(""))
    };

    if !valid_uid(uid) || !valid_nickname(nick, false) {
        let text = format!("Dropping invalid UID introduction for {nick} ({uid})");
        net.sendto_realops(UserModes::DEBUG, &text);
        return Err(HandlerError::Dropped("invalid UID"));
    }
    let (arrived, servptr) = match net.client(source) {
        Some(c) if c.is_server() => (c.from.clone(), c.uid.clone()),
        _ => return Err(HandlerError::Dropped("UID from non-server")),
    };

    if net.clients.contains_key(uid) {
        // A duplicate UID is unresolvable: refuse the newcomer back
        // along the link that introduced it.
        let kill = format!(":{} KILL {} :Duplicate UID", net.me.sid, uid);
        net.sendto_one(&arrived, &kill);
        return Err(HandlerError::Dropped("duplicate UID"));
    }

    if let Some(holder) = net
        .nicks
        .get(Folded::new(nick).as_str())
        .map(String::to_owned)
    {
        let holder_ts = net.client(&holder).map(|c| c.tsinfo).unwrap_or(0);
        if ts > holder_ts {
            // Incoming is newer: refuse it back along its own link.
            let kill = format!(":{} KILL {} :Nick collision (newer nick)", net.me.sid, uid);
            net.sendto_one(&arrived, &kill);
            return Ok(());
        }
        if ts == holder_ts {
            net.kill_client(&holder, "Nick collision (same TS)");
            let kill = format!(":{} KILL {} :Nick collision (same TS)", net.me.sid, uid);
            net.sendto_one(&arrived, &kill);
            return Ok(());
        }
        net.kill_client(&holder, "Nick collision (older nick overruled)");
    }

    let mut client = Client::new(uid.to_owned(), Status::Client);
    client.name = nick.to_owned();
    client.username = username.to_owned();
    client.host = host.to_owned();
    client.realhost = if realhost.is_empty() {
        host.to_owned()
    } else {
        realhost.to_owned()
    };
    client.sockhost = if ip == "0" { String::new() } else { ip.to_owned() };
    client.ip = ip.parse().ok();
    client.info = gecos.to_owned();
    client.account = if account == "0" || account.is_empty() {
        "*".to_owned()
    } else {
        account.to_owned()
    };
    client.tsinfo = ts;
    client.umodes = UserModes::from_word(umodes);
    client.servptr = servptr;
    client.from = arrived.clone();
    net.clients.insert(uid.to_owned(), client);
    net.hash_add_client(uid);

    net.watch_check_hash(uid, Response::RPL_LOGON);

    net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &line.to_string());
    Ok(())
}

impl Network {
    /// The losing half of TS reconciliation: the channel's claimed age
    /// was beaten. Adopt the older TS, drop every local privilege and
    /// every parametered mode, and tell local members what happened.
    pub(crate) fn channel_ts_lost(&mut self, chan: &Folded, new_ts: i64) {
        let me = self.me.name.clone();
        let (display, removed_modes, removed_key, deops) = {
            let Some(channel) = self.channels.get_mut(chan.as_str()) else {
                return;
            };
            channel.creation_time = new_ts;

            let removed_modes = channel.modes.letters();
            channel.modes = ChannelModes::empty();
            let removed_key = std::mem::take(&mut channel.key);
            channel.limit = 0;
            channel.invites.clear();

            let mut deops: Vec<(char, String)> = Vec::new();
            let member_uids: Vec<String> = channel.members.keys().cloned().collect();
            for uid in &member_uids {
                let flags = channel.members.get_mut(uid).expect("key from same map");
                if flags.has(MemberFlags::CHANOP) {
                    deops.push(('o', uid.clone()));
                }
                if flags.has(MemberFlags::HALFOP) {
                    deops.push(('h', uid.clone()));
                }
                if flags.has(MemberFlags::VOICE) {
                    deops.push(('v', uid.clone()));
                }
                flags.strip_prefixes();
            }
            (channel.name.clone(), removed_modes, removed_key, deops)
        };

        // Simple-mode removal, one line.
        let mut letters = removed_modes;
        let mut params = String::new();
        if !removed_key.is_empty() {
            letters.push('k');
            params.push(' ');
            params.push_str(&removed_key);
        }
        if !letters.is_empty() {
            let line = format!(":{me} MODE {display} -{letters}{params}");
            self.sendto_channel_local(
                None,
                chan,
                MemberFlags::empty(),
                Caps::empty(),
                Caps::empty(),
                &line,
            );
        }

        // De-prefix lines, batched, with nicks rather than UIDs.
        for batch in deops.chunks(MAX_MODE_PARAMS) {
            let mut letters = String::from("-");
            let mut names = String::new();
            for (c, uid) in batch {
                letters.push(*c);
                names.push(' ');
                names.push_str(&self.display_name(uid));
            }
            let line = format!(":{me} MODE {display} {letters}{names}");
            self.sendto_channel_local(
                None,
                chan,
                MemberFlags::empty(),
                Caps::empty(),
                Caps::empty(),
                &line,
            );
        }
    }
}

/// Parse an SJOIN mode word and its parameters.
fn parse_sjoin_modes(word: &str, params: &[&str]) -> (ChannelModes, String, usize) {
    let mut modes = ChannelModes::empty();
    let mut key = String::new();
    let mut limit = 0usize;
    let mut idx = 0;

    for c in word.chars() {
        match c {
            '+' => {}
            'k' => {
                if let Some(k) = params.get(idx) {
                    key = (*k).to_owned();
                    idx += 1;
                }
            }
            'l' => {
                if let Some(l) = params.get(idx) {
                    limit = l.parse().unwrap_or(0);
                    idx += 1;
                }
            }
            _ => {
                if let Some(m) = ChannelModes::from_letter(c) {
                    modes.set(m);
                }
            }
        }
    }
    (modes, key, limit)
}

/// SJOIN: the sole authority for channel state propagation.
pub fn ms_sjoin(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let Some(src) = net.client(source) else {
        return Ok(());
    };
    if !src.is_server() {
        return Err(HandlerError::Dropped("SJOIN from non-server"));
    }
    let arrived = src.from.clone();

    let ts: i64 = match line.arg(0).and_then(|s| s.parse().ok()) {
        Some(ts) => ts,
        None => return Err(HandlerError::Dropped("bad SJOIN TS")),
    };
    let name = line.arg(1).unwrap_or("");
    if !channel_check_name(name, false) {
        return Err(HandlerError::Dropped("bad SJOIN channel name"));
    }
    let mode_word = line.arg(2).unwrap_or("+").to_owned();
    let last = line.params.len() - 1;
    let mode_params: Vec<&str> = line.params[3..last].iter().map(String::as_str).collect();
    let member_word = line.params[last].clone();

    let (inc_modes, inc_key, inc_limit) = parse_sjoin_modes(&mode_word, &mode_params);

    let fold = Folded::new(name);
    let newly = !net.channels.contains_key(fold.as_str());
    if newly {
        net.channel_make(name);
        if let Some(channel) = net.channel_mut(&fold) {
            channel.creation_time = ts;
        }
    }

    let local_ts = net.channel(&fold).map(|c| c.creation_time).unwrap_or(ts);
    let keep_new_modes = newly || ts <= local_ts;
    let me = net.me.name.clone();
    let chan_name = net.channel(&fold).map(|c| c.name.clone()).unwrap_or_default();

    if newly {
        if let Some(channel) = net.channel_mut(&fold) {
            channel.modes = inc_modes;
            channel.key = inc_key.clone();
            channel.limit = inc_limit;
        }
    } else if ts < local_ts {
        // Incoming is older: it wins outright.
        debug!(channel = %chan_name, ts, local_ts, "SJOIN: remote TS wins, resetting state");
        net.channel_ts_lost(&fold, ts);
        if let Some(channel) = net.channel_mut(&fold) {
            channel.modes = inc_modes;
            channel.key = inc_key.clone();
            channel.limit = inc_limit;
        }
        let added = {
            let channel = net.channel(&fold).expect("created above");
            channel.modes_string(true)
        };
        if added != "+" {
            let line = format!(":{me} MODE {chan_name} {added}");
            net.sendto_channel_local(
                None,
                &fold,
                MemberFlags::empty(),
                Caps::empty(),
                Caps::empty(),
                &line,
            );
        }
    } else if ts == local_ts {
        // Same age: union of simple modes, local key and limit kept.
        let (diff_letters, diff_params) = {
            let Some(channel) = net.channel_mut(&fold) else {
                return Ok(());
            };
            let mut letters = String::new();
            let mut params = String::new();
            for c in inc_modes.letters().chars() {
                let m = ChannelModes::from_letter(c).expect("letter from table");
                if !channel.modes.has(m) {
                    letters.push(c);
                }
            }
            channel.modes.union(inc_modes);
            if channel.key.is_empty() && !inc_key.is_empty() {
                channel.key = inc_key.clone();
                letters.push('k');
                params.push(' ');
                params.push_str(&inc_key);
            }
            if channel.limit == 0 && inc_limit != 0 {
                channel.limit = inc_limit;
                letters.push('l');
                params.push(' ');
                params.push_str(&inc_limit.to_string());
            }
            (letters, params)
        };
        if !diff_letters.is_empty() {
            let line = format!(":{me} MODE {chan_name} +{diff_letters}{diff_params}");
            net.sendto_channel_local(
                None,
                &fold,
                MemberFlags::empty(),
                Caps::empty(),
                Caps::empty(),
                &line,
            );
        }
    }
    // ts > local_ts: their modes are discarded entirely.

    // Membership merge.
    let mut accepted: Vec<String> = Vec::new();
    let mut granted: Vec<(char, String)> = Vec::new();
    for token in member_word.split_whitespace() {
        let mut flags = MemberFlags::empty();
        let mut rest = token;
        while let Some(c) = rest.chars().next() {
            match MemberFlags::from_prefix_char(c) {
                Some(f) => {
                    flags.set(f);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        let uid = rest;
        if net.client(uid).is_none() {
            debug!(uid, channel = %chan_name, "SJOIN names unknown UID, skipping");
            continue;
        }

        if !keep_new_modes {
            flags = MemberFlags::empty();
        }

        if net.channel(&fold).is_some_and(|c| !c.is_member(uid)) {
            net.add_user_to_channel(&fold, uid, flags, false);
            announce_join(net, &fold, uid);
            if flags.has(MemberFlags::CHANOP) {
                granted.push(('o', uid.to_owned()));
            }
            if flags.has(MemberFlags::HALFOP) {
                granted.push(('h', uid.to_owned()));
            }
            if flags.has(MemberFlags::VOICE) {
                granted.push(('v', uid.to_owned()));
            }
        }

        // Render from the membership as it now stands, so downstream
        // servers never hear a prefix we refused.
        let applied = net
            .channel(&fold)
            .and_then(|c| c.member(uid))
            .unwrap_or_default();
        let mut rendered = applied.status(true);
        rendered.push_str(uid);
        accepted.push(rendered);
    }

    // Announce granted prefixes to local members, batched.
    for batch in granted.chunks(MAX_MODE_PARAMS) {
        let mut letters = String::from("+");
        let mut names = String::new();
        for (c, uid) in batch {
            letters.push(*c);
            names.push(' ');
            names.push_str(&net.display_name(uid));
        }
        let line = format!(":{me} MODE {chan_name} {letters}{names}");
        net.sendto_channel_local(
            None,
            &fold,
            MemberFlags::empty(),
            Caps::empty(),
            Caps::empty(),
            &line,
        );
    }

    // Propagate with the state as accepted.
    if !accepted.is_empty() {
        let final_ts = net.channel(&fold).map(|c| c.creation_time).unwrap_or(ts);
        let mode_part = if keep_new_modes {
            net.channel(&fold)
                .map(|c| c.modes_string(true))
                .unwrap_or_else(|| "+".to_owned())
        } else {
            "+".to_owned()
        };
        let prop = format!(
            ":{source} SJOIN {final_ts} {chan_name} {mode_part} :{}",
            accepted.join(" ")
        );
        net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &prop);
    }

    Ok(())
}

/// BMASK: burst batches of ban/except/invex masks. No TS arbitration;
/// the lists merge.
pub fn ms_bmask(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let name = line.arg(1).unwrap_or("");
    let which = match line.arg(2) {
        Some("b") => MaskList::Ban,
        Some("e") => MaskList::Except,
        Some("I") => MaskList::Invex,
        _ => return Err(HandlerError::Dropped("unknown BMASK list")),
    };
    let masks = line.arg(3).unwrap_or("").to_owned();

    let fold = Folded::new(name);
    if net.channel(&fold).is_none() {
        return Err(HandlerError::Dropped("BMASK for unknown channel"));
    }
    let setter = net
        .client(source)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| net.me.name.clone());
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();
    let now = net.clock.sec_real;

    let mut touched = false;
    if let Some(channel) = net.channel_mut(&fold) {
        for mask in masks.split_whitespace() {
            let list = channel.mask_list_mut(which);
            if list.iter().any(|b| ferric_proto::irc_eq(&b.mask, mask)) {
                continue;
            }
            list.push(ban_make(mask, &setter, now));
            touched = true;
        }
        if touched && !matches!(which, MaskList::Invex) {
            channel.invalidate_ban_cache();
        }
    }

    net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &line.to_string());
    Ok(())
}

/// ENCAP: propagate everywhere, and execute the subcommand's ENCAP slot
/// if the target mask covers us.
pub fn ms_encap(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target_mask = line.arg(0).unwrap_or("").to_owned();
    let sub = line.arg(1).unwrap_or("").to_ascii_uppercase();
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();

    net.sendto_server(Some(&arrived), Capab::ENCAP, Capab::empty(), &line.to_string());

    if !match_mask(&target_mask, &net.me.name) {
        return Ok(());
    }
    let Some(entry) = net.registry.find(&sub) else {
        return Err(HandlerError::Dropped("unknown ENCAP subcommand"));
    };

    let inner = Line {
        tags: None,
        prefix: line.prefix.clone(),
        command: sub,
        params: line.params[2..].to_vec(),
    };
    if inner.params.len() < entry.args_min {
        return Err(HandlerError::Dropped("underargued ENCAP subcommand"));
    }
    net.run_slot(entry.handlers[ENCAP_HANDLER], source, &inner)
}

/// KILL relayed by a server.
pub fn ms_kill(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target_ref = line.arg(0).unwrap_or("");
    let reason = line.arg(1).unwrap_or("Killed").to_owned();

    let Some(target) = net.find_person(target_ref) else {
        return Err(HandlerError::Dropped("KILL for unknown target"));
    };
    let target_uid = target.uid.clone();
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();

    let prop = format!(":{source} KILL {target_uid} :{reason}");
    net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &prop);

    if let Some(client) = net.client_mut(&target_uid) {
        client.flags.set(ClientFlags::KILLED);
    }
    net.exit_client(&target_uid, &format!("Killed ({reason})"));
    Ok(())
}

/// KILL from a local operator.
pub fn mo_kill(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target_ref = line.arg(0).unwrap_or("");
    let reason = line.arg(1).unwrap_or("No reason").to_owned();

    let Some(target) = net.find_person(target_ref) else {
        net.sendto_one_numeric(source, Response::ERR_NOSUCHNICK, &[target_ref, "No such nick"]);
        return Ok(());
    };
    let target_uid = target.uid.clone();
    let oper_name = net.display_name(source);

    let full = format!("Killed ({oper_name} ({reason}))");
    let prop = format!(":{source} KILL {target_uid} :{full}");
    net.sendto_server(None, Capab::empty(), Capab::empty(), &prop);

    if let Some(client) = net.client_mut(&target_uid) {
        client.flags.set(ClientFlags::KILLED);
    }
    net.exit_client(&target_uid, &full);
    Ok(())
}

/// SQUIT: a server (and its whole subtree) leaves the network.
pub fn ms_squit(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target_ref = line.arg(0).unwrap_or("");
    let reason = line.arg(1).unwrap_or("Remote SQUIT").to_owned();

    let target = net
        .clients
        .values()
        .find(|c| {
            c.is_server() && (c.uid == target_ref || ferric_proto::irc_eq(&c.name, target_ref))
        })
        .map(|c| c.uid.clone());
    let Some(target_sid) = target else {
        return Err(HandlerError::Dropped("SQUIT for unknown server"));
    };
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();

    let prop = format!(":{source} SQUIT {target_sid} :{reason}");
    net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &prop);

    net.exit_server(&target_sid, &reason);
    Ok(())
}
