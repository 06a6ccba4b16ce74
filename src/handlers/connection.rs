//! Connection upkeep and the client registration state machine.
//!
//! A connection starts UNREGISTERED and becomes a CLIENT once NICK and
//! USER have both arrived and any CAP negotiation was closed with
//! `CAP END`. Server links take the other exit from UNREGISTERED; that
//! path lives in [`crate::handlers::server`].

use ferric_proto::validation::{REAL_LEN, USER_LEN};
use ferric_proto::{truncate_bytes, valid_nickname, Folded, Line, Response};
use tracing::{debug, info};

use crate::error::HandlerResult;
use crate::state::client::Status;
use crate::state::modes::Caps;
use crate::state::Network;

/// NICK before registration: collect the name and try to finish.
pub fn mr_nick(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
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
    if net.nicks.contains_key(Folded::new(nick).as_str()) {
        net.sendto_one_numeric(
            source,
            Response::ERR_NICKNAMEINUSE,
            &[nick, "Nickname is already in use"],
        );
        return Ok(());
    }

    if let Some(client) = net.client_mut(source) {
        client.name = nick.to_owned();
        if let Some(conn) = client.conn.as_mut() {
            conn.got_nick = true;
        }
    }
    try_register(net, source);
    Ok(())
}

/// USER before registration: collect ident and GECOS.
pub fn mr_user(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let username = line.arg(0).unwrap_or("");
    let realname = line.arg(3).unwrap_or("");

    if let Some(client) = net.client_mut(source) {
        client.username = truncate_bytes(username, USER_LEN).to_owned();
        client.info = truncate_bytes(realname, REAL_LEN).to_owned();
        if let Some(conn) = client.conn.as_mut() {
            conn.got_user = true;
        }
    }
    try_register(net, source);
    Ok(())
}

/// PASS before registration. The plain form stores the password for the
/// auth collaborator; the TS6 form (`PASS <pw> TS 6 <sid>`) additionally
/// stages a server handshake.
pub fn mr_pass(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let password = line.arg(0).unwrap_or("").to_owned();
    let ts6 = match (line.arg(1), line.arg(2), line.arg(3)) {
        (Some(ts), Some("6"), Some(sid)) if ts.eq_ignore_ascii_case("TS") => {
            Some((password.clone(), sid.to_owned()))
        }
        _ => None,
    };

    if let Some(conn) = net.client_mut(source).and_then(|c| c.conn.as_mut()) {
        conn.password = Some(password);
        conn.ts6_pass = ts6;
    }
    Ok(())
}

/// CAP negotiation: LS, LIST, REQ, END. Opening negotiation holds
/// registration until END.
pub fn m_cap(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let sub = line.arg(0).unwrap_or("").to_ascii_uppercase();
    let nick = net.display_name(source);
    let me = net.me.name.clone();

    match sub.as_str() {
        "LS" => {
            if let Some(client) = net.client_mut(source) {
                let registered = client.is_client();
                if let Some(conn) = client.conn.as_mut() {
                    if !registered {
                        conn.cap_negotiating = true;
                    }
                }
            }
            let tokens: Vec<&str> = Caps::all_tokens().collect();
            let reply = format!(":{me} CAP {nick} LS :{}", tokens.join(" "));
            net.sendto_one(source, &reply);
        }
        "LIST" => {
            let tokens = net
                .client(source)
                .map(|c| c.caps.tokens().join(" "))
                .unwrap_or_default();
            let reply = format!(":{me} CAP {nick} LIST :{tokens}");
            net.sendto_one(source, &reply);
        }
        "REQ" => {
            let request = line.arg(1).unwrap_or("");
            let mut adds = Caps::empty();
            let mut dels = Caps::empty();
            let mut ok = true;
            for token in request.split_whitespace() {
                let (neg, name) = match token.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, token),
                };
                match Caps::find(name) {
                    Some(cap) if neg => dels.set(cap),
                    Some(cap) => adds.set(cap),
                    None => {
                        ok = false;
                        break;
                    }
                }
            }

            if let Some(client) = net.client_mut(source) {
                if ok {
                    client.caps.set(adds);
                    client.caps.clear(dels);
                }
                let registered = client.is_client();
                if let Some(conn) = client.conn.as_mut() {
                    if !registered {
                        conn.cap_negotiating = true;
                    }
                }
            }
            let verb = if ok { "ACK" } else { "NAK" };
            let reply = format!(":{me} CAP {nick} {verb} :{request}");
            net.sendto_one(source, &reply);
        }
        "END" => {
            if let Some(conn) = net.client_mut(source).and_then(|c| c.conn.as_mut()) {
                conn.cap_negotiating = false;
            }
            try_register(net, source);
        }
        _ => debug!(sub = %sub, "unknown CAP subcommand"),
    }
    Ok(())
}

/// Complete registration when NICK, USER and CAP are all settled.
pub fn try_register(net: &mut Network, source: &str) {
    let ready = net
        .client(source)
        .and_then(|c| c.conn.as_ref().map(|conn| (c, conn)))
        .is_some_and(|(c, conn)| {
            c.is_unknown() && conn.got_nick && conn.got_user && !conn.cap_negotiating
        });
    if ready {
        register_local_user(net, source);
    }
}

/// The UNREGISTERED → CLIENT transition: index the nick, stamp the TS,
/// greet, introduce to the network and fire watch LOGON.
pub fn register_local_user(net: &mut Network, uid: &str) {
    let (nick, nuh, intro) = {
        let sid = net.me.sid.clone();
        let now_real = net.clock.sec_real;
        let Some(client) = net.client_mut(uid) else { return };
        client.status = Status::Client;
        client.tsinfo = now_real;
        client.servptr = sid.clone();
        if client.host.is_empty() {
            client.host = client.sockhost.clone();
            client.realhost = client.sockhost.clone();
        }
        let intro = format!(
            ":{} UID {} 1 {} {} {} {} {} {} :{}",
            sid,
            client.name,
            client.tsinfo,
            client.umodes.letters(),
            client.username,
            client.host,
            if client.sockhost.is_empty() { "0" } else { client.sockhost.as_str() },
            client.uid,
            client.info
        );
        (client.name.clone(), client.nuh(), intro)
    };

    net.hash_add_client(uid);
    info!(uid, nick = %nick, "client registered");

    let network = net.config.server.network_description.clone();
    let welcome = format!("Welcome to the {network} Internet Relay Chat Network {nuh}");
    net.sendto_one_numeric(uid, Response::RPL_WELCOME, &[&welcome]);

    net.sendto_server(None, crate::state::modes::Capab::empty(), crate::state::modes::Capab::empty(), &intro);
    net.watch_check_hash(uid, Response::RPL_LOGON);
}

/// QUIT from a local user or an unregistered connection.
pub fn m_quit(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let reason = line.arg(0).unwrap_or("");
    let comment = {
        let age_ok = net
            .client(source)
            .and_then(|c| c.conn.as_ref())
            .is_some_and(|conn| {
                conn.created_monotonic + net.config.general.anti_spam_exit_message_time
                    <= net.clock.sec_monotonic
            });
        if !reason.is_empty() && age_ok {
            format!("Quit: {reason}")
        } else {
            "Client Quit".to_owned()
        }
    };
    net.exit_client(source, &comment);
    Ok(())
}

/// QUIT for a remote client, relayed by a server.
pub fn ms_quit(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let reason = line.arg(0).unwrap_or("Client Quit").to_owned();
    net.exit_client(source, &reason);
    Ok(())
}

/// PING: answer with our PONG.
pub fn m_ping(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let origin = line.arg(0).unwrap_or("");
    let me = net.me.name.clone();
    let reply = format!(":{me} PONG {me} :{origin}");
    net.sendto_one(source, &reply);
    Ok(())
}

/// PONG: nothing beyond the idle-time refresh done by the dispatcher.
pub fn m_pong(_net: &mut Network, _source: &str, _line: &Line) -> HandlerResult {
    Ok(())
}

/// ERROR from a link or an unregistered connection: close it.
pub fn mr_error(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let text = line.arg(0).unwrap_or("");
    debug!(source, text, "ERROR received");
    let is_server = net.client(source).is_some_and(|c| c.is_server());
    if is_server {
        net.exit_server(source, "ERROR received");
    } else {
        net.exit_client(source, "ERROR received");
    }
    Ok(())
}
