//! WHOIS reply assembly.
//!
//! The reply order is fixed and visibility-gated line by line: user,
//! channels, server, registration, account, away, caller-id, operator,
//! service tags, gateway, modes and actual host, TLS, certificate,
//! idle. Remote queries are paced for non-opers.

use ferric_proto::{Folded, Line, Response, LINE_MAX};

use crate::channel_engine::frame_lines;
use crate::error::HandlerResult;
use crate::state::modes::UserModes;
use crate::state::Network;

/// WHOIS from a local client; remote targets are paced.
pub fn m_whois(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let first = line.arg(0).unwrap_or("");
    if first.is_empty() {
        net.sendto_one_numeric(source, Response::ERR_NONICKNAMEGIVEN, &["No nickname given"]);
        return Ok(());
    }

    if line.params.len() > 1 && !line.arg(1).unwrap_or("").is_empty() {
        let now = net.clock.sec_monotonic;
        if net.whois_last_used + net.config.general.pace_wait_simple > now {
            net.sendto_one_numeric(
                source,
                Response::RPL_LOAD2HI,
                &["WHOIS", "This command could not be completed because it has been used recently, and is rate-limited"],
            );
            return Ok(());
        }
        net.whois_last_used = now;

        let hunt_target = if net.config.general.disable_remote_commands {
            line.arg(1).unwrap_or("")
        } else {
            first
        };
        if hunt(net, source, hunt_target, line.arg(1).unwrap_or("")) {
            return Ok(());
        }
        do_whois(net, source, &line.arg(1).unwrap_or("").to_owned());
        return Ok(());
    }

    do_whois(net, source, &first.to_owned());
    Ok(())
}

/// WHOIS for opers and remote sources: no pacing.
pub fn mo_whois(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let first = line.arg(0).unwrap_or("");
    if first.is_empty() {
        net.sendto_one_numeric(source, Response::ERR_NONICKNAMEGIVEN, &["No nickname given"]);
        return Ok(());
    }

    if line.params.len() > 1 && !line.arg(1).unwrap_or("").is_empty() {
        if hunt(net, source, first, line.arg(1).unwrap_or("")) {
            return Ok(());
        }
        do_whois(net, source, &line.arg(1).unwrap_or("").to_owned());
        return Ok(());
    }

    do_whois(net, source, &first.to_owned());
    Ok(())
}

/// Route a remote WHOIS toward the server named (or hosting) `place`.
/// Returns true when the query left this server.
fn hunt(net: &mut Network, source: &str, place: &str, nick: &str) -> bool {
    if ferric_proto::irc_eq(place, &net.me.name) || place == net.me.sid {
        return false;
    }

    let via = net
        .clients
        .values()
        .find(|c| c.is_server() && (ferric_proto::irc_eq(&c.name, place) || c.uid == place))
        .map(|c| (c.uid.clone(), c.from.clone()))
        .or_else(|| {
            net.find_person(place)
                .filter(|p| !p.my_connect())
                .map(|p| (p.servptr.clone(), p.from.clone()))
        });

    match via {
        Some((sid, from)) => {
            let fwd = format!(":{source} WHOIS {sid} :{nick}");
            net.sendto_one(&from, &fwd);
            true
        }
        None => {
            if net.find_person(place).is_some() {
                // Local user named directly: answer here.
                false
            } else {
                net.sendto_one_numeric(
                    source,
                    Response::ERR_NOSUCHSERVER,
                    &[place, "No such server"],
                );
                true
            }
        }
    }
}

fn do_whois(net: &mut Network, source: &str, name: &str) {
    match net.find_person(name).map(|c| c.uid.clone()) {
        Some(target) => whois_person(net, source, &target),
        None => {
            net.sendto_one_numeric(source, Response::ERR_NOSUCHNICK, &[name, "No such nick"]);
        }
    }
    net.sendto_one_numeric(source, Response::RPL_ENDOFWHOIS, &[name, "End of /WHOIS list"]);
}

fn whois_person(net: &mut Network, source: &str, target: &str) {
    struct Snapshot {
        nick: String,
        username: String,
        host: String,
        realhost: String,
        sockhost: String,
        info: String,
        account: String,
        away: String,
        certfp: String,
        umodes: UserModes,
        is_service: bool,
        local: bool,
        idle: Option<(u64, i64)>,
        channels: Vec<Folded>,
        svstags: Vec<(u16, UserModes, String)>,
        server_name: String,
        server_info: String,
    }

    let (snap, src_oper, src_is_target) = {
        let Some(t) = net.client(target) else { return };
        let Some(s) = net.client(source) else { return };
        let server_name = net.server_name_of(t);
        let server_info = net
            .clients
            .values()
            .find(|c| c.is_server() && c.name == server_name)
            .map(|c| c.info.clone())
            .unwrap_or_else(|| net.me.info.clone());
        (
            Snapshot {
                nick: t.name.clone(),
                username: t.username.clone(),
                host: t.host.clone(),
                realhost: t.realhost.clone(),
                sockhost: t.sockhost.clone(),
                info: t.info.clone(),
                account: t.account.clone(),
                away: t.away.clone(),
                certfp: t.certfp.clone(),
                umodes: t.umodes,
                is_service: t.is_service(),
                local: t.my_connect(),
                idle: t.conn.as_ref().map(|conn| {
                    (
                        net.clock.sec_monotonic.saturating_sub(conn.last_active),
                        conn.created_real,
                    )
                }),
                channels: t.channels.iter().cloned().collect(),
                svstags: t
                    .svstags
                    .iter()
                    .map(|tag| (tag.numeric, tag.umodes, tag.tag.clone()))
                    .collect(),
                server_name,
                server_info,
            },
            s.umodes.has(UserModes::OPER),
            s.uid == *target,
        )
    };

    net.sendto_one_numeric(
        source,
        Response::RPL_WHOISUSER,
        &[&snap.nick, &snap.username, &snap.host, "*", &snap.info],
    );

    // Channel list, framed like NAMES.
    let mut items: Vec<String> = Vec::new();
    for chan in &snap.channels {
        let Some(channel) = net.channel(chan) else { continue };
        let public_shown = channel.is_public() && !snap.umodes.has(UserModes::HIDECHANS);
        let requester_in = src_is_target || channel.is_member(source);
        let show = if public_shown || requester_in {
            1
        } else if src_oper {
            2
        } else {
            0
        };
        if show == 0 {
            continue;
        }
        let status = channel.member(target).map(|f| f.status(true)).unwrap_or_default();
        let marker = if show == 2 { "~" } else { "" };
        items.push(format!("{}{}{}", marker, status, channel.name));
    }
    if !items.is_empty() {
        let snick = net.display_name(source);
        let header = format!(":{} 319 {} {} :", net.me.name, snick, snap.nick);
        for line in frame_lines(&header, &items, LINE_MAX - 2) {
            net.sendto_route(source, &line);
        }
    }

    if net.config.server.hide_servers && !(src_oper || src_is_target) {
        let hidden = net.config.server.hidden_name.clone();
        let netdesc = net.config.server.network_description.clone();
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISSERVER,
            &[&snap.nick, &hidden, &netdesc],
        );
    } else {
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISSERVER,
            &[&snap.nick, &snap.server_name, &snap.server_info],
        );
    }

    if snap.umodes.has(UserModes::REGISTERED) {
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISREGNICK,
            &[&snap.nick, "has identified for this nick"],
        );
    }
    if snap.account != "*" {
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISACCOUNT,
            &[&snap.nick, &snap.account, "is logged in as"],
        );
    }
    if !snap.away.is_empty() {
        net.sendto_one_numeric(source, Response::RPL_AWAY, &[&snap.nick, &snap.away]);
    }

    if snap.umodes.has(UserModes::CALLERID) || snap.umodes.has(UserModes::SOFTCALLERID) {
        let hard = snap.umodes.has(UserModes::CALLERID);
        net.sendto_one_numeric(
            source,
            Response::RPL_TARGUMODEG,
            &[
                &snap.nick,
                if hard { "+g" } else { "+G" },
                if hard {
                    "server side ignore"
                } else {
                    "server side ignore with the exception of common channels"
                },
            ],
        );
    }

    if (snap.umodes.has(UserModes::OPER) || snap.is_service)
        && (!snap.umodes.has(UserModes::HIDDEN) || src_oper)
    {
        let overridden = snap
            .svstags
            .first()
            .is_some_and(|(numeric, _, _)| *numeric == Response::RPL_WHOISOPERATOR.code());
        if !overridden {
            let text = if snap.is_service {
                "is a Network Service"
            } else if snap.umodes.has(UserModes::ADMIN) {
                "is a Server Administrator"
            } else {
                "is an IRC Operator"
            };
            net.sendto_one_numeric(source, Response::RPL_WHOISOPERATOR, &[&snap.nick, text]);
        }
    }

    let src_umodes = net.client(source).map(|c| c.umodes).unwrap_or_default();
    for (numeric, gate, text) in &snap.svstags {
        if *numeric == Response::RPL_WHOISOPERATOR.code()
            && snap.umodes.has(UserModes::HIDDEN)
            && !src_oper
        {
            continue;
        }
        if *gate != UserModes::empty() && !src_umodes.has(*gate) {
            continue;
        }
        let snick = net.display_name(source);
        let raw = format!(":{} {:03} {} {} :{}", net.me.name, numeric, snick, snap.nick, text);
        net.sendto_route(source, &raw);
    }

    if snap.umodes.has(UserModes::WEBIRC) {
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISTEXT,
            &[&snap.nick, "User connected using a webirc gateway"],
        );
    }

    if src_oper || src_is_target {
        let modes = snap.umodes.letters();
        net.sendto_one_numeric(source, Response::RPL_WHOISMODES, &[&snap.nick, &modes]);
        let userhost = format!("{}@{}", snap.username, snap.realhost);
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISACTUALLY,
            &[&snap.nick, &userhost, &snap.sockhost, "Actual user@host, Actual IP"],
        );
    }

    if snap.umodes.has(UserModes::SECURE) {
        net.sendto_one_numeric(
            source,
            Response::RPL_WHOISSECURE,
            &[&snap.nick, "is using a secure connection"],
        );
    }
    if !snap.certfp.is_empty() && (src_oper || src_is_target) {
        let text = format!("has client certificate fingerprint {}", snap.certfp);
        net.sendto_one_numeric(source, Response::RPL_WHOISCERTFP, &[&snap.nick, &text]);
    }

    if snap.local && (!snap.umodes.has(UserModes::HIDEIDLE) || src_oper || src_is_target) {
        if let Some((idle, signon)) = snap.idle {
            let idle = idle.to_string();
            let signon = signon.to_string();
            net.sendto_one_numeric(
                source,
                Response::RPL_WHOISIDLE,
                &[&snap.nick, &idle, &signon, "seconds idle, signon time"],
            );
        }
    }

    if snap.umodes.has(UserModes::SPY) && !src_is_target {
        let (snick, suser, shost, sserver) = {
            let Some(s) = net.client(source) else { return };
            (
                s.name.clone(),
                s.username.clone(),
                s.host.clone(),
                net.server_name_of(s),
            )
        };
        let text = format!(
            ":*** Notice -- {snick} ({suser}@{shost}) [{sserver}] is doing a /whois on you"
        );
        net.sendto_one_notice(target, &text);
    }
}
