//! PRIVMSG and NOTICE relay.
//!
//! The two verbs share one path; the differences are the numeric replies
//! (NOTICE never generates any) and the +N channel mode.

use ferric_proto::{is_chan_prefix, Folded, Line, Response};

use crate::channel_engine::CanSend;
use crate::error::HandlerResult;
use crate::state::modes::{Capab, Caps, MemberFlags, UserModes};
use crate::state::Network;

/// Per-command target cap, matching the usual ircd limit.
const MAX_TARGETS: usize = 4;

pub fn m_privmsg(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    relay(net, source, line, false)
}

pub fn m_notice(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    relay(net, source, line, true)
}

fn send_error_text(err: Response) -> &'static str {
    match err {
        Response::ERR_NOCTRLSONCHAN => "You cannot use control codes on this channel",
        Response::ERR_NOCTCP => "You cannot use CTCP on this channel",
        Response::ERR_NEEDREGGEDNICK => "You need to identify to a registered nick",
        _ => "Cannot send to channel",
    }
}

fn relay(net: &mut Network, source: &str, line: &Line, notice: bool) -> HandlerResult {
    let targets = line.arg(0).unwrap_or("").to_owned();
    let text = line.arg(1).unwrap_or("").to_owned();
    let verb = if notice { "NOTICE" } else { "PRIVMSG" };

    if text.is_empty() {
        if !notice {
            net.sendto_one_numeric(source, Response::ERR_NOTEXTTOSEND, &["No text to send"]);
        }
        return Ok(());
    }

    let (nuh, my, from, is_oper, is_service) = match net.client(source) {
        Some(c) => (
            c.nuh(),
            c.my_connect(),
            c.from.clone(),
            c.umodes.has(UserModes::OPER),
            c.is_service() || c.is_server(),
        ),
        None => return Ok(()),
    };
    let except = if my { None } else { Some(from) };

    for target in targets.split(',').take(MAX_TARGETS) {
        if target.is_empty() {
            continue;
        }

        if target.chars().next().is_some_and(is_chan_prefix) {
            let fold = Folded::new(target);
            if net.channel(&fold).is_none() {
                if !notice {
                    net.sendto_one_numeric(
                        source,
                        Response::ERR_NOSUCHNICK,
                        &[target, "No such nick/channel"],
                    );
                }
                continue;
            }

            match net.can_send(&fold, source, &text, notice) {
                CanSend::Err(err) => {
                    if !notice {
                        let display = net
                            .channel(&fold)
                            .map(|c| c.name.clone())
                            .unwrap_or_else(|| target.to_owned());
                        net.sendto_one_numeric(source, err, &[&display, send_error_text(err)]);
                    }
                }
                CanSend::Opv | CanSend::NonOp => {
                    let display = net
                        .channel(&fold)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| target.to_owned());
                    let local = format!(":{nuh} {verb} {display} :{text}");
                    net.sendto_channel_local(
                        Some(source),
                        &fold,
                        MemberFlags::empty(),
                        Caps::empty(),
                        Caps::empty(),
                        &local,
                    );
                    let prop = format!(":{source} {verb} {display} :{text}");
                    net.sendto_server(
                        except.as_deref(),
                        Capab::empty(),
                        Capab::empty(),
                        &prop,
                    );
                }
            }
            continue;
        }

        // Directed at a user.
        let target_client = net.find_person(target).map(|t| {
            (
                t.uid.clone(),
                t.name.clone(),
                t.my_connect(),
                t.away.clone(),
                t.umodes.has(UserModes::CALLERID),
                t.umodes.has(UserModes::SOFTCALLERID),
            )
        });
        let Some((target_uid, target_nick, target_local, target_away, caller_id, soft_caller_id)) =
            target_client
        else {
            if !notice {
                net.sendto_one_numeric(
                    source,
                    Response::ERR_NOSUCHNICK,
                    &[target, "No such nick/channel"],
                );
            }
            continue;
        };

        if target_local {
            if (caller_id || soft_caller_id) && !is_oper && !is_service {
                let shares_channel = net.client(source).is_some_and(|src| {
                    net.client(&target_uid)
                        .is_some_and(|t| t.channels.iter().any(|c| src.channels.contains(c)))
                });
                let blocked = caller_id || !shares_channel;
                if blocked {
                    if !notice {
                        let mode = if caller_id { "+g" } else { "+G" };
                        net.sendto_one_numeric(
                            source,
                            Response::RPL_TARGUMODEG,
                            &[&target_nick, mode, "is in server-side ignore mode"],
                        );
                    }
                    continue;
                }
            }
            let msg = format!(":{nuh} {verb} {target_nick} :{text}");
            net.sendto_one(&target_uid, &msg);
            if !notice && !target_away.is_empty() {
                net.sendto_one_numeric(source, Response::RPL_AWAY, &[&target_nick, &target_away]);
            }
        } else {
            let msg = format!(":{source} {verb} {target_uid} :{text}");
            net.sendto_route(&target_uid, &msg);
        }
    }
    Ok(())
}
