//! MODE and TMODE: channel mode changes, mask lists, member prefixes,
//! and user modes.

use ferric_proto::validation::KEY_LEN;
use ferric_proto::{is_chan_prefix, truncate_bytes, Folded, Line, Response};

use crate::error::{HandlerError, HandlerResult};
use crate::security::ban::ban_make;
use crate::state::channel::MaskList;
use crate::state::modes::{Capab, Caps, ChannelModes, MemberFlags, UserModes};
use crate::state::Network;

/// One rendered, successfully applied change.
struct Applied {
    plus: bool,
    letter: char,
    param: Option<String>,
}

/// Render applied changes as `+ab-cd` plus the parameter tail.
fn render_changes(changes: &[Applied]) -> (String, String) {
    let mut letters = String::new();
    let mut params = String::new();
    let mut sign: Option<bool> = None;

    for change in changes {
        if sign != Some(change.plus) {
            letters.push(if change.plus { '+' } else { '-' });
            sign = Some(change.plus);
        }
        letters.push(change.letter);
        if let Some(p) = &change.param {
            params.push(' ');
            params.push_str(p);
        }
    }
    (letters, params)
}

fn send_mask_list(net: &mut Network, source: &str, fold: &Folded, which: MaskList) {
    let (display, entries) = match net.channel(fold) {
        Some(c) => (
            c.name.clone(),
            c.mask_list(which)
                .iter()
                .map(|b| (b.mask.clone(), b.setter.clone(), b.when.to_string()))
                .collect::<Vec<_>>(),
        ),
        None => return,
    };

    let (item, end, end_text) = match which {
        MaskList::Ban => (
            Response::RPL_BANLIST,
            Response::RPL_ENDOFBANLIST,
            "End of channel ban list",
        ),
        MaskList::Except => (
            Response::RPL_EXCEPTLIST,
            Response::RPL_ENDOFEXCEPTLIST,
            "End of channel exception list",
        ),
        MaskList::Invex => (
            Response::RPL_INVEXLIST,
            Response::RPL_ENDOFINVEXLIST,
            "End of channel invite exception list",
        ),
    };

    for (mask, setter, when) in entries {
        net.sendto_one_numeric(source, item, &[&display, &mask, &setter, &when]);
    }
    net.sendto_one_numeric(source, end, &[&display, end_text]);
}

/// Walk one MODE/TMODE argument list against a channel and apply it.
/// Returns the changes that actually took effect.
fn apply_channel_modes(
    net: &mut Network,
    fold: &Folded,
    source: &str,
    setter: &str,
    words: &[String],
    report_errors: bool,
) -> Vec<Applied> {
    let mut applied: Vec<Applied> = Vec::new();
    let Some(word) = words.first() else {
        return applied;
    };
    let mut params = words[1..].iter();
    let now = net.clock.sec_real;
    let mut plus = true;

    for c in word.chars() {
        match c {
            '+' => plus = true,
            '-' => plus = false,
            'b' | 'e' | 'I' => {
                let which = match c {
                    'b' => MaskList::Ban,
                    'e' => MaskList::Except,
                    _ => MaskList::Invex,
                };
                let Some(mask) = params.next() else {
                    send_mask_list(net, source, fold, which);
                    continue;
                };
                let Some(channel) = net.channel_mut(fold) else { break };
                let list = channel.mask_list_mut(which);
                let changed = if plus {
                    if list.iter().any(|b| ferric_proto::irc_eq(&b.mask, mask)) {
                        false
                    } else {
                        list.push(ban_make(mask, setter, now));
                        true
                    }
                } else {
                    let before = list.len();
                    list.retain(|b| !ferric_proto::irc_eq(&b.mask, mask));
                    list.len() != before
                };
                if changed {
                    // Invex changes leave the verdict cache alone.
                    if !matches!(which, MaskList::Invex) {
                        channel.invalidate_ban_cache();
                    }
                    applied.push(Applied {
                        plus,
                        letter: c,
                        param: Some(mask.clone()),
                    });
                }
            }
            'k' => {
                let Some(channel) = net.channel_mut(fold) else { break };
                if plus {
                    let Some(key) = params.next() else { continue };
                    channel.key = truncate_bytes(key, KEY_LEN).to_owned();
                    applied.push(Applied {
                        plus,
                        letter: 'k',
                        param: Some(channel.key.clone()),
                    });
                } else if !channel.key.is_empty() {
                    let old = std::mem::take(&mut channel.key);
                    let _ = params.next();
                    applied.push(Applied {
                        plus,
                        letter: 'k',
                        param: Some(old),
                    });
                }
            }
            'l' => {
                let Some(channel) = net.channel_mut(fold) else { break };
                if plus {
                    let Some(arg) = params.next() else { continue };
                    let Ok(limit) = arg.parse::<usize>() else { continue };
                    if limit == 0 {
                        continue;
                    }
                    channel.limit = limit;
                    applied.push(Applied {
                        plus,
                        letter: 'l',
                        param: Some(limit.to_string()),
                    });
                } else if channel.limit != 0 {
                    channel.limit = 0;
                    applied.push(Applied {
                        plus,
                        letter: 'l',
                        param: None,
                    });
                }
            }
            'o' | 'h' | 'v' => {
                let Some(nick) = params.next() else { continue };
                let target = net.find_person(nick).map(|t| (t.uid.clone(), t.name.clone()));
                let Some((target_uid, target_nick)) = target else {
                    if report_errors {
                        net.sendto_one_numeric(
                            source,
                            Response::ERR_NOSUCHNICK,
                            &[nick, "No such nick"],
                        );
                    }
                    continue;
                };
                let flag = match c {
                    'o' => MemberFlags::CHANOP,
                    'h' => MemberFlags::HALFOP,
                    _ => MemberFlags::VOICE,
                };
                let display = net.channel(fold).map(|ch| ch.name.clone()).unwrap_or_default();
                let on_channel = net
                    .channel(fold)
                    .is_some_and(|ch| ch.is_member(&target_uid));
                if !on_channel {
                    if report_errors {
                        net.sendto_one_numeric(
                            source,
                            Response::ERR_USERNOTINCHANNEL,
                            &[&target_nick, &display, "They aren't on that channel"],
                        );
                    }
                    continue;
                }
                let Some(channel) = net.channel_mut(fold) else { break };
                let flags = channel
                    .members
                    .get_mut(&target_uid)
                    .expect("membership checked above");
                let had = flags.has(flag);
                if plus && !had {
                    flags.set(flag);
                } else if !plus && had {
                    flags.clear(flag);
                } else {
                    continue;
                }
                applied.push(Applied {
                    plus,
                    letter: c,
                    param: Some(target_nick),
                });
            }
            _ => match ChannelModes::from_letter(c) {
                Some(mode) => {
                    let Some(channel) = net.channel_mut(fold) else { break };
                    let had = channel.modes.has(mode);
                    if plus && !had {
                        channel.modes.set(mode);
                    } else if !plus && had {
                        channel.modes.clear(mode);
                    } else {
                        continue;
                    }
                    applied.push(Applied {
                        plus,
                        letter: c,
                        param: None,
                    });
                }
                None => {
                    if report_errors {
                        let ch = c.to_string();
                        net.sendto_one_numeric(
                            source,
                            Response::ERR_UNKNOWNMODE,
                            &[&ch, "is unknown mode char to me"],
                        );
                    }
                }
            },
        }
    }

    applied
}

/// Broadcast and propagate an applied mode change.
fn announce_changes(
    net: &mut Network,
    fold: &Folded,
    source: &str,
    setter: &str,
    changes: &[Applied],
    except: Option<&str>,
) {
    if changes.is_empty() {
        return;
    }
    let (letters, params) = render_changes(changes);
    let (display, ts) = match net.channel(fold) {
        Some(c) => (c.name.clone(), c.creation_time),
        None => return,
    };

    let local = format!(":{setter} MODE {display} {letters}{params}");
    net.sendto_channel_local(
        None,
        fold,
        MemberFlags::empty(),
        Caps::empty(),
        Caps::empty(),
        &local,
    );

    let prop = format!(":{source} TMODE {ts} {display} {letters}{params}");
    net.sendto_server(except, Capab::empty(), Capab::empty(), &prop);
}

/// MODE from a client: channel or own user modes.
pub fn m_mode(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target = line.arg(0).unwrap_or("");
    if target.chars().next().is_some_and(is_chan_prefix) {
        return channel_mode(net, source, line);
    }
    user_mode(net, source, line)
}

fn channel_mode(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let name = line.arg(0).unwrap_or("");
    let fold = Folded::new(name);
    let snapshot = net.channel(&fold).map(|c| {
        (
            c.name.clone(),
            c.member(source),
            c.modes_string(c.is_member(source)),
            c.creation_time.to_string(),
        )
    });
    let Some((display, member, modes, created)) = snapshot else {
        net.sendto_one_numeric(source, Response::ERR_NOSUCHCHANNEL, &[name, "No such channel"]);
        return Ok(());
    };

    if line.params.len() == 1 {
        net.sendto_one_numeric(source, Response::RPL_CHANNELMODEIS, &[&display, &modes]);
        net.sendto_one_numeric(source, Response::RPL_CREATIONTIME, &[&display, &created]);
        return Ok(());
    }

    // A bare list letter is a query, not a change.
    let words: Vec<String> = line.params[1..].to_vec();
    let first = words[0].trim_start_matches('+');
    if words.len() == 1 && matches!(first, "b" | "e" | "I") {
        let which = match first {
            "b" => MaskList::Ban,
            "e" => MaskList::Except,
            _ => MaskList::Invex,
        };
        send_mask_list(net, source, &fold, which);
        return Ok(());
    }

    if !member.is_some_and(|f| f.has(MemberFlags::CHANOP) || f.has(MemberFlags::HALFOP)) {
        net.sendto_one_numeric(
            source,
            Response::ERR_CHANOPRIVSNEEDED,
            &[&display, "You're not channel operator"],
        );
        return Ok(());
    }

    let setter = net.client(source).map(|c| c.nuh()).unwrap_or_default();
    let changes = apply_channel_modes(net, &fold, source, &setter, &words, true);
    announce_changes(net, &fold, source, &setter, &changes, None);
    Ok(())
}

fn user_mode(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target = line.arg(0).unwrap_or("");
    let (own_nick, old_modes) = match net.client(source) {
        Some(c) => (c.name.clone(), c.umodes),
        None => return Ok(()),
    };
    if !ferric_proto::irc_eq(target, &own_nick) {
        net.sendto_one_numeric(
            source,
            Response::ERR_USERSDONTMATCH,
            &["Cannot change mode for other users"],
        );
        return Ok(());
    }

    if line.params.len() == 1 {
        let modes = old_modes.letters();
        net.sendto_one_numeric(source, Response::RPL_UMODEIS, &[&modes]);
        return Ok(());
    }

    let word = line.arg(1).unwrap_or("").to_owned();
    let mut modes = old_modes;
    let mut plus = true;
    for c in word.chars() {
        match c {
            '+' => plus = true,
            '-' => plus = false,
            // Oper status is only granted through OPER, never MODE.
            'o' | 'a' if plus => {}
            _ => {
                if let Some(m) = UserModes::from_letter(c) {
                    if plus {
                        modes.set(m);
                    } else {
                        modes.clear(m);
                    }
                }
            }
        }
    }

    let diff = modes.diff(old_modes);
    if diff.is_empty() {
        return Ok(());
    }
    if let Some(client) = net.client_mut(source) {
        client.umodes = modes;
    }

    let reply = format!(":{own_nick} MODE {own_nick} :{diff}");
    net.sendto_one(source, &reply);
    let prop = format!(":{source} MODE {source} :{diff}");
    net.sendto_server(None, Capab::empty(), Capab::empty(), &prop);
    Ok(())
}

/// MODE relayed by a server for a remote user or channel.
pub fn ms_mode(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target = line.arg(0).unwrap_or("");
    if target.chars().next().is_some_and(is_chan_prefix) {
        // Channel modes between servers travel as TMODE.
        return Err(HandlerError::Dropped("channel MODE from server"));
    }

    // Remote umode change: apply and pass along.
    let word = line.arg(1).unwrap_or("").to_owned();
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();
    if let Some(client) = net.client_mut(source) {
        let mut plus = true;
        for c in word.chars() {
            match c {
                '+' => plus = true,
                '-' => plus = false,
                _ => {
                    if let Some(m) = UserModes::from_letter(c) {
                        if plus {
                            client.umodes.set(m);
                        } else {
                            client.umodes.clear(m);
                        }
                    }
                }
            }
        }
    }
    net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &line.to_string());
    Ok(())
}

/// TMODE: a timestamped channel mode change from a peer. Stale senders
/// (TS above ours) are discarded.
pub fn ms_tmode(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let ts: i64 = line.arg(0).and_then(|s| s.parse().ok()).unwrap_or(0);
    let name = line.arg(1).unwrap_or("");
    let fold = Folded::new(name);

    let Some(channel) = net.channel(&fold) else {
        return Err(HandlerError::Dropped("TMODE for unknown channel"));
    };
    if ts > channel.creation_time {
        return Err(HandlerError::Dropped("TMODE with newer TS"));
    }

    let (setter, arrived) = match net.client(source) {
        Some(c) if c.is_server() => (c.name.clone(), c.from.clone()),
        Some(c) => (c.nuh(), c.from.clone()),
        None => return Ok(()),
    };

    let words: Vec<String> = line.params[2..].to_vec();
    let changes = apply_channel_modes(net, &fold, source, &setter, &words, false);
    announce_changes(net, &fold, source, &setter, &changes, Some(&arrived));
    Ok(())
}
