//! Channel membership commands: JOIN, PART, TOPIC, NAMES, INVITE.

use ferric_proto::{channel_check_name, Folded, Line, Response};

use crate::channel_engine::CanSend;
use crate::error::HandlerResult;
use crate::state::modes::{Capab, Caps, ChannelModes, MemberFlags, UserModes};
use crate::state::Network;

fn join_error_text(err: Response) -> &'static str {
    match err {
        Response::ERR_INVITEONLYCHAN => "Cannot join channel (+i)",
        Response::ERR_BADCHANNELKEY => "Cannot join channel (+k)",
        Response::ERR_CHANNELISFULL => "Cannot join channel (+l)",
        Response::ERR_BANNEDFROMCHAN => "Cannot join channel (+b)",
        Response::ERR_NEEDREGGEDNICK => "You need to identify to a registered nick",
        Response::ERR_SECUREONLYCHAN => "Cannot join channel (+S): TLS required",
        Response::ERR_OPERONLYCHAN => "Cannot join channel (+O)",
        _ => "Cannot join channel",
    }
}

/// Emit the local JOIN pair: the extended-join form to clients that asked
/// for it, the plain form to everyone else.
pub(crate) fn announce_join(net: &mut Network, chan: &Folded, uid: &str) {
    let (nuh, account, info, away, name) = {
        let Some(client) = net.client(uid) else { return };
        let Some(channel) = net.channel(chan) else { return };
        (
            client.nuh(),
            client.account.clone(),
            client.info.clone(),
            client.away.clone(),
            channel.name.clone(),
        )
    };

    let extended = format!(":{nuh} JOIN {name} {account} :{info}");
    net.sendto_channel_local(
        None,
        chan,
        MemberFlags::empty(),
        Caps::EXTENDED_JOIN,
        Caps::empty(),
        &extended,
    );
    let plain = format!(":{nuh} JOIN :{name}");
    net.sendto_channel_local(
        None,
        chan,
        MemberFlags::empty(),
        Caps::empty(),
        Caps::EXTENDED_JOIN,
        &plain,
    );

    if !away.is_empty() {
        let line = format!(":{nuh} AWAY :{away}");
        net.sendto_channel_local(
            Some(uid),
            chan,
            MemberFlags::empty(),
            Caps::AWAY_NOTIFY,
            Caps::empty(),
            &line,
        );
    }
}

/// JOIN from a local client: one channel per comma-separated name, keys
/// consumed left to right.
pub fn m_join(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let names = line.arg(0).unwrap_or("").to_owned();
    let keys = line.arg(1).unwrap_or("").to_owned();
    let mut keys = keys.split(',');

    for name in names.split(',').filter(|n| !n.is_empty()) {
        let key = keys.next().filter(|k| !k.is_empty());

        let strict = net.config.channel.disable_fake_channels;
        if !channel_check_name(name, strict) {
            net.sendto_one_numeric(
                source,
                Response::ERR_BADCHANNAME,
                &[name, "Illegal channel name"],
            );
            continue;
        }

        let (channel_count, is_oper) = match net.client(source) {
            Some(c) => (c.channels.len(), c.umodes.has(UserModes::OPER)),
            None => return Ok(()),
        };
        if channel_count >= net.config.channel.max_channels {
            net.sendto_one_numeric(
                source,
                Response::ERR_TOOMANYCHANNELS,
                &[name, "You have joined too many channels"],
            );
            break;
        }

        let fold = Folded::new(name);
        let existing = net.channels.contains_key(fold.as_str());
        let flags = if existing {
            if net.channel(&fold).is_some_and(|c| c.is_member(source)) {
                continue;
            }
            if let Some(err) = net.can_join(&fold, source, key) {
                let display = net
                    .channel(&fold)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| name.to_owned());
                net.sendto_one_numeric(source, err, &[&display, join_error_text(err)]);
                continue;
            }
            MemberFlags::empty()
        } else {
            net.channel_make(name);
            MemberFlags::CHANOP
        };

        if !is_oper {
            net.check_spambot_warning(source, Some(name));
        }

        net.add_user_to_channel(&fold, source, flags, true);

        let creation_time = net.channel(&fold).map(|c| c.creation_time).unwrap_or(0);
        if flags == MemberFlags::CHANOP {
            // Fresh channel: stamp the TS, apply the default modes, and
            // let the network know in one SJOIN.
            let now = net.clock.sec_real;
            if let Some(channel) = net.channel_mut(&fold) {
                channel.creation_time = now;
                channel.modes.set(ChannelModes::TOPICLIMIT);
                channel.modes.set(ChannelModes::NOPRIVMSGS);
            }
            let sjoin = format!(
                ":{} SJOIN {} {} +nt :@{}",
                net.me.sid, now, name, source
            );
            net.sendto_server(None, Capab::empty(), Capab::empty(), &sjoin);

            announce_join(net, &fold, source);
            let mode_line = format!(":{} MODE {} +nt", net.me.name, name);
            net.sendto_channel_local(
                None,
                &fold,
                MemberFlags::empty(),
                Caps::empty(),
                Caps::empty(),
                &mode_line,
            );
        } else {
            let join = format!(":{source} JOIN {creation_time} {name} +");
            net.sendto_server(None, Capab::empty(), Capab::empty(), &join);
            announce_join(net, &fold, source);
        }

        if let Some(channel) = net.channel_mut(&fold) {
            channel.invites.remove(source);
        }

        let (topic, topic_info, topic_time, display) = net
            .channel(&fold)
            .map(|c| {
                (
                    c.topic.clone(),
                    c.topic_info.clone(),
                    c.topic_time.to_string(),
                    c.name.clone(),
                )
            })
            .unwrap_or_default();
        if !topic.is_empty() {
            net.sendto_one_numeric(source, Response::RPL_TOPIC, &[&display, &topic]);
            net.sendto_one_numeric(
                source,
                Response::RPL_TOPICWHOTIME,
                &[&display, &topic_info, &topic_time],
            );
        }

        net.channel_member_names(source, &fold, true);

        let now_mono = net.clock.sec_monotonic;
        if let Some(conn) = net.client_mut(source).and_then(|c| c.conn.as_mut()) {
            conn.last_join_time = now_mono;
        }
    }
    Ok(())
}

/// JOIN from a server: one remote client entering one channel, with the
/// channel TS for conflict resolution.
pub fn ms_join(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    // Format: :<uid> JOIN <ts> <channel> +
    let ts: i64 = line.arg(0).and_then(|s| s.parse().ok()).unwrap_or(0);
    let name = line.arg(1).unwrap_or("");
    if !channel_check_name(name, false) {
        return Err(crate::error::HandlerError::Dropped("bad channel name"));
    }
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();

    let fold = Folded::new(name);
    if net.channels.contains_key(fold.as_str()) {
        let local_ts = net.channel(&fold).map(|c| c.creation_time).unwrap_or(0);
        if ts < local_ts && ts != 0 {
            net.channel_ts_lost(&fold, ts);
        }
    } else {
        net.channel_make(name);
        if let Some(channel) = net.channel_mut(&fold) {
            channel.creation_time = ts;
        }
    }

    if net.channel(&fold).is_some_and(|c| !c.is_member(source)) {
        net.add_user_to_channel(&fold, source, MemberFlags::empty(), false);
        announce_join(net, &fold, source);
    }

    let prop = format!(":{source} JOIN {ts} {name} +");
    net.sendto_server(Some(&arrived), Capab::empty(), Capab::empty(), &prop);
    Ok(())
}

/// Shared PART logic for local and remote sources.
fn part_one_channel(net: &mut Network, source: &str, name: &str, reason: &str) {
    let fold = Folded::new(name);
    let snapshot = net
        .channel(&fold)
        .map(|c| (c.name.clone(), c.is_member(source)));
    let Some((display, is_member)) = snapshot else {
        net.sendto_one_numeric(source, Response::ERR_NOSUCHCHANNEL, &[name, "No such channel"]);
        return;
    };
    if !is_member {
        net.sendto_one_numeric(
            source,
            Response::ERR_NOTONCHANNEL,
            &[&display, "You're not on that channel"],
        );
        return;
    }

    let (my, is_oper, nuh, from, age_ok) = {
        let Some(client) = net.client(source) else { return };
        let age_ok = client.conn.as_ref().is_some_and(|conn| {
            conn.created_monotonic + net.config.general.anti_spam_exit_message_time
                < net.clock.sec_monotonic
        });
        (
            client.my_connect(),
            client.umodes.has(UserModes::OPER),
            client.nuh(),
            client.from.clone(),
            age_ok,
        )
    };

    if my && !is_oper {
        net.check_spambot_warning(source, None);
    }

    // Part reasons only from established connections that may speak.
    let reason_ok = !reason.is_empty()
        && (!my
            || (age_ok
                && matches!(
                    net.can_send(&fold, source, reason, false),
                    CanSend::Opv | CanSend::NonOp
                )));

    let except = if my { None } else { Some(from.as_str()) };
    if reason_ok {
        let prop = format!(":{source} PART {display} :{reason}");
        net.sendto_server(except, Capab::empty(), Capab::empty(), &prop);
        let local = format!(":{nuh} PART {display} :{reason}");
        net.sendto_channel_local(
            None,
            &fold,
            MemberFlags::empty(),
            Caps::empty(),
            Caps::empty(),
            &local,
        );
    } else {
        let prop = format!(":{source} PART {display}");
        net.sendto_server(except, Capab::empty(), Capab::empty(), &prop);
        let local = format!(":{nuh} PART {display}");
        net.sendto_channel_local(
            None,
            &fold,
            MemberFlags::empty(),
            Caps::empty(),
            Caps::empty(),
            &local,
        );
    }

    net.remove_user_from_channel(&fold, source);
}

/// PART from a local client.
pub fn m_part(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let names = line.arg(0).unwrap_or("").to_owned();
    let reason = line.arg(1).unwrap_or("").to_owned();
    for name in names.split(',').filter(|n| !n.is_empty()) {
        part_one_channel(net, source, name, &reason);
    }
    Ok(())
}

/// PART relayed for a remote client.
pub fn ms_part(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    m_part(net, source, line)
}

/// TOPIC query or change from a local client.
pub fn m_topic(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let name = line.arg(0).unwrap_or("");
    let fold = Folded::new(name);
    let snapshot = net.channel(&fold).map(|c| {
        (
            c.name.clone(),
            c.is_public(),
            c.member(source),
            c.topic.clone(),
            c.topic_info.clone(),
            c.topic_time.to_string(),
            c.modes.has(ChannelModes::TOPICLIMIT),
        )
    });
    let Some((display, public, member, topic, info, time, topic_limited)) = snapshot else {
        net.sendto_one_numeric(source, Response::ERR_NOSUCHCHANNEL, &[name, "No such channel"]);
        return Ok(());
    };

    if line.params.len() == 1 {
        if !public && member.is_none() {
            net.sendto_one_numeric(
                source,
                Response::ERR_NOTONCHANNEL,
                &[&display, "You're not on that channel"],
            );
            return Ok(());
        }
        if topic.is_empty() {
            net.sendto_one_numeric(source, Response::RPL_NOTOPIC, &[&display, "No topic is set"]);
        } else {
            net.sendto_one_numeric(source, Response::RPL_TOPIC, &[&display, &topic]);
            net.sendto_one_numeric(
                source,
                Response::RPL_TOPICWHOTIME,
                &[&display, &info, &time],
            );
        }
        return Ok(());
    }

    if member.is_none() {
        net.sendto_one_numeric(
            source,
            Response::ERR_NOTONCHANNEL,
            &[&display, "You're not on that channel"],
        );
        return Ok(());
    }
    if topic_limited
        && !member.is_some_and(|f| f.has(MemberFlags::CHANOP) || f.has(MemberFlags::HALFOP))
    {
        net.sendto_one_numeric(
            source,
            Response::ERR_CHANOPRIVSNEEDED,
            &[&display, "You're not channel operator"],
        );
        return Ok(());
    }

    let text = line.arg(1).unwrap_or("").to_owned();
    let nuh = net.client(source).map(|c| c.nuh()).unwrap_or_default();
    let now = net.clock.sec_real;
    net.channel_set_topic(&fold, &text, &nuh, now, true);

    let stored = net.channel(&fold).map(|c| c.topic.clone()).unwrap_or_default();
    let local = format!(":{nuh} TOPIC {display} :{stored}");
    net.sendto_channel_local(
        None,
        &fold,
        MemberFlags::empty(),
        Caps::empty(),
        Caps::empty(),
        &local,
    );
    let prop = format!(":{source} TOPIC {display} :{stored}");
    net.sendto_server(None, Capab::empty(), Capab::empty(), &prop);
    Ok(())
}

/// TOPIC relayed for a remote user.
pub fn ms_topic(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let name = line.arg(0).unwrap_or("");
    let fold = Folded::new(name);
    if net.channel(&fold).is_none() {
        return Err(crate::error::HandlerError::Dropped("topic for unknown channel"));
    }
    let text = line.arg(1).unwrap_or("").to_owned();
    let (nuh, from) = match net.client(source) {
        Some(c) => (c.nuh(), c.from.clone()),
        None => return Ok(()),
    };
    let now = net.clock.sec_real;
    net.channel_set_topic(&fold, &text, &nuh, now, false);

    let display = net.channel(&fold).map(|c| c.name.clone()).unwrap_or_default();
    let stored = net.channel(&fold).map(|c| c.topic.clone()).unwrap_or_default();
    let local = format!(":{nuh} TOPIC {display} :{stored}");
    net.sendto_channel_local(
        None,
        &fold,
        MemberFlags::empty(),
        Caps::empty(),
        Caps::empty(),
        &local,
    );
    let prop = format!(":{source} TOPIC {display} :{stored}");
    net.sendto_server(Some(&from), Capab::empty(), Capab::empty(), &prop);
    Ok(())
}

/// NAMES for the listed channels, or just the terminator without one.
pub fn m_names(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    match line.arg(0) {
        Some(names) => {
            for name in names.to_owned().split(',').filter(|n| !n.is_empty()) {
                let fold = Folded::new(name);
                if net.channel(&fold).is_some() {
                    net.channel_member_names(source, &fold, true);
                } else {
                    net.sendto_one_numeric(
                        source,
                        Response::RPL_ENDOFNAMES,
                        &[name, "End of /NAMES list"],
                    );
                }
            }
        }
        None => {
            net.sendto_one_numeric(source, Response::RPL_ENDOFNAMES, &["*", "End of /NAMES list"]);
        }
    }
    Ok(())
}

/// INVITE from a local client.
pub fn m_invite(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let nick = line.arg(0).unwrap_or("");
    let name = line.arg(1).unwrap_or("");

    let target = net
        .find_person(nick)
        .map(|t| (t.uid.clone(), t.name.clone(), t.my_connect()));
    let Some((target_uid, target_nick, target_local)) = target else {
        net.sendto_one_numeric(source, Response::ERR_NOSUCHNICK, &[nick, "No such nick"]);
        return Ok(());
    };

    let fold = Folded::new(name);
    let snapshot = net.channel(&fold).map(|c| {
        (
            c.name.clone(),
            c.member(source),
            c.is_member(&target_uid),
            c.modes.has(ChannelModes::INVITEONLY),
        )
    });
    let Some((display, member, target_in, invite_only)) = snapshot else {
        net.sendto_one_numeric(source, Response::ERR_NOSUCHCHANNEL, &[name, "No such channel"]);
        return Ok(());
    };

    if member.is_none() {
        net.sendto_one_numeric(
            source,
            Response::ERR_NOTONCHANNEL,
            &[&display, "You're not on that channel"],
        );
        return Ok(());
    }
    if target_in {
        net.sendto_one_numeric(
            source,
            Response::ERR_USERONCHANNEL,
            &[&target_nick, &display, "is already on channel"],
        );
        return Ok(());
    }
    if invite_only && !member.is_some_and(|f| f.has(MemberFlags::CHANOP)) {
        net.sendto_one_numeric(
            source,
            Response::ERR_CHANOPRIVSNEEDED,
            &[&display, "You're not channel operator"],
        );
        return Ok(());
    }

    if let Some(channel) = net.channel_mut(&fold) {
        channel.invites.insert(target_uid.clone());
    }

    net.sendto_one_numeric(source, Response::RPL_INVITING, &[&target_nick, &display]);

    let nuh = net.client(source).map(|c| c.nuh()).unwrap_or_default();
    if target_local {
        let line = format!(":{nuh} INVITE {target_nick} :{display}");
        net.sendto_one(&target_uid, &line);
    } else {
        let line = format!(":{source} INVITE {target_uid} {display}");
        net.sendto_route(&target_uid, &line);
    }
    Ok(())
}

/// INVITE relayed between servers.
pub fn ms_invite(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let target_ref = line.arg(0).unwrap_or("");
    let name = line.arg(1).unwrap_or("");

    let Some(target) = net.find_person(target_ref) else {
        return Ok(());
    };
    let target_uid = target.uid.clone();
    let target_nick = target.name.clone();
    let target_local = target.my_connect();

    let fold = Folded::new(name);
    if net.channel(&fold).is_none() {
        return Ok(());
    }
    let display = net.channel(&fold).map(|c| c.name.clone()).unwrap_or_default();

    if let Some(channel) = net.channel_mut(&fold) {
        channel.invites.insert(target_uid.clone());
    }

    if target_local {
        let nuh = net.client(source).map(|c| c.nuh()).unwrap_or_default();
        let line = format!(":{nuh} INVITE {target_nick} :{display}");
        net.sendto_one(&target_uid, &line);
    } else {
        let line = format!(":{source} INVITE {target_uid} {display}");
        net.sendto_route(&target_uid, &line);
    }
    Ok(())
}
