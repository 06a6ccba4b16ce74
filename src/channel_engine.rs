//! Channel policy and formatting: join checks, send checks, NAMES
//! framing, topic storage and burst emission.
//!
//! Everything here reads like the decision tables it implements: the
//! checks run in a fixed order and the first failure wins.

use ferric_proto::validation::TOPIC_LEN;
use ferric_proto::{match_mask, truncate_bytes, Folded, Response, LINE_MAX};

use crate::security::ban::{acting_ban, find_bmask, is_banned};
use crate::security::extban::Action;
use crate::state::channel::MaskList;
use crate::state::modes::{Caps, ChannelModes, ClientFlags, MemberFlags, UserModes};
use crate::state::Network;

/// Verdict of [`Network::can_send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanSend {
    /// Sender is a server, service, or holds a channel prefix.
    Opv,
    /// Plain member (or allowed outsider).
    NonOp,
    /// Denied; the numeric to return.
    Err(Response),
}

/// Does the message contain control codes? CTCP's `\x01` is allowed, as
/// is an ISO 2022 charset shift (`ESC $` / `ESC (`).
fn msg_has_ctrls(message: &str) -> bool {
    let bytes = message.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b > 31 || b == 1 {
            i += 1;
            continue;
        }
        if b == 27 && matches!(bytes.get(i + 1), Some(b'$') | Some(b'(')) {
            i += 2;
            continue;
        }
        return true;
    }
    false
}

/// Pack `items` onto as few lines as possible: each line is `header`
/// followed by space-separated items, kept under `limit` bytes.
pub(crate) fn frame_lines(header: &str, items: &[String], limit: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::from(header);

    for item in items {
        if current.len() > header.len() && current.len() + 1 + item.len() > limit {
            lines.push(std::mem::take(&mut current));
            current.push_str(header);
        }
        if current.len() > header.len() {
            current.push(' ');
        }
        current.push_str(item);
    }

    if current.len() > header.len() {
        lines.push(current);
    }
    lines
}

impl Network {
    /// May `uid` join `chan` with the given key? `None` means yes;
    /// otherwise the numeric to send. Checks run in policy order and the
    /// first failure wins.
    pub fn can_join(&self, chan: &Folded, uid: &str, key: Option<&str>) -> Option<Response> {
        let client = self.client(uid)?;
        let channel = self.channel(chan)?;
        let server_name = self.server_name_of(client);

        if channel.modes.has(ChannelModes::SECUREONLY) && !client.umodes.has(UserModes::SECURE) {
            return Some(Response::ERR_SECUREONLYCHAN);
        }
        if channel.modes.has(ChannelModes::REGONLY) && !client.umodes.has(UserModes::REGISTERED) {
            return Some(Response::ERR_NEEDREGGEDNICK);
        }
        if channel.modes.has(ChannelModes::OPERONLY) && !client.umodes.has(UserModes::OPER) {
            return Some(Response::ERR_OPERONLYCHAN);
        }
        if channel.modes.has(ChannelModes::INVITEONLY)
            && !channel.invites.contains(uid)
            && !find_bmask(&channel.invexlist, client, &server_name, None)
        {
            return Some(Response::ERR_INVITEONLYCHAN);
        }
        if !channel.key.is_empty() && key != Some(channel.key.as_str()) {
            return Some(Response::ERR_BADCHANNELKEY);
        }
        if channel.limit != 0 && channel.members.len() >= channel.limit {
            return Some(Response::ERR_CHANNELISFULL);
        }
        if is_banned(channel, client, &server_name) {
            return Some(Response::ERR_BANNEDFROMCHAN);
        }
        if acting_ban(channel, client, &server_name, Action::Join) {
            return Some(Response::ERR_BANNEDFROMCHAN);
        }

        None
    }

    /// May `uid` deliver `message` to `chan`? Mutates the per-member ban
    /// cache for local senders, so it takes `&mut self`.
    pub fn can_send(&mut self, chan: &Folded, uid: &str, message: &str, notice: bool) -> CanSend {
        let Some(client) = self.client(uid) else {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        };

        if client.is_server() || client.is_service() {
            return CanSend::Opv;
        }

        let server_name = self.server_name_of(client);
        let my = client.my_connect();
        let is_oper = client.umodes.has(UserModes::OPER);
        let exempt_resv = client.flags.has(ClientFlags::EXEMPTRESV);
        let registered = client.umodes.has(UserModes::REGISTERED);

        let Some(channel) = self.channel(chan) else {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        };

        if my
            && !exempt_resv
            && !is_oper
            && self
                .config
                .channel
                .reserved
                .iter()
                .any(|mask| match_mask(mask, &channel.name))
        {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        }

        if channel.modes.has(ChannelModes::NOCTRL) && msg_has_ctrls(message) {
            return CanSend::Err(Response::ERR_NOCTRLSONCHAN);
        }
        if channel.modes.has(ChannelModes::NOCTCP)
            && message.starts_with('\u{1}')
            && !message[1..].starts_with("ACTION ")
        {
            return CanSend::Err(Response::ERR_NOCTCP);
        }

        let member = channel.member(uid);
        if let Some(flags) = member {
            if flags.has_prefix() {
                return CanSend::Opv;
            }
        }

        if member.is_none() && channel.modes.has(ChannelModes::NOPRIVMSGS) {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        }
        if channel.modes.has(ChannelModes::MODERATED) {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        }
        if channel.modes.has(ChannelModes::MODREG) && !registered {
            return CanSend::Err(Response::ERR_NEEDREGGEDNICK);
        }
        if channel.modes.has(ChannelModes::NONOTICE) && notice {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        }

        // Ban verdict, memoized on the membership for local clients until
        // a mask list changes.
        if my {
            match member {
                Some(flags) => {
                    if flags.has(MemberFlags::BAN_SILENCED) {
                        return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
                    }
                    if !flags.has(MemberFlags::BAN_CHECKED) {
                        let banned = is_banned(channel, client, &server_name);
                        let channel = self
                            .channels
                            .get_mut(chan.as_str())
                            .expect("channel checked above");
                        let flags = channel
                            .members
                            .get_mut(uid)
                            .expect("membership checked above");
                        flags.set(MemberFlags::BAN_CHECKED);
                        if banned {
                            flags.set(MemberFlags::BAN_SILENCED);
                            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
                        }
                    }
                }
                None => {
                    if is_banned(channel, client, &server_name) {
                        return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
                    }
                }
            }
        }

        // Mute extbans act here, after every structural check.
        let client = self.client(uid).expect("client checked above");
        let channel = self.channel(chan).expect("channel checked above");
        if acting_ban(channel, client, &server_name, Action::Mute) {
            return CanSend::Err(Response::ERR_CANNOTSENDTOCHAN);
        }

        CanSend::NonOp
    }

    /// NAMES reply for one channel: visibility rules, prefix rendering
    /// per the requester's caps, and 510-byte framing.
    pub fn channel_member_names(&mut self, uid: &str, chan: &Folded, show_eon: bool) {
        let Some(client) = self.client(uid) else { return };
        let Some(channel) = self.channel(chan) else { return };

        let is_member = channel.is_member(uid);
        let multi_prefix = client.caps.has(Caps::MULTI_PREFIX);
        let uhnames = client.caps.has(Caps::UHNAMES);
        let nick = self.display_name(uid);
        let channel_name = channel.name.clone();

        if channel.is_public() || is_member {
            let header = format!(
                ":{} 353 {} {} {} :",
                self.me.name,
                nick,
                channel.pub_or_secret(),
                channel_name
            );

            let mut items: Vec<String> = Vec::with_capacity(channel.members.len());
            for (member_uid, flags) in &channel.members {
                let Some(member) = self.client(member_uid) else {
                    continue;
                };
                if member.umodes.has(UserModes::INVISIBLE) && !is_member {
                    continue;
                }
                let status = flags.status(multi_prefix);
                if uhnames {
                    items.push(format!("{}{}", status, member.nuh()));
                } else {
                    items.push(format!("{}{}", status, member.name));
                }
            }

            let lines = frame_lines(&header, &items, LINE_MAX - 2);
            for line in lines {
                self.sendto_route(uid, &line);
            }
        }

        if show_eon {
            self.sendto_one_numeric(
                uid,
                Response::RPL_ENDOFNAMES,
                &[&channel_name, "End of /NAMES list"],
            );
        }
    }

    /// Burst one channel to a just-linked server: SJOIN with the member
    /// list, then one BMASK batch per non-empty mask list.
    pub fn channel_send_modes(&mut self, server_uid: &str, chan: &Folded) {
        let Some(channel) = self.channel(chan) else { return };

        let header = format!(
            ":{} SJOIN {} {} {} :",
            self.me.sid,
            channel.creation_time,
            channel.name,
            channel.modes_string(true)
        );

        let mut members: Vec<String> = Vec::with_capacity(channel.members.len());
        for (member_uid, flags) in &channel.members {
            let mut item = String::new();
            if flags.has(MemberFlags::CHANOP) {
                item.push('@');
            }
            if flags.has(MemberFlags::HALFOP) {
                item.push('%');
            }
            if flags.has(MemberFlags::VOICE) {
                item.push('+');
            }
            item.push_str(member_uid);
            members.push(item);
        }

        for line in frame_lines(&header, &members, LINE_MAX - 2) {
            self.sendto_one(server_uid, &line);
        }

        for which in [MaskList::Ban, MaskList::Except, MaskList::Invex] {
            self.channel_send_mask_list(server_uid, chan, which);
        }
    }

    fn channel_send_mask_list(&mut self, server_uid: &str, chan: &Folded, which: MaskList) {
        let Some(channel) = self.channel(chan) else { return };
        let list = channel.mask_list(which);
        if list.is_empty() {
            return;
        }

        let header = format!(
            ":{} BMASK {} {} {} :",
            self.me.sid,
            channel.creation_time,
            channel.name,
            which.letter()
        );
        let masks: Vec<String> = list.iter().map(|b| b.mask.clone()).collect();
        for line in frame_lines(&header, &masks, LINE_MAX - 2) {
            self.sendto_one(server_uid, &line);
        }
    }

    /// Store a topic. Local topics are capped at the configured visible
    /// length; remote ones only at storage size.
    pub fn channel_set_topic(
        &mut self,
        chan: &Folded,
        topic: &str,
        info: &str,
        ts: i64,
        local: bool,
    ) {
        let cap = if local {
            std::cmp::min(TOPIC_LEN, self.config.server.max_topic_length)
        } else {
            TOPIC_LEN
        };
        let Some(channel) = self.channels.get_mut(chan.as_str()) else {
            return;
        };
        channel.topic = truncate_bytes(topic, cap).to_owned();
        channel.topic_info = info.to_owned();
        channel.topic_time = ts;
    }
}
