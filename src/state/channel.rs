//! Channel records.
//!
//! A channel exists exactly as long as it has members; the engine creates
//! it lazily on the first JOIN or SJOIN and destroys it in the same
//! operation that removes its last member. Membership is a map from UID to
//! [`MemberFlags`]; the member entry doubles as the ban-result cache.

use std::collections::{HashMap, HashSet};

use ipnet::IpNet;

use crate::security::extban::Extban;
use crate::state::client::Uid;
use crate::state::modes::{ChannelModes, MemberFlags};

/// How a ban's host part is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatch {
    /// Wildcard match against realhost, sockhost and visible host.
    Host,
    /// CIDR compare against the stored IP when families agree.
    Cidr(IpNet),
}

/// One entry in a channel mask list (ban, exception or invex).
#[derive(Debug, Clone)]
pub struct Ban {
    /// The raw mask as set.
    pub mask: String,
    /// Parsed nick part, `*` when absent.
    pub nick: String,
    /// Parsed user part, `*` when absent.
    pub user: String,
    /// Parsed host part, `*` when absent.
    pub host: String,
    /// Host comparison mode.
    pub htype: HostMatch,
    /// Parsed extban when the mask is `$`-led.
    pub extban: Option<Extban>,
    /// `nick!user@host` of the setter.
    pub setter: String,
    /// Wall-clock second the entry was set.
    pub when: i64,
}

/// Which of the three mask lists an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskList {
    Ban,
    Except,
    Invex,
}

impl MaskList {
    /// The BMASK / MODE letter for this list.
    pub fn letter(self) -> char {
        match self {
            MaskList::Ban => 'b',
            MaskList::Except => 'e',
            MaskList::Invex => 'I',
        }
    }
}

/// A channel.
#[derive(Debug)]
pub struct Channel {
    /// Display casing of the name.
    pub name: String,
    /// TS6 creation time; rewritten downward by SJOIN reconciliation.
    pub creation_time: i64,
    /// Monotonic second of the last join, for flood decay.
    pub last_join_time: u64,
    /// Join-flood accumulator.
    pub number_joined: f32,
    /// Oper notice already sent for the current saturation.
    pub join_flood_noticed: bool,
    /// Simple mode bits.
    pub modes: ChannelModes,
    /// +k key; empty = unset.
    pub key: String,
    /// +l limit; 0 = unset.
    pub limit: usize,
    /// +b list.
    pub banlist: Vec<Ban>,
    /// +e list.
    pub exceptlist: Vec<Ban>,
    /// +I list.
    pub invexlist: Vec<Ban>,
    /// Pending single-use invites, by UID.
    pub invites: HashSet<Uid>,
    /// Topic text; empty = unset.
    pub topic: String,
    /// `nick!user@host` of the topic setter.
    pub topic_info: String,
    /// Wall-clock second of the topic.
    pub topic_time: i64,
    /// Membership: UID to flags. The local view is obtained by filtering
    /// through the client registry, which keeps this the single source of
    /// truth for invariant checks.
    pub members: HashMap<Uid, MemberFlags>,
}

impl Channel {
    /// Fresh channel; the caller stamps `creation_time` from the clock.
    pub fn new(name: &str, creation_time: i64, now_monotonic: u64) -> Self {
        Channel {
            name: name.to_owned(),
            creation_time,
            last_join_time: now_monotonic,
            number_joined: 0.0,
            join_flood_noticed: false,
            modes: ChannelModes::empty(),
            key: String::new(),
            limit: 0,
            banlist: Vec::new(),
            exceptlist: Vec::new(),
            invexlist: Vec::new(),
            invites: HashSet::new(),
            topic: String::new(),
            topic_info: String::new(),
            topic_time: 0,
            members: HashMap::new(),
        }
    }

    /// Is `uid` on the channel?
    #[inline]
    pub fn is_member(&self, uid: &str) -> bool {
        self.members.contains_key(uid)
    }

    /// Member flags for `uid`.
    #[inline]
    pub fn member(&self, uid: &str) -> Option<MemberFlags> {
        self.members.get(uid).copied()
    }

    /// Publicly listed (neither secret nor private)?
    #[inline]
    pub fn is_public(&self) -> bool {
        !self.modes.has(ChannelModes::SECRET) && !self.modes.has(ChannelModes::PRIVATE)
    }

    /// NAMES/LIST visibility sigil: `@` secret, `*` private, `=` public.
    pub fn pub_or_secret(&self) -> &'static str {
        if self.modes.has(ChannelModes::SECRET) {
            "@"
        } else if self.modes.has(ChannelModes::PRIVATE) {
            "*"
        } else {
            "="
        }
    }

    /// Access one of the three mask lists.
    pub fn mask_list(&self, which: MaskList) -> &Vec<Ban> {
        match which {
            MaskList::Ban => &self.banlist,
            MaskList::Except => &self.exceptlist,
            MaskList::Invex => &self.invexlist,
        }
    }

    /// Mutable access to one of the three mask lists.
    pub fn mask_list_mut(&mut self, which: MaskList) -> &mut Vec<Ban> {
        match which {
            MaskList::Ban => &mut self.banlist,
            MaskList::Except => &mut self.exceptlist,
            MaskList::Invex => &mut self.invexlist,
        }
    }

    /// Drop every member's cached ban verdict. Called after any mutation
    /// of the ban or exception list; invex changes do not reach here.
    pub fn invalidate_ban_cache(&mut self) {
        for flags in self.members.values_mut() {
            flags.clear(MemberFlags::BAN_CHECKED);
            flags.clear(MemberFlags::BAN_SILENCED);
        }
    }

    /// The mode string `+<letters>[<key>][<limit>]` with parameters,
    /// as used by MODE 324 replies and SJOIN emission. Key is shown only
    /// when `show_key`; otherwise `*` stands in, matching burst behaviour
    /// towards links that may leak to users.
    pub fn modes_string(&self, show_key: bool) -> String {
        let mut letters = String::from("+");
        letters.push_str(&self.modes.letters());
        let mut params = String::new();

        if !self.key.is_empty() {
            letters.push('k');
            params.push(' ');
            params.push_str(if show_key { &self.key } else { "*" });
        }
        if self.limit != 0 {
            letters.push('l');
            params.push(' ');
            params.push_str(&self.limit.to_string());
        }

        letters + &params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chan() -> Channel {
        Channel::new("#test", 1_600_000_000, 0)
    }

    #[test]
    fn new_channel_is_empty_and_public() {
        let c = chan();
        assert!(c.members.is_empty());
        assert!(c.is_public());
        assert_eq!(c.pub_or_secret(), "=");
    }

    #[test]
    fn visibility_sigils() {
        let mut c = chan();
        c.modes.set(ChannelModes::SECRET);
        assert_eq!(c.pub_or_secret(), "@");
        c.modes.clear(ChannelModes::SECRET);
        c.modes.set(ChannelModes::PRIVATE);
        assert_eq!(c.pub_or_secret(), "*");
    }

    #[test]
    fn modes_string_with_params() {
        let mut c = chan();
        c.modes.set(ChannelModes::NOPRIVMSGS);
        c.modes.set(ChannelModes::TOPICLIMIT);
        assert_eq!(c.modes_string(true), "+nt");

        c.key = "secret".to_owned();
        c.limit = 10;
        assert_eq!(c.modes_string(true), "+ntkl secret 10");
        assert_eq!(c.modes_string(false), "+ntkl * 10");
    }

    #[test]
    fn ban_cache_invalidation_clears_both_bits() {
        let mut c = chan();
        let mut flags = MemberFlags::empty();
        flags.set(MemberFlags::CHANOP);
        flags.set(MemberFlags::BAN_CHECKED);
        flags.set(MemberFlags::BAN_SILENCED);
        c.members.insert("0FEAAAAAA".to_owned(), flags);

        c.invalidate_ban_cache();
        let flags = c.member("0FEAAAAAA").unwrap();
        assert!(!flags.has(MemberFlags::BAN_CHECKED));
        assert!(!flags.has(MemberFlags::BAN_SILENCED));
        assert!(flags.has(MemberFlags::CHANOP));
    }
}
