//! Mode, flag and capability bitsets.
//!
//! Every per-client and per-channel boolean lives in one of these integer
//! bitsets with a named constant, set/clear/test operations, and - where a
//! wire representation exists - a letter table. Keeping them as integers
//! makes the SJOIN mode union and the umode diff in SVSNICK single
//! instructions instead of field-by-field copies.

/// Per-user mode bits (`+i`, `+o`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserModes(u32);

impl UserModes {
    /// +i - invisible to NAMES/WHO from strangers
    pub const INVISIBLE: UserModes = UserModes(1 << 0);
    /// +o - IRC operator
    pub const OPER: UserModes = UserModes(1 << 1);
    /// +a - server administrator
    pub const ADMIN: UserModes = UserModes(1 << 2);
    /// +r - identified to services
    pub const REGISTERED: UserModes = UserModes(1 << 3);
    /// +S - TLS connection
    pub const SECURE: UserModes = UserModes(1 << 4);
    /// +g - caller-id: server-side ignore
    pub const CALLERID: UserModes = UserModes(1 << 5);
    /// +G - caller-id except common channels
    pub const SOFTCALLERID: UserModes = UserModes(1 << 6);
    /// +H - oper status hidden from non-opers
    pub const HIDDEN: UserModes = UserModes(1 << 7);
    /// +p - channel list hidden in WHOIS
    pub const HIDECHANS: UserModes = UserModes(1 << 8);
    /// +q - idle time hidden in WHOIS
    pub const HIDEIDLE: UserModes = UserModes(1 << 9);
    /// +W - connected through a WebIRC gateway
    pub const WEBIRC: UserModes = UserModes(1 << 10);
    /// +y - notified when targeted by WHOIS
    pub const SPY: UserModes = UserModes(1 << 11);
    /// +d - receives debug-class server notices
    pub const DEBUG: UserModes = UserModes(1 << 12);
    /// +b - receives flood/spambot server notices
    pub const BOTS: UserModes = UserModes(1 << 13);

    const TABLE: &'static [(char, UserModes)] = &[
        ('a', Self::ADMIN),
        ('b', Self::BOTS),
        ('d', Self::DEBUG),
        ('g', Self::CALLERID),
        ('G', Self::SOFTCALLERID),
        ('H', Self::HIDDEN),
        ('i', Self::INVISIBLE),
        ('o', Self::OPER),
        ('p', Self::HIDECHANS),
        ('q', Self::HIDEIDLE),
        ('r', Self::REGISTERED),
        ('S', Self::SECURE),
        ('W', Self::WEBIRC),
        ('y', Self::SPY),
    ];

    /// Empty set.
    pub const fn empty() -> Self {
        UserModes(0)
    }

    /// Test for any of the bits in `m`.
    #[inline]
    pub fn has(self, m: UserModes) -> bool {
        self.0 & m.0 != 0
    }

    /// Set the bits in `m`.
    #[inline]
    pub fn set(&mut self, m: UserModes) {
        self.0 |= m.0;
    }

    /// Clear the bits in `m`.
    #[inline]
    pub fn clear(&mut self, m: UserModes) {
        self.0 &= !m.0;
    }

    /// Look up a mode letter.
    pub fn from_letter(c: char) -> Option<UserModes> {
        Self::TABLE.iter().find(|(l, _)| *l == c).map(|&(_, m)| m)
    }

    /// Render as a `+...` string; bare `+` when empty.
    pub fn letters(self) -> String {
        let mut s = String::from("+");
        for &(c, m) in Self::TABLE {
            if self.has(m) {
                s.push(c);
            }
        }
        s
    }

    /// Render the umode difference `old` → `self` as `-...+...`.
    ///
    /// Empty string when nothing changed.
    pub fn diff(self, old: UserModes) -> String {
        let mut out = String::new();
        let removed = old.0 & !self.0;
        let added = self.0 & !old.0;

        if removed != 0 {
            out.push('-');
            for &(c, m) in Self::TABLE {
                if removed & m.0 != 0 {
                    out.push(c);
                }
            }
        }
        if added != 0 {
            out.push('+');
            for &(c, m) in Self::TABLE {
                if added & m.0 != 0 {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Parse a `+`-prefixed umode word from a UID/EUID introduction.
    pub fn from_word(word: &str) -> UserModes {
        let mut modes = UserModes::empty();
        for c in word.chars() {
            if c == '+' {
                continue;
            }
            if let Some(m) = Self::from_letter(c) {
                modes.set(m);
            }
        }
        modes
    }
}

/// Non-mode per-client flags. Never visible on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientFlags(u32);

impl ClientFlags {
    /// Network service: exempt from most policy checks.
    pub const SERVICE: ClientFlags = ClientFlags(1 << 0);
    /// Exempt from channel reservations.
    pub const EXEMPTRESV: ClientFlags = ClientFlags(1 << 1);
    /// Ident lookup succeeded.
    pub const GOTID: ClientFlags = ClientFlags(1 << 2);
    /// Marked for reaping; sends to this client are no-ops.
    pub const DEAD: ClientFlags = ClientFlags(1 << 3);
    /// Server link has completed its burst.
    pub const EOB: ClientFlags = ClientFlags(1 << 4);
    /// Removed by KILL; exit must not re-announce to servers.
    pub const KILLED: ClientFlags = ClientFlags(1 << 5);

    #[inline]
    pub fn has(self, f: ClientFlags) -> bool {
        self.0 & f.0 != 0
    }

    #[inline]
    pub fn set(&mut self, f: ClientFlags) {
        self.0 |= f.0;
    }

    #[inline]
    pub fn clear(&mut self, f: ClientFlags) {
        self.0 &= !f.0;
    }
}

/// IRCv3 client capabilities negotiated via CAP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caps(u16);

impl Caps {
    pub const MULTI_PREFIX: Caps = Caps(1 << 0);
    pub const UHNAMES: Caps = Caps(1 << 1);
    pub const AWAY_NOTIFY: Caps = Caps(1 << 2);
    pub const EXTENDED_JOIN: Caps = Caps(1 << 3);
    pub const ACCOUNT_NOTIFY: Caps = Caps(1 << 4);
    pub const SERVER_TIME: Caps = Caps(1 << 5);

    const TABLE: &'static [(&'static str, Caps)] = &[
        ("multi-prefix", Self::MULTI_PREFIX),
        ("userhost-in-names", Self::UHNAMES),
        ("away-notify", Self::AWAY_NOTIFY),
        ("extended-join", Self::EXTENDED_JOIN),
        ("account-notify", Self::ACCOUNT_NOTIFY),
        ("server-time", Self::SERVER_TIME),
    ];

    pub const fn empty() -> Self {
        Caps(0)
    }

    #[inline]
    pub fn has(self, c: Caps) -> bool {
        self.0 & c.0 != 0
    }

    #[inline]
    pub fn set(&mut self, c: Caps) {
        self.0 |= c.0;
    }

    #[inline]
    pub fn clear(&mut self, c: Caps) {
        self.0 &= !c.0;
    }

    /// Look up a capability token.
    pub fn find(token: &str) -> Option<Caps> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == token)
            .map(|&(_, c)| c)
    }

    /// Every token we advertise in `CAP LS`.
    pub fn all_tokens() -> impl Iterator<Item = &'static str> {
        Self::TABLE.iter().map(|&(name, _)| name)
    }

    /// Tokens currently enabled, for `CAP LIST`.
    pub fn tokens(self) -> Vec<&'static str> {
        Self::TABLE
            .iter()
            .filter(|&&(_, c)| self.has(c))
            .map(|&(name, _)| name)
            .collect()
    }
}

/// Server-link capabilities accumulated from CAPAB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capab(u16);

impl Capab {
    /// Quit storm: peer understands netsplit-aware quits.
    pub const QS: Capab = Capab(1 << 0);
    /// ENCAP routing.
    pub const ENCAP: Capab = Capab(1 << 1);
    /// Ban exceptions (+e).
    pub const EX: Capab = Capab(1 << 2);
    /// Invite exceptions (+I).
    pub const IE: Capab = Capab(1 << 3);
    /// Topic burst.
    pub const TB: Capab = Capab(1 << 4);
    /// End-of-burst marker.
    pub const EOB: Capab = Capab(1 << 5);
    /// Services extensions (SVSNICK et al).
    pub const SVS: Capab = Capab(1 << 6);
    /// K-line propagation.
    pub const KLN: Capab = Capab(1 << 7);

    const TABLE: &'static [(&'static str, Capab)] = &[
        ("QS", Self::QS),
        ("ENCAP", Self::ENCAP),
        ("EX", Self::EX),
        ("IE", Self::IE),
        ("TB", Self::TB),
        ("EOB", Self::EOB),
        ("SVS", Self::SVS),
        ("KLN", Self::KLN),
    ];

    pub const fn empty() -> Self {
        Capab(0)
    }

    #[inline]
    pub fn has(self, c: Capab) -> bool {
        self.0 & c.0 != 0
    }

    #[inline]
    pub fn set(&mut self, c: Capab) {
        self.0 |= c.0;
    }

    /// Look up a CAPAB token; unknown tokens yield `None` and are ignored.
    pub fn find(token: &str) -> Option<Capab> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == token)
            .map(|&(_, c)| c)
    }

    /// The token list we send in our own CAPAB.
    pub fn our_tokens() -> impl Iterator<Item = &'static str> {
        Self::TABLE.iter().map(|&(name, _)| name)
    }
}

/// Channel mode bits. Key and limit carry parameters and live as separate
/// fields on the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelModes(u32);

impl ChannelModes {
    /// +s - secret
    pub const SECRET: ChannelModes = ChannelModes(1 << 0);
    /// +p - private
    pub const PRIVATE: ChannelModes = ChannelModes(1 << 1);
    /// +m - moderated
    pub const MODERATED: ChannelModes = ChannelModes(1 << 2);
    /// +i - invite only
    pub const INVITEONLY: ChannelModes = ChannelModes(1 << 3);
    /// +n - no messages from outside
    pub const NOPRIVMSGS: ChannelModes = ChannelModes(1 << 4);
    /// +t - topic settable by ops only
    pub const TOPICLIMIT: ChannelModes = ChannelModes(1 << 5);
    /// +c - no control codes
    pub const NOCTRL: ChannelModes = ChannelModes(1 << 6);
    /// +C - no CTCP except ACTION
    pub const NOCTCP: ChannelModes = ChannelModes(1 << 7);
    /// +N - no NOTICE
    pub const NONOTICE: ChannelModes = ChannelModes(1 << 8);
    /// +M - only registered nicks may speak
    pub const MODREG: ChannelModes = ChannelModes(1 << 9);
    /// +r - only registered nicks may join
    pub const REGONLY: ChannelModes = ChannelModes(1 << 10);
    /// +O - opers only
    pub const OPERONLY: ChannelModes = ChannelModes(1 << 11);
    /// +S - TLS users only
    pub const SECUREONLY: ChannelModes = ChannelModes(1 << 12);

    const TABLE: &'static [(char, ChannelModes)] = &[
        ('c', Self::NOCTRL),
        ('C', Self::NOCTCP),
        ('i', Self::INVITEONLY),
        ('m', Self::MODERATED),
        ('M', Self::MODREG),
        ('n', Self::NOPRIVMSGS),
        ('N', Self::NONOTICE),
        ('O', Self::OPERONLY),
        ('p', Self::PRIVATE),
        ('r', Self::REGONLY),
        ('s', Self::SECRET),
        ('S', Self::SECUREONLY),
        ('t', Self::TOPICLIMIT),
    ];

    pub const fn empty() -> Self {
        ChannelModes(0)
    }

    #[inline]
    pub fn has(self, m: ChannelModes) -> bool {
        self.0 & m.0 != 0
    }

    #[inline]
    pub fn set(&mut self, m: ChannelModes) {
        self.0 |= m.0;
    }

    #[inline]
    pub fn clear(&mut self, m: ChannelModes) {
        self.0 &= !m.0;
    }

    /// Union with another set (SJOIN equal-TS merge).
    #[inline]
    pub fn union(&mut self, other: ChannelModes) {
        self.0 |= other.0;
    }

    /// Look up a simple-mode letter.
    pub fn from_letter(c: char) -> Option<ChannelModes> {
        Self::TABLE.iter().find(|(l, _)| *l == c).map(|&(_, m)| m)
    }

    /// Mode letters set, without the `+` and without key/limit.
    pub fn letters(self) -> String {
        let mut s = String::new();
        for &(c, m) in Self::TABLE {
            if self.has(m) {
                s.push(c);
            }
        }
        s
    }
}

/// Per-membership flags: the wire-visible prefixes plus the ban cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberFlags(u8);

impl MemberFlags {
    /// `@` channel operator
    pub const CHANOP: MemberFlags = MemberFlags(1 << 0);
    /// `%` half-op
    pub const HALFOP: MemberFlags = MemberFlags(1 << 1);
    /// `+` voice
    pub const VOICE: MemberFlags = MemberFlags(1 << 2);
    /// Ban cache: result valid
    pub const BAN_CHECKED: MemberFlags = MemberFlags(1 << 3);
    /// Ban cache: member is silenced
    pub const BAN_SILENCED: MemberFlags = MemberFlags(1 << 4);

    pub const fn empty() -> Self {
        MemberFlags(0)
    }

    #[inline]
    pub fn has(self, f: MemberFlags) -> bool {
        self.0 & f.0 != 0
    }

    #[inline]
    pub fn set(&mut self, f: MemberFlags) {
        self.0 |= f.0;
    }

    #[inline]
    pub fn clear(&mut self, f: MemberFlags) {
        self.0 &= !f.0;
    }

    /// Any of `@%+`?
    #[inline]
    pub fn has_prefix(self) -> bool {
        self.has(Self::CHANOP) || self.has(Self::HALFOP) || self.has(Self::VOICE)
    }

    /// Strip all wire-visible prefixes, keeping the ban cache bits.
    #[inline]
    pub fn strip_prefixes(&mut self) {
        self.clear(Self::CHANOP);
        self.clear(Self::HALFOP);
        self.clear(Self::VOICE);
    }

    /// Parse one SJOIN prefix character.
    pub fn from_prefix_char(c: char) -> Option<MemberFlags> {
        match c {
            '@' => Some(Self::CHANOP),
            '%' => Some(Self::HALFOP),
            '+' => Some(Self::VOICE),
            _ => None,
        }
    }

    /// Status string: all of `@%+` when `combine`, else the highest alone.
    pub fn status(self, combine: bool) -> String {
        let mut s = String::new();
        if self.has(Self::CHANOP) {
            if !combine {
                return "@".to_owned();
            }
            s.push('@');
        }
        if self.has(Self::HALFOP) {
            if !combine {
                return "%".to_owned();
            }
            s.push('%');
        }
        if self.has(Self::VOICE) {
            if !combine {
                return "+".to_owned();
            }
            s.push('+');
        }
        s
    }
}
