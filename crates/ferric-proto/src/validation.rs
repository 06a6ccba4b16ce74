//! Identifier validity predicates and size limits.
//!
//! These are the gatekeepers in front of every index insertion: nicknames,
//! hostnames and channel names are validated here before the server ever
//! creates a record for them. Remote (server-introduced) identifiers get a
//! wider character set than locally created ones, matching the traditional
//! TS6 behaviour of trusting peers more than users.

/// Maximum nickname length.
pub const NICK_LEN: usize = 30;
/// Maximum username (ident) length.
pub const USER_LEN: usize = 10;
/// Maximum hostname length.
pub const HOST_LEN: usize = 63;
/// Maximum channel name length.
pub const CHANNEL_LEN: usize = 50;
/// Maximum stored topic length; the visible cap is configured lower.
pub const TOPIC_LEN: usize = 390;
/// Maximum channel key length.
pub const KEY_LEN: usize = 24;
/// Maximum GECOS/realname length.
pub const REAL_LEN: usize = 50;
/// Maximum away message length.
pub const AWAY_LEN: usize = 180;
/// Maximum kick/part/quit reason length.
pub const REASON_LEN: usize = 180;

#[inline]
fn is_nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '[' | ']' | '\\' | '`' | '^' | '{' | '}' | '|' | '_' | '-')
}

/// Check a nickname for validity.
///
/// Local clients may not start a nick with a digit or `-`; nicks introduced
/// by servers are allowed to (TS6 peers enforce their own rules).
pub fn valid_nickname(name: &str, local: bool) -> bool {
    if name.is_empty() || name.len() > NICK_LEN {
        return false;
    }

    let mut chars = name.chars();
    let first = chars.next().expect("non-empty");

    if !is_nick_char(first) {
        return false;
    }
    if local && (first.is_ascii_digit() || first == '-') {
        return false;
    }

    chars.all(is_nick_char)
}

/// Check a username (ident) for validity.
pub fn valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= USER_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// Check a hostname for validity.
///
/// Accepts DNS labels and textual IP addresses; rejects a leading `.` or
/// `:` so a spoofed host can never be mistaken for a trailing parameter.
pub fn valid_hostname(name: &str) -> bool {
    if name.is_empty() || name.len() > HOST_LEN {
        return false;
    }
    if name.starts_with('.') || name.starts_with(':') {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '/'))
}

/// Is `c` one of the channel name prefix sigils?
#[inline]
pub fn is_chan_prefix(c: char) -> bool {
    matches!(c, '#' | '&' | '+' | '!')
}

/// Wide channel-name character set, used for server-introduced channels:
/// printable, not a space, comma, colon or BEL.
#[inline]
fn is_chan_char(c: char) -> bool {
    c >= '!' && c != ',' && c != ':' && c != '\u{7f}'
}

/// Strict "visible" subset: plain ASCII graphics only. Applied to local
/// creations when fake-lookalike channel names are disabled.
#[inline]
fn is_visible_chan_char(c: char) -> bool {
    c.is_ascii_graphic() && c != ',' && c != ':'
}

/// Check a channel name for validity.
///
/// `strict` selects the visible subset for the non-sigil characters; pass
/// it for local creations when the `disable_fake_channels` knob is on.
pub fn channel_check_name(name: &str, strict: bool) -> bool {
    if name.is_empty() || name.len() > CHANNEL_LEN {
        return false;
    }

    let mut chars = name.chars();
    if !is_chan_prefix(chars.next().expect("non-empty")) {
        return false;
    }

    if strict {
        chars.all(is_visible_chan_char)
    } else {
        chars.all(is_chan_char)
    }
}

/// Check a TS6 server ID: one digit followed by two uppercase alphanumerics.
pub fn valid_sid(sid: &str) -> bool {
    let b = sid.as_bytes();
    b.len() == 3
        && b[0].is_ascii_digit()
        && b[1..]
            .iter()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

/// Check a TS6 client UID: a SID followed by six uppercase alphanumerics.
pub fn valid_uid(uid: &str) -> bool {
    let b = uid.as_bytes();
    b.len() == 9
        && valid_sid(&uid[..3])
        && b[3..]
            .iter()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_basic() {
        assert!(valid_nickname("alice", true));
        assert!(valid_nickname("a[b]c^", true));
        assert!(valid_nickname("x_-`", true));
        assert!(!valid_nickname("", true));
        assert!(!valid_nickname("with space", true));
        assert!(!valid_nickname("a#b", true));
    }

    #[test]
    fn nickname_leading_chars() {
        assert!(!valid_nickname("1abc", true));
        assert!(!valid_nickname("-abc", true));
        // Remote introductions get the relaxed rule.
        assert!(valid_nickname("1abc", false));
    }

    #[test]
    fn nickname_length_bound() {
        let long = "a".repeat(NICK_LEN);
        assert!(valid_nickname(&long, true));
        let too_long = "a".repeat(NICK_LEN + 1);
        assert!(!valid_nickname(&too_long, true));
    }

    #[test]
    fn hostname_basic() {
        assert!(valid_hostname("irc.example.org"));
        assert!(valid_hostname("2001:db8::1"));
        assert!(valid_hostname("host-1.tld"));
        assert!(!valid_hostname(":leading"));
        assert!(!valid_hostname(".leading"));
        assert!(!valid_hostname("spaces in.host"));
        assert!(!valid_hostname(""));
    }

    #[test]
    fn channel_name_prefixes() {
        for p in ['#', '&', '+', '!'] {
            assert!(channel_check_name(&format!("{p}chan"), true));
        }
        assert!(!channel_check_name("chan", true));
        assert!(!channel_check_name("", true));
    }

    #[test]
    fn channel_name_charsets() {
        assert!(!channel_check_name("#a,b", false));
        assert!(!channel_check_name("#a:b", false));
        assert!(!channel_check_name("#a b", false));
        // Non-ASCII allowed from servers, refused locally under strict.
        assert!(channel_check_name("#caf\u{e9}", false));
        assert!(!channel_check_name("#caf\u{e9}", true));
    }

    #[test]
    fn channel_name_length_bound() {
        let name = format!("#{}", "c".repeat(CHANNEL_LEN - 1));
        assert!(channel_check_name(&name, true));
        assert!(!channel_check_name(&format!("{name}c"), true));
    }

    #[test]
    fn sid_and_uid() {
        assert!(valid_sid("0AB"));
        assert!(valid_sid("999"));
        assert!(!valid_sid("A00"));
        assert!(!valid_sid("00"));
        assert!(valid_uid("0ABAAAAAB"));
        assert!(valid_uid("001A2B3C4"));
        assert!(!valid_uid("001aaaaab"));
        assert!(!valid_uid("001AAAA"));
    }
}
