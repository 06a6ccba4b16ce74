//! Small helpers shared across the wire layer and the server.

use crate::casemap::fold_char;

/// Maximum length of a message body on the wire, including CRLF.
pub const LINE_MAX: usize = 512;

/// Maximum number of parameters after the command.
pub const MAX_PARA: usize = 15;

/// Truncates a string to at most `max_bytes` bytes without splitting a
/// multi-byte UTF-8 codepoint.
///
/// All bounded fields in the server (nick, channel, topic, key, host) are
/// copied through this; oversized input is silently cut, never rejected.
///
/// ```
/// use ferric_proto::util::truncate_bytes;
///
/// assert_eq!(truncate_bytes("hello world", 5), "hello");
/// assert_eq!(truncate_bytes("hi", 10), "hi");
/// ```
#[inline]
pub fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    // The fast path: the limit lands on a codepoint boundary (always
    // true for the ASCII that dominates IRC traffic).
    if let Some(prefix) = s.get(..max_bytes) {
        return prefix;
    }
    if max_bytes >= s.len() {
        return s;
    }

    // The limit split a codepoint; cut at the nearest start before it.
    let cut = (0..max_bytes)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..cut]
}

/// IRC wildcard match under RFC 1459 case folding.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one. Everything else compares folded. This is the matcher used for ban
/// masks, watch names and WHOIS channel visibility; it must not allocate.
///
/// ```
/// use ferric_proto::util::match_mask;
///
/// assert!(match_mask("*!*@bad.host", "eve!e@bad.host"));
/// assert!(match_mask("Nick[1]", "nick{1}"));
/// assert!(match_mask("user?", "user1"));
/// assert!(!match_mask("user?", "user12"));
/// ```
pub fn match_mask(mask: &str, text: &str) -> bool {
    let mask: Vec<char> = mask.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut m, mut t) = (0usize, 0usize);
    // Backtrack points for the most recent '*'.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if m < mask.len() && mask[m] == '*' {
            // Collapse consecutive stars, remember the restart point.
            while m < mask.len() && mask[m] == '*' {
                m += 1;
            }
            star = Some((m, t));
        } else if m < mask.len()
            && (mask[m] == '?' || fold_char(mask[m]) == fold_char(text[t]))
        {
            m += 1;
            t += 1;
        } else if let Some((sm, st)) = star {
            // Mismatch after a star: consume one more text char under it.
            m = sm;
            t = st + 1;
            star = Some((sm, t));
        } else {
            return false;
        }
    }

    while m < mask.len() && mask[m] == '*' {
        m += 1;
    }

    m == mask.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_is_noop_when_short() {
        assert_eq!(truncate_bytes("abc", 16), "abc");
        assert_eq!(truncate_bytes("", 4), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ab\u{e9}cd"; // é is two bytes
        assert_eq!(truncate_bytes(s, 3), "ab");
        assert_eq!(truncate_bytes(s, 4), "ab\u{e9}");
    }

    #[test]
    fn match_literal_folds() {
        assert!(match_mask("NICK", "nick"));
        assert!(match_mask("a[b]c", "A{B}C"));
        assert!(!match_mask("nick", "nick2"));
    }

    #[test]
    fn match_star_runs() {
        assert!(match_mask("*", ""));
        assert!(match_mask("*", "anything"));
        assert!(match_mask("*bot*", "mybot123"));
        assert!(match_mask("*!*@*.example.org", "n!u@irc.example.org"));
        assert!(!match_mask("*.example.org", "example.org"));
    }

    #[test]
    fn match_question_exactly_one() {
        assert!(match_mask("user?", "user1"));
        assert!(!match_mask("user?", "user"));
        assert!(!match_mask("user?", "user12"));
    }

    #[test]
    fn match_star_backtracks() {
        assert!(match_mask("*abc*abc", "xabcyabcabc"));
        assert!(!match_mask("*abc*abd", "xabcyabcabc"));
    }
}
