//! Ban-mask parsing and matching.
//!
//! A mask is either an extban (`$`-led, see [`crate::security::extban`])
//! or a `nick!user@host` wildcard triple whose host part may be a literal
//! CIDR range. Parsing happens once at set time; matching walks the
//! parsed form and never re-tokenizes.

use ipnet::IpNet;

use ferric_proto::match_mask;

use crate::security::extban::{Action, Extban};
use crate::state::channel::{Ban, Channel, HostMatch};
use crate::state::client::Client;

/// Split a `nick!user@host` mask into its parts, substituting `*` for
/// anything absent or empty.
fn split_nuh(mask: &str) -> (String, String, String) {
    let star = || "*".to_owned();

    let (nick, rest) = match mask.split_once('!') {
        Some((n, r)) => (n, r),
        None => ("", mask),
    };
    let (user, host) = match rest.split_once('@') {
        Some((u, h)) => (u, h),
        // No `@` anywhere: a bare token is a nick mask.
        None => {
            if mask.contains('!') {
                (rest, "")
            } else {
                return (if mask.is_empty() { star() } else { mask.to_owned() }, star(), star());
            }
        }
    };

    let fix = |s: &str| if s.is_empty() { star() } else { s.to_owned() };
    (fix(nick), fix(user), fix(host))
}

/// Parse `mask` into a [`Ban`] record.
pub fn ban_make(mask: &str, setter: &str, when: i64) -> Ban {
    let extban = Extban::parse(mask);

    let (nick, user, host) = if extban.is_some() {
        ("*".to_owned(), "*".to_owned(), "*".to_owned())
    } else {
        split_nuh(mask)
    };

    let htype = match host.parse::<IpNet>() {
        Ok(net) => HostMatch::Cidr(net),
        Err(_) => match host.parse::<std::net::IpAddr>() {
            Ok(addr) => HostMatch::Cidr(IpNet::from(addr)),
            Err(_) => HostMatch::Host,
        },
    };

    Ban {
        mask: mask.to_owned(),
        nick,
        user,
        host,
        htype,
        extban,
        setter: setter.to_owned(),
        when,
    }
}

/// Does `ban` select `client`? Extban entries dispatch to their matcher;
/// plain masks compare nick and user first, then the host by its parsed
/// type: wildcard against real host, sock host and visible host, or CIDR
/// against the stored IP when address families agree.
pub fn ban_matches(ban: &Ban, client: &Client, server_name: &str) -> bool {
    if let Some(extban) = &ban.extban {
        return match extban {
            Extban::Matching(m) => m.matches(client, server_name),
            Extban::Acting(_, inner) => inner.matches(client, server_name),
        };
    }

    if !match_mask(&ban.nick, &client.name) || !match_mask(&ban.user, &client.username) {
        return false;
    }

    match &ban.htype {
        HostMatch::Host => {
            match_mask(&ban.host, &client.realhost)
                || match_mask(&ban.host, &client.sockhost)
                || match_mask(&ban.host, &client.host)
        }
        HostMatch::Cidr(net) => match client.ip {
            Some(ip) => net.contains(&ip),
            None => false,
        },
    }
}

/// Walk a mask list looking for a match on `client`.
///
/// With `action == None` this is the general-purpose walk: acting extbans
/// are skipped since they fire only at their own hook. With
/// `action == Some(a)` only acting entries for `a` are considered.
pub fn find_bmask(
    list: &[Ban],
    client: &Client,
    server_name: &str,
    action: Option<Action>,
) -> bool {
    list.iter().any(|ban| {
        let entry_action = ban.extban.as_ref().and_then(Extban::action);
        if entry_action != action {
            return false;
        }
        ban_matches(ban, client, server_name)
    })
}

/// The ban verdict: matched by the ban list and not excused by the
/// exception list.
pub fn is_banned(channel: &Channel, client: &Client, server_name: &str) -> bool {
    find_bmask(&channel.banlist, client, server_name, None)
        && !find_bmask(&channel.exceptlist, client, server_name, None)
}

/// Is `client` selected by an acting extban of kind `action` in the ban
/// list, without an exception-list entry of the same kind?
pub fn acting_ban(
    channel: &Channel,
    client: &Client,
    server_name: &str,
    action: Action,
) -> bool {
    find_bmask(&channel.banlist, client, server_name, Some(action))
        && !find_bmask(&channel.exceptlist, client, server_name, Some(action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::client::Status;

    fn client() -> Client {
        let mut c = Client::new("0FEAAAAAA".to_owned(), Status::Client);
        c.name = "eve".to_owned();
        c.username = "e".to_owned();
        c.host = "cloak.example".to_owned();
        c.realhost = "bad.host".to_owned();
        c.sockhost = "192.0.2.7".to_owned();
        c.ip = Some("192.0.2.7".parse().unwrap());
        c.info = "Eve".to_owned();
        c
    }

    #[test]
    fn split_nuh_variants() {
        assert_eq!(
            split_nuh("n!u@h"),
            ("n".to_owned(), "u".to_owned(), "h".to_owned())
        );
        assert_eq!(
            split_nuh("*!*@bad.host"),
            ("*".to_owned(), "*".to_owned(), "bad.host".to_owned())
        );
        assert_eq!(
            split_nuh("eve"),
            ("eve".to_owned(), "*".to_owned(), "*".to_owned())
        );
        assert_eq!(
            split_nuh("!@"),
            ("*".to_owned(), "*".to_owned(), "*".to_owned())
        );
    }

    #[test]
    fn host_mask_matches_any_host_view() {
        let ban = ban_make("*!*@bad.host", "oper!o@h", 0);
        assert!(ban_matches(&ban, &client(), "srv"));

        let ban = ban_make("*!*@cloak.example", "oper!o@h", 0);
        assert!(ban_matches(&ban, &client(), "srv"));

        let ban = ban_make("*!*@elsewhere", "oper!o@h", 0);
        assert!(!ban_matches(&ban, &client(), "srv"));
    }

    #[test]
    fn cidr_mask_compares_ip() {
        let ban = ban_make("*!*@192.0.2.0/24", "oper!o@h", 0);
        assert!(matches!(ban.htype, HostMatch::Cidr(_)));
        assert!(ban_matches(&ban, &client(), "srv"));

        let ban = ban_make("*!*@198.51.100.0/24", "oper!o@h", 0);
        assert!(!ban_matches(&ban, &client(), "srv"));

        // v6 range never matches a v4 client.
        let ban = ban_make("*!*@2001:db8::/32", "oper!o@h", 0);
        assert!(!ban_matches(&ban, &client(), "srv"));
    }

    #[test]
    fn nick_part_gates_host_check() {
        let ban = ban_make("mallory!*@bad.host", "oper!o@h", 0);
        assert!(!ban_matches(&ban, &client(), "srv"));
    }

    #[test]
    fn is_banned_respects_exceptions() {
        let mut chan = Channel::new("#r", 0, 0);
        chan.banlist.push(ban_make("*!*@bad.host", "o!o@h", 0));
        assert!(is_banned(&chan, &client(), "srv"));

        chan.exceptlist.push(ban_make("$~n:eve", "o!o@h", 0));
        assert!(!is_banned(&chan, &client(), "srv"));
    }

    #[test]
    fn acting_extbans_skipped_in_general_walk() {
        let mut chan = Channel::new("#r", 0, 0);
        chan.banlist.push(ban_make("$m:*!*@bad.host", "o!o@h", 0));
        assert!(!is_banned(&chan, &client(), "srv"));
        assert!(acting_ban(&chan, &client(), "srv", Action::Mute));
        assert!(!acting_ban(&chan, &client(), "srv", Action::Join));
    }
}
