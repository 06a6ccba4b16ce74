//! Extended bans.
//!
//! An extban is a `$`-led mask that dispatches to a matcher over client
//! attributes instead of the `nick!user@host` triple. Two kinds exist:
//!
//! - **matching** extbans select *who* (`$a:account`, `$n:nick`,
//!   `$r:realname`, `$s:server`, `$c:#channel`) and participate in every
//!   list the way ordinary masks do;
//! - **acting** extbans decide *what for* (`$j:` join veto, `$m:` mute)
//!   and wrap an inner mask, e.g. `$m:*!*@spam.host` silences without
//!   blocking the join. Acting entries are skipped by general-purpose ban
//!   walks and consulted only at their own hook.
//!
//! Syntax note: a `~` immediately after the `$` is accepted and ignored
//! for compatibility with networks that write extbans as `$~x:...`; it
//! selects the same matcher.

use ferric_proto::{match_mask, Folded};

use crate::state::client::Client;

/// A matching extban: selects clients by attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// `$a:pattern` - services account.
    Account(String),
    /// `$c:#channel` - membership of another channel.
    Channel(Folded),
    /// `$n:pattern` - nickname.
    Nick(String),
    /// `$r:pattern` - realname/GECOS.
    Realname(String),
    /// `$s:pattern` - name of the server the client sits on.
    Server(String),
}

/// What an acting extban gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `$j:` - veto joins without showing up as +b.
    Join,
    /// `$m:` - silence without blocking joins.
    Mute,
}

/// The inner selector of an acting extban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inner {
    /// A nested matching extban: `$m:$a:spammer`.
    Matcher(Matcher),
    /// A plain `nick!user@host` wildcard mask.
    Hostmask(String),
}

/// A parsed extban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extban {
    Matching(Matcher),
    Acting(Action, Inner),
}

fn parse_matcher(letter: char, data: &str) -> Option<Matcher> {
    match letter {
        'a' => Some(Matcher::Account(data.to_owned())),
        'c' => Some(Matcher::Channel(Folded::new(data))),
        'n' => Some(Matcher::Nick(data.to_owned())),
        'r' => Some(Matcher::Realname(data.to_owned())),
        's' => Some(Matcher::Server(data.to_owned())),
        _ => None,
    }
}

impl Extban {
    /// Parse a `$`-led mask. Returns `None` for anything that is not a
    /// well-formed extban; the caller then treats the mask as a literal.
    pub fn parse(mask: &str) -> Option<Extban> {
        let body = mask.strip_prefix('$')?;
        let body = body.strip_prefix('~').unwrap_or(body);

        let (letter, data) = match body.split_once(':') {
            Some((flag, data)) => (flag, data),
            None => (body, ""),
        };
        if letter.len() != 1 {
            return None;
        }
        let letter = letter.chars().next().expect("length checked");

        match letter {
            'j' | 'm' => {
                let action = if letter == 'j' { Action::Join } else { Action::Mute };
                if data.is_empty() {
                    return None;
                }
                let inner = if data.starts_with('$') {
                    match Extban::parse(data)? {
                        Extban::Matching(m) => Inner::Matcher(m),
                        // Acting extbans do not nest.
                        Extban::Acting(..) => return None,
                    }
                } else {
                    Inner::Hostmask(data.to_owned())
                };
                Some(Extban::Acting(action, inner))
            }
            _ => {
                if data.is_empty() {
                    return None;
                }
                parse_matcher(letter, data).map(Extban::Matching)
            }
        }
    }

    /// Is this a matching (general-purpose) extban?
    #[inline]
    pub fn is_matching(&self) -> bool {
        matches!(self, Extban::Matching(_))
    }

    /// The acting hook this extban belongs to, if any.
    #[inline]
    pub fn action(&self) -> Option<Action> {
        match self {
            Extban::Acting(action, _) => Some(*action),
            Extban::Matching(_) => None,
        }
    }
}

impl Matcher {
    /// Does this matcher select `client`? `server_name` is the resolved
    /// name of the server the client is attached to.
    pub fn matches(&self, client: &Client, server_name: &str) -> bool {
        match self {
            Matcher::Account(pattern) => {
                client.has_account() && match_mask(pattern, &client.account)
            }
            Matcher::Channel(name) => client.channels.contains(name),
            Matcher::Nick(pattern) => match_mask(pattern, &client.name),
            Matcher::Realname(pattern) => match_mask(pattern, &client.info),
            Matcher::Server(pattern) => match_mask(pattern, server_name),
        }
    }
}

impl Inner {
    /// Does the inner selector of an acting extban select `client`?
    pub fn matches(&self, client: &Client, server_name: &str) -> bool {
        match self {
            Inner::Matcher(m) => m.matches(client, server_name),
            Inner::Hostmask(mask) => {
                match_mask(mask, &client.nuh())
                    || match_mask(
                        mask,
                        &format!("{}!{}@{}", client.name, client.username, client.realhost),
                    )
                    || match_mask(
                        mask,
                        &format!("{}!{}@{}", client.name, client.username, client.sockhost),
                    )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::client::{Client, Status};

    fn client(nick: &str, account: &str, realname: &str) -> Client {
        let mut c = Client::new("0FEAAAAAA".to_owned(), Status::Client);
        c.name = nick.to_owned();
        c.username = "u".to_owned();
        c.host = "host.example".to_owned();
        c.realhost = "host.example".to_owned();
        c.sockhost = "192.0.2.7".to_owned();
        c.account = account.to_owned();
        c.info = realname.to_owned();
        c
    }

    #[test]
    fn parse_matching_forms() {
        assert_eq!(
            Extban::parse("$a:spammer"),
            Some(Extban::Matching(Matcher::Account("spammer".to_owned())))
        );
        assert_eq!(
            Extban::parse("$~n:eve"),
            Some(Extban::Matching(Matcher::Nick("eve".to_owned())))
        );
        assert_eq!(
            Extban::parse("$r:*bot*"),
            Some(Extban::Matching(Matcher::Realname("*bot*".to_owned())))
        );
        assert!(Extban::parse("$x:huh").is_none());
        assert!(Extban::parse("$a").is_none());
        assert!(Extban::parse("notextban").is_none());
    }

    #[test]
    fn parse_acting_forms() {
        assert_eq!(
            Extban::parse("$m:*!*@spam.host"),
            Some(Extban::Acting(
                Action::Mute,
                Inner::Hostmask("*!*@spam.host".to_owned())
            ))
        );
        assert_eq!(
            Extban::parse("$j:$a:troll"),
            Some(Extban::Acting(
                Action::Join,
                Inner::Matcher(Matcher::Account("troll".to_owned()))
            ))
        );
        // Acting extbans do not nest inside each other.
        assert!(Extban::parse("$j:$m:x!y@z").is_none());
    }

    #[test]
    fn account_matcher_needs_login() {
        let m = Matcher::Account("spammer".to_owned());
        assert!(m.matches(&client("x", "spammer", "r"), "srv"));
        assert!(!m.matches(&client("x", "*", "r"), "srv"));
    }

    #[test]
    fn nick_matcher_folds() {
        let m = Matcher::Nick("EVE".to_owned());
        assert!(m.matches(&client("eve", "*", "r"), "srv"));
        assert!(!m.matches(&client("mallory", "*", "r"), "srv"));
    }

    #[test]
    fn channel_matcher_uses_folded_names() {
        let m = Matcher::Channel(Folded::new("#Bad"));
        let mut c = client("n", "*", "r");
        c.channels.insert(Folded::new("#bad"));
        assert!(m.matches(&c, "srv"));
    }

    #[test]
    fn acting_inner_hostmask_checks_all_hosts() {
        let inner = Inner::Hostmask("*!*@192.0.2.7".to_owned());
        assert!(inner.matches(&client("n", "*", "r"), "srv"));
    }
}
