//! Line tokenizing and serialization.
//!
//! The server core consumes and emits whole IRC lines: an optional
//! `@tags` blob, an optional `:prefix` naming the source (nick, UID or
//! SID), a command word, and up to [`MAX_PARA`] parameters of which the
//! last may be a `:`-led trailing parameter containing spaces. Tags are
//! carried opaquely; the core never interprets them.

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::{take_while1, take_until},
    character::complete::char,
    combinator::opt,
    sequence::preceded,
    IResult,
};
use thiserror::Error;

use crate::util::MAX_PARA;

/// A tokenized IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Raw tag section without the leading `@`, if present.
    pub tags: Option<String>,
    /// Source of the message without the leading `:`, if present.
    pub prefix: Option<String>,
    /// The command word, uppercased by convention at the dispatch layer.
    pub command: String,
    /// Parameters, trailing last. At most [`MAX_PARA`].
    pub params: Vec<String>,
}

/// Why a line failed to tokenize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineParseError {
    #[error("empty message")]
    Empty,
    #[error("missing or malformed command word")]
    BadCommand,
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

fn skip_spaces(mut input: &str) -> &str {
    while input.as_bytes().first() == Some(&b' ') {
        input = &input[1..];
    }
    input
}

/// Split the parameter section. Consecutive spaces collapse; once
/// `MAX_PARA - 1` middle parameters have been taken, the remainder becomes
/// the final parameter whether or not it carries the `:` marker.
fn parse_params(mut rest: &str) -> Vec<String> {
    let mut params = Vec::new();

    loop {
        rest = skip_spaces(rest);
        let rest_trimmed = rest.trim_end_matches(['\r', '\n']);
        if rest_trimmed.is_empty() {
            break;
        }

        if let Some(stripped) = rest_trimmed.strip_prefix(':') {
            params.push(stripped.to_owned());
            break;
        }

        if params.len() == MAX_PARA - 1 {
            params.push(rest_trimmed.to_owned());
            break;
        }

        let end = rest_trimmed
            .find(' ')
            .unwrap_or(rest_trimmed.len());
        params.push(rest_trimmed[..end].to_owned());
        rest = &rest_trimmed[end..];
    }

    params
}

impl FromStr for Line {
    type Err = LineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches(['\r', '\n']);
        if s.is_empty() {
            return Err(LineParseError::Empty);
        }

        let (s, tags) = opt(parse_tags)(s).map_err(|_: nom::Err<nom::error::Error<&str>>| {
            LineParseError::BadCommand
        })?;
        let s = skip_spaces(s);

        let (s, prefix) = opt(parse_prefix)(s)
            .map_err(|_: nom::Err<nom::error::Error<&str>>| LineParseError::BadCommand)?;
        let s = skip_spaces(s);

        let (rest, command) =
            parse_command(s).map_err(|_: nom::Err<nom::error::Error<&str>>| {
                LineParseError::BadCommand
            })?;

        let is_word = command.chars().all(|c| c.is_ascii_alphabetic());
        let is_numeric = command.len() == 3 && command.chars().all(|c| c.is_ascii_digit());
        if !is_word && !is_numeric {
            return Err(LineParseError::BadCommand);
        }

        Ok(Line {
            tags: tags.map(str::to_owned),
            prefix: prefix.map(str::to_owned),
            command: command.to_owned(),
            params: parse_params(rest),
        })
    }
}

impl Line {
    /// Build a line from parts; parameters are taken verbatim.
    pub fn new(prefix: Option<&str>, command: &str, params: &[&str]) -> Self {
        Line {
            tags: None,
            prefix: prefix.map(str::to_owned),
            command: command.to_owned(),
            params: params.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    /// Parameter accessor.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.params.get(i).map(String::as_str)
    }

    /// Does the final parameter need the `:` marker?
    fn needs_colon(p: &str) -> bool {
        p.is_empty() || p.starts_with(':') || p.contains(' ')
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            write!(f, "@{tags} ")?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for p in middle {
                write!(f, " {p}")?;
            }
            if Line::needs_colon(last) {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_bare_command() {
        let line: Line = "QUIT".parse().unwrap();
        assert_eq!(line.command, "QUIT");
        assert!(line.params.is_empty());
        assert!(line.prefix.is_none());
    }

    #[test]
    fn parse_privmsg_with_trailing() {
        let line: Line = ":nick!user@host PRIVMSG #chan :Hello world".parse().unwrap();
        assert_eq!(line.prefix.as_deref(), Some("nick!user@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#chan", "Hello world"]);
    }

    #[test]
    fn parse_sjoin() {
        let line: Line = ":0AB SJOIN 1600000000 #chan +ntk secret :@0ABAAAAAB +0ABAAAAAC"
            .parse()
            .unwrap();
        assert_eq!(line.command, "SJOIN");
        assert_eq!(
            line.params,
            vec!["1600000000", "#chan", "+ntk", "secret", "@0ABAAAAAB +0ABAAAAAC"]
        );
    }

    #[test]
    fn parse_collapses_spaces_and_crlf() {
        let line: Line = "JOIN   #a  #b\r\n".parse().unwrap();
        assert_eq!(line.params, vec!["#a", "#b"]);
    }

    #[test]
    fn parse_numeric_command() {
        let line: Line = ":server 001 alice :Welcome".parse().unwrap();
        assert_eq!(line.command, "001");
        assert!("12".parse::<Line>().is_err());
        assert!("1234".parse::<Line>().is_err());
    }

    #[test]
    fn parse_empty_trailing() {
        let line: Line = "TOPIC #chan :".parse().unwrap();
        assert_eq!(line.params, vec!["#chan", ""]);
    }

    #[test]
    fn parse_caps_para_count() {
        let raw = format!("CMD {}", (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join(" "));
        let line: Line = raw.parse().unwrap();
        assert_eq!(line.params.len(), MAX_PARA);
        assert_eq!(line.params[MAX_PARA - 1], "14 15 16 17 18 19");
    }

    #[test]
    fn parse_tags_passthrough() {
        let line: Line = "@time=2026-01-01T00:00:00Z :n PRIVMSG #c :hi".parse().unwrap();
        assert_eq!(line.tags.as_deref(), Some("time=2026-01-01T00:00:00Z"));
        assert_eq!(line.to_string(), "@time=2026-01-01T00:00:00Z :n PRIVMSG #c hi");
    }

    #[test]
    fn display_marks_trailing_when_needed() {
        let line = Line::new(Some("srv"), "KICK", &["#c", "nick", "bye bye"]);
        assert_eq!(line.to_string(), ":srv KICK #c nick :bye bye");

        let line = Line::new(None, "MODE", &["#c", "+nt"]);
        assert_eq!(line.to_string(), "MODE #c +nt");
    }

    #[test]
    fn roundtrip_preserves_tokenization() {
        for raw in [
            ":srv 353 alice = #chan :@alice +bob carol",
            "PING :irc.example.org",
            ":0AB SJOIN 100 #c +m :@0ABAAAAAC",
            "NICK newnick",
            ":a!b@c PART #chan :",
        ] {
            let line: Line = raw.parse().unwrap();
            let reparsed: Line = line.to_string().parse().unwrap();
            assert_eq!(line, reparsed, "round-trip failed for {raw}");
        }
    }

    proptest! {
        #[test]
        fn roundtrip_random_params(
            cmd in "[A-Z]{3,8}",
            mid in proptest::collection::vec("[!-9;-~]{1,10}", 0..4),
            trailing in "[ -~]{0,30}",
        ) {
            let mut params: Vec<&str> = mid.iter().map(String::as_str).collect();
            params.push(&trailing);
            let line = Line::new(Some("source"), &cmd, &params);
            let reparsed: Line = line.to_string().parse().unwrap();
            prop_assert_eq!(line, reparsed);
        }
    }
}
