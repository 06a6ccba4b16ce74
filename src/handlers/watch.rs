//! The WATCH command: manipulate and query the notify list.

use ferric_proto::{valid_nickname, Line, Response};

use crate::error::HandlerResult;
use crate::state::Network;

/// Most names one client may watch.
const WATCH_LIMIT: usize = 50;

/// Reply 604/605 for one watched name depending on presence.
fn show_status(net: &mut Network, source: &str, name: &str) {
    let online = net
        .find_person(name)
        .map(|t| (t.name.clone(), t.username.clone(), t.host.clone(), t.tsinfo.to_string()));
    match online {
        Some((nick, user, host, ts)) => {
            net.sendto_one_numeric(
                source,
                Response::RPL_NOWON,
                &[&nick, &user, &host, &ts, "is online"],
            );
        }
        None => {
            let lasttime = net
                .watch
                .get(ferric_proto::Folded::new(name).as_str())
                .map(|e| e.lasttime)
                .unwrap_or(0)
                .to_string();
            net.sendto_one_numeric(
                source,
                Response::RPL_NOWOFF,
                &[name, "*", "*", &lasttime, "is offline"],
            );
        }
    }
}

/// WATCH with `+nick`/`-nick` edits and `C`/`S`/`L` queries. Tokens are
/// processed left to right; an empty command defaults to `L`.
pub fn m_watch(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let mut tokens: Vec<String> = line.params.iter().cloned().collect();
    if tokens.is_empty() {
        tokens.push("L".to_owned());
    }

    for token in tokens.iter().flat_map(|t| t.split(',')) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Some(name) = token.strip_prefix('+') {
            if !valid_nickname(name, true) {
                continue;
            }
            let count = net
                .client(source)
                .and_then(|c| c.conn.as_ref())
                .map(|conn| conn.watches.len())
                .unwrap_or(0);
            if count >= WATCH_LIMIT {
                let limit = WATCH_LIMIT.to_string();
                net.sendto_one_numeric(
                    source,
                    Response::ERR_TOOMANYWATCH,
                    &[name, &limit, "Maximum size for WATCH-list is reached"],
                );
                continue;
            }
            net.watch_add(name, source);
            show_status(net, source, name);
            continue;
        }

        if let Some(name) = token.strip_prefix('-') {
            net.watch_del(name, source);
            let (nick, user, host) = match net.find_person(name) {
                Some(t) => (t.name.clone(), t.username.clone(), t.host.clone()),
                None => (name.to_owned(), "*".to_owned(), "*".to_owned()),
            };
            net.sendto_one_numeric(
                source,
                Response::RPL_WATCHOFF,
                &[&nick, &user, &host, "0", "stopped watching"],
            );
            continue;
        }

        match token {
            "C" | "c" => net.watch_del_all(source),
            "S" | "s" => {
                let mine: Vec<String> = net
                    .client(source)
                    .and_then(|c| c.conn.as_ref())
                    .map(|conn| conn.watches.iter().map(|f| f.as_str().to_owned()).collect())
                    .unwrap_or_default();
                let watching_me = net
                    .watch
                    .get(ferric_proto::Folded::new(&net.display_name(source)).as_str())
                    .map(|e| e.watched_by.len())
                    .unwrap_or(0);
                let text = format!(
                    "You have {} and are on {} WATCH entries",
                    mine.len(),
                    watching_me
                );
                net.sendto_one_numeric(source, Response::RPL_WATCHSTAT, &[&text]);
                if !mine.is_empty() {
                    let list = mine.join(" ");
                    net.sendto_one_numeric(source, Response::RPL_WATCHLIST, &[&list]);
                }
                net.sendto_one_numeric(
                    source,
                    Response::RPL_ENDOFWATCHLIST,
                    &["End of WATCH S"],
                );
            }
            "L" | "l" => {
                let mine: Vec<String> = net
                    .client(source)
                    .and_then(|c| c.conn.as_ref())
                    .map(|conn| conn.watches.iter().map(|f| f.as_str().to_owned()).collect())
                    .unwrap_or_default();
                for name in mine {
                    show_status(net, source, &name);
                }
                net.sendto_one_numeric(
                    source,
                    Response::RPL_ENDOFWATCHLIST,
                    &["End of WATCH L"],
                );
            }
            _ => {}
        }
    }
    Ok(())
}
