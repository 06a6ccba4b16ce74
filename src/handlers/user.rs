//! AWAY handling, local and relayed.

use ferric_proto::validation::AWAY_LEN;
use ferric_proto::{truncate_bytes, Line, Response};

use crate::error::HandlerResult;
use crate::state::modes::{Capab, Caps};
use crate::state::Network;

/// Set or clear away state and fan the change out to away-notify
/// clients in common channels.
fn set_away(net: &mut Network, uid: &str, text: &str, except: Option<&str>) {
    let text = truncate_bytes(text, AWAY_LEN).to_owned();
    let nuh = match net.client_mut(uid) {
        Some(c) => {
            c.away = text.clone();
            c.nuh()
        }
        None => return,
    };

    let notify = if text.is_empty() {
        format!(":{nuh} AWAY")
    } else {
        format!(":{nuh} AWAY :{text}")
    };
    net.sendto_common_channels_local(uid, false, Caps::AWAY_NOTIFY, Caps::empty(), &notify);

    let prop = if text.is_empty() {
        format!(":{uid} AWAY")
    } else {
        format!(":{uid} AWAY :{text}")
    };
    net.sendto_server(except, Capab::empty(), Capab::empty(), &prop);
}

/// AWAY from a local client.
pub fn m_away(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let text = line.arg(0).unwrap_or("").to_owned();
    set_away(net, source, &text, None);
    if text.is_empty() {
        net.sendto_one_numeric(
            source,
            Response::RPL_UNAWAY,
            &["You are no longer marked as being away"],
        );
    } else {
        net.sendto_one_numeric(
            source,
            Response::RPL_NOWAWAY,
            &["You have been marked as being away"],
        );
    }
    Ok(())
}

/// AWAY relayed for a remote user.
pub fn ms_away(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let text = line.arg(0).unwrap_or("").to_owned();
    let arrived = net.client(source).map(|c| c.from.clone()).unwrap_or_default();
    set_away(net, source, &text, Some(&arrived));
    Ok(())
}
