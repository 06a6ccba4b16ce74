//! WEBIRC: gateway spoofing of host and IP before registration.

use ferric_proto::{match_mask, valid_hostname, Line};
use tracing::debug;

use crate::error::HandlerResult;
use crate::state::modes::{ClientFlags, UserModes};
use crate::state::Network;

/// WEBIRC from an unregistered connection: `WEBIRC <password> <user>
/// <host> <addr>`. Validates the gateway block, then rewrites the
/// client's apparent host and IP.
pub fn mr_webirc(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let password = line.arg(0).unwrap_or("");
    let host = line.arg(2).unwrap_or("").to_owned();
    let addr = line.arg(3).unwrap_or("").to_owned();

    if !valid_hostname(&host) {
        let text = format!(":WEBIRC: Invalid hostname {host}");
        net.sendto_one_notice(source, &text);
        return Ok(());
    }

    // The gateway must present a configured block matching its real
    // connection, and that block must carry a password.
    let (sockhost, realhost, gotid, username) = match net.client(source) {
        Some(c) => (
            c.sockhost.clone(),
            c.realhost.clone(),
            c.flags.has(ClientFlags::GOTID),
            c.username.clone(),
        ),
        None => return Ok(()),
    };
    let ident = if gotid { username } else { "webirc".to_owned() };

    let block = net.config.webirc.iter().find(|b| {
        b.hosts
            .iter()
            .any(|mask| match_mask(mask, &sockhost) || match_mask(mask, &realhost))
            && (b.ident.is_empty() || match_mask(&b.ident, &ident))
    });
    let Some(block) = block else {
        debug!(source, "WEBIRC from unconfigured gateway");
        return Ok(());
    };
    if block.password.is_empty() {
        net.sendto_one_notice(source, ":WEBIRC gateway blocks must have a password");
        return Ok(());
    }
    if block.password != password {
        net.sendto_one_notice(source, ":WEBIRC password incorrect");
        return Ok(());
    }

    // The claimed address must be numeric.
    let Ok(ip) = addr.parse::<std::net::IpAddr>() else {
        let text = format!(":Invalid WEBIRC IP address {addr}");
        net.sendto_one_notice(source, &text);
        return Ok(());
    };

    // A textual v6 address may start with `:`, which would break the
    // wire format wherever the sockhost is emitted; prefix a zero.
    let mut sockhost = addr.clone();
    if sockhost.starts_with(':') {
        sockhost.insert(0, '0');
    }

    if let Some(client) = net.client_mut(source) {
        client.ip = Some(ip);
        client.sockhost = sockhost;
        client.host = host.clone();
        client.realhost = host.clone();
        client.umodes.set(UserModes::WEBIRC);
    }

    let text = format!(":WEBIRC host/IP set to {host} {addr}");
    net.sendto_one_notice(source, &text);
    Ok(())
}
