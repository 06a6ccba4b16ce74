//! Shared harness: a Network driven through the real dispatcher, with
//! helpers to register users, link servers and inspect the outbox.

#![allow(dead_code)]

use ferricd::clock::Clock;
use ferricd::config::Config;
use ferricd::send::Recipient;
use ferricd::state::client::Uid;
use ferricd::state::Network;

/// Wall-clock origin for deterministic TS values.
pub const T0: i64 = 1_600_000_000;

/// Fresh network with a fixed clock.
pub fn build() -> Network {
    build_with(Config::default())
}

/// Fresh network with a custom config and a fixed clock.
pub fn build_with(config: Config) -> Network {
    let mut net = Network::new(config);
    net.clock = Clock::fixed(T0, 1000);
    net
}

/// Register a local user through the real NICK/USER path. The connection
/// gets a stock host and IP before registration, as the I/O layer would
/// arrange.
pub fn local_user(net: &mut Network, nick: &str) -> Uid {
    local_user_at(net, nick, "example.test", "192.0.2.10")
}

/// Register a local user with a specific host and IP.
pub fn local_user_at(net: &mut Network, nick: &str, host: &str, ip: &str) -> Uid {
    let uid = net.new_local_client();
    {
        let client = net.client_mut(&uid).unwrap();
        client.host = host.to_owned();
        client.realhost = host.to_owned();
        client.sockhost = ip.to_owned();
        client.ip = ip.parse().ok();
    }
    net.dispatch_raw(&uid, &format!("NICK {nick}"));
    net.dispatch_raw(&uid, &format!("USER {} 0 * :{} user", nick, nick));
    assert!(
        net.client(&uid).is_some_and(|c| c.is_client()),
        "registration failed for {nick}"
    );
    net.outbox.clear();
    uid
}

/// Link a server through the real PASS/CAPAB/SERVER handshake. Returns
/// its SID, which is also its client key after establishment.
pub fn link_server(net: &mut Network, sid: &str, name: &str) -> Uid {
    let uid = net.new_local_client();
    net.dispatch_raw(&uid, &format!("PASS linkpass TS 6 :{sid}"));
    net.dispatch_raw(&uid, "CAPAB :QS ENCAP EX IE TB EOB SVS");
    net.dispatch_raw(&uid, &format!("SERVER {name} 1 :Test link"));
    assert!(
        net.client(sid).is_some_and(|c| c.is_server()),
        "link handshake failed for {name}"
    );
    net.outbox.clear();
    sid.to_owned()
}

/// Introduce a remote user over an established link.
pub fn remote_user(net: &mut Network, sid: &str, nick: &str, uid_tail: &str, ts: i64) -> Uid {
    let uid = format!("{sid}{uid_tail}");
    net.dispatch_raw(
        sid,
        &format!(
            ":{sid} UID {nick} 1 {ts} +i {nick} remote.test 198.51.100.9 {uid} :{nick} remote"
        ),
    );
    assert!(
        net.client(&uid).is_some_and(|c| c.is_client()),
        "remote introduction failed for {nick}"
    );
    uid
}

/// All queued lines addressed to one recipient, in order.
pub fn lines_for(net: &Network, uid: &str) -> Vec<String> {
    net.outbox
        .iter()
        .filter(|e| match &e.to {
            Recipient::Client(u) | Recipient::Server(u) => u == uid,
        })
        .map(|e| e.line.clone())
        .collect()
}

/// Every queued line, flattened.
pub fn all_lines(net: &Network) -> Vec<String> {
    net.outbox.iter().map(|e| e.line.clone()).collect()
}

/// Does any queued line for `uid` contain `needle`?
pub fn got(net: &Network, uid: &str, needle: &str) -> bool {
    lines_for(net, uid).iter().any(|l| l.contains(needle))
}
