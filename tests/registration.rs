//! Registration state machine: NICK/USER collection, CAP gating,
//! rejection numerics, and the server handshake.

mod common;

use common::{build, link_server, local_user};

#[test]
fn nick_then_user_registers_and_greets() {
    let mut net = build();
    let uid = net.new_local_client();

    net.dispatch_raw(&uid, "NICK alice");
    assert!(net.client(&uid).unwrap().is_unknown(), "NICK alone is not enough");

    net.dispatch_raw(&uid, "USER alice 0 * :Alice A");
    let client = net.client(&uid).unwrap();
    assert!(client.is_client());
    assert_eq!(client.name, "alice");
    assert_eq!(client.tsinfo, common::T0);

    let lines = common::lines_for(&net, &uid);
    assert!(
        lines.iter().any(|l| l.contains(" 001 alice :Welcome")),
        "missing welcome: {lines:?}"
    );
    assert_eq!(net.find_person("ALICE").unwrap().uid, uid);
}

#[test]
fn user_then_nick_also_registers() {
    let mut net = build();
    let uid = net.new_local_client();
    net.dispatch_raw(&uid, "USER bob 0 * :Bob");
    net.dispatch_raw(&uid, "NICK bob");
    assert!(net.client(&uid).unwrap().is_client());
}

#[test]
fn cap_negotiation_holds_registration_until_end() {
    let mut net = build();
    let uid = net.new_local_client();

    net.dispatch_raw(&uid, "CAP LS 302");
    net.dispatch_raw(&uid, "NICK carol");
    net.dispatch_raw(&uid, "USER carol 0 * :Carol");
    assert!(
        net.client(&uid).unwrap().is_unknown(),
        "registration must wait for CAP END"
    );

    net.dispatch_raw(&uid, "CAP REQ :multi-prefix userhost-in-names");
    assert!(common::got(&net, &uid, "ACK"));

    net.dispatch_raw(&uid, "CAP END");
    let client = net.client(&uid).unwrap();
    assert!(client.is_client());
    assert!(client.caps.has(ferricd::state::modes::Caps::MULTI_PREFIX));
    assert!(client.caps.has(ferricd::state::modes::Caps::UHNAMES));
}

#[test]
fn cap_req_unknown_token_naks() {
    let mut net = build();
    let uid = net.new_local_client();
    net.dispatch_raw(&uid, "CAP REQ :multi-prefix bogus-cap");
    assert!(common::got(&net, &uid, "NAK"));
    assert!(!net.client(&uid).unwrap().caps.has(ferricd::state::modes::Caps::MULTI_PREFIX));
}

#[test]
fn taken_nick_is_refused_during_registration() {
    let mut net = build();
    let _alice = local_user(&mut net, "alice");
    let uid = net.new_local_client();
    net.dispatch_raw(&uid, "NICK Alice");
    assert!(common::got(&net, &uid, " 433 "));
    assert!(net.client(&uid).unwrap().name.is_empty());
}

#[test]
fn commands_before_registration_get_451() {
    let mut net = build();
    let uid = net.new_local_client();
    net.dispatch_raw(&uid, "JOIN #test");
    assert!(common::got(&net, &uid, " 451 "));
}

#[test]
fn reregistration_gets_462() {
    let mut net = build();
    let uid = local_user(&mut net, "alice");
    net.dispatch_raw(&uid, "USER again 0 * :Again");
    assert!(common::got(&net, &uid, " 462 "));
}

#[test]
fn unknown_command_gets_421() {
    let mut net = build();
    let uid = local_user(&mut net, "alice");
    net.dispatch_raw(&uid, "FROBNICATE now");
    assert!(common::got(&net, &uid, " 421 alice FROBNICATE "));
}

#[test]
fn underargued_command_gets_461() {
    let mut net = build();
    let uid = local_user(&mut net, "alice");
    net.dispatch_raw(&uid, "INVITE bob");
    assert!(common::got(&net, &uid, " 461 "));
}

#[test]
fn ts6_handshake_links_and_bursts() {
    let mut net = build();
    let alice = local_user(&mut net, "alice");
    net.dispatch_raw(&alice, "JOIN #room");
    net.outbox.clear();

    // Manual handshake so the burst stays observable.
    let conn = net.new_local_client();
    net.dispatch_raw(&conn, "PASS linkpass TS 6 :9AB");
    net.dispatch_raw(&conn, "CAPAB :QS ENCAP TB EOB");
    net.dispatch_raw(&conn, "SERVER hub.test 1 :Hub");

    let link = net.client("9AB").expect("link record under its SID");
    assert!(link.is_server());
    assert_eq!(link.name, "hub.test");
    assert!(link.capab.has(ferricd::state::modes::Capab::ENCAP));

    let burst = common::lines_for(&net, "9AB");
    assert!(
        burst.iter().any(|l| l.contains("SVINFO 6 6 0")),
        "missing SVINFO: {burst:?}"
    );
    assert!(
        burst.iter().any(|l| l.contains("EUID alice 1")),
        "missing user introduction: {burst:?}"
    );
    assert!(
        burst
            .iter()
            .any(|l| l.contains("SJOIN") && l.contains("#room") && l.contains(&format!("@{alice}"))),
        "missing channel burst: {burst:?}"
    );
}

#[test]
fn svinfo_version_mismatch_drops_link() {
    let mut net = build();
    let sid = link_server(&mut net, "9AB", "hub.test");
    net.dispatch_raw(&sid, ":9AB SVINFO 5 5 0 :1600000000");
    net.reap();
    assert!(net.client("9AB").is_none(), "TS5 peer must be dropped");
}
