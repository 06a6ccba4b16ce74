//! TS6 reconciliation: SJOIN decision table, BMASK merging, TMODE
//! gating, and nick collisions on introduction.

mod common;

use common::{build, link_server, local_user, remote_user};
use ferric_proto::Folded;
use ferricd::state::modes::{ChannelModes, MemberFlags};

/// Local channel at TS 200 with `alice@`, `bob+`, modes `+ntk secret`.
fn staged(net: &mut ferricd::state::Network) -> (String, String, String) {
    let alice = local_user(net, "alice");
    let bob = local_user(net, "bob");
    net.dispatch_raw(&alice, "JOIN #c");
    net.dispatch_raw(&bob, "JOIN #c");
    net.dispatch_raw(&alice, "MODE #c +k secret");
    net.dispatch_raw(&alice, "MODE #c +v bob");
    let chan = Folded::new("#c");
    net.channel_mut(&chan).unwrap().creation_time = 200;
    let link = link_server(net, "9AB", "hub.test");
    (alice, bob, link)
}

#[test]
fn sjoin_lower_ts_resets_local_state() {
    let mut net = build();
    let (alice, bob, link) = staged(&mut net);
    let carol = remote_user(&mut net, &link, "carol", "AAAAAC", 90);
    net.outbox.clear();

    net.dispatch_raw(&link, &format!(":9AB SJOIN 100 #c +m :@{carol}"));

    let chan = Folded::new("#c");
    let channel = net.channel(&chan).unwrap();
    assert_eq!(channel.creation_time, 100, "older TS wins");
    assert!(channel.modes.has(ChannelModes::MODERATED));
    assert!(!channel.modes.has(ChannelModes::NOPRIVMSGS));
    assert!(!channel.modes.has(ChannelModes::TOPICLIMIT));
    assert!(channel.key.is_empty(), "key cleared on TS loss");

    assert!(!channel.member(&alice).unwrap().has_prefix(), "alice de-opped");
    assert!(!channel.member(&bob).unwrap().has_prefix(), "bob de-voiced");
    assert!(channel.member(&carol).unwrap().has(MemberFlags::CHANOP));

    // Local members saw the state change spelled out.
    let to_alice = common::lines_for(&net, &alice);
    assert!(
        to_alice.iter().any(|l| l.contains("MODE #c -ntk secret")),
        "mode removal diff: {to_alice:?}"
    );
    let deops = to_alice
        .iter()
        .filter(|l| l.contains("MODE #c -"))
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ");
    assert!(deops.contains("alice"), "alice deop announced: {deops}");
    assert!(deops.contains("bob"), "bob devoice announced: {deops}");
    assert!(to_alice.iter().any(|l| l.contains("MODE #c +m")));
    assert!(to_alice.iter().any(|l| l.contains("JOIN") && l.contains("carol")));
}

#[test]
fn sjoin_equal_ts_merges_modes_keeps_key() {
    let mut net = build();
    let (_alice, _bob, link) = staged(&mut net);
    let carol = remote_user(&mut net, &link, "carol", "AAAAAC", 90);
    net.outbox.clear();

    net.dispatch_raw(&link, &format!(":9AB SJOIN 200 #c +ms :+{carol}"));

    let chan = Folded::new("#c");
    let channel = net.channel(&chan).unwrap();
    assert_eq!(channel.creation_time, 200);
    // Union of simple modes.
    assert!(channel.modes.has(ChannelModes::MODERATED));
    assert!(channel.modes.has(ChannelModes::SECRET));
    assert!(channel.modes.has(ChannelModes::NOPRIVMSGS));
    // Local key survives an equal-TS merge.
    assert_eq!(channel.key, "secret");
    assert!(channel.member(&carol).unwrap().has(MemberFlags::VOICE));
}

#[test]
fn sjoin_higher_ts_discards_modes_and_prefixes() {
    let mut net = build();
    let (alice, _bob, link) = staged(&mut net);
    let carol = remote_user(&mut net, &link, "carol", "AAAAAC", 90);
    net.outbox.clear();

    net.dispatch_raw(&link, &format!(":9AB SJOIN 900 #c +m :@{carol}"));

    let chan = Folded::new("#c");
    let channel = net.channel(&chan).unwrap();
    assert_eq!(channel.creation_time, 200, "newer TS loses");
    assert!(!channel.modes.has(ChannelModes::MODERATED));
    assert_eq!(channel.key, "secret");
    assert!(channel.member(&alice).unwrap().has(MemberFlags::CHANOP), "locals keep ops");
    let carol_flags = channel.member(&carol).unwrap();
    assert!(!carol_flags.has_prefix(), "newer side joins without prefixes");
}

#[test]
fn sjoin_creates_unknown_channel_with_incoming_state() {
    let mut net = build();
    let link = link_server(&mut net, "9AB", "hub.test");
    let carol = remote_user(&mut net, &link, "carol", "AAAAAC", 90);
    net.outbox.clear();

    net.dispatch_raw(&link, &format!(":9AB SJOIN 1234 #new +ntk hunter2 :@{carol}"));

    let chan = Folded::new("#new");
    let channel = net.channel(&chan).unwrap();
    assert_eq!(channel.creation_time, 1234);
    assert!(channel.modes.has(ChannelModes::TOPICLIMIT));
    assert_eq!(channel.key, "hunter2");
    assert!(channel.member(&carol).unwrap().has(MemberFlags::CHANOP));
}

#[test]
fn bmask_merges_lists_and_clears_cache() {
    let mut net = build();
    let (_alice, bob, link) = staged(&mut net);
    // Prime bob's ban cache.
    let chan = Folded::new("#c");
    net.channel_mut(&chan)
        .unwrap()
        .members
        .get_mut(&bob)
        .unwrap()
        .set(MemberFlags::BAN_CHECKED);

    net.dispatch_raw(&link, ":9AB BMASK 200 #c b :*!*@spam.example $a:troll");

    let channel = net.channel(&chan).unwrap();
    assert_eq!(channel.banlist.len(), 2);
    assert!(channel.banlist.iter().any(|b| b.mask == "$a:troll"));
    assert!(
        !channel.member(&bob).unwrap().has(MemberFlags::BAN_CHECKED),
        "ban cache invalidated by list mutation"
    );

    // Invex additions leave the cache alone.
    net.channel_mut(&chan)
        .unwrap()
        .members
        .get_mut(&bob)
        .unwrap()
        .set(MemberFlags::BAN_CHECKED);
    net.dispatch_raw(&link, ":9AB BMASK 200 #c I :*!*@friend.example");
    let channel = net.channel(&chan).unwrap();
    assert_eq!(channel.invexlist.len(), 1);
    assert!(channel.member(&bob).unwrap().has(MemberFlags::BAN_CHECKED));
}

#[test]
fn tmode_is_gated_by_channel_ts() {
    let mut net = build();
    let (_alice, _bob, link) = staged(&mut net);
    let chan = Folded::new("#c");

    // Stale TS: ignored.
    net.dispatch_raw(&link, ":9AB TMODE 900 #c +s");
    assert!(!net.channel(&chan).unwrap().modes.has(ChannelModes::SECRET));

    // Matching TS: applied.
    net.dispatch_raw(&link, ":9AB TMODE 200 #c +s");
    assert!(net.channel(&chan).unwrap().modes.has(ChannelModes::SECRET));
}

#[test]
fn uid_collision_lower_ts_survives() {
    let mut net = build();
    let link = link_server(&mut net, "9AB", "hub.test");
    let alice = local_user(&mut net, "alice");
    net.client_mut(&alice).unwrap().tsinfo = 500;
    net.outbox.clear();

    // Older remote wins: local alice dies, remote takes the name.
    net.dispatch_raw(
        &link,
        ":9AB UID alice 1 400 +i a remote.test 198.51.100.9 9ABAAAAAZ :Remote Alice",
    );
    assert!(net.client(&alice).is_none(), "newer local client killed");
    assert_eq!(net.find_person("alice").unwrap().uid, "9ABAAAAAZ");
}

#[test]
fn uid_collision_newer_is_refused() {
    let mut net = build();
    let link = link_server(&mut net, "9AB", "hub.test");
    let alice = local_user(&mut net, "alice");
    net.client_mut(&alice).unwrap().tsinfo = 500;
    net.outbox.clear();

    net.dispatch_raw(
        &link,
        ":9AB UID alice 1 600 +i a remote.test 198.51.100.9 9ABAAAAAZ :Remote Alice",
    );
    assert_eq!(net.find_person("alice").unwrap().uid, alice, "older local survives");
    assert!(net.client("9ABAAAAAZ").is_none());
    assert!(
        common::got(&net, &link, "KILL 9ABAAAAAZ"),
        "loser is killed back toward its link"
    );
}

#[test]
fn uid_collision_tie_kills_both() {
    let mut net = build();
    let link = link_server(&mut net, "9AB", "hub.test");
    let alice = local_user(&mut net, "alice");
    net.client_mut(&alice).unwrap().tsinfo = 500;
    net.outbox.clear();

    net.dispatch_raw(
        &link,
        ":9AB UID alice 1 500 +i a remote.test 198.51.100.9 9ABAAAAAZ :Remote Alice",
    );
    assert!(net.client(&alice).is_none());
    assert!(net.client("9ABAAAAAZ").is_none());
    assert!(net.find_person("alice").is_none());
}

#[test]
fn squit_removes_server_subtree() {
    let mut net = build();
    let link = link_server(&mut net, "9AB", "hub.test");
    let remote = remote_user(&mut net, &link, "rbob", "AAAAAB", 1000);
    // A server behind the link.
    net.dispatch_raw(&link, ":9AB SID leaf.test 2 7LF :Leaf");
    assert!(net.client("7LF").is_some());
    net.outbox.clear();

    net.dispatch_raw(&link, ":9AB SQUIT 9AB :rehash");
    assert!(net.client("9AB").is_none());
    assert!(net.client("7LF").is_none(), "sub-servers go too");
    assert!(net.client(&remote).is_none(), "clients behind the link go too");
    assert!(net.find_person("rbob").is_none());
}

#[test]
fn remote_nick_change_applies_ts() {
    let mut net = build();
    let link = link_server(&mut net, "9AB", "hub.test");
    let remote = remote_user(&mut net, &link, "rbob", "AAAAAB", 1000);
    let alice = local_user(&mut net, "alice");
    net.dispatch_raw(&alice, "JOIN #w");
    net.dispatch_raw(&link, &format!(":{remote} JOIN 1 #w +"));
    net.outbox.clear();

    net.dispatch_raw(&link, &format!(":{remote} NICK rrob :2000"));
    let renamed = net.find_person("rrob").expect("renamed");
    assert_eq!(renamed.uid, remote);
    assert_eq!(renamed.tsinfo, 2000);
    assert!(net.find_person("rbob").is_none());
    assert!(common::got(&net, &alice, "NICK :rrob"));
}
