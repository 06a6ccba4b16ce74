//! NAMES output framing: many members must split across multiple
//! RPL_NAMREPLY lines, each within the wire limit, with one terminator.

mod common;

use common::{build, local_user};
use ferric_proto::LINE_MAX;

#[test]
fn three_hundred_members_frame_under_the_limit() {
    let mut net = build();

    let first = local_user(&mut net, "member000");
    net.dispatch_raw(&first, "JOIN #big");
    for i in 1..300 {
        let uid = local_user(&mut net, &format!("member{i:03}"));
        net.dispatch_raw(&uid, "JOIN #big");
        net.outbox.clear();
    }

    let probe = local_user(&mut net, "probe");
    net.dispatch_raw(&probe, "JOIN #big");

    let name_replies: Vec<String> = common::lines_for(&net, &probe)
        .into_iter()
        .filter(|l| l.contains(" 353 "))
        .collect();
    let end_replies = common::lines_for(&net, &probe)
        .iter()
        .filter(|l| l.contains(" 366 "))
        .count();

    assert!(
        name_replies.len() > 1,
        "301 members cannot fit one line, got {}",
        name_replies.len()
    );
    assert_eq!(end_replies, 1, "exactly one RPL_ENDOFNAMES");

    for line in &name_replies {
        assert!(
            line.len() <= LINE_MAX - 2,
            "line over budget ({} bytes): {line}",
            line.len()
        );
    }

    // Nobody fell through the cracks.
    let combined = name_replies.join(" ");
    for i in 0..300 {
        assert!(
            combined.contains(&format!("member{i:03}")),
            "member{i:03} missing from NAMES"
        );
    }
    assert!(combined.contains("@member000"), "creator keeps the op prefix");
}

#[test]
fn names_hides_invisible_members_from_outsiders() {
    let mut net = build();
    let alice = local_user(&mut net, "alice");
    let ghost = local_user(&mut net, "ghost");
    net.dispatch_raw(&alice, "JOIN #v");
    net.dispatch_raw(&ghost, "JOIN #v");
    net.dispatch_raw(&ghost, "MODE ghost +i");

    let outsider = local_user(&mut net, "outsider");
    net.outbox.clear();
    net.dispatch_raw(&outsider, "NAMES #v");

    let lines = common::lines_for(&net, &outsider).join(" ");
    assert!(lines.contains("alice"));
    assert!(!lines.contains("ghost"), "invisible member leaked: {lines}");

    // Members see everyone.
    net.outbox.clear();
    net.dispatch_raw(&alice, "NAMES #v");
    let lines = common::lines_for(&net, &alice).join(" ");
    assert!(lines.contains("ghost"));
}

#[test]
fn secret_channel_names_only_for_members() {
    let mut net = build();
    let alice = local_user(&mut net, "alice");
    net.dispatch_raw(&alice, "JOIN #s");
    net.dispatch_raw(&alice, "MODE #s +s");

    let outsider = local_user(&mut net, "outsider");
    net.outbox.clear();
    net.dispatch_raw(&outsider, "NAMES #s");

    let lines = common::lines_for(&net, &outsider);
    assert!(
        !lines.iter().any(|l| l.contains(" 353 ")),
        "secret membership leaked: {lines:?}"
    );
    assert!(lines.iter().any(|l| l.contains(" 366 ")));
}

#[test]
fn multi_prefix_and_uhnames_render() {
    let mut net = build();
    let uid = net.new_local_client();
    {
        let client = net.client_mut(&uid).unwrap();
        client.host = "example.test".to_owned();
        client.realhost = "example.test".to_owned();
        client.sockhost = "192.0.2.20".to_owned();
    }
    net.dispatch_raw(&uid, "CAP LS 302");
    net.dispatch_raw(&uid, "NICK fancy");
    net.dispatch_raw(&uid, "USER fancy 0 * :Fancy");
    net.dispatch_raw(&uid, "CAP REQ :multi-prefix userhost-in-names");
    net.dispatch_raw(&uid, "CAP END");
    net.outbox.clear();

    net.dispatch_raw(&uid, "JOIN #fp");
    // Give the creator voice on top of ops; both prefixes must show.
    net.dispatch_raw(&uid, "MODE #fp +v fancy");
    net.outbox.clear();
    net.dispatch_raw(&uid, "NAMES #fp");

    let lines = common::lines_for(&net, &uid).join(" ");
    assert!(
        lines.contains("@+fancy!fancy@example.test"),
        "expected combined prefixes and uhnames: {lines}"
    );
}
