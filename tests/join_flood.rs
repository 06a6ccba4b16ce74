//! Join-flood accumulator behaviour through the real JOIN path.

mod common;

use common::{build_with, local_user};
use ferricd::config::Config;
use ferricd::state::modes::UserModes;

fn flood_config() -> Config {
    Config::from_toml(
        r#"
        [channel]
        joinfloodcount = 5
        joinfloodtime = 10
        "#,
    )
    .unwrap()
}

fn flood_notices(net: &ferricd::state::Network) -> usize {
    net.outbox
        .iter()
        .filter(|e| e.line.contains("Possible Join Flooder"))
        .count()
}

#[test]
fn six_joins_in_a_second_notice_exactly_once() {
    let mut net = build_with(flood_config());
    let watcher = local_user(&mut net, "watcher");
    net.client_mut(&watcher).unwrap().umodes.set(UserModes::BOTS);

    // Register everyone first; registration clears the outbox.
    let joiners: Vec<String> = (0..6)
        .map(|i| local_user(&mut net, &format!("joiner{i}")))
        .collect();
    let late = local_user(&mut net, "late");

    for uid in &joiners {
        net.dispatch_raw(uid, "JOIN #f");
    }
    assert_eq!(flood_notices(&net), 1, "one sticky notice while saturated");

    // Saturation holds: a seventh join stays quiet.
    net.dispatch_raw(&late, "JOIN #f");
    assert_eq!(flood_notices(&net), 1);
}

#[test]
fn notice_rearms_after_the_accumulator_drains() {
    let mut net = build_with(flood_config());
    let watcher = local_user(&mut net, "watcher");
    net.client_mut(&watcher).unwrap().umodes.set(UserModes::BOTS);

    let first: Vec<String> = (0..6)
        .map(|i| local_user(&mut net, &format!("joiner{i}")))
        .collect();
    let second: Vec<String> = (0..7)
        .map(|i| local_user(&mut net, &format!("again{i}")))
        .collect();

    for uid in &first {
        net.dispatch_raw(uid, "JOIN #f");
    }
    assert_eq!(flood_notices(&net), 1);

    // joinfloodcount/joinfloodtime decays 0.5 per second; a minute
    // drains the bucket completely and re-arms the notice.
    net.clock.advance(60);
    for uid in &second {
        net.dispatch_raw(uid, "JOIN #f");
    }
    assert_eq!(flood_notices(&net), 2);
}

#[test]
fn spambot_counter_warns_on_join_part_churn() {
    let mut net = build_with(flood_config());
    let watcher = local_user(&mut net, "watcher");
    net.client_mut(&watcher).unwrap().umodes.set(UserModes::BOTS);
    let anchor = local_user(&mut net, "anchor");
    net.dispatch_raw(&anchor, "JOIN #churn");

    let churner = local_user(&mut net, "churner");
    for _ in 0..8 {
        net.dispatch_raw(&churner, "JOIN #churn");
        net.dispatch_raw(&churner, "PART #churn");
    }

    let warnings = net
        .outbox
        .iter()
        .filter(|e| e.line.contains("possible spambot"))
        .count();
    assert!(warnings >= 1, "churn must raise a spambot warning");
}

#[test]
fn opers_do_not_feed_the_spambot_counter() {
    let mut net = build_with(flood_config());
    let oper = local_user(&mut net, "staff");
    net.client_mut(&oper).unwrap().umodes.set(UserModes::OPER);

    for _ in 0..8 {
        net.dispatch_raw(&oper, "JOIN #ops");
        net.dispatch_raw(&oper, "PART #ops");
    }
    let count = net
        .client(&oper)
        .unwrap()
        .conn
        .as_ref()
        .unwrap()
        .join_leave_count;
    assert_eq!(count, 0, "oper joins are exempt");
}
