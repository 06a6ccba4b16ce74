//! Join-flood and spambot heuristics.
//!
//! Two accumulators, both driven from the monotonic clock:
//!
//! - per-channel: a leaky bucket of recent joins; saturating it once emits
//!   a single "Possible Join Flooder" oper notice that stays sticky until
//!   the bucket drains to zero;
//! - per-client: a join/leave counter that decays on idle and, past the
//!   configured threshold, produces periodic "possible spambot" notices.

use ferric_proto::Folded;

use crate::state::modes::UserModes;
use crate::state::Network;

/// Seconds of idle after which one unit of join/leave count is forgiven.
pub const JOIN_LEAVE_COUNT_EXPIRE_TIME: u64 = 120;

/// Notices are spaced by this many flagged joins once a client is known.
pub const OPER_SPAM_COUNTDOWN: u32 = 5;

impl Network {
    /// Decay and bump the channel's join-flood accumulator.
    ///
    /// The accumulator loses `joinfloodcount / joinfloodtime` per elapsed
    /// second and gains one per counted join. Crossing `joinfloodcount`
    /// pins it there and emits the oper notice exactly once per
    /// saturation episode.
    pub(crate) fn channel_join_flood(&mut self, chan: &Folded, uid: &str, flood_ctrl: bool) {
        let count = self.config.channel.joinfloodcount as f32;
        let time = self.config.channel.joinfloodtime;
        if time == 0 {
            return;
        }

        let now = self.clock.sec_monotonic;
        let (who, server) = match self.clients.get(uid) {
            Some(c) => (c.nuh(), self.server_name_of(c)),
            None => (uid.to_owned(), self.me.name.clone()),
        };

        let Some(channel) = self.channels.get_mut(chan.as_str()) else {
            return;
        };

        if flood_ctrl {
            channel.number_joined += 1.0;
        }

        channel.number_joined -=
            (now.saturating_sub(channel.last_join_time)) as f32 * (count / time as f32);

        let mut notice = None;
        if channel.number_joined <= 0.0 {
            channel.number_joined = 0.0;
            channel.join_flood_noticed = false;
        } else if channel.number_joined >= count {
            channel.number_joined = count;

            if !channel.join_flood_noticed {
                channel.join_flood_noticed = true;
                notice = Some(format!(
                    "Possible Join Flooder {} on {} target: {}",
                    who, server, channel.name
                ));
            }
        }

        channel.last_join_time = now;

        if let Some(text) = notice {
            self.sendto_realops(UserModes::BOTS, &text);
        }
    }

    /// Update the client's join/leave counters and warn opers about
    /// probable spambots. `joining` carries the channel name on joins and
    /// is `None` on parts.
    pub fn check_spambot_warning(&mut self, uid: &str, joining: Option<&str>) {
        let spam_num = self.config.general.spam_num;
        let spam_time = self.config.general.spam_time;
        let now = self.clock.sec_monotonic;

        let notice = {
            let Some(client) = self.clients.get_mut(uid) else { return };
            let nuh = client.nuh();
            let Some(conn) = client.conn.as_mut() else { return };

            let mut notice = None;
            if spam_num != 0 && conn.join_leave_count >= spam_num {
                if conn.oper_warn_count_down > 0 {
                    conn.oper_warn_count_down -= 1;
                }
                if conn.oper_warn_count_down == 0 {
                    notice = Some(match joining {
                        Some(name) => format!(
                            "User {nuh} trying to join {name} is a possible spambot"
                        ),
                        None => format!("User {nuh} is a possible spambot"),
                    });
                    conn.oper_warn_count_down = OPER_SPAM_COUNTDOWN;
                }
            } else {
                let t_delta = now.saturating_sub(conn.last_leave_time);
                if t_delta > JOIN_LEAVE_COUNT_EXPIRE_TIME {
                    let decrement = (t_delta / JOIN_LEAVE_COUNT_EXPIRE_TIME) as u32;
                    conn.join_leave_count = conn.join_leave_count.saturating_sub(decrement);
                } else if now.saturating_sub(conn.last_join_time) < spam_time {
                    conn.join_leave_count += 1;
                }
            }

            if joining.is_some() {
                conn.last_join_time = now;
            } else {
                conn.last_leave_time = now;
            }

            notice
        };

        if let Some(text) = notice {
            self.sendto_realops(UserModes::BOTS, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::Config;
    use crate::state::client::{Status, Uid};
    use crate::state::modes::MemberFlags;

    fn net(count: u32, time: u64) -> Network {
        let mut config = Config::default();
        config.channel.joinfloodcount = count;
        config.channel.joinfloodtime = time;
        let mut net = Network::new(config);
        net.clock = Clock::fixed(1_600_000_000, 100);
        net
    }

    fn user(net: &mut Network, nick: &str) -> Uid {
        let uid = net.new_local_client();
        {
            let c = net.client_mut(&uid).unwrap();
            c.name = nick.to_owned();
            c.username = "u".to_owned();
            c.host = "h".to_owned();
            c.status = Status::Client;
        }
        net.hash_add_client(&uid);
        uid
    }

    fn oper(net: &mut Network) -> Uid {
        let uid = user(net, "watcher");
        net.client_mut(&uid)
            .unwrap()
            .umodes
            .set(UserModes::BOTS);
        uid
    }

    fn flood_notices(net: &Network) -> usize {
        net.outbox
            .iter()
            .filter(|e| e.line.contains("Possible Join Flooder"))
            .count()
    }

    #[test]
    fn six_fast_joins_notice_once() {
        let mut net = net(5, 10);
        let _watcher = oper(&mut net);
        let chan = net.channel_make("#f");

        for i in 0..6 {
            let joiner = user(&mut net, &format!("u{i}"));
            net.add_user_to_channel(&chan, &joiner, MemberFlags::empty(), true);
        }
        assert_eq!(flood_notices(&net), 1, "exactly one notice while saturated");

        // Still saturated: another join, still no second notice.
        let late = user(&mut net, "late");
        net.add_user_to_channel(&chan, &late, MemberFlags::empty(), true);
        assert_eq!(flood_notices(&net), 1);
    }

    #[test]
    fn accumulator_drains_and_rearms() {
        let mut net = net(5, 10);
        let _watcher = oper(&mut net);
        let chan = net.channel_make("#f");

        for i in 0..6 {
            let joiner = user(&mut net, &format!("u{i}"));
            net.add_user_to_channel(&chan, &joiner, MemberFlags::empty(), true);
        }
        assert_eq!(flood_notices(&net), 1);

        // Let the bucket drain fully, then flood again: a fresh notice.
        net.clock.sec_monotonic += 60;
        for i in 0..7 {
            let joiner = user(&mut net, &format!("v{i}"));
            net.add_user_to_channel(&chan, &joiner, MemberFlags::empty(), true);
        }
        assert_eq!(flood_notices(&net), 2);
    }

    #[test]
    fn disabled_when_time_zero() {
        let mut net = net(5, 0);
        let _watcher = oper(&mut net);
        let chan = net.channel_make("#f");
        for i in 0..20 {
            let joiner = user(&mut net, &format!("u{i}"));
            net.add_user_to_channel(&chan, &joiner, MemberFlags::empty(), true);
        }
        assert_eq!(flood_notices(&net), 0);
    }

    #[test]
    fn spambot_warning_fires_past_threshold() {
        let mut net = net(16, 8);
        let _watcher = oper(&mut net);
        let uid = user(&mut net, "churner");

        // Rapid join/leave cycles push the counter past spam_num.
        for _ in 0..6 {
            net.check_spambot_warning(&uid, Some("#x"));
            net.check_spambot_warning(&uid, None);
        }
        let warnings = net
            .outbox
            .iter()
            .filter(|e| e.line.contains("possible spambot"))
            .count();
        assert!(warnings >= 1, "expected at least one spambot warning");
    }
}
