//! Watch (notify) subsystem.
//!
//! A watch entry maps a folded nickname to the set of local clients that
//! asked to be told when that nick logs on or off. The inverse set lives
//! on each client's connection record so an exiting client can be removed
//! from every entry it subscribes to without scanning the table. Entries
//! never outlive their last subscriber.

use std::collections::HashSet;

use ferric_proto::{Folded, Response};

use crate::state::client::Uid;
use crate::state::Network;

/// One watched name.
#[derive(Debug, Default)]
pub struct WatchEntry {
    /// Wall-clock second of the last LOGON/LOGOFF event for this name.
    pub lasttime: i64,
    /// Local subscribers. Never empty for a retained entry.
    pub watched_by: HashSet<Uid>,
}

impl Network {
    /// Subscribe `uid` to `name`. Idempotent; creates the entry lazily.
    pub fn watch_add(&mut self, name: &str, uid: &str) {
        let key = Folded::new(name);
        let now = self.clock.sec_real;
        let entry = self.watch.entry(key.clone()).or_insert_with(|| WatchEntry {
            lasttime: now,
            watched_by: HashSet::new(),
        });
        entry.watched_by.insert(uid.to_owned());

        if let Some(conn) = self.clients.get_mut(uid).and_then(|c| c.conn.as_mut()) {
            conn.watches.insert(key);
        }
    }

    /// Unsubscribe `uid` from `name`, deleting an emptied entry.
    pub fn watch_del(&mut self, name: &str, uid: &str) {
        let key = Folded::new(name);
        if let Some(entry) = self.watch.get_mut(key.as_str()) {
            entry.watched_by.remove(uid);
            if entry.watched_by.is_empty() {
                self.watch.remove(key.as_str());
            }
        }
        if let Some(conn) = self.clients.get_mut(uid).and_then(|c| c.conn.as_mut()) {
            conn.watches.remove(&key);
        }
    }

    /// Drop every subscription `uid` holds; called from `exit_client`.
    pub fn watch_del_all(&mut self, uid: &str) {
        let names: Vec<Folded> = self
            .clients
            .get(uid)
            .and_then(|c| c.conn.as_ref())
            .map(|conn| conn.watches.iter().cloned().collect())
            .unwrap_or_default();

        for name in names {
            if let Some(entry) = self.watch.get_mut(name.as_str()) {
                entry.watched_by.remove(uid);
                if entry.watched_by.is_empty() {
                    self.watch.remove(name.as_str());
                }
            }
        }

        if let Some(conn) = self.clients.get_mut(uid).and_then(|c| c.conn.as_mut()) {
            conn.watches.clear();
        }
    }

    /// Fire a LOGON or LOGOFF event for the client's current name:
    /// freshen `lasttime` and notify every subscriber.
    pub fn watch_check_hash(&mut self, uid: &str, reply: Response) {
        let Some(client) = self.clients.get(uid) else { return };
        let name = client.name.clone();
        let username = client.username.clone();
        let host = client.host.clone();

        let key = Folded::new(&name);
        let now = self.clock.sec_real;
        let Some(entry) = self.watch.get_mut(key.as_str()) else {
            return;
        };
        entry.lasttime = now;
        let lasttime = entry.lasttime.to_string();
        let subscribers: Vec<Uid> = entry.watched_by.iter().cloned().collect();

        let text = match reply {
            Response::RPL_LOGON => "logged online",
            _ => "logged offline",
        };
        for sub in subscribers {
            self.sendto_one_numeric(
                &sub,
                reply,
                &[&name, &username, &host, &lasttime, text],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::Config;
    use crate::state::client::Status;

    fn net() -> Network {
        let mut net = Network::new(Config::default());
        net.clock = Clock::fixed(1_600_000_000, 0);
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

    #[test]
    fn add_is_idempotent() {
        let mut net = net();
        let a = user(&mut net, "alice");
        net.watch_add("Target", &a);
        net.watch_add("target", &a);
        assert_eq!(net.watch.len(), 1);
        let entry = net.watch.get("target").unwrap();
        assert_eq!(entry.watched_by.len(), 1);
    }

    #[test]
    fn del_removes_empty_entries() {
        let mut net = net();
        let a = user(&mut net, "alice");
        let b = user(&mut net, "bob");
        net.watch_add("t", &a);
        net.watch_add("t", &b);
        net.watch_del("t", &a);
        assert!(net.watch.contains_key("t"));
        net.watch_del("t", &b);
        assert!(!net.watch.contains_key("t"));
    }

    #[test]
    fn del_all_on_exit() {
        let mut net = net();
        let a = user(&mut net, "alice");
        net.watch_add("one", &a);
        net.watch_add("two", &a);
        net.watch_del_all(&a);
        assert!(net.watch.is_empty());
    }

    #[test]
    fn check_hash_notifies_subscribers() {
        let mut net = net();
        let a = user(&mut net, "alice");
        let t = user(&mut net, "target");
        net.watch_add("target", &a);
        net.outbox.clear();

        net.clock.sec_real += 5;
        net.watch_check_hash(&t, Response::RPL_LOGON);

        assert_eq!(net.outbox.len(), 1);
        let line = &net.outbox[0].line;
        assert!(line.contains(" 600 alice target u h 1600000005 "), "got {line}");
        assert_eq!(net.watch.get("target").unwrap().lasttime, 1_600_000_005);
    }

    #[test]
    fn no_entry_no_events() {
        let mut net = net();
        let t = user(&mut net, "target");
        net.outbox.clear();
        net.watch_check_hash(&t, Response::RPL_LOGON);
        assert!(net.outbox.is_empty());
    }
}
