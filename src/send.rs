//! Outbound message routing.
//!
//! Handlers never touch sockets; they append [`Envelope`]s to the
//! network's outbox and the I/O layer drains them in order. Per-recipient
//! ordering therefore follows emission order, which is all the protocol
//! requires. Sends addressed to a client flagged DEAD are dropped here so
//! a handler never has to care whether its target died earlier in the
//! same command.

use ferric_proto::{Line, Response};

use crate::state::client::Uid;
use crate::state::modes::{Capab, Caps, MemberFlags, UserModes};
use crate::state::Network;

/// Where an envelope goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A locally connected user.
    Client(Uid),
    /// A directly linked server.
    Server(Uid),
}

/// One outbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub to: Recipient,
    pub line: String,
}

impl Network {
    fn push(&mut self, to: Recipient, line: String) {
        let uid = match &to {
            Recipient::Client(uid) | Recipient::Server(uid) => uid,
        };
        match self.clients.get(uid) {
            Some(c) if !c.is_dead() && c.my_connect() => {}
            _ => return,
        }
        self.outbox.push_back(Envelope { to, line });
    }

    /// Serialize one line to one local peer (client or server link).
    pub fn sendto_one(&mut self, uid: &str, line: &str) {
        let to = match self.clients.get(uid) {
            Some(c) if c.is_server() => Recipient::Server(uid.to_owned()),
            Some(_) => Recipient::Client(uid.to_owned()),
            None => return,
        };
        self.push(to, line.to_owned());
    }

    /// Route toward a possibly remote client: local targets get the line
    /// directly, remote ones have it forwarded along their link.
    pub fn sendto_route(&mut self, uid: &str, line: &str) {
        let hop = match self.clients.get(uid) {
            Some(c) if c.my_connect() => uid.to_owned(),
            Some(c) => c.from.clone(),
            None => return,
        };
        self.sendto_one(&hop, line);
    }

    /// Flood-fill to every server link except `except`, filtered by link
    /// capabilities: all of `caps` required, none of `nocaps` allowed.
    pub fn sendto_server(
        &mut self,
        except: Option<&str>,
        caps: Capab,
        nocaps: Capab,
        line: &str,
    ) {
        let targets: Vec<Uid> = self
            .local_servers
            .iter()
            .filter(|sid| Some(sid.as_str()) != except)
            .filter(|sid| {
                self.clients.get(*sid).is_some_and(|s| {
                    (caps == Capab::empty() || s.capab.has(caps))
                        && (nocaps == Capab::empty() || !s.capab.has(nocaps))
                })
            })
            .cloned()
            .collect();
        for sid in targets {
            self.push(Recipient::Server(sid), line.to_owned());
        }
    }

    /// Deliver to every local member of a channel except `except`,
    /// filtered by membership status and client capabilities.
    ///
    /// `status` of zero means every member; otherwise only members holding
    /// one of the given prefix flags receive the line.
    pub fn sendto_channel_local(
        &mut self,
        except: Option<&str>,
        chan: &ferric_proto::Folded,
        status: MemberFlags,
        cap: Caps,
        nocap: Caps,
        line: &str,
    ) {
        let Some(channel) = self.channels.get(chan.as_str()) else {
            return;
        };
        let targets: Vec<Uid> = channel
            .members
            .iter()
            .filter(|(uid, flags)| {
                if Some(uid.as_str()) == except {
                    return false;
                }
                if status != MemberFlags::empty() && !flags.has(status) {
                    return false;
                }
                self.clients.get(uid.as_str()).is_some_and(|c| {
                    c.my_connect()
                        && !c.is_server()
                        && (cap == Caps::empty() || c.caps.has(cap))
                        && (nocap == Caps::empty() || !c.caps.has(nocap))
                })
            })
            .map(|(uid, _)| uid.clone())
            .collect();

        for uid in targets {
            self.push(Recipient::Client(uid), line.to_owned());
        }
    }

    /// Deliver to the local neighborhood of `uid`: every local client
    /// sharing at least one channel, de-duplicated with a walk serial so a
    /// client in three common channels gets one copy.
    pub fn sendto_common_channels_local(
        &mut self,
        uid: &str,
        include_self: bool,
        cap: Caps,
        nocap: Caps,
        line: &str,
    ) {
        self.serial += 1;
        let serial = self.serial;

        let channels: Vec<ferric_proto::Folded> = self
            .clients
            .get(uid)
            .map(|c| c.channels.iter().cloned().collect())
            .unwrap_or_default();

        let mut targets: Vec<Uid> = Vec::new();
        for chan in &channels {
            let Some(channel) = self.channels.get(chan.as_str()) else {
                continue;
            };
            for member in channel.members.keys() {
                if member == uid {
                    continue;
                }
                let Some(client) = self.clients.get(member.as_str()) else {
                    continue;
                };
                if !client.my_connect() || client.serial == serial {
                    continue;
                }
                if (cap != Caps::empty() && !client.caps.has(cap))
                    || (nocap != Caps::empty() && client.caps.has(nocap))
                {
                    continue;
                }
                targets.push(member.clone());
            }
            // Mark as visited before walking the next channel.
            for member in targets.iter() {
                if let Some(client) = self.clients.get_mut(member.as_str()) {
                    client.serial = serial;
                }
            }
        }

        if include_self {
            if let Some(c) = self.clients.get(uid) {
                if c.my_connect()
                    && (cap == Caps::empty() || c.caps.has(cap))
                    && (nocap == Caps::empty() || !c.caps.has(nocap))
                {
                    targets.push(uid.to_owned());
                }
            }
        }

        for target in targets {
            self.push(Recipient::Client(target), line.to_owned());
        }
    }

    /// Server notice to every local oper holding `umode`.
    pub fn sendto_realops(&mut self, umode: UserModes, text: &str) {
        let line = format!(":{} NOTICE * :*** Notice -- {}", self.me.name, text);
        for uid in self.local_clients_with_umode(umode) {
            self.push(Recipient::Client(uid), line.clone());
        }
    }

    /// Private server notice to one client.
    pub fn sendto_one_notice(&mut self, uid: &str, text: &str) {
        let nick = self.display_name(uid);
        let line = format!(":{} NOTICE {} {}", self.me.name, nick, text);
        self.sendto_one(uid, &line);
    }

    /// Numeric reply to a client, with our server as prefix and the
    /// client's nick (or `*` before registration) as first argument.
    pub fn sendto_one_numeric(&mut self, uid: &str, numeric: Response, args: &[&str]) {
        let nick = self.display_name(uid);
        let mut params: Vec<&str> = Vec::with_capacity(args.len() + 1);
        params.push(&nick);
        params.extend_from_slice(args);
        let line = Line::new(Some(&self.me.name), &numeric.as_command(), &params);
        self.sendto_route(uid, &line.to_string());
    }

    /// Nick for numerics; `*` while unregistered.
    pub fn display_name(&self, uid: &str) -> String {
        match self.clients.get(uid) {
            Some(c) if !c.name.is_empty() => c.name.clone(),
            _ => "*".to_owned(),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::Config;
    use crate::state::client::Status;
    use crate::state::modes::MemberFlags;

    fn net() -> Network {
        let mut net = Network::new(Config::default());
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

    fn drain(net: &mut Network) -> Vec<(Recipient, String)> {
        net.outbox.drain(..).map(|e| (e.to, e.line)).collect()
    }

    #[test]
    fn sendto_one_reaches_local_client() {
        let mut net = net();
        let uid = user(&mut net, "alice");
        net.sendto_one(&uid, "PING :x");
        let out = drain(&mut net);
        assert_eq!(out, vec![(Recipient::Client(uid), "PING :x".to_owned())]);
    }

    #[test]
    fn dead_clients_receive_nothing() {
        let mut net = net();
        let uid = user(&mut net, "alice");
        net.exit_client(&uid, "bye");
        net.outbox.clear();
        net.sendto_one(&uid, "PING :x");
        assert!(net.outbox.is_empty());
    }

    #[test]
    fn common_channels_dedup() {
        let mut net = net();
        let a = user(&mut net, "alice");
        let b = user(&mut net, "bob");
        for name in ["#one", "#two", "#three"] {
            let chan = net.channel_make(name);
            net.add_user_to_channel(&chan, &a, MemberFlags::empty(), false);
            net.add_user_to_channel(&chan, &b, MemberFlags::empty(), false);
        }

        net.sendto_common_channels_local(&a, false, Caps::empty(), Caps::empty(), ":x QUIT :y");
        let out = drain(&mut net);
        assert_eq!(out.len(), 1, "bob must get exactly one copy");
        assert_eq!(out[0].0, Recipient::Client(b));
    }

    #[test]
    fn common_channels_include_self() {
        let mut net = net();
        let a = user(&mut net, "alice");
        let chan = net.channel_make("#one");
        net.add_user_to_channel(&chan, &a, MemberFlags::empty(), false);

        net.sendto_common_channels_local(&a, true, Caps::empty(), Caps::empty(), "X");
        let out = drain(&mut net);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, Recipient::Client(a));
    }

    #[test]
    fn numeric_uses_star_before_registration() {
        let mut net = net();
        let uid = net.new_local_client();
        net.sendto_one_numeric(&uid, Response::ERR_NOTREGISTERED, &["You have not registered"]);
        let out = drain(&mut net);
        assert_eq!(
            out[0].1,
            format!(":{} 451 * :You have not registered", "irc.example.org")
        );
    }

    #[test]
    fn realops_filters_by_umode() {
        let mut net = net();
        let plain = user(&mut net, "plain");
        let oper = user(&mut net, "oper");
        net.client_mut(&oper).unwrap().umodes.set(UserModes::BOTS);

        net.sendto_realops(UserModes::BOTS, "Possible Join Flooder x");
        let out = drain(&mut net);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, Recipient::Client(oper));
        let _ = plain;
    }
}
