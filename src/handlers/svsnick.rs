//! SVSNICK: services-driven forced nick change.
//!
//! Two argument forms are accepted. The current form is
//! `SVSNICK <target> <new_nick> <ts>`; the legacy form inserts the
//! target's old TS ahead of the new nick:
//! `SVSNICK <target> <old_ts> <new_nick> <new_ts>`, and is rejected when
//! the old TS is present, non-zero and does not match the target. The
//! parameter interleaving of the two forms, including which slot is
//! echoed when forwarding, follows the established network behaviour
//! exactly; interoperability here matters more than symmetry.

use ferric_proto::{valid_nickname, Line, Response};
use tracing::debug;

use crate::error::HandlerResult;
use crate::state::modes::{Capab, Caps, UserModes};
use crate::state::Network;

pub fn ms_svsnick(net: &mut Network, source: &str, line: &Line) -> HandlerResult {
    let legacy = line.params.len() >= 4;
    let new_nick = if legacy {
        line.arg(2).unwrap_or("")
    } else {
        line.arg(1).unwrap_or("")
    }
    .to_owned();

    let Some(src) = net.client(source) else {
        return Ok(());
    };
    if !src.is_service() {
        return Ok(());
    }
    let src_from = src.from.clone();

    if !valid_nickname(&new_nick, true) {
        return Ok(());
    }

    let Some(target) = net.find_person(line.arg(0).unwrap_or("")) else {
        return Ok(());
    };
    let target_uid = target.uid.clone();
    let target_ts = target.tsinfo;
    let target_local = target.my_connect();
    let target_from = target.from.clone();
    let target_name = target.name.clone();

    let ts: u64;
    if legacy {
        ts = line.arg(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        if ts != 0 && ts != target_ts as u64 {
            return Ok(());
        }
    } else {
        ts = line.arg(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    }

    let new_ts: u64 = if !legacy {
        ts
    } else {
        line.arg(3).and_then(|s| s.parse().ok()).unwrap_or(0)
    };

    if !target_local {
        if target_from == src_from {
            let text = format!(
                "Received wrong-direction SVSNICK for {} (behind {}) from {}",
                target_name,
                net.display_name(&src_from),
                net.display_name(source)
            );
            net.sendto_realops(UserModes::DEBUG, &text);
            return Ok(());
        }

        // Forwarding echoes the third argument slot verbatim, whichever
        // form it arrived in.
        let echoed = line.arg(2).unwrap_or("").to_owned();
        let fwd = format!(":{source} SVSNICK {target_uid} {new_nick} {echoed}");
        net.sendto_route(&target_uid, &fwd);
        return Ok(());
    }

    if let Some(exists) = net.find_person(&new_nick) {
        let exists_uid = exists.uid.clone();
        if exists_uid == target_uid {
            if target_name == new_nick {
                return Ok(());
            }
            // Same client, different casing: fall through and rename.
        } else {
            net.exit_client(&target_uid, "SVSNICK Collide");
            return Ok(());
        }
    } else if let Some(unknown) = net
        .local_clients
        .iter()
        .find(|uid| {
            net.clients
                .get(*uid)
                .is_some_and(|c| c.is_unknown() && ferric_proto::irc_eq(&c.name, &new_nick))
        })
        .cloned()
    {
        net.exit_client(&unknown, "SVSNICK Override");
    }

    debug!(target = %target_name, new_nick = %new_nick, new_ts, "applying SVSNICK");

    if let Some(client) = net.client_mut(&target_uid) {
        client.tsinfo = new_ts as i64;
    }
    net.clear_ban_cache_on_channels(&target_uid);
    net.watch_check_hash(&target_uid, Response::RPL_LOGOFF);

    let registered = net
        .client(&target_uid)
        .is_some_and(|c| c.umodes.has(UserModes::REGISTERED));
    if registered {
        let (nuh, name) = {
            let c = net.client(&target_uid).expect("target fetched above");
            (c.nuh(), c.name.clone())
        };
        if let Some(client) = net.client_mut(&target_uid) {
            client.umodes.clear(UserModes::REGISTERED);
        }
        let echo = format!(":{nuh} MODE {name} :-r");
        net.sendto_one(&target_uid, &echo);
    }

    let nuh = net
        .client(&target_uid)
        .map(|c| c.nuh())
        .unwrap_or_default();
    let announce = format!(":{nuh} NICK :{new_nick}");
    net.sendto_common_channels_local(&target_uid, true, Caps::empty(), Caps::empty(), &announce);

    net.whowas_add_history(&target_uid);

    let tsinfo = net.client(&target_uid).map(|c| c.tsinfo).unwrap_or_default();
    let prop = format!(":{target_uid} NICK {new_nick} :{tsinfo}");
    net.sendto_server(None, Capab::empty(), Capab::empty(), &prop);

    net.hash_del_client(&target_uid);
    if let Some(client) = net.client_mut(&target_uid) {
        client.name = new_nick;
    }
    net.hash_add_client(&target_uid);

    net.watch_check_hash(&target_uid, Response::RPL_LOGON);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::Config;
    use crate::state::client::{Client, Status, Uid};
    use crate::state::modes::ClientFlags;

    fn net() -> Network {
        let mut net = Network::new(Config::default());
        net.clock = Clock::fixed(1_600_000_000, 100);
        net
    }

    fn service(net: &mut Network) -> Uid {
        // A services pseudo-client behind a linked server.
        let mut link = Client::new("9SS".to_owned(), Status::Server);
        link.name = "services.test".to_owned();
        link.from = "9SS".to_owned();
        link.conn = Some(Default::default());
        net.clients.insert("9SS".to_owned(), link);
        net.local_servers.push("9SS".to_owned());
        net.sids.insert("9SS".to_owned(), "9SS".to_owned());

        let mut svc = Client::new("9SSAAAAAA".to_owned(), Status::Client);
        svc.name = "NickServ".to_owned();
        svc.flags.set(ClientFlags::SERVICE);
        svc.from = "9SS".to_owned();
        svc.servptr = "9SS".to_owned();
        net.clients.insert("9SSAAAAAA".to_owned(), svc);
        net.hash_add_client("9SSAAAAAA");
        "9SSAAAAAA".to_owned()
    }

    fn user(net: &mut Network, nick: &str, ts: i64) -> Uid {
        let uid = net.new_local_client();
        {
            let c = net.client_mut(&uid).unwrap();
            c.name = nick.to_owned();
            c.username = "u".to_owned();
            c.host = "h".to_owned();
            c.status = Status::Client;
            c.tsinfo = ts;
        }
        net.hash_add_client(&uid);
        uid
    }

    #[test]
    fn new_form_renames_and_retimes() {
        let mut net = net();
        let svc = service(&mut net);
        let u = user(&mut net, "u", 500);

        let line: Line = format!(":{svc} SVSNICK u v 600").parse().unwrap();
        ms_svsnick(&mut net, &svc, &line).unwrap();

        assert!(net.find_person("u").is_none());
        let renamed = net.find_person("v").unwrap();
        assert_eq!(renamed.uid, u);
        assert_eq!(renamed.tsinfo, 600);
    }

    #[test]
    fn legacy_form_requires_matching_old_ts() {
        let mut net = net();
        let svc = service(&mut net);
        let _u = user(&mut net, "u", 500);

        // Wrong old TS: dropped.
        let line: Line = format!(":{svc} SVSNICK u 777 v 600").parse().unwrap();
        ms_svsnick(&mut net, &svc, &line).unwrap();
        assert!(net.find_person("u").is_some());
        assert!(net.find_person("v").is_none());

        // Matching old TS: applied, with the trailing new TS.
        let line: Line = format!(":{svc} SVSNICK u 500 v 600").parse().unwrap();
        ms_svsnick(&mut net, &svc, &line).unwrap();
        assert_eq!(net.find_person("v").unwrap().tsinfo, 600);
    }

    #[test]
    fn collide_kills_target() {
        let mut net = net();
        let svc = service(&mut net);
        let u = user(&mut net, "u", 500);
        let v = user(&mut net, "v", 400);

        let line: Line = format!(":{svc} SVSNICK u 500 v 600").parse().unwrap();
        ms_svsnick(&mut net, &svc, &line).unwrap();
        net.reap();

        assert!(net.client(&u).is_none(), "target dies in a collide");
        assert!(net.client(&v).is_some(), "holder survives");
        assert_eq!(net.find_person("v").unwrap().uid, v);
    }

    #[test]
    fn override_kills_unregistered_holder() {
        let mut net = net();
        let svc = service(&mut net);
        let u = user(&mut net, "u", 500);
        // An unregistered connection squatting the nick.
        let squatter = net.new_local_client();
        net.client_mut(&squatter).unwrap().name = "v".to_owned();

        let line: Line = format!(":{svc} SVSNICK u 500 v 600").parse().unwrap();
        ms_svsnick(&mut net, &svc, &line).unwrap();
        net.reap();

        assert!(net.client(&squatter).is_none(), "squatter overridden");
        assert_eq!(net.find_person("v").unwrap().uid, u);
    }

    #[test]
    fn clears_registered_umode() {
        let mut net = net();
        let svc = service(&mut net);
        let u = user(&mut net, "u", 500);
        net.client_mut(&u).unwrap().umodes.set(UserModes::REGISTERED);

        let line: Line = format!(":{svc} SVSNICK u v 600").parse().unwrap();
        ms_svsnick(&mut net, &svc, &line).unwrap();

        assert!(!net.client(&u).unwrap().umodes.has(UserModes::REGISTERED));
        assert!(net
            .outbox
            .iter()
            .any(|e| e.line.ends_with("MODE u :-r")));
    }

    #[test]
    fn non_service_sources_ignored() {
        let mut net = net();
        let joe = user(&mut net, "joe", 100);
        let _u = user(&mut net, "u", 500);

        let line: Line = "SVSNICK u v 600".parse().unwrap();
        ms_svsnick(&mut net, &joe, &line).unwrap();
        assert!(net.find_person("v").is_none());
    }
}
