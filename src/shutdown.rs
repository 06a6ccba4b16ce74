//! Orderly death and restart.
//!
//! The core does not own file descriptors, databases or the process
//! image; it drives the shutdown sequence through a hook trait the
//! embedder implements. The sequence is fixed: tell every local client,
//! tell every link, log, save, close, drop the pid file, then restart or
//! exit.

use tracing::info;

use crate::state::modes::Capab;
use crate::state::Network;

/// Collaborator surface invoked during [`server_die`].
pub trait ShutdownHooks {
    /// Flush any persistent collaborator state.
    fn save_all_databases(&mut self) {}
    /// Close every owned file descriptor.
    fn close_fds(&mut self) {}
    /// Remove the pid file.
    fn unlink_pidfile(&mut self) {}
    /// Replace the process image; only reached on restart. Returning is
    /// treated as exec failure.
    fn restart_process(&mut self) {}
    /// Terminate the process.
    fn exit_process(&mut self, _success: bool) {}
}

/// No-op hooks for embedding and tests.
#[derive(Debug, Default)]
pub struct NoHooks;

impl ShutdownHooks for NoHooks {}

/// Bring the server down, optionally restarting. A second restart while
/// one is already underway is an unrecoverable fault.
pub fn server_die(net: &mut Network, message: &str, restart: bool, hooks: &mut dyn ShutdownHooks) {
    if restart {
        assert!(!net.restart_in_progress, "recursive restart");
        net.restart_in_progress = true;
    }

    let what = if restart { "Restarting" } else { "Terminating" };
    let buffer = if message.is_empty() {
        format!("Server {what}")
    } else {
        format!("Server {what}: {message}")
    };

    let locals: Vec<String> = net.local_clients.clone();
    for uid in locals {
        let text = format!(":{buffer}");
        net.sendto_one_notice(&uid, &text);
    }

    let error = format!(":{} ERROR :{}", net.me.sid, buffer);
    net.sendto_server(None, Capab::empty(), Capab::empty(), &error);

    info!(message = %buffer, restart, "server going down");

    hooks.save_all_databases();
    hooks.close_fds();
    hooks.unlink_pidfile();

    if restart {
        hooks.restart_process();
        hooks.exit_process(false);
    } else {
        hooks.exit_process(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::client::Status;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl ShutdownHooks for Recorder {
        fn save_all_databases(&mut self) {
            self.calls.push("save");
        }
        fn close_fds(&mut self) {
            self.calls.push("close");
        }
        fn unlink_pidfile(&mut self) {
            self.calls.push("unlink");
        }
        fn restart_process(&mut self) {
            self.calls.push("restart");
        }
        fn exit_process(&mut self, _success: bool) {
            self.calls.push("exit");
        }
    }

    #[test]
    fn hook_order_is_fixed() {
        let mut net = Network::new(Config::default());
        let uid = net.new_local_client();
        {
            let c = net.client_mut(&uid).unwrap();
            c.name = "alice".to_owned();
            c.status = Status::Client;
        }

        let mut hooks = Recorder::default();
        server_die(&mut net, "maintenance", false, &mut hooks);
        assert_eq!(hooks.calls, vec!["save", "close", "unlink", "exit"]);

        // Every local client heard about it first.
        assert!(net
            .outbox
            .iter()
            .any(|e| e.line.contains("Server Terminating: maintenance")));
    }

    #[test]
    fn restart_runs_restart_hook() {
        let mut net = Network::new(Config::default());
        let mut hooks = Recorder::default();
        server_die(&mut net, "", true, &mut hooks);
        assert_eq!(hooks.calls, vec!["save", "close", "unlink", "restart", "exit"]);
    }
}
