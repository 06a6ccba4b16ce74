//! Configuration tree.
//!
//! The engine is handed a fully built [`Config`]; reading it from a TOML
//! file is a thin convenience on top. Every knob has a serde default so a
//! minimal config only names the server identity.

use serde::Deserialize;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server identity and presentation.
    #[serde(default)]
    pub server: ServerConfig,
    /// Channel limits and join-flood knobs.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Pacing and spam heuristics.
    #[serde(default)]
    pub general: GeneralConfig,
    /// WEBIRC gateway blocks.
    #[serde(default)]
    pub webirc: Vec<WebircBlock>,
}

/// One authorized WEBIRC gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WebircBlock {
    /// Password the gateway must present. Must be non-empty to be usable.
    pub password: String,
    /// Masks matched against the gateway's real host or IP.
    pub hosts: Vec<String>,
    /// Optional ident mask; empty matches any.
    #[serde(default)]
    pub ident: String,
}

/// Failure to load a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Server identity and server-hiding policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name announced in prefixes and numerics.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// TS6 server ID: digit plus two uppercase alphanumerics.
    #[serde(default = "default_sid")]
    pub sid: String,
    /// Free-form server description.
    #[serde(default = "default_description")]
    pub description: String,
    /// Network description shown when servers are hidden.
    #[serde(default = "default_network_description")]
    pub network_description: String,
    /// Rewrite remote server names in WHOIS for non-opers.
    #[serde(default)]
    pub hide_servers: bool,
    /// Name presented in place of hidden servers.
    #[serde(default = "default_hidden_name")]
    pub hidden_name: String,
    /// Visible topic length cap for locally set topics.
    #[serde(default = "default_max_topic_length")]
    pub max_topic_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            sid: default_sid(),
            description: default_description(),
            network_description: default_network_description(),
            hide_servers: false,
            hidden_name: default_hidden_name(),
            max_topic_length: default_max_topic_length(),
        }
    }
}

/// Channel limits and the per-channel join-flood accumulator knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Maximum channels a local user may occupy.
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    /// Restrict locally created channel names to visible ASCII.
    #[serde(default)]
    pub disable_fake_channels: bool,
    /// Joins tolerated within `joinfloodtime` before the oper notice.
    /// Zero disables the accumulator entirely.
    #[serde(default = "default_joinfloodcount")]
    pub joinfloodcount: u32,
    /// Decay window for the join-flood accumulator, in seconds.
    #[serde(default = "default_joinfloodtime")]
    pub joinfloodtime: u64,
    /// Reserved channel-name masks; non-exempt locals cannot speak there.
    #[serde(default)]
    pub reserved: Vec<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            disable_fake_channels: false,
            joinfloodcount: default_joinfloodcount(),
            joinfloodtime: default_joinfloodtime(),
            reserved: Vec::new(),
        }
    }
}

/// Pacing and per-client spambot heuristics.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Minimum seconds between paced remote queries (WHOIS to a peer).
    #[serde(default = "default_pace_wait_simple")]
    pub pace_wait_simple: u64,
    /// Drop the target-server argument of remote-capable commands.
    #[serde(default)]
    pub disable_remote_commands: bool,
    /// Join/leave count at which a client is considered a possible spambot.
    #[serde(default = "default_spam_num")]
    pub spam_num: u32,
    /// Joins faster than this many seconds apart count towards `spam_num`.
    #[serde(default = "default_spam_time")]
    pub spam_time: u64,
    /// Part/quit reasons are suppressed for connections younger than this.
    #[serde(default = "default_anti_spam_exit_message_time")]
    pub anti_spam_exit_message_time: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            pace_wait_simple: default_pace_wait_simple(),
            disable_remote_commands: false,
            spam_num: default_spam_num(),
            spam_time: default_spam_time(),
            anti_spam_exit_message_time: default_anti_spam_exit_message_time(),
        }
    }
}

fn default_server_name() -> String {
    "irc.example.org".to_owned()
}

fn default_sid() -> String {
    "0FE".to_owned()
}

fn default_description() -> String {
    "ferricd".to_owned()
}

fn default_network_description() -> String {
    "An IRC network".to_owned()
}

fn default_hidden_name() -> String {
    "*.hidden".to_owned()
}

fn default_max_topic_length() -> usize {
    300
}

fn default_max_channels() -> usize {
    25
}

fn default_joinfloodcount() -> u32 {
    16
}

fn default_joinfloodtime() -> u64 {
    8
}

fn default_pace_wait_simple() -> u64 {
    1
}

fn default_spam_num() -> u32 {
    5
}

fn default_spam_time() -> u64 {
    60
}

fn default_anti_spam_exit_message_time() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_everything() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.name, "irc.example.org");
        assert_eq!(config.server.sid, "0FE");
        assert_eq!(config.channel.joinfloodcount, 16);
        assert_eq!(config.channel.joinfloodtime, 8);
        assert_eq!(config.general.pace_wait_simple, 1);
    }

    #[test]
    fn partial_overrides() {
        let config = Config::from_toml(
            r#"
            [server]
            name = "hub.test.net"
            sid = "1AB"

            [channel]
            joinfloodcount = 5
            joinfloodtime = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.server.name, "hub.test.net");
        assert_eq!(config.server.sid, "1AB");
        assert_eq!(config.channel.joinfloodcount, 5);
        assert_eq!(config.channel.joinfloodtime, 10);
        // Untouched sections keep their defaults.
        assert!(!config.general.disable_remote_commands);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(Config::from_toml("[server\nname=").is_err());
    }
}
