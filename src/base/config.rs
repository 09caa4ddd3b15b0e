//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::Path, sync::Arc, time::Duration};

use serde::Deserialize;

use super::types::Res;

/// Default IRC server to connect to.
fn default_host() -> String {
    "irc.libera.chat:6667".to_string()
}

/// Default nick (and user name) for the bot.
fn default_nick() -> String {
    "minibot".to_string()
}

/// Default channel to join.
fn default_channel() -> String {
    "#minibot".to_string()
}

/// Default SQLite file for the mailbox.
fn default_database() -> String {
    "minibot.db".to_string()
}

/// Default command prefix.
fn default_command_prefix() -> String {
    "!".to_string()
}

/// Default WHOIS wait, in milliseconds.
fn default_probe_timeout_ms() -> u64 {
    1000
}

/// Who may use the `opme` command.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpmePolicy {
    /// Only nicks that already hold `@` in the channel.
    #[default]
    RequireOperator,
    /// Anyone; this is how the bot historically behaved.
    Permissive,
}

/// Configuration for minibot.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// IRC `host:port` to connect to (`MINIBOT_HOST`).
    #[serde(default = "default_host")]
    pub host: String,
    /// IRC nick (`MINIBOT_NICK`).
    #[serde(default = "default_nick")]
    pub nick: String,
    /// IRC user name (`MINIBOT_USER`).
    #[serde(default = "default_nick")]
    pub user: String,
    /// Channel to join and reply into (`MINIBOT_CHANNEL`).
    #[serde(default = "default_channel")]
    pub channel: String,
    /// SQLite file holding pending messages (`MINIBOT_DATABASE`).
    #[serde(default = "default_database")]
    pub database: String,
    /// Prefix that marks a command token (`MINIBOT_COMMAND_PREFIX`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// How long to wait for a WHOIS reply (`MINIBOT_PROBE_TIMEOUT_MS`).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Who may use `opme` (`MINIBOT_OPME_POLICY`).
    #[serde(default)]
    pub opme_policy: OpmePolicy,
    /// Export spans over OTLP (`MINIBOT_OTLP`).
    #[serde(default)]
    pub otlp: bool,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            host: default_host(),
            nick: default_nick(),
            user: default_nick(),
            channel: default_channel(),
            database: default_database(),
            command_prefix: default_command_prefix(),
            probe_timeout_ms: default_probe_timeout_ms(),
            opme_policy: OpmePolicy::default(),
            otlp: false,
        }
    }
}

impl ConfigInner {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub nick: Option<String>,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub database: Option<String>,
    pub otlp: Option<bool>,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, overrides: &Overrides) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("MINIBOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        cfg = cfg
            .set_override_option("host", overrides.host.clone())?
            .set_override_option("nick", overrides.nick.clone())?
            .set_override_option("user", overrides.user.clone())?
            .set_override_option("channel", overrides.channel.clone())?
            .set_override_option("database", overrides.database.clone())?
            .set_override_option("otlp", overrides.otlp)?;

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.nick.is_empty() || self.nick.contains(char::is_whitespace) {
            return Err(anyhow::anyhow!("Nick must be a single non-empty word."));
        }

        if !self.channel.starts_with('#') && !self.channel.starts_with('&') {
            return Err(anyhow::anyhow!("Channel `{}` must start with `#` or `&`.", self.channel));
        }

        if self.command_prefix.is_empty() || self.command_prefix.contains(char::is_whitespace) {
            return Err(anyhow::anyhow!("Command prefix must be non-empty and contain no whitespace."));
        }

        if self.probe_timeout_ms == 0 {
            return Err(anyhow::anyhow!("Probe timeout must be greater than zero."));
        }

        Ok(())
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_historic_bot() {
        let config = Config::default();

        assert_eq!(config.nick, "minibot");
        assert_eq!(config.channel, "#minibot");
        assert_eq!(config.database, "minibot.db");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.probe_timeout(), Duration::from_secs(1));
        assert_eq!(config.opme_policy, OpmePolicy::RequireOperator);
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "channel = \"#file\"\nnick = \"filebot\"\nopme_policy = \"permissive\"\n").unwrap();

        let overrides = Overrides {
            channel: Some("#cli".to_string()),
            ..Default::default()
        };

        let config = Config::load(Some(&path), &overrides).unwrap();

        assert_eq!(config.channel, "#cli");
        assert_eq!(config.nick, "filebot");
        assert_eq!(config.opme_policy, OpmePolicy::Permissive);
    }

    #[test]
    fn rejects_channel_without_sigil() {
        let overrides = Overrides {
            channel: Some("minibot".to_string()),
            ..Default::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();

        assert!(Config::load(Some(&path), &overrides).is_err());
    }
}
