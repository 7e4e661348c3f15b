//! Configuration for the clan runtime

use chrono::Duration;
use clan_types::LifecycleEvent;
use serde::{Deserialize, Serialize};

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanConfig {
    /// Confirmation windows
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Confirmation windows, in seconds, for the two-step commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_confirm_secs")]
    pub disband_confirm_secs: u64,

    #[serde(default = "default_confirm_secs")]
    pub leave_confirm_secs: u64,

    #[serde(default = "default_confirm_secs")]
    pub kick_confirm_secs: u64,

    #[serde(default = "default_confirm_secs")]
    pub coronate_confirm_secs: u64,

    /// How long an invitation stays open
    #[serde(default = "default_invitation_secs")]
    pub invitation_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disband_confirm_secs: default_confirm_secs(),
            leave_confirm_secs: default_confirm_secs(),
            kick_confirm_secs: default_confirm_secs(),
            coronate_confirm_secs: default_confirm_secs(),
            invitation_secs: default_invitation_secs(),
        }
    }
}

impl SessionConfig {
    /// The confirmation window for an event, or `None` for events that
    /// take effect in a single call
    pub fn window(&self, event: LifecycleEvent) -> Option<Duration> {
        let secs = match event {
            LifecycleEvent::Disband => self.disband_confirm_secs,
            LifecycleEvent::Leave => self.leave_confirm_secs,
            LifecycleEvent::Kick => self.kick_confirm_secs,
            LifecycleEvent::Coronate => self.coronate_confirm_secs,
            LifecycleEvent::Join => self.invitation_secs,
            LifecycleEvent::Create | LifecycleEvent::Promote | LifecycleEvent::Demote => {
                return None
            }
        };
        Some(
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        )
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directives
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_confirm_secs() -> u64 {
    15
}

fn default_invitation_secs() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ClanConfig {
    /// Load configuration: defaults, then the optional file, then `CLAN__*`
    /// environment variables (e.g. `CLAN__SESSION__KICK_CONFIRM_SECS=30`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ClanConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CLAN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClanConfig::default();
        assert_eq!(config.session.kick_confirm_secs, 15);
        assert_eq!(config.session.invitation_secs, 120);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_windows() {
        let session = SessionConfig {
            disband_confirm_secs: 5,
            ..Default::default()
        };
        assert_eq!(
            session.window(LifecycleEvent::Disband),
            Some(Duration::seconds(5))
        );
        assert_eq!(
            session.window(LifecycleEvent::Join),
            Some(Duration::seconds(120))
        );
        assert_eq!(session.window(LifecycleEvent::Promote), None);
        assert_eq!(session.window(LifecycleEvent::Create), None);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ClanConfig::load(None).unwrap();
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[session]\nleave_confirm_secs = 3\n\n[logging]\njson = true").unwrap();

        let config = ClanConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.session.leave_confirm_secs, 3);
        assert_eq!(config.session.kick_confirm_secs, 15);
        assert!(config.logging.json);
    }

    #[test]
    fn test_partial_deserialization() {
        let config: ClanConfig =
            serde_json::from_str(r#"{"session":{"invitation_secs":30}}"#).unwrap();
        assert_eq!(config.session.invitation_secs, 30);
        assert_eq!(config.session.disband_confirm_secs, 15);
        assert_eq!(config.logging, LoggingConfig::default());
    }
}
