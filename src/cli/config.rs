//! Curator configuration file handling
//!
//! Configuration is a TOML file, by default at `<data_dir>/curator/config.toml`.
//! The three settings a deployment cannot run without (bot token, moderator
//! ids, outlet) may instead come from `CURATOR_*` environment variables, which
//! take precedence over the file.

use curator::ingress::{IngressMode, IngressSettings};
use curator::moderation::{Moderators, PipelineSettings};
use curator::telegram::{ChatRef, RetryPolicy, UserId, DEFAULT_API_URL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
const DEFAULT_POLL_TIMEOUT: &str = "30s";
const DEFAULT_SHUTDOWN_GRACE: &str = "30s";
const DEFAULT_PUBLISH_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: &str = "1s";

pub const ENV_BOT_TOKEN: &str = "CURATOR_BOT_TOKEN";
pub const ENV_MODERATORS: &str = "CURATOR_MODERATORS";
pub const ENV_OUTLET: &str = "CURATOR_OUTLET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write config file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid duration for {field}: {source}")]
    Duration {
        field: &'static str,
        source: humantime::DurationError,
    },

    #[error("Invalid listen address '{value}': {source}")]
    Address {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuratorConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingress: IngressConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Token issued by @BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Bot API base URL (override for a local Bot API server)
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Telegram user ids allowed to approve or reject
    #[serde(default)]
    pub moderators: Vec<i64>,

    /// Channel approved proposals are published to: numeric id or "@username"
    pub outlet: Option<ChatRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the proposals database
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressConfig {
    #[serde(default)]
    pub mode: IngressMode,

    /// Webhook listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Public base URL Telegram posts updates to (webhook mode)
    pub public_url: Option<String>,

    /// Secret Telegram echoes in every webhook request
    pub secret: Option<String>,

    /// Long-poll timeout, humantime format
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: String,

    /// Time in-flight updates get to finish after Ctrl-C, humantime format
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Attempts at copying an approved proposal to the outlet
    #[serde(default = "default_publish_attempts")]
    pub publish_attempts: u32,

    /// Delay before the first retry, doubled per attempt; humantime format
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_poll_timeout() -> String {
    DEFAULT_POLL_TIMEOUT.to_string()
}

fn default_shutdown_grace() -> String {
    DEFAULT_SHUTDOWN_GRACE.to_string()
}

fn default_publish_attempts() -> u32 {
    DEFAULT_PUBLISH_ATTEMPTS
}

fn default_retry_delay() -> String {
    DEFAULT_RETRY_DELAY.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: default_api_url(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            mode: IngressMode::default(),
            listen: default_listen(),
            public_url: None,
            secret: None,
            poll_timeout: default_poll_timeout(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            publish_attempts: DEFAULT_PUBLISH_ATTEMPTS,
            retry_delay: default_retry_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|source| ConfigError::Duration { field, source })
}

/// Parse a comma-separated list of user ids, e.g. `"123, 456"`.
fn parse_moderator_list(value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| ConfigError::Invalid {
                field: "moderators",
                reason: format!("'{}' is not a user id", part),
            })
        })
        .collect()
}

/// Numeric chat id, or a public `@username`.
fn parse_outlet(value: &str) -> ChatRef {
    let value = value.trim();
    match value.parse::<i64>() {
        Ok(id) => ChatRef::Id(id),
        Err(_) => ChatRef::Username(value.to_string()),
    }
}

impl CuratorConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `CURATOR_*` overrides from `lookup` (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_BOT_TOKEN) {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(list) = lookup(ENV_MODERATORS) {
            self.moderation.moderators = parse_moderator_list(&list)?;
        }
        if let Some(outlet) = lookup(ENV_OUTLET) {
            self.moderation.outlet = Some(parse_outlet(&outlet));
        }
        Ok(())
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Check everything `run` needs, without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "telegram.bot_token",
                reason: format!("not set (set it in the config file or {})", ENV_BOT_TOKEN),
            });
        }
        if self.moderation.moderators.is_empty() {
            return Err(ConfigError::Invalid {
                field: "moderation.moderators",
                reason: format!("at least one moderator id is required (or {})", ENV_MODERATORS),
            });
        }
        match &self.moderation.outlet {
            None => {
                return Err(ConfigError::Invalid {
                    field: "moderation.outlet",
                    reason: format!("not set (set it in the config file or {})", ENV_OUTLET),
                })
            }
            Some(ChatRef::Username(name)) if !name.starts_with('@') => {
                return Err(ConfigError::Invalid {
                    field: "moderation.outlet",
                    reason: format!("'{}' is neither a chat id nor an @username", name),
                })
            }
            Some(_) => {}
        }
        if self.ingress.mode == IngressMode::Webhook && self.ingress.public_url.is_none() {
            return Err(ConfigError::Invalid {
                field: "ingress.public_url",
                reason: "required in webhook mode".to_string(),
            });
        }
        if self.delivery.publish_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "delivery.publish_attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        self.retry_policy()?;
        self.ingress_settings()?;
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy {
            max_attempts: self.delivery.publish_attempts,
            base_delay: parse_duration("delivery.retry_delay", &self.delivery.retry_delay)?,
        })
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        let outlet = self
            .moderation
            .outlet
            .clone()
            .ok_or_else(|| ConfigError::Invalid {
                field: "moderation.outlet",
                reason: "not set".to_string(),
            })?;

        Ok(PipelineSettings {
            moderators: Moderators::new(self.moderation.moderators.iter().copied().map(UserId)),
            outlet,
            publish_retry: self.retry_policy()?,
        })
    }

    pub fn ingress_settings(&self) -> Result<IngressSettings, ConfigError> {
        let listen: SocketAddr =
            self.ingress
                .listen
                .parse()
                .map_err(|source| ConfigError::Address {
                    value: self.ingress.listen.clone(),
                    source,
                })?;

        Ok(IngressSettings {
            mode: self.ingress.mode,
            listen,
            public_url: self.ingress.public_url.clone(),
            secret: self.ingress.secret.clone(),
            poll_timeout: parse_duration("ingress.poll_timeout", &self.ingress.poll_timeout)?,
            poll_retry: RetryPolicy {
                max_attempts: u32::MAX,
                base_delay: parse_duration("delivery.retry_delay", &self.delivery.retry_delay)?,
            },
            shutdown_grace: parse_duration("ingress.shutdown_grace", &self.ingress.shutdown_grace)?,
        })
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(store_path: &Path) -> String {
        format!(
            r#"# Curator Bot Configuration
#
# The bot token, moderator ids and outlet may also be given through the
# CURATOR_BOT_TOKEN, CURATOR_MODERATORS and CURATOR_OUTLET environment
# variables, which take precedence over this file.

[telegram]
# Token issued by @BotFather
bot_token = ""

# Bot API base URL (change only when running a local Bot API server)
api_url = "{api_url}"

[moderation]
# Telegram user ids of the moderators, e.g. [12345678, 98765432]
moderators = []

# Channel approved proposals are published to: numeric id or "@channel"
# The bot must be an administrator there.
# outlet = -1001234567890

[store]
# Path to the proposals database
path = "{store_path}"

[ingress]
# "polling" (getUpdates) or "webhook"
mode = "polling"

# Long-poll timeout
poll_timeout = "{poll_timeout}"

# Time updates still being handled get to finish after Ctrl-C
shutdown_grace = "{shutdown_grace}"

# Webhook settings (webhook mode only)
# listen = "{listen}"
# public_url = "https://bot.example.org"
# secret = "change-me"

[delivery]
# Attempts at publishing an approved proposal to the outlet
publish_attempts = {publish_attempts}

# Delay before the first retry, doubled per attempt
retry_delay = "{retry_delay}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/curator/curator.log"
"#,
            api_url = DEFAULT_API_URL,
            store_path = store_path.display(),
            poll_timeout = DEFAULT_POLL_TIMEOUT,
            shutdown_grace = DEFAULT_SHUTDOWN_GRACE,
            listen = DEFAULT_LISTEN,
            publish_attempts = DEFAULT_PUBLISH_ATTEMPTS,
            retry_delay = DEFAULT_RETRY_DELAY,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path, store_path: &Path) -> Result<(), ConfigError> {
        write_file(config_path, &Self::generate_default_toml(store_path))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("curator")
}

/// Get the default config file path: `<data_dir>/curator/config.toml`
pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Get the default store path: `<data_dir>/curator/proposals.db`
pub fn default_store_path() -> PathBuf {
    data_dir().join("proposals.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn valid_config() -> CuratorConfig {
        let mut config = CuratorConfig::default();
        config.telegram.bot_token = "123:abc".to_string();
        config.moderation.moderators = vec![11, 22];
        config.moderation.outlet = Some(ChatRef::Id(-1001));
        config
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CuratorConfig::default();

        assert_eq!(config.telegram.api_url, DEFAULT_API_URL);
        assert_eq!(config.ingress.mode, IngressMode::Polling);
        assert_eq!(config.delivery.publish_attempts, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.store.path.ends_with("curator/proposals.db"));
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[telegram]
bot_token = "123:abc"

[moderation]
moderators = [11, 22]
outlet = -1001
"#,
        )
        .unwrap();

        let loaded = CuratorConfig::load(&config_path).unwrap();
        assert_eq!(loaded.telegram.bot_token, "123:abc");
        assert_eq!(loaded.moderation.moderators, vec![11, 22]);
        assert_eq!(loaded.moderation.outlet, Some(ChatRef::Id(-1001)));
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let store_path = temp_dir.path().join("proposals.db");

        CuratorConfig::create_default(&config_path, &store_path).unwrap();
        assert!(config_path.exists());

        let config = CuratorConfig::load(&config_path).unwrap();
        assert_eq!(config.store.path, store_path);
        assert!(config.telegram.bot_token.is_empty());
        assert!(config.moderation.outlet.is_none());

        // A fresh default file is loadable but not runnable.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_minimal_config_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[telegram]
bot_token = "123:abc"

[moderation]
moderators = [5]
outlet = "@my_channel"
"#,
        )
        .unwrap();

        let config = CuratorConfig::load(&config_path).unwrap();
        assert_eq!(
            config.moderation.outlet,
            Some(ChatRef::Username("@my_channel".to_string()))
        );
        assert_eq!(config.ingress.poll_timeout, "30s");
        assert_eq!(config.delivery.retry_delay, "1s");
        config.validate().unwrap();
    }

    #[test]
    fn test_load_reports_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[moderation]\nmoderators = \"nope\"\n").unwrap();

        let err = CuratorConfig::load(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CuratorConfig::load(Path::new("/nonexistent/curator.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = valid_config();
        config
            .apply_overrides(env(&[
                (ENV_BOT_TOKEN, " 999:zzz "),
                (ENV_MODERATORS, "1, 2,3,"),
                (ENV_OUTLET, "@news"),
            ]))
            .unwrap();

        assert_eq!(config.telegram.bot_token, "999:zzz");
        assert_eq!(config.moderation.moderators, vec![1, 2, 3]);
        assert_eq!(
            config.moderation.outlet,
            Some(ChatRef::Username("@news".to_string()))
        );
    }

    #[test]
    fn test_env_outlet_numeric() {
        let mut config = CuratorConfig::default();
        config
            .apply_overrides(env(&[(ENV_OUTLET, "-1005")]))
            .unwrap();
        assert_eq!(config.moderation.outlet, Some(ChatRef::Id(-1005)));
    }

    #[test]
    fn test_env_bad_moderator_list() {
        let mut config = CuratorConfig::default();
        let err = config
            .apply_overrides(env(&[(ENV_MODERATORS, "1,two")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "moderators", .. }));
    }

    #[test]
    fn test_no_overrides_leaves_file_values() {
        let mut config = valid_config();
        config.apply_overrides(env(&[])).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.moderation.moderators, vec![11, 22]);
    }

    #[test]
    fn test_validate_requires_token_moderators_and_outlet() {
        let mut config = valid_config();
        config.telegram.bot_token = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.moderation.moderators.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.moderation.outlet = None;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.moderation.outlet = Some(ChatRef::Username("news".to_string()));
        assert!(config.validate().is_err());

        valid_config().validate().unwrap();
    }

    #[test]
    fn test_validate_webhook_needs_public_url() {
        let mut config = valid_config();
        config.ingress.mode = IngressMode::Webhook;
        assert!(config.validate().is_err());

        config.ingress.public_url = Some("https://bot.example.org".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_durations_and_address() {
        let mut config = valid_config();
        config.delivery.retry_delay = "soon".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Duration { .. })
        ));

        let mut config = valid_config();
        config.ingress.listen = "localhost".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Address { .. })));

        let mut config = valid_config();
        config.delivery.publish_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_settings() {
        let mut config = valid_config();
        config.moderation.moderators = vec![11, 22, 11];
        config.delivery.retry_delay = "250ms".to_string();

        let settings = config.pipeline_settings().unwrap();
        assert_eq!(settings.moderators.len(), 2);
        assert!(settings.moderators.contains(UserId(22)));
        assert_eq!(settings.outlet, ChatRef::Id(-1001));
        assert_eq!(settings.publish_retry.max_attempts, 3);
        assert_eq!(settings.publish_retry.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_ingress_settings() {
        let mut config = valid_config();
        config.ingress.poll_timeout = "45s".to_string();

        let settings = config.ingress_settings().unwrap();
        assert_eq!(settings.mode, IngressMode::Polling);
        assert_eq!(settings.listen, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.poll_timeout, Duration::from_secs(45));
        assert_eq!(settings.shutdown_grace, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_shutdown_grace() {
        let mut config = valid_config();
        config.ingress.shutdown_grace = "soon".to_string();

        let err = config.ingress_settings().unwrap_err();
        assert!(err.to_string().contains("ingress.shutdown_grace"));
    }

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("curator/config.toml"));
        assert!(default_store_path().ends_with("curator/proposals.db"));
    }

    #[test]
    fn test_generate_default_toml() {
        let store_path = PathBuf::from("/data/curator/proposals.db");
        let toml = CuratorConfig::generate_default_toml(&store_path);

        assert!(toml.contains("path = \"/data/curator/proposals.db\""));
        assert!(toml.contains("mode = \"polling\""));
        assert!(toml.contains(ENV_BOT_TOKEN));

        let parsed: CuratorConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.delivery.publish_attempts, 3);
        assert_eq!(parsed.ingress.listen, DEFAULT_LISTEN);
    }
}
