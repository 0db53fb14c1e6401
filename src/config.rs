// src/config.rs
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use governor::Quota;
use reqwest::Url;
use crate::models::server::ServerAddress;

const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{} must be set", key),
            Self::Invalid { key, value } => write!(f, "Invalid value for {}: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Telegram users allowed to run privileged commands. Empty means everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminSet(HashSet<i64>);

impl AdminSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn allows(&self, user_id: i64) -> bool {
        self.0.is_empty() || self.0.contains(&user_id)
    }

    pub fn is_open(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for AdminSet {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut ids = HashSet::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part.parse::<i64>().map_err(|_| part.to_string())?;
            ids.insert(id);
        }
        Ok(Self(ids))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    Polling,
    Webhook,
}

impl FromStr for BotMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "polling" | "poll" => Ok(Self::Polling),
            "webhook" => Ok(Self::Webhook),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerAddress,
    pub admins: AdminSet,

    // Telegram
    pub telegram_token: String,
    pub telegram_api_url: Url,
    pub mode: BotMode,
    pub poll_timeout_secs: u64,

    // Webhook listener
    pub bind_address: String,
    pub port: u16,
    pub webhook_url: Option<Url>,
    pub webhook_secret: Option<String>,
    pub webhook_verify_source: bool,
    pub webhook_trust_forwarded: bool,

    // Server probes
    pub probe_timeout_secs: u64,

    // Per-user command rate limiting
    pub command_period_secs: u64,
    pub command_burst_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = get("TELEGRAM_BOT_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let admins = match get("ADMIN_USERS") {
            Some(raw) => raw.parse::<AdminSet>().map_err(|value| ConfigError::Invalid {
                key: "ADMIN_USERS",
                value,
            })?,
            None => AdminSet::default(),
        };

        let mode = match get("BOT_MODE") {
            Some(raw) => raw.parse::<BotMode>().map_err(|value| ConfigError::Invalid {
                key: "BOT_MODE",
                value,
            })?,
            None => BotMode::Polling,
        };

        Ok(Self {
            server: ServerAddress {
                host: get("MINECRAFT_SERVER_HOST").unwrap_or_else(|| "localhost".to_string()),
                query_port: parse_or(&get, "MINECRAFT_SERVER_PORT", 25565),
                console_port: parse_or(&get, "MINECRAFT_RCON_PORT", 25575),
                console_secret: get("MINECRAFT_RCON_PASSWORD").unwrap_or_default(),
            },
            admins,
            telegram_token,
            telegram_api_url: parse_url(&get, "TELEGRAM_API_URL")?
                .unwrap_or(default_api_url()?),
            mode,
            poll_timeout_secs: parse_or(&get, "POLL_TIMEOUT_SECS", 30),
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8080),
            webhook_url: parse_url(&get, "WEBHOOK_URL")?,
            webhook_secret: get("WEBHOOK_SECRET").filter(|v| !v.is_empty()),
            webhook_verify_source: parse_or(&get, "WEBHOOK_VERIFY_SOURCE", true),
            webhook_trust_forwarded: parse_or(&get, "WEBHOOK_TRUST_FORWARDED", false),
            probe_timeout_secs: parse_or(&get, "PROBE_TIMEOUT_SECS", 5),
            command_period_secs: parse_or(&get, "COMMAND_PERIOD_SECS", 2),
            command_burst_limit: parse_or(&get, "COMMAND_BURST_LIMIT", 5),
        })
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn command_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.command_burst_limit).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(Duration::from_secs(self.command_period_secs.max(1)))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}

fn default_api_url() -> Result<Url, ConfigError> {
    Url::parse(DEFAULT_API_URL).map_err(|_| ConfigError::Invalid {
        key: "TELEGRAM_API_URL",
        value: DEFAULT_API_URL.to_string(),
    })
}

fn parse_url<F>(get: &F, key: &'static str) -> Result<Option<Url>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => Url::parse(raw.trim())
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(None),
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
