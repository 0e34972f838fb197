//! Runtime configuration for the watcher.
//!
//! Every endpoint, credential and timing constant lives here with a default
//! matching the public Minecraft services. [`WatchConfig::from_env`] applies
//! overrides from the process environment; the CLI loads a `.env` file before
//! calling it.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default version manifest published by the launcher.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Default prefix of changelog article URLs.
pub const DEFAULT_CHANGELOG_BASE: &str = "https://www.minecraft.net/en-us/article/minecraft";

/// Default Telegram Bot API host.
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Default location of the last-seen version record.
pub const DEFAULT_VERSION_FILE: &str = "version.json";

/// Telegram rejects messages longer than this many characters.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// Smallest accepted message cap; leaves room for the changelog link header
/// plus a few lines of body.
pub const MIN_MESSAGE_LEN: usize = 256;

/// Steady-state wait between polls.
pub const HOUR: Duration = Duration::from_secs(60 * 60);

/// Wait between polls while a changelog is not published yet.
pub const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);

/// Backoff between failed fetch attempts.
pub const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

/// Credentials and destination for the Telegram notifier.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token (`TOKEN`).
    pub token: String,
    /// Destination chat (`CHAT_ID`).
    pub chat_id: String,
    /// API host, overridable for tests.
    pub api_base: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Complete watcher configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Where to fetch the version manifest from.
    pub manifest_url: String,
    /// Prefix used to derive changelog article URLs.
    pub changelog_base: String,
    /// Path of the persisted last-seen version.
    pub version_file: PathBuf,
    /// Wait after an unchanged poll or a delivered notification.
    pub poll_interval: Duration,
    /// Wait while a new version's changelog is missing.
    pub retry_interval: Duration,
    /// How many short waits to spend on a missing changelog.
    pub changelog_retries: u32,
    /// Attempts per HTTP fetch.
    pub fetch_tries: u32,
    /// Wait between failed fetch attempts.
    pub fetch_backoff: Duration,
    /// Hard cap on the delivered message length, in characters.
    pub max_message_len: usize,
    /// Notifier settings; `None` until credentials are supplied.
    pub telegram: Option<TelegramConfig>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            changelog_base: DEFAULT_CHANGELOG_BASE.to_string(),
            version_file: PathBuf::from(DEFAULT_VERSION_FILE),
            poll_interval: HOUR,
            retry_interval: TEN_MINUTES,
            changelog_retries: 3,
            fetch_tries: 3,
            fetch_backoff: FIVE_MINUTES,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            telegram: None,
        }
    }
}

impl WatchConfig {
    /// Builds a configuration from the process environment on top of the
    /// defaults.
    ///
    /// Telegram credentials are optional here; use
    /// [`require_telegram`](Self::require_telegram) before delivering.
    ///
    /// ## Errors
    ///
    /// Returns `ConfigError::Invalid` when a variable is set but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// This is what [`from_env`](Self::from_env) uses; tests pass a map
    /// instead of touching the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("MCNOTIFY_MANIFEST_URL") {
            config.manifest_url = url;
        }
        if let Some(base) = get("MCNOTIFY_CHANGELOG_BASE") {
            config.changelog_base = base.trim_end_matches('/').to_string();
        }
        if let Some(path) = get("MCNOTIFY_VERSION_FILE") {
            config.version_file = PathBuf::from(path);
        }
        if let Some(value) = get("MCNOTIFY_POLL_INTERVAL") {
            config.poll_interval = parse_interval(&value).map_err(|reason| ConfigError::Invalid {
                key: "MCNOTIFY_POLL_INTERVAL",
                reason,
            })?;
        }
        if let Some(value) = get("MCNOTIFY_RETRY_INTERVAL") {
            config.retry_interval =
                parse_interval(&value).map_err(|reason| ConfigError::Invalid {
                    key: "MCNOTIFY_RETRY_INTERVAL",
                    reason,
                })?;
        }
        if let Some(value) = get("MCNOTIFY_FETCH_BACKOFF") {
            config.fetch_backoff = parse_interval(&value).map_err(|reason| ConfigError::Invalid {
                key: "MCNOTIFY_FETCH_BACKOFF",
                reason,
            })?;
        }
        if let Some(value) = get("MCNOTIFY_CHANGELOG_RETRIES") {
            config.changelog_retries = parse_number("MCNOTIFY_CHANGELOG_RETRIES", &value)?;
        }
        if let Some(value) = get("MCNOTIFY_FETCH_TRIES") {
            config.fetch_tries = parse_number("MCNOTIFY_FETCH_TRIES", &value)?;
            if config.fetch_tries == 0 {
                return Err(ConfigError::Invalid {
                    key: "MCNOTIFY_FETCH_TRIES",
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if let Some(value) = get("MCNOTIFY_MAX_MESSAGE_LEN") {
            config.max_message_len = parse_number("MCNOTIFY_MAX_MESSAGE_LEN", &value)?;
            if config.max_message_len < MIN_MESSAGE_LEN {
                return Err(ConfigError::Invalid {
                    key: "MCNOTIFY_MAX_MESSAGE_LEN",
                    reason: format!("must be at least {MIN_MESSAGE_LEN}"),
                });
            }
        }

        let api_base = get("MCNOTIFY_TELEGRAM_API")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string());
        if let (Some(token), Some(chat_id)) = (get("TOKEN"), get("CHAT_ID")) {
            config.telegram = Some(TelegramConfig {
                token,
                chat_id,
                api_base,
            });
        }

        Ok(config)
    }

    /// Returns the Telegram settings or the name of the first missing one.
    ///
    /// ## Errors
    ///
    /// Returns `ConfigError::Missing` when `TOKEN` or `CHAT_ID` was not set.
    pub fn require_telegram(&self) -> Result<&TelegramConfig, ConfigError> {
        self.telegram
            .as_ref()
            .ok_or(ConfigError::Missing("TOKEN and CHAT_ID"))
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}

/// Parses an interval string into a `Duration`.
///
/// ## Supported Units
///
/// - `s` - seconds
/// - `m` - minutes (default if no unit specified)
/// - `h` - hours
/// - `d` - days
///
/// ## Errors
///
/// Returns an error string if the interval cannot be parsed.
///
/// ## Examples
///
/// ```
/// use mcnotify_lib::parse_interval;
/// use std::time::Duration;
///
/// assert_eq!(parse_interval("10").unwrap(), Duration::from_secs(600));
/// assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
/// ```
pub fn parse_interval(value: &str) -> Result<Duration, String> {
    let normalized = value.trim().to_lowercase().replace(' ', "");

    if normalized.is_empty() {
        return Err("interval cannot be empty".to_string());
    }

    let split_index = normalized
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (amount, unit) = normalized.split_at(split_index);

    if amount.is_empty() {
        return Err("interval must start with a number".to_string());
    }

    let amount: u64 = amount
        .parse()
        .map_err(|_| "interval must be a number".to_string())?;

    let seconds = match unit {
        "" | "m" => amount.checked_mul(60),
        "s" => Some(amount),
        "h" => amount.checked_mul(60 * 60),
        "d" => amount.checked_mul(24 * 60 * 60),
        _ => {
            return Err("interval units must be s, m, h, or d".to_string());
        }
    };

    seconds
        .map(Duration::from_secs)
        .ok_or_else(|| "interval is too large".to_string())
}
