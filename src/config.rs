use std::env;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ConfigError;

pub const PLACEHOLDER_BOT_TOKEN: &str = "your-telegram-bot-token";

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,

    pub alpha_vantage_key: String,
    pub market_data_min_interval_ms: u64,

    pub telegram_bot_token: String,
    pub telegram_public_token: String,

    // All schedule evaluation happens in this zone.
    pub notify_timezone: Tz,
    pub schedule_interval_secs: u64,
    pub entry_alert_interval_secs: u64,
    pub entry_alert_cooldown_secs: u64,
    pub external_call_timeout_secs: u64,
    pub checkpoint_on_failure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "stockpulse".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "change-me-dev-secret".to_string(),
            jwt_cookie_name: "auth".to_string(),
            alpha_vantage_key: String::new(),
            market_data_min_interval_ms: 1000,
            telegram_bot_token: String::new(),
            telegram_public_token: String::new(),
            notify_timezone: chrono_tz::Asia::Jerusalem,
            schedule_interval_secs: 60,
            entry_alert_interval_secs: 30 * 60,
            entry_alert_cooldown_secs: 6 * 60 * 60,
            external_call_timeout_secs: 10,
            checkpoint_on_failure: true,
        }
    }
}

impl Settings {
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs.max(1))
    }

    pub fn entry_alert_interval(&self) -> Duration {
        Duration::from_secs(self.entry_alert_interval_secs.max(1))
    }

    pub fn entry_alert_cooldown(&self) -> chrono::Duration {
        let secs = i64::try_from(self.entry_alert_cooldown_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }

    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs.max(1))
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                field: name,
                reason: format!("cannot parse '{raw}'"),
            })
        }
        _ => Ok(default),
    }
}

fn string_var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

pub fn load() -> Result<Settings, ConfigError> {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let defaults = Settings::default();

    let tz_name = string_var("NOTIFY_TIMEZONE", "Asia/Jerusalem");
    let notify_timezone = tz_name
        .trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(tz_name.clone()))?;

    Ok(Settings {
        mongodb_uri: string_var("MONGODB_URI", &defaults.mongodb_uri),
        mongodb_db: string_var("MONGODB_DB", &defaults.mongodb_db),
        host: string_var("HOST", &defaults.host),
        port: parse_var("PORT", defaults.port)?,
        jwt_secret: string_var("JWT_SECRET", &defaults.jwt_secret),
        jwt_cookie_name: string_var("JWT_COOKIE_NAME", &defaults.jwt_cookie_name),
        alpha_vantage_key: string_var("ALPHA_VANTAGE_KEY", ""),
        market_data_min_interval_ms: parse_var(
            "MARKET_DATA_MIN_INTERVAL_MS",
            defaults.market_data_min_interval_ms,
        )?,
        telegram_bot_token: string_var("TELEGRAM_BOT_TOKEN", ""),
        telegram_public_token: string_var("TELEGRAM_PUBLIC_TOKEN", ""),
        notify_timezone,
        schedule_interval_secs: parse_var("SCHEDULE_INTERVAL_SECS", defaults.schedule_interval_secs)?,
        entry_alert_interval_secs: parse_var(
            "ENTRY_ALERT_INTERVAL_SECS",
            defaults.entry_alert_interval_secs,
        )?,
        entry_alert_cooldown_secs: parse_var(
            "ENTRY_ALERT_COOLDOWN_SECS",
            defaults.entry_alert_cooldown_secs,
        )?,
        external_call_timeout_secs: parse_var(
            "EXTERNAL_CALL_TIMEOUT_SECS",
            defaults.external_call_timeout_secs,
        )?,
        checkpoint_on_failure: parse_var("CHECKPOINT_ON_FAILURE", defaults.checkpoint_on_failure)?,
    })
}
