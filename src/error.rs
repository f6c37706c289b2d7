use thiserror::Error;

/// Start-up configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid time zone '{0}'")]
    InvalidTimezone(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failures of the market-data provider.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("ALPHA_VANTAGE_KEY is missing in .env")]
    MissingKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("market data request failed: {status} {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("no data for {0}")]
    NoData(String),

    #[error("invalid {field} in provider payload: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("market data request timed out after {0}s")]
    Timeout(u64),
}

/// Failures while delivering a chat message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Telegram bot not configured")]
    NotConfigured,

    #[error("invalid chat id '{0}'")]
    InvalidChatId(String),

    #[error("{0}")]
    Provider(String),

    #[error("send timed out after {0}s")]
    Timeout(u64),
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("malformed document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),
}

/// Rejections from the save-settings entry point.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("chat id is required")]
    MissingChatId,

    #[error("{field} must be a 24-hour HH:MM time, got '{value}'")]
    InvalidTime { field: &'static str, value: String },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Failures of a single notification cycle (test send or scheduled send).
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}
