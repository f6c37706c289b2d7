use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SUMMARY_TIME: &str = "20:00";
pub const DEFAULT_ENTRY_CHANGE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_ENTRY_VOLUME_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_PRICE_THRESHOLD: f64 = 5.0;

fn default_true() -> bool {
    true
}

fn default_time() -> String {
    DEFAULT_SUMMARY_TIME.to_string()
}

fn default_entry_change_threshold() -> f64 {
    DEFAULT_ENTRY_CHANGE_THRESHOLD
}

fn default_entry_volume_multiplier() -> f64 {
    DEFAULT_ENTRY_VOLUME_MULTIPLIER
}

fn default_price_threshold() -> f64 {
    DEFAULT_PRICE_THRESHOLD
}

fn default_day_of_month() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySchedule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub last_sent_at: Option<i64>,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            time: default_time(),
            last_sent_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub enabled: bool,
    // 0 = Sunday .. 6 = Saturday
    #[serde(default)]
    pub day_of_week: u32,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub last_sent_at: Option<i64>,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            enabled: false,
            day_of_week: 0,
            time: default_time(),
            last_sent_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlySchedule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_day_of_month")]
    pub day_of_month: u32,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub last_sent_at: Option<i64>,
}

impl Default for MonthlySchedule {
    fn default() -> Self {
        Self {
            enabled: false,
            day_of_month: default_day_of_month(),
            time: default_time(),
            last_sent_at: None,
        }
    }
}

/// Per-user Telegram notification settings (at most one document per user).
///
/// The engine only reads these, except for the `last_sent_at` checkpoint of
/// each schedule block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub chat_id: String,

    // empty => shared default bot
    #[serde(default)]
    pub bot_token: String,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default = "default_true")]
    pub notify_price_change: bool,
    #[serde(default = "default_price_threshold")]
    pub price_threshold: f64,

    #[serde(default = "default_true")]
    pub notify_entry_alerts: bool,
    #[serde(default = "default_entry_change_threshold")]
    pub entry_change_threshold: f64,
    #[serde(default = "default_entry_volume_multiplier")]
    pub entry_volume_multiplier: f64,

    #[serde(default)]
    pub daily_summary: DailySchedule,
    #[serde(default)]
    pub weekly_summary: WeeklySchedule,
    #[serde(default)]
    pub monthly_summary: MonthlySchedule,

    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl NotificationSettings {
    pub fn new(user_id: ObjectId, chat_id: impl Into<String>, now: i64) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            chat_id: chat_id.into(),
            bot_token: String::new(),
            is_active: false,
            notify_price_change: true,
            price_threshold: DEFAULT_PRICE_THRESHOLD,
            notify_entry_alerts: true,
            entry_change_threshold: DEFAULT_ENTRY_CHANGE_THRESHOLD,
            entry_volume_multiplier: DEFAULT_ENTRY_VOLUME_MULTIPLIER,
            daily_summary: DailySchedule::default(),
            weekly_summary: WeeklySchedule::default(),
            monthly_summary: MonthlySchedule::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The per-user bot override, if one is set.
    pub fn bot_credential(&self) -> Option<&str> {
        let token = self.bot_token.trim();
        if token.is_empty() { None } else { Some(token) }
    }

    pub fn has_chat(&self) -> bool {
        !self.chat_id.trim().is_empty()
    }

    pub fn wants_market_alerts(&self) -> bool {
        self.notify_entry_alerts || self.notify_price_change
    }

    pub fn wants_any_summary(&self) -> bool {
        self.daily_summary.enabled || self.weekly_summary.enabled || self.monthly_summary.enabled
    }
}
