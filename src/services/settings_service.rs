use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use tracing::info;

use crate::error::SettingsError;
use crate::models::notification_settings::{
    DEFAULT_ENTRY_CHANGE_THRESHOLD, DEFAULT_ENTRY_VOLUME_MULTIPLIER, DEFAULT_PRICE_THRESHOLD, DEFAULT_SUMMARY_TIME,
};
use crate::models::NotificationSettings;
use crate::services::schedule::TimeOfDay;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub enabled: Option<bool>,
    pub time: Option<String>,
    pub day_of_week: Option<u32>,
    pub day_of_month: Option<u32>,
}

/// Body of the save-settings request. Omitted fields fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    pub chat_id: Option<String>,
    pub bot_token: Option<String>,
    pub is_active: Option<bool>,
    pub notify_price_change: Option<bool>,
    pub price_threshold: Option<f64>,
    pub notify_entry_alerts: Option<bool>,
    pub entry_change_threshold: Option<f64>,
    pub entry_volume_multiplier: Option<f64>,
    // shorthand for dailySummary.enabled
    pub notify_daily_summary: Option<bool>,
    pub daily_summary: Option<ScheduleInput>,
    pub weekly_summary: Option<ScheduleInput>,
    pub monthly_summary: Option<ScheduleInput>,
}

fn in_range(field: &'static str, value: Option<f64>, default: f64, min: f64, max: f64) -> Result<f64, SettingsError> {
    let v = value.unwrap_or(default);
    if !v.is_finite() || v < min || v > max {
        return Err(SettingsError::OutOfRange { field, min, max });
    }
    Ok(v)
}

fn time_of_day(field: &'static str, value: Option<&str>) -> Result<String, SettingsError> {
    let raw = value.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SUMMARY_TIME);
    let t: TimeOfDay = raw.parse().map_err(|_| SettingsError::InvalidTime {
        field,
        value: raw.to_string(),
    })?;
    Ok(t.to_string())
}

fn day(field: &'static str, value: Option<u32>, default: u32, min: u32, max: u32) -> Result<u32, SettingsError> {
    let v = value.unwrap_or(default);
    if v < min || v > max {
        return Err(SettingsError::OutOfRange {
            field,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(v)
}

/// Validates `input` and merges it over any stored settings.
///
/// Schedule checkpoints of an existing document are preserved.
pub fn apply_input(
    existing: Option<NotificationSettings>,
    user_id: ObjectId,
    input: &SettingsInput,
    now: i64,
) -> Result<NotificationSettings, SettingsError> {
    let chat_id = input
        .chat_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SettingsError::MissingChatId)?;

    let mut s = existing.unwrap_or_else(|| NotificationSettings::new(user_id, chat_id, now));

    s.chat_id = chat_id.to_string();
    s.bot_token = input.bot_token.as_deref().map(str::trim).unwrap_or_default().to_string();
    s.is_active = input.is_active.unwrap_or(false);

    s.notify_price_change = input.notify_price_change.unwrap_or(true);
    s.price_threshold = in_range("priceThreshold", input.price_threshold, DEFAULT_PRICE_THRESHOLD, 1.0, 50.0)?;

    s.notify_entry_alerts = input.notify_entry_alerts.unwrap_or(true);
    s.entry_change_threshold = in_range(
        "entryChangeThreshold",
        input.entry_change_threshold,
        DEFAULT_ENTRY_CHANGE_THRESHOLD,
        0.5,
        50.0,
    )?;
    s.entry_volume_multiplier = in_range(
        "entryVolumeMultiplier",
        input.entry_volume_multiplier,
        DEFAULT_ENTRY_VOLUME_MULTIPLIER,
        1.0,
        10.0,
    )?;

    let daily = input.daily_summary.clone().unwrap_or_default();
    s.daily_summary.enabled = daily.enabled.or(input.notify_daily_summary).unwrap_or(true);
    s.daily_summary.time = time_of_day("dailySummary.time", daily.time.as_deref())?;

    let weekly = input.weekly_summary.clone().unwrap_or_default();
    s.weekly_summary.enabled = weekly.enabled.unwrap_or(false);
    s.weekly_summary.day_of_week = day("weeklySummary.dayOfWeek", weekly.day_of_week, 0, 0, 6)?;
    s.weekly_summary.time = time_of_day("weeklySummary.time", weekly.time.as_deref())?;

    let monthly = input.monthly_summary.clone().unwrap_or_default();
    s.monthly_summary.enabled = monthly.enabled.unwrap_or(false);
    s.monthly_summary.day_of_month = day("monthlySummary.dayOfMonth", monthly.day_of_month, 1, 1, 31)?;
    s.monthly_summary.time = time_of_day("monthlySummary.time", monthly.time.as_deref())?;

    s.user_id = user_id;
    s.updated_at = now;

    Ok(s)
}

pub async fn get_settings(state: &AppState, user_id: ObjectId) -> Result<Option<NotificationSettings>, SettingsError> {
    Ok(state.repo.get_settings(user_id).await?)
}

/// Save-settings entry point. A missing chat id is rejected before any read or write.
pub async fn save_settings(
    state: &AppState,
    user_id: ObjectId,
    input: &SettingsInput,
) -> Result<NotificationSettings, SettingsError> {
    let now = Utc::now().timestamp();

    // validate once against defaults so nothing touches storage on bad input
    apply_input(None, user_id, input, now)?;

    let existing = state.repo.get_settings(user_id).await?;
    let settings = apply_input(existing, user_id, input, now)?;

    state.repo.upsert_settings(&settings).await?;

    info!(user_id = %user_id, active = settings.is_active, "telegram settings saved");
    Ok(settings)
}

pub async fn delete_settings(state: &AppState, user_id: ObjectId) -> Result<bool, SettingsError> {
    Ok(state.repo.delete_settings(user_id).await?)
}
