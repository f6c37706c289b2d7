use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use mongodb::bson::oid::ObjectId;
use tracing::info;

use crate::error::NotifyError;
use crate::models::NotificationSettings;
use crate::services::schedule::ScheduleKind;
use crate::services::valuation::{self, PortfolioSummary};
use crate::AppState;

/// Loads holdings and goals for `user_id`, quotes every distinct symbol once,
/// and values the portfolio.
pub async fn valuate_user(state: &AppState, user_id: ObjectId) -> Result<PortfolioSummary, NotifyError> {
    let holdings = state.repo.list_holdings(user_id).await?;
    let goals = state.repo.get_trading_goals(user_id).await?;

    let symbols: Vec<String> = holdings
        .iter()
        .map(|h| h.normalized_symbol())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let prices = state.quotes.last_prices(&symbols).await;

    Ok(valuation::summarize(&holdings, &prices, goals.as_ref()))
}

pub fn local_now(state: &AppState, now: DateTime<Utc>) -> DateTime<Tz> {
    now.with_timezone(&state.settings.notify_timezone)
}

/// Values, renders and sends one scheduled summary.
pub async fn send_summary(
    state: &AppState,
    settings: &NotificationSettings,
    kind: ScheduleKind,
    summary: &PortfolioSummary,
    now: DateTime<Utc>,
) -> Result<(), NotifyError> {
    let html = state.messages.summary(kind, summary, &local_now(state, now))?;
    state
        .transport
        .send(&settings.chat_id, &html, settings.bot_credential())
        .await?;
    Ok(())
}

/// Manual "send test message" entry point: one valuation + render + send cycle.
pub async fn send_test_message(state: &AppState, user_id: ObjectId) -> Result<(), NotifyError> {
    let Some(settings) = state.repo.get_settings(user_id).await? else {
        return Err(NotifyError::NotConfigured("chat id is not configured"));
    };
    if !settings.has_chat() {
        return Err(NotifyError::NotConfigured("chat id is not configured"));
    }

    let summary = valuate_user(state, user_id).await?;
    let html = state.messages.test_message(&summary, &local_now(state, Utc::now()))?;

    state
        .transport
        .send(&settings.chat_id, &html, settings.bot_credential())
        .await?;

    info!(user_id = %user_id, "test message sent");
    Ok(())
}
