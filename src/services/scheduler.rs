//! Notification Orchestrator.
//!
//! Two background tasks drive the periodic passes: entry alerts (every
//! `ENTRY_ALERT_INTERVAL_SECS`) and scheduled summaries (every
//! `SCHEDULE_INTERVAL_SECS`). Each task finishes a pass, including every
//! await, before starting its next one, and a slow entry pass never delays
//! the minute-exact schedule pass. Failures for one user or symbol are logged
//! and never stop the rest of the pass.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::NotificationSettings;
use crate::services::cooldown::{entry_alert_key, price_alert_key};
use crate::services::entry_alert::{self, EntryDecision, EntryThresholds};
use crate::services::notification_service::{self, local_now};
use crate::services::quote_source::Quote;
use crate::services::schedule::{self, ScheduleKind};
use crate::services::valuation::PortfolioSummary;
use crate::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub users: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub fn spawn_notification_scheduler(state: AppState) {
    info!(
        zone = %state.settings.notify_timezone,
        schedule_secs = state.settings.schedule_interval_secs,
        entry_secs = state.settings.entry_alert_interval_secs,
        "notification scheduler started"
    );

    let schedule_state = state.clone();
    tokio::spawn(async move {
        let mut ticks = time::interval(schedule_state.settings.schedule_interval());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            match run_schedule_pass(&schedule_state, Utc::now()).await {
                Ok(r) if r.sent + r.failed > 0 => info!(?r, "schedule pass"),
                Ok(r) => debug!(?r, "schedule pass"),
                Err(e) => warn!(error = %e, "schedule pass aborted"),
            }
        }
    });

    tokio::spawn(async move {
        let mut ticks = time::interval(state.settings.entry_alert_interval());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            match run_entry_alert_pass(&state, Utc::now()).await {
                Ok(r) => info!(?r, "entry alert pass"),
                Err(e) => warn!(error = %e, "entry alert pass aborted"),
            }
        }
    });
}

fn sendable(state: &AppState, s: &NotificationSettings) -> bool {
    if !s.is_active || !s.has_chat() {
        return false;
    }
    if !state.transport.can_send(s.bot_credential()) {
        debug!(user_id = %s.user_id, "no bot resolvable, skipping user");
        return false;
    }
    true
}

// Quotes and trailing averages fetched during one pass, shared across users.
#[derive(Default)]
struct PassCache {
    quotes: HashMap<String, Option<Quote>>,
    averages: HashMap<String, Option<f64>>,
}

impl PassCache {
    async fn quote(&mut self, state: &AppState, symbol: &str) -> Option<Quote> {
        if let Some(q) = self.quotes.get(symbol) {
            return q.clone();
        }
        let q = state.quotes.quote(symbol).await;
        self.quotes.insert(symbol.to_string(), q.clone());
        q
    }

    async fn average(&mut self, state: &AppState, symbol: &str, now: DateTime<Utc>) -> Option<f64> {
        if let Some(a) = self.averages.get(symbol) {
            return *a;
        }
        let today = local_now(state, now).date_naive();
        let a = state.quotes.trailing_average_volume(symbol, today).await;
        self.averages.insert(symbol.to_string(), a);
        a
    }
}

/// Entry-alert pass: per active user, per distinct held symbol.
pub async fn run_entry_alert_pass(state: &AppState, now: DateTime<Utc>) -> Result<PassReport, crate::error::RepoError> {
    let window = state.settings.entry_alert_cooldown();
    let pruned = state.cooldown.prune(window, now);
    if pruned > 0 {
        debug!(pruned, "cooldown entries evicted");
    }

    let users = state.repo.list_active_settings().await?;
    let mut report = PassReport::default();
    let mut cache = PassCache::default();

    for s in users.iter().filter(|s| s.wants_market_alerts()) {
        if !sendable(state, s) {
            report.skipped += 1;
            continue;
        }
        report.users += 1;

        let holdings = match state.repo.list_holdings(s.user_id).await {
            Ok(h) => h,
            Err(e) => {
                warn!(user_id = %s.user_id, error = %e, "failed to load holdings");
                report.failed += 1;
                continue;
            }
        };

        let symbols: BTreeSet<String> = holdings.iter().map(|h| h.normalized_symbol()).collect();
        let local = local_now(state, now);

        for sym in symbols {
            let Some(quote) = cache.quote(state, &sym).await else {
                continue;
            };

            if s.notify_entry_alerts {
                let avg = cache.average(state, &sym, now).await;
                match entry_alert::evaluate(&quote, avg, &EntryThresholds::from_settings(s)) {
                    EntryDecision::Fire { volume_ratio } => {
                        let key = entry_alert_key(&s.user_id, &sym);
                        if state.cooldown.should_send(&key, window, now) {
                            let html = state
                                .messages
                                .entry_alert(&quote, avg.unwrap_or_default(), volume_ratio, &local);
                            tally(&mut report, deliver(state, s, &sym, "entry", html).await);
                        } else {
                            debug!(user_id = %s.user_id, symbol = %sym, "entry alert cooling down");
                        }
                    }
                    EntryDecision::InsufficientData => {
                        debug!(user_id = %s.user_id, symbol = %sym, "insufficient data for entry alert");
                    }
                    EntryDecision::Quiet => {}
                }
            }

            if s.notify_price_change && entry_alert::price_move_exceeds(&quote, s.price_threshold) {
                let key = price_alert_key(&s.user_id, &sym);
                if state.cooldown.should_send(&key, window, now) {
                    let html = state.messages.price_alert(&quote, &local);
                    tally(&mut report, deliver(state, s, &sym, "price", html).await);
                }
            }
        }
    }

    Ok(report)
}

fn tally(report: &mut PassReport, ok: bool) {
    if ok {
        report.sent += 1;
    } else {
        report.failed += 1;
    }
}

async fn deliver(
    state: &AppState,
    s: &NotificationSettings,
    symbol: &str,
    what: &'static str,
    html: Result<String, handlebars::RenderError>,
) -> bool {
    let html = match html {
        Ok(h) => h,
        Err(e) => {
            warn!(user_id = %s.user_id, symbol, alert = what, error = %e, "failed to render alert");
            return false;
        }
    };

    match state.transport.send(&s.chat_id, &html, s.bot_credential()).await {
        Ok(()) => {
            info!(user_id = %s.user_id, symbol, alert = what, "alert sent");
            true
        }
        Err(e) => {
            warn!(user_id = %s.user_id, symbol, alert = what, error = %e, "failed to send alert");
            false
        }
    }
}

/// Schedule pass: evaluates daily, weekly and monthly summaries for every active user.
pub async fn run_schedule_pass(state: &AppState, now: DateTime<Utc>) -> Result<PassReport, crate::error::RepoError> {
    let users = state.repo.list_active_settings().await?;
    let local = local_now(state, now);
    let mut report = PassReport::default();

    for s in users.iter().filter(|s| s.wants_any_summary()) {
        if !sendable(state, s) {
            report.skipped += 1;
            continue;
        }
        report.users += 1;

        // valued lazily, at most once per user per pass
        let mut summary: Option<PortfolioSummary> = None;

        for kind in ScheduleKind::ALL {
            let (trigger, last_sent) = match schedule::configured_trigger(s, kind) {
                None => continue,
                Some(Ok(t)) => t,
                Some(Err(e)) => {
                    warn!(user_id = %s.user_id, schedule = kind.as_str(), error = %e, "invalid schedule");
                    continue;
                }
            };

            let last = schedule::checkpoint_in_zone(last_sent, state.settings.notify_timezone);
            if !schedule::is_due(&trigger, last, local) {
                continue;
            }

            if summary.is_none() {
                match notification_service::valuate_user(state, s.user_id).await {
                    Ok(v) => summary = Some(v),
                    Err(e) => {
                        warn!(user_id = %s.user_id, error = %e, "failed to value portfolio");
                        report.failed += 1;
                        break;
                    }
                }
            }
            let Some(summary) = summary.as_ref() else { break };

            let sent = notification_service::send_summary(state, s, kind, summary, now).await;
            let ok = match &sent {
                Ok(()) => {
                    info!(user_id = %s.user_id, schedule = kind.as_str(), "summary sent");
                    true
                }
                Err(e) => {
                    warn!(user_id = %s.user_id, schedule = kind.as_str(), error = %e, "failed to send summary");
                    false
                }
            };
            tally(&mut report, ok);

            if ok || state.settings.checkpoint_on_failure {
                if let Err(e) = state.repo.record_checkpoint(s.user_id, kind, now.timestamp()).await {
                    warn!(user_id = %s.user_id, schedule = kind.as_str(), error = %e, "failed to record checkpoint");
                }
            }
        }
    }

    Ok(report)
}
