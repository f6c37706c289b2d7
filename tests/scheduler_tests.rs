mod common;

use std::sync::atomic::Ordering;

use chrono::{Duration, NaiveDate};
use mongodb::bson::{doc, oid::ObjectId};

use stockpulse::models::PortfolioType;
use stockpulse::services::scheduler::{run_entry_alert_pass, run_schedule_pass, PassReport};
use stockpulse::services::schedule::ScheduleKind;

use common::{active_settings, harness, harness_with, holding, jerusalem, quote, test_settings, Harness};

fn june_8() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 8).unwrap()
}

/// One user holding AAPL, entry alerts only, default 3% / 2x thresholds.
fn entry_alert_user(h: &Harness) -> ObjectId {
    let user = ObjectId::new();
    let mut s = active_settings(user);
    s.notify_price_change = false;
    s.daily_summary.enabled = false;
    h.repo.put_settings(s);
    h.repo
        .put_holdings(user, vec![holding(user, "AAPL", 10.0, 100.0, PortfolioType::Long)]);
    user
}

#[tokio::test]
async fn entry_alert_fires_once_then_cools_down() {
    let h = harness();
    entry_alert_user(&h);
    h.market.set_quote(quote("AAPL", 105.0, 5.0, 2_500_000.0));
    h.market.set_flat_history("AAPL", june_8(), 20, 1_000_000.0, 2_500_000.0);

    let now = jerusalem(2026, 6, 8, 15, 0);
    let report = run_entry_alert_pass(&h.state, now).await.unwrap();

    assert_eq!(report.sent, 1);
    let msgs = h.chat.messages();
    assert_eq!(msgs[0].0, "424242");
    assert!(msgs[0].1.contains("<b>AAPL</b>"));
    assert!(msgs[0].1.contains("2.5×"));
    assert!(msgs[0].1.contains("2,500,000"));

    let again = run_entry_alert_pass(&h.state, now + Duration::minutes(30)).await.unwrap();
    assert_eq!(again.sent, 0);
    assert_eq!(h.chat.count(), 1);

    let later = run_entry_alert_pass(&h.state, now + Duration::hours(6)).await.unwrap();
    assert_eq!(later.sent, 1);
}

#[tokio::test]
async fn entry_alert_quiet_below_volume_threshold() {
    let h = harness();
    entry_alert_user(&h);
    h.market.set_quote(quote("AAPL", 105.0, 5.0, 1_900_000.0));
    h.market.set_flat_history("AAPL", june_8(), 20, 1_000_000.0, 1_900_000.0);

    let report = run_entry_alert_pass(&h.state, jerusalem(2026, 6, 8, 15, 0)).await.unwrap();

    assert_eq!(report.sent, 0);
    assert_eq!(h.chat.count(), 0);
}

#[tokio::test]
async fn entry_alert_skipped_without_history() {
    let h = harness();
    entry_alert_user(&h);
    h.market.set_quote(quote("AAPL", 105.0, 9.0, 9_000_000.0));

    let report = run_entry_alert_pass(&h.state, jerusalem(2026, 6, 8, 15, 0)).await.unwrap();

    assert_eq!(report, PassReport { users: 1, ..PassReport::default() });
    assert_eq!(h.chat.count(), 0);
}

#[tokio::test]
async fn price_move_alert_uses_user_threshold() {
    let h = harness();
    let user = ObjectId::new();
    let mut s = active_settings(user);
    s.notify_entry_alerts = false;
    s.price_threshold = 4.0;
    h.repo.put_settings(s);
    h.repo
        .put_holdings(user, vec![holding(user, "TSLA", 1.0, 200.0, PortfolioType::Trade)]);
    h.market.set_quote(quote("TSLA", 180.0, -4.5, 100.0));

    let report = run_entry_alert_pass(&h.state, jerusalem(2026, 6, 8, 15, 0)).await.unwrap();

    assert_eq!(report.sent, 1);
    let (_, html) = &h.chat.messages()[0];
    assert!(html.contains("Price alert"));
    assert!(html.contains("-4.50%"));
}

#[tokio::test]
async fn quotes_fetched_once_per_pass_across_users() {
    let h = harness();
    entry_alert_user(&h);
    entry_alert_user(&h);
    h.market.set_quote(quote("AAPL", 105.0, 5.0, 2_500_000.0));
    h.market.set_flat_history("AAPL", june_8(), 20, 1_000_000.0, 2_500_000.0);

    let report = run_entry_alert_pass(&h.state, jerusalem(2026, 6, 8, 15, 0)).await.unwrap();

    assert_eq!(report.users, 2);
    assert_eq!(report.sent, 2);
    assert_eq!(h.market.quote_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn daily_summary_fires_at_configured_minute_only() {
    let h = harness();
    let user = ObjectId::new();
    h.repo.put_settings(active_settings(user));
    h.repo
        .put_holdings(user, vec![holding(user, "AAPL", 10.0, 100.0, PortfolioType::Long)]);
    h.market.set_quote(quote("AAPL", 110.0, 1.0, 1.0));

    let early = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 19, 59)).await.unwrap();
    assert_eq!(early.sent, 0);

    let on_time = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();
    assert_eq!(on_time.sent, 1);
    let (_, html) = &h.chat.messages()[0];
    assert!(html.contains("Daily summary"));
    assert!(html.contains("$1,100.00"));
    assert!(html.contains("+$100.00"));

    let stored = h.repo.settings_of(user).unwrap();
    assert_eq!(stored.daily_summary.last_sent_at, Some(jerusalem(2026, 6, 8, 20, 0).timestamp()));

    let late = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 1)).await.unwrap();
    assert_eq!(late.sent, 0);

    let next_day = run_schedule_pass(&h.state, jerusalem(2026, 6, 9, 20, 0)).await.unwrap();
    assert_eq!(next_day.sent, 1);
    assert_eq!(h.chat.count(), 2);
}

#[tokio::test]
async fn weekly_and_monthly_summaries_share_one_valuation() {
    let h = harness();
    let user = ObjectId::new();
    let mut s = active_settings(user);
    s.weekly_summary.enabled = true;
    s.weekly_summary.day_of_week = 1;
    s.monthly_summary.enabled = true;
    s.monthly_summary.day_of_month = 1;
    h.repo.put_settings(s);
    h.repo
        .put_holdings(user, vec![holding(user, "AAPL", 1.0, 100.0, PortfolioType::Long)]);
    h.market.set_quote(quote("AAPL", 100.0, 0.0, 1.0));

    // Monday 1 June 2026
    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 1, 20, 0)).await.unwrap();

    assert_eq!(report.sent, 3);
    assert_eq!(h.market.quote_calls.load(Ordering::SeqCst), 1);
    let kinds: Vec<ScheduleKind> = h.repo.checkpoints.lock().iter().map(|(_, k, _)| *k).collect();
    assert_eq!(kinds, ScheduleKind::ALL.to_vec());
}

#[tokio::test]
async fn one_failing_user_does_not_stop_the_pass() {
    let h = harness();
    let broken = ObjectId::new();
    let healthy = ObjectId::new();
    h.repo.put_settings(active_settings(broken));
    h.repo.put_settings(active_settings(healthy));
    *h.repo.fail_holdings_for.lock() = Some(broken);

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();

    assert_eq!(report.users, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert!(h.repo.settings_of(healthy).unwrap().daily_summary.last_sent_at.is_some());
    assert!(h.repo.settings_of(broken).unwrap().daily_summary.last_sent_at.is_none());
}

#[tokio::test]
async fn failed_send_checkpoints_by_default() {
    let h = harness();
    let user = ObjectId::new();
    h.repo.put_settings(active_settings(user));
    h.chat.fail("Bad Request: chat not found");

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(h.repo.checkpoints.lock().len(), 1);
}

#[tokio::test]
async fn failed_send_leaves_checkpoint_when_disabled() {
    let mut settings = test_settings();
    settings.checkpoint_on_failure = false;
    let h = harness_with(settings, common::DEFAULT_TOKEN);
    let user = ObjectId::new();
    h.repo.put_settings(active_settings(user));
    h.chat.fail("Bad Request: chat not found");

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(h.repo.checkpoints.lock().is_empty());
}

#[tokio::test]
async fn users_without_any_bot_are_skipped() {
    let h = harness_with(test_settings(), "");
    let plain = ObjectId::new();
    let own_bot = ObjectId::new();
    h.repo.put_settings(active_settings(plain));
    let mut s = active_settings(own_bot);
    s.bot_token = "999:own-bot".to_string();
    h.repo.put_settings(s);

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(h.state.transport.registry().cached_clients(), 1);
}

#[tokio::test]
async fn inactive_users_are_ignored() {
    let h = harness();
    let user = ObjectId::new();
    let mut s = active_settings(user);
    s.is_active = false;
    h.repo.put_settings(s);

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();

    assert_eq!(report, PassReport::default());
    assert_eq!(h.chat.count(), 0);
}

#[tokio::test]
async fn malformed_settings_document_does_not_stop_other_users() {
    let h = harness();
    let user = ObjectId::new();
    h.repo.put_settings(active_settings(user));
    // active but without a chat id
    h.repo.put_raw_settings(doc! {
        "_id": ObjectId::new(),
        "user_id": ObjectId::new(),
        "is_active": true,
    });

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();
    assert_eq!(report.users, 1);
    assert_eq!(report.sent, 1);

    let entries = run_entry_alert_pass(&h.state, jerusalem(2026, 6, 8, 15, 0)).await;
    assert!(entries.is_ok());
}

#[tokio::test]
async fn schedule_pass_runs_while_entry_pass_is_stalled() {
    let h = harness();
    let alert_user = entry_alert_user(&h);
    let summary_user = ObjectId::new();
    h.repo.put_settings(active_settings(summary_user));
    h.market.hang.store(true, Ordering::SeqCst);

    let state = h.state.clone();
    let entry = tokio::spawn(async move { run_entry_alert_pass(&state, jerusalem(2026, 6, 8, 19, 59)).await });
    tokio::task::yield_now().await;

    let report = run_schedule_pass(&h.state, jerusalem(2026, 6, 8, 20, 0)).await.unwrap();

    assert_eq!(report.sent, 1);
    assert!(h.repo.settings_of(summary_user).unwrap().daily_summary.last_sent_at.is_some());
    assert!(h.repo.settings_of(alert_user).unwrap().daily_summary.last_sent_at.is_none());
    assert!(!entry.is_finished());
    entry.abort();
}
