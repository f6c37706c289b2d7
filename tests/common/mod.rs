#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mongodb::bson::{self, oid::ObjectId, Document};
use parking_lot::Mutex;

use stockpulse::error::{QuoteError, RepoError, TransportError};
use stockpulse::models::{Holding, NotificationSettings, PortfolioType, TradingGoals, User};
use stockpulse::services::cooldown::InMemoryCooldownLedger;
use stockpulse::services::quote_source::{DailyBar, MarketData, Quote};
use stockpulse::services::repository::{decode_settings, NotificationRepository};
use stockpulse::services::schedule::ScheduleKind;
use stockpulse::services::transport::{BotClientRegistry, ChatClient};
use stockpulse::{config, AppState};

pub const DEFAULT_TOKEN: &str = "123456:default-bot";

// ---------------- Persistence ----------------

#[derive(Default)]
pub struct FakeRepo {
    pub users: Mutex<HashMap<ObjectId, User>>,
    pub settings: Mutex<HashMap<ObjectId, NotificationSettings>>,
    // stored documents that bypass the typed model
    pub raw_settings: Mutex<Vec<Document>>,
    pub holdings: Mutex<HashMap<ObjectId, Vec<Holding>>>,
    pub goals: Mutex<HashMap<ObjectId, TradingGoals>>,
    pub checkpoints: Mutex<Vec<(ObjectId, ScheduleKind, i64)>>,
    pub calls: AtomicUsize,
    pub fail_holdings_for: Mutex<Option<ObjectId>>,
}

impl FakeRepo {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Storage calls made by the engine; auth user lookups are not counted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn put_settings(&self, s: NotificationSettings) {
        self.settings.lock().insert(s.user_id, s);
    }

    pub fn put_holdings(&self, user_id: ObjectId, holdings: Vec<Holding>) {
        self.holdings.lock().insert(user_id, holdings);
    }

    pub fn put_raw_settings(&self, raw: Document) {
        self.raw_settings.lock().push(raw);
    }

    pub fn settings_of(&self, user_id: ObjectId) -> Option<NotificationSettings> {
        self.settings.lock().get(&user_id).cloned()
    }
}

#[async_trait]
impl NotificationRepository for FakeRepo {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }

    async fn find_user(&self, user_id: ObjectId) -> Result<Option<User>, RepoError> {
        Ok(self.users.lock().get(&user_id).cloned())
    }

    async fn get_settings(&self, user_id: ObjectId) -> Result<Option<NotificationSettings>, RepoError> {
        self.touch();
        Ok(self.settings.lock().get(&user_id).cloned())
    }

    async fn upsert_settings(&self, settings: &NotificationSettings) -> Result<(), RepoError> {
        self.touch();
        self.settings.lock().insert(settings.user_id, settings.clone());
        Ok(())
    }

    async fn delete_settings(&self, user_id: ObjectId) -> Result<bool, RepoError> {
        self.touch();
        Ok(self.settings.lock().remove(&user_id).is_some())
    }

    async fn list_active_settings(&self) -> Result<Vec<NotificationSettings>, RepoError> {
        self.touch();
        let mut stored: Vec<NotificationSettings> = self.settings.lock().values().cloned().collect();
        stored.sort_by_key(|s| s.user_id);

        let mut docs: Vec<Document> = stored
            .iter()
            .map(|s| bson::to_document(s).expect("settings encode"))
            .collect();
        docs.extend(self.raw_settings.lock().iter().cloned());

        Ok(docs
            .into_iter()
            .filter(|d| d.get_bool("is_active").unwrap_or(false))
            .filter_map(decode_settings)
            .collect())
    }

    async fn record_checkpoint(&self, user_id: ObjectId, kind: ScheduleKind, sent_at: i64) -> Result<(), RepoError> {
        self.touch();
        self.checkpoints.lock().push((user_id, kind, sent_at));
        if let Some(s) = self.settings.lock().get_mut(&user_id) {
            match kind {
                ScheduleKind::Daily => s.daily_summary.last_sent_at = Some(sent_at),
                ScheduleKind::Weekly => s.weekly_summary.last_sent_at = Some(sent_at),
                ScheduleKind::Monthly => s.monthly_summary.last_sent_at = Some(sent_at),
            }
        }
        Ok(())
    }

    async fn list_holdings(&self, user_id: ObjectId) -> Result<Vec<Holding>, RepoError> {
        self.touch();
        if *self.fail_holdings_for.lock() == Some(user_id) {
            let malformed = bson::from_document::<Holding>(Document::new()).unwrap_err();
            return Err(RepoError::Decode(malformed));
        }
        Ok(self.holdings.lock().get(&user_id).cloned().unwrap_or_default())
    }

    async fn get_trading_goals(&self, user_id: ObjectId) -> Result<Option<TradingGoals>, RepoError> {
        self.touch();
        Ok(self.goals.lock().get(&user_id).cloned())
    }
}

// ---------------- Market data ----------------

#[derive(Default)]
pub struct FakeMarket {
    pub quotes: Mutex<HashMap<String, Quote>>,
    pub history: Mutex<HashMap<String, Vec<DailyBar>>>,
    pub quote_calls: AtomicUsize,
    // quotes never resolve while set
    pub hang: AtomicBool,
}

impl FakeMarket {
    pub fn set_quote(&self, q: Quote) {
        self.quotes.lock().insert(q.symbol.clone(), q);
    }

    /// `days` bars of constant `volume` ending the day before `today`, plus today's partial bar.
    pub fn set_flat_history(&self, symbol: &str, today: NaiveDate, days: i64, volume: f64, today_volume: f64) {
        let mut bars: Vec<DailyBar> = (1..=days)
            .rev()
            .map(|back| DailyBar {
                date: today - chrono::Duration::days(back),
                close: 100.0,
                volume,
            })
            .collect();
        bars.push(DailyBar {
            date: today,
            close: 100.0,
            volume: today_volume,
        });
        self.history.lock().insert(symbol.to_string(), bars);
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.quotes
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| QuoteError::NoData(symbol.to_string()))
    }

    async fn daily_history(&self, symbol: &str, lookback_days: usize) -> Result<Vec<DailyBar>, QuoteError> {
        let bars = self
            .history
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| QuoteError::NoData(symbol.to_string()))?;
        let skip = bars.len().saturating_sub(lookback_days);
        Ok(bars[skip..].to_vec())
    }
}

// ---------------- Chat transport ----------------

#[derive(Default)]
pub struct RecordingChat {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_with: Mutex<Option<String>>,
    // sends never resolve while set
    pub hang: AtomicBool,
}

impl RecordingChat {
    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub fn fail(&self, detail: &str) {
        *self.fail_with.lock() = Some(detail.to_string());
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn send_html(&self, chat_id: &str, html: &str) -> Result<(), TransportError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(detail) = self.fail_with.lock().clone() {
            return Err(TransportError::Provider(detail));
        }
        self.sent.lock().push((chat_id.to_string(), html.to_string()));
        Ok(())
    }
}

pub fn registry_for(chat: Arc<RecordingChat>, default_token: &str) -> BotClientRegistry {
    BotClientRegistry::new(
        default_token,
        Arc::new(move |_token: &str| chat.clone() as Arc<dyn ChatClient>),
    )
}

// ---------------- App state ----------------

pub struct Harness {
    pub state: AppState,
    pub repo: Arc<FakeRepo>,
    pub market: Arc<FakeMarket>,
    pub chat: Arc<RecordingChat>,
}

pub fn test_settings() -> config::Settings {
    config::Settings {
        market_data_min_interval_ms: 0,
        telegram_bot_token: DEFAULT_TOKEN.to_string(),
        ..config::Settings::default()
    }
}

pub fn harness() -> Harness {
    harness_with(test_settings(), DEFAULT_TOKEN)
}

pub fn harness_with(settings: config::Settings, default_token: &str) -> Harness {
    let repo = Arc::new(FakeRepo::default());
    let market = Arc::new(FakeMarket::default());
    let chat = Arc::new(RecordingChat::default());

    let state = AppState::new(
        settings,
        repo.clone(),
        market.clone(),
        registry_for(chat.clone(), default_token),
        Arc::new(InMemoryCooldownLedger::new()),
    )
    .expect("templates");

    Harness { state, repo, market, chat }
}

// ---------------- Fixtures ----------------

pub fn jerusalem(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    chrono_tz::Asia::Jerusalem
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

pub fn add_user(repo: &FakeRepo) -> ObjectId {
    let id = ObjectId::new();
    repo.users.lock().insert(
        id,
        User {
            id,
            email: "trader@example.com".to_string(),
            username: Some("trader".to_string()),
        },
    );
    id
}

pub fn active_settings(user_id: ObjectId) -> NotificationSettings {
    let mut s = NotificationSettings::new(user_id, "424242", 0);
    s.is_active = true;
    s
}

pub fn holding(user_id: ObjectId, symbol: &str, shares: f64, buy_price: f64, kind: PortfolioType) -> Holding {
    Holding {
        id: ObjectId::new(),
        user_id,
        symbol: symbol.to_string(),
        shares,
        buy_price,
        buy_date: 0,
        portfolio_type: kind,
    }
}

pub fn quote(symbol: &str, price: f64, percent_change: f64, volume: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price,
        change: price * percent_change / 100.0,
        percent_change,
        volume,
    }
}
