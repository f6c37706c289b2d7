//! Cooldown Ledger: suppresses repeat alerts for the same key within a window.
//!
//! In-memory only; a restart forgets every entry, which can produce at most one
//! duplicate alert per key.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;
use parking_lot::Mutex;

pub trait CooldownStore: Send + Sync {
    /// Returns true when `key` has no entry or its entry is older than `window`,
    /// and in that case records `now` for `key` in the same critical section.
    fn should_send(&self, key: &str, window: Duration, now: DateTime<Utc>) -> bool;

    /// Drops entries older than `max_age`; returns how many were removed.
    fn prune(&self, max_age: Duration, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn entry_alert_key(user_id: &ObjectId, symbol: &str) -> String {
    format!("entry:{}:{}", user_id.to_hex(), symbol.to_uppercase())
}

pub fn price_alert_key(user_id: &ObjectId, symbol: &str) -> String {
    format!("price:{}:{}", user_id.to_hex(), symbol.to_uppercase())
}

#[derive(Default)]
pub struct InMemoryCooldownLedger {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryCooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CooldownStore for InMemoryCooldownLedger {
    fn should_send(&self, key: &str, window: Duration, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();

        if let Some(last) = entries.get(key) {
            if now.signed_duration_since(*last) < window {
                return false;
            }
        }

        entries.insert(key.to_string(), now);
        true
    }

    fn prune(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, last| now.signed_duration_since(*last) < max_age);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
