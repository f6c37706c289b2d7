//! Quote Source Adapter.
//!
//! Wraps a [`MarketData`] provider so callers only ever see "a quote" or
//! "unavailable". Every provider call is bounded by a timeout and spaced out
//! to respect the provider's rate limit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::error::QuoteError;

/// Number of daily bars requested when computing the trailing volume average.
pub const HISTORY_LOOKBACK_DAYS: usize = 21;
/// Bars that make up the trailing average (today's bar excluded).
pub const TRAILING_VOLUME_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub percent_change: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// Raw market-data capability.
///
/// `daily_history` returns bars ordered oldest-to-newest.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
    async fn daily_history(&self, symbol: &str, lookback_days: usize) -> Result<Vec<DailyBar>, QuoteError>;
}

/// Mean volume of the most recent [`TRAILING_VOLUME_WINDOW`] bars dated strictly before `today`.
///
/// `bars` must be ordered oldest-to-newest. Returns `None` when there is no
/// usable bar or the mean is not positive.
pub fn trailing_average_volume(bars: &[DailyBar], today: NaiveDate) -> Option<f64> {
    let prior: Vec<f64> = bars
        .iter()
        .filter(|b| b.date < today)
        .map(|b| b.volume)
        .collect();

    let start = prior.len().saturating_sub(TRAILING_VOLUME_WINDOW);
    let window: Vec<f64> = prior[start..]
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect();

    if window.is_empty() {
        return None;
    }

    let avg = window.iter().sum::<f64>() / window.len() as f64;
    (avg.is_finite() && avg > 0.0).then_some(avg)
}

#[derive(Clone)]
pub struct QuoteSource {
    provider: Arc<dyn MarketData>,
    timeout: Duration,
    min_spacing: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl QuoteSource {
    pub fn new(provider: Arc<dyn MarketData>, timeout: Duration, min_spacing: Duration) -> Self {
        Self {
            provider,
            timeout,
            min_spacing,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    async fn pace(&self) {
        if self.min_spacing.is_zero() {
            return;
        }

        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_spacing {
                time::sleep(self.min_spacing - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, QuoteError>
    where
        F: std::future::Future<Output = Result<T, QuoteError>>,
    {
        self.pace().await;
        match time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(QuoteError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Current quote, or `None` when the provider fails or returns unusable data.
    pub async fn quote(&self, symbol: &str) -> Option<Quote> {
        match self.bounded(self.provider.quote(symbol)).await {
            Ok(q) => Some(q),
            Err(e) => {
                warn!(symbol, error = %e, "quote unavailable");
                None
            }
        }
    }

    pub async fn trailing_average_volume(&self, symbol: &str, today: NaiveDate) -> Option<f64> {
        let bars = match self
            .bounded(self.provider.daily_history(symbol, HISTORY_LOOKBACK_DAYS))
            .await
        {
            Ok(b) => b,
            Err(e) => {
                warn!(symbol, error = %e, "daily history unavailable");
                return None;
            }
        };

        let avg = trailing_average_volume(&bars, today);
        if avg.is_none() {
            debug!(symbol, bars = bars.len(), "no trailing volume average");
        }
        avg
    }

    /// Last prices for each symbol; symbols without a quote are left out.
    pub async fn last_prices(&self, symbols: &[String]) -> HashMap<String, f64> {
        let mut out = HashMap::new();
        for sym in symbols {
            if out.contains_key(sym) {
                continue;
            }
            if let Some(q) = self.quote(sym).await {
                if q.price.is_finite() && q.price > 0.0 {
                    out.insert(sym.clone(), q.price);
                }
            }
        }
        out
    }
}
