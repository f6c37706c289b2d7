//! Entry-Alert Evaluator: volume + price-change breakout detection.

use crate::models::NotificationSettings;
use crate::services::quote_source::Quote;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryThresholds {
    pub price_change_percent: f64,
    pub volume_multiplier: f64,
}

impl EntryThresholds {
    pub fn from_settings(s: &NotificationSettings) -> Self {
        Self {
            price_change_percent: s.entry_change_threshold,
            volume_multiplier: s.entry_volume_multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryDecision {
    Fire { volume_ratio: f64 },
    Quiet,
    InsufficientData,
}

impl EntryDecision {
    pub fn fires(&self) -> bool {
        matches!(self, Self::Fire { .. })
    }
}

fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Fires when `|percent_change| >= price_change_percent` and
/// `volume / trailing_avg >= volume_multiplier`. Both bounds are inclusive.
pub fn evaluate(quote: &Quote, trailing_avg_volume: Option<f64>, thresholds: &EntryThresholds) -> EntryDecision {
    let Some(avg) = trailing_avg_volume.filter(|v| positive(*v)) else {
        return EntryDecision::InsufficientData;
    };

    if !positive(quote.price) || !positive(quote.volume) || !quote.percent_change.is_finite() {
        return EntryDecision::InsufficientData;
    }

    let volume_ratio = quote.volume / avg;
    let moved = quote.percent_change.abs() >= thresholds.price_change_percent;
    let heavy = volume_ratio >= thresholds.volume_multiplier;

    if moved && heavy {
        EntryDecision::Fire { volume_ratio }
    } else {
        EntryDecision::Quiet
    }
}

/// Plain price-move check used for the per-holding price alert.
pub fn price_move_exceeds(quote: &Quote, threshold_percent: f64) -> bool {
    positive(quote.price) && quote.percent_change.is_finite() && quote.percent_change.abs() >= threshold_percent
}
