use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use handlebars::{Handlebars, RenderError, TemplateError};
use serde_json::json;

use crate::services::quote_source::{Quote, TRAILING_VOLUME_WINDOW};
use crate::services::schedule::ScheduleKind;
use crate::services::valuation::{HoldingPerformance, PortfolioSummary};
use crate::views::format::{
    arrow, fmt2, fmt_money, fmt_signed_money, fmt_signed_percent, fmt_volume, indicator, local_timestamp,
};

pub type Hbs = Arc<Handlebars<'static>>;

const ENTRY_ALERT: &str = "telegram/entry_alert";
const PRICE_ALERT: &str = "telegram/price_alert";
const SUMMARY: &str = "telegram/summary";
const TEST_MESSAGE: &str = "telegram/test_message";

/// Telegram message renderer. Output is Telegram-flavoured HTML; values are
/// escaped by handlebars.
#[derive(Clone)]
pub struct Messages {
    hbs: Hbs,
}

impl Messages {
    pub fn build() -> Result<Self, TemplateError> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);

        hb.register_template_string(ENTRY_ALERT, include_str!("../../templates/telegram/entry_alert.hbs"))?;
        hb.register_template_string(PRICE_ALERT, include_str!("../../templates/telegram/price_alert.hbs"))?;
        hb.register_template_string(SUMMARY, include_str!("../../templates/telegram/summary.hbs"))?;
        hb.register_template_string(TEST_MESSAGE, include_str!("../../templates/telegram/test_message.hbs"))?;

        Ok(Self { hbs: Arc::new(hb) })
    }

    pub fn entry_alert(
        &self,
        quote: &Quote,
        avg_volume: f64,
        volume_ratio: f64,
        now: &DateTime<Tz>,
    ) -> Result<String, RenderError> {
        let ctx = json!({
            "indicator": indicator(quote.percent_change),
            "arrow": arrow(quote.percent_change),
            "symbol": quote.symbol,
            "price": fmt2(quote.price),
            "change_percent": fmt_signed_percent(quote.percent_change),
            "volume": fmt_volume(quote.volume),
            "volume_ratio": format!("{:.1}", volume_ratio),
            "window": TRAILING_VOLUME_WINDOW,
            "avg_volume": fmt_volume(avg_volume),
            "timestamp": local_timestamp(now),
        });
        self.hbs.render(ENTRY_ALERT, &ctx)
    }

    pub fn price_alert(&self, quote: &Quote, now: &DateTime<Tz>) -> Result<String, RenderError> {
        let ctx = json!({
            "indicator": indicator(quote.percent_change),
            "arrow": arrow(quote.percent_change),
            "symbol": quote.symbol,
            "price": fmt2(quote.price),
            "change_percent": fmt_signed_percent(quote.percent_change),
            "timestamp": local_timestamp(now),
        });
        self.hbs.render(PRICE_ALERT, &ctx)
    }

    pub fn summary(
        &self,
        kind: ScheduleKind,
        summary: &PortfolioSummary,
        now: &DateTime<Tz>,
    ) -> Result<String, RenderError> {
        let title = match kind {
            ScheduleKind::Daily => "Daily summary",
            ScheduleKind::Weekly => "Weekly summary",
            ScheduleKind::Monthly => "Monthly summary",
        };

        let perf = |p: &Option<HoldingPerformance>| {
            p.as_ref()
                .map(|p| format!("{} ({}%)", p.symbol, fmt_signed_percent(p.pnl_percent)))
                .unwrap_or_else(|| "N/A".to_string())
        };

        let ctx = json!({
            "title": title,
            "total_equity": fmt_money(summary.total_equity),
            "long_value": fmt_money(summary.long.value),
            "long_indicator": indicator(summary.long.pnl),
            "long_pnl": fmt_signed_money(summary.long.pnl),
            "long_pnl_percent": fmt_signed_percent(summary.long.pnl_percent),
            "trade_capital": fmt_money(summary.trade_capital),
            "weekly_return": fmt2(summary.trade_weekly_return),
            "best": perf(&summary.best),
            "worst": perf(&summary.worst),
            "timestamp": local_timestamp(now),
        });
        self.hbs.render(SUMMARY, &ctx)
    }

    pub fn test_message(&self, summary: &PortfolioSummary, now: &DateTime<Tz>) -> Result<String, RenderError> {
        let ctx = json!({
            "total_equity": fmt_money(summary.total_equity),
            "timestamp": local_timestamp(now),
        });
        self.hbs.render(TEST_MESSAGE, &ctx)
    }
}
