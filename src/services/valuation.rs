//! Portfolio Valuation.
//!
//! Splits holdings into the long-term and trading buckets, marks them to the
//! latest price (falling back to cost basis when no quote is available) and
//! layers the manually tracked trading-capital ledger on top.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{Holding, PortfolioType, TradingGoals};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BucketValuation {
    pub value: f64,
    pub cost: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
}

impl BucketValuation {
    fn add(&mut self, value: f64, cost: f64) {
        self.value += value;
        self.cost += cost;
    }

    fn finish(mut self) -> Self {
        self.pnl = self.value - self.cost;
        self.pnl_percent = if self.cost > 0.0 { self.pnl / self.cost * 100.0 } else { 0.0 };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingPerformance {
    pub symbol: String,
    pub pnl_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub long: BucketValuation,
    pub trade: BucketValuation,
    pub trade_capital: f64,
    pub trade_weekly_return: f64,
    pub total_equity: f64,
    pub best: Option<HoldingPerformance>,
    pub worst: Option<HoldingPerformance>,
}

impl PortfolioSummary {
    pub fn long_value(&self) -> f64 {
        self.long.value
    }

    pub fn long_pnl(&self) -> f64 {
        self.long.pnl
    }

    pub fn long_pnl_percent(&self) -> f64 {
        self.long.pnl_percent
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

/// Values `holdings` against `prices` (symbol -> last price) and `goals`.
pub fn summarize(holdings: &[Holding], prices: &HashMap<String, f64>, goals: Option<&TradingGoals>) -> PortfolioSummary {
    let mut long = BucketValuation::default();
    let mut trade = BucketValuation::default();
    let mut perf: Vec<HoldingPerformance> = Vec::new();

    for h in holdings {
        let symbol = h.normalized_symbol();
        let shares = finite_or_zero(h.shares);
        let cost_basis = finite_or_zero(h.buy_price);
        let price = prices
            .get(&symbol)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(cost_basis);

        let value = shares * price;
        let cost = shares * cost_basis;

        match h.portfolio_type {
            PortfolioType::Trade => trade.add(value, cost),
            PortfolioType::Long => long.add(value, cost),
        }

        if cost > 0.0 {
            perf.push(HoldingPerformance {
                symbol,
                pnl_percent: (value - cost) / cost * 100.0,
            });
        }
    }

    let long = long.finish();
    let trade = trade.finish();

    let trade_capital = goals.map(trade_capital).unwrap_or(0.0);
    let trade_weekly_return = goals.map(|g| finite_or_zero(g.weekly_return)).unwrap_or(0.0);

    let best = perf
        .iter()
        .max_by(|a, b| a.pnl_percent.total_cmp(&b.pnl_percent))
        .cloned();
    let worst = perf
        .iter()
        .min_by(|a, b| a.pnl_percent.total_cmp(&b.pnl_percent))
        .cloned();

    PortfolioSummary {
        long,
        trade,
        trade_capital,
        trade_weekly_return,
        total_equity: total_equity(long.value, trade.value, trade_capital),
        best,
        worst,
    }
}

/// Total equity as the product currently reports it.
///
/// Trade-bucket market value is added on top of the trading-capital ledger,
/// so trade holdings are counted in both. Kept here so the policy can change
/// without touching bucket valuation.
pub fn total_equity(long_value: f64, trade_holdings_value: f64, trade_capital: f64) -> f64 {
    long_value + trade_holdings_value + trade_capital
}

#[derive(Debug, Default)]
struct MonthTally {
    days: f64,
    weeks: f64,
    has_weeks: bool,
}

/// Bookkeeping total of the trading account: base capital plus every month's
/// recorded result, floored at zero.
///
/// A month contributes its explicit month entry when present, otherwise the
/// sum of its week entries when any exist, otherwise the sum of its day entries.
pub fn trade_capital(goals: &TradingGoals) -> f64 {
    let entries = &goals.profit_entries;
    let mut tallies: BTreeMap<String, MonthTally> = BTreeMap::new();

    for (day, value) in &entries.days {
        let Some(month) = day.get(..7) else { continue };
        tallies.entry(month.to_string()).or_default().days += finite_or_zero(*value);
    }

    for (week, value) in &entries.weeks {
        let mut parts = week.split('-');
        let (Some(year), Some(month)) = (parts.next(), parts.next()) else {
            continue;
        };
        let tally = tallies.entry(format!("{year}-{month}")).or_default();
        tally.weeks += finite_or_zero(*value);
        tally.has_weeks = true;
    }

    let mut total = 0.0;
    for (month, value) in &entries.months {
        total += finite_or_zero(*value);
        tallies.remove(month);
    }
    for tally in tallies.values() {
        total += if tally.has_weeks { tally.weeks } else { tally.days };
    }

    (finite_or_zero(goals.base_capital) + total).max(0.0)
}
