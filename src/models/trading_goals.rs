use std::collections::BTreeMap;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Manually tracked profit/loss entries.
///
/// Keys are `YYYY-MM-DD` for days, `YYYY-MM-Wn` for weeks and `YYYY-MM` for months.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitEntries {
    #[serde(default)]
    pub days: BTreeMap<String, f64>,
    #[serde(default)]
    pub weeks: BTreeMap<String, f64>,
    #[serde(default)]
    pub months: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingGoals {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    #[serde(default)]
    pub base_capital: f64,
    #[serde(default)]
    pub target_capital: f64,
    // weekly return target, percent
    #[serde(default)]
    pub weekly_return: f64,

    #[serde(default)]
    pub profit_entries: ProfitEntries,
}
