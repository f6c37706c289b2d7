use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioType {
    Trade,
    // anything that is not "trade" is valued as long-term
    #[default]
    #[serde(other)]
    Long,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,

    pub shares: f64,
    // cost basis per share
    pub buy_price: f64,

    #[serde(default)]
    pub buy_date: i64,

    #[serde(default)]
    pub portfolio_type: PortfolioType,
}

impl Holding {
    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }
}
