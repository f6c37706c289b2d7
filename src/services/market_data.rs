use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::error::QuoteError;
use crate::services::quote_source::{DailyBar, MarketData, Quote};

const BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Clone)]
pub struct AlphaVantageClient {
    http: Client,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        function: &str,
        symbol: &str,
    ) -> Result<T, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::MissingKey);
        }

        let res = self
            .http
            .get(BASE_URL)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Status { status, body });
        }

        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl MarketData for AlphaVantageClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let sym = symbol.to_uppercase();
        let env: GlobalQuoteResponse = self.query("GLOBAL_QUOTE", &sym).await?;
        env.notices.check()?;

        let Some(q) = env.quote.filter(|q| !q.price.trim().is_empty()) else {
            return Err(QuoteError::NoData(sym));
        };

        Ok(Quote {
            symbol: if q.symbol.is_empty() { sym } else { q.symbol.clone() },
            price: parse_num("price", &q.price)?,
            change: parse_num("change", &q.change)?,
            percent_change: parse_num("change percent", q.change_percent.trim_end_matches('%'))?,
            volume: parse_num("volume", &q.volume)?,
        })
    }

    async fn daily_history(&self, symbol: &str, lookback_days: usize) -> Result<Vec<DailyBar>, QuoteError> {
        let sym = symbol.to_uppercase();
        let env: DailySeriesResponse = self.query("TIME_SERIES_DAILY", &sym).await?;
        env.notices.check()?;

        let Some(series) = env.series else {
            return Err(QuoteError::NoData(sym));
        };

        // BTreeMap keys are ISO dates, so iteration is oldest-to-newest.
        let mut bars = Vec::with_capacity(series.len());
        for (date, day) in series {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| QuoteError::InvalidField {
                field: "date",
                value: date.clone(),
            })?;
            bars.push(DailyBar {
                date,
                close: parse_num("close", &day.close)?,
                volume: parse_num("volume", &day.volume)?,
            });
        }

        let skip = bars.len().saturating_sub(lookback_days);
        Ok(bars.split_off(skip))
    }
}

fn parse_num(field: &'static str, raw: &str) -> Result<f64, QuoteError> {
    raw.trim().parse::<f64>().map_err(|_| QuoteError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

// The provider answers 200 with one of these keys when it refuses a call.
#[derive(Debug, Default, Deserialize)]
struct Notices {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error: Option<String>,
}

impl Notices {
    fn check(&self) -> Result<(), QuoteError> {
        if let Some(e) = &self.error {
            return Err(QuoteError::Provider(e.clone()));
        }
        if let Some(n) = self.note.as_ref().or(self.information.as_ref()) {
            return Err(QuoteError::RateLimited(n.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
    #[serde(flatten)]
    notices: Notices,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol", default)]
    symbol: String,
    #[serde(rename = "05. price", default)]
    price: String,
    #[serde(rename = "06. volume", default)]
    volume: String,
    #[serde(rename = "09. change", default)]
    change: String,
    #[serde(rename = "10. change percent", default)]
    change_percent: String,
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, DailySeriesEntry>>,
    #[serde(flatten)]
    notices: Notices,
}

#[derive(Debug, Deserialize)]
struct DailySeriesEntry {
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}
