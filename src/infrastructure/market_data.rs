//! HTTP market-data source. Sits behind `CachedMarketDataProvider`, which
//! owns the TTL caching and single-flight locking -- this adapter only
//! knows how to turn a vendor response into `PriceBar`/`Quote`.

use crate::application::market_data::{HistoryQuery, MarketDataSource};
use crate::domain::market::{PriceBar, Quote};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use super::http_client_factory::HttpClientFactory;

#[derive(Debug, Deserialize)]
struct WireBar {
    timestamp: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct WireQuote {
    bid: Option<String>,
    ask: Option<String>,
    last: Option<String>,
    volume: Option<String>,
    timestamp: i64,
}

fn parse_decimal(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_default()
}

pub struct HttpMarketDataSource {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpMarketDataSource {
    pub fn new(base_url: String, api_key: String, api_secret: String) -> Self {
        Self { client: HttpClientFactory::create_client(), base_url, api_key, api_secret }
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn fetch_historical_data(&self, symbol: &str, timeframe: &str, query: HistoryQuery) -> Result<Vec<PriceBar>> {
        let mut request = self
            .client
            .get(format!("{}/bars", self.base_url))
            .header("Authorization", format!("{}:{}", self.api_key, self.api_secret))
            .query(&[("symbol", symbol), ("timeframe", timeframe)]);
        if let Some(limit) = query.limit {
            request = request.query(&[("limit", limit)]);
        }
        if let Some(start) = query.start_time {
            request = request.query(&[("start", start)]);
        }
        if let Some(end) = query.end_time {
            request = request.query(&[("end", end)]);
        }

        let wire: Vec<WireBar> = request
            .send()
            .await
            .with_context(|| format!("fetching bars for {symbol}"))?
            .json()
            .await
            .with_context(|| format!("parsing bar response for {symbol}"))?;

        Ok(wire
            .into_iter()
            .map(|b| PriceBar::new(b.timestamp, parse_decimal(&b.open), parse_decimal(&b.high), parse_decimal(&b.low), parse_decimal(&b.close), parse_decimal(&b.volume)))
            .collect())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let response = self
            .client
            .get(format!("{}/quote", self.base_url))
            .header("Authorization", format!("{}:{}", self.api_key, self.api_secret))
            .query(&[("symbol", symbol)])
            .send()
            .await
            .with_context(|| format!("fetching quote for {symbol}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let wire: WireQuote = response.json().await.with_context(|| format!("parsing quote response for {symbol}"))?;
        Ok(Some(Quote {
            bid: wire.bid.as_deref().map(parse_decimal),
            ask: wire.ask.as_deref().map(parse_decimal),
            last: wire.last.as_deref().map(parse_decimal),
            volume: wire.volume.as_deref().map(parse_decimal),
            timestamp: wire.timestamp,
        }))
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(quote) = self.fetch_quote(symbol).await? {
                quotes.insert(symbol.clone(), quote);
            }
        }
        Ok(quotes)
    }
}
