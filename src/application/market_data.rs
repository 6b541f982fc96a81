//! Market Data Provider: lazy, cached supply of bars and quotes. The cache
//! sits in front of whatever HTTP adapter actually talks to a data vendor
//! (`infrastructure::market_data`), so strategies and the signal manager
//! never make a network call directly.

use crate::domain::market::{PriceBar, Quote};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

/// Raw vendor access, no caching. Implementations live in `infrastructure`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_historical_data(&self, symbol: &str, timeframe: &str, query: HistoryQuery) -> Result<Vec<PriceBar>>;
    async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>>;
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>>;
}

#[derive(Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// Cache key is the full argument tuple, per spec -- two calls for the same
/// symbol but a different limit/start/end are different cache slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BarKey {
    symbol: String,
    timeframe: String,
    limit: Option<u32>,
    start_time: Option<i64>,
    end_time: Option<i64>,
}

const BAR_TTL: Duration = Duration::from_secs(60);
const QUOTE_TTL: Duration = Duration::from_secs(6);

/// Wraps a `MarketDataSource` with per-key TTL caching and single-flight
/// locks, so a thundering herd of symbols hitting a cold cache entry at the
/// same moment only issues one upstream fetch. A miss never populates the
/// cache with a failure -- the error just propagates to every caller that
/// arrived before the retry.
pub struct CachedMarketDataProvider<S: MarketDataSource> {
    source: S,
    bars: RwLock<HashMap<BarKey, CacheEntry<Vec<PriceBar>>>>,
    quotes: RwLock<HashMap<String, CacheEntry<Quote>>>,
    bar_locks: Mutex<HashMap<BarKey, Arc<Mutex<()>>>>,
    quote_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: MarketDataSource> CachedMarketDataProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            bars: RwLock::new(HashMap::new()),
            quotes: RwLock::new(HashMap::new()),
            bar_locks: Mutex::new(HashMap::new()),
            quote_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for<K: std::hash::Hash + Eq + Clone>(locks: &Mutex<HashMap<K, Arc<Mutex<()>>>>, key: &K) -> Arc<Mutex<()>> {
        let mut guard = locks.lock().await;
        guard.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn fetch_historical_data(
        &self,
        symbol: &str,
        timeframe: &str,
        query: HistoryQuery,
    ) -> Result<Vec<PriceBar>> {
        let key = BarKey {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            limit: query.limit,
            start_time: query.start_time,
            end_time: query.end_time,
        };

        if let Some(entry) = self.bars.read().await.get(&key) {
            if entry.fetched_at.elapsed() < BAR_TTL {
                return Ok(entry.value.clone());
            }
        }

        let key_lock = Self::lock_for(&self.bar_locks, &key).await;
        let _guard = key_lock.lock().await;

        if let Some(entry) = self.bars.read().await.get(&key) {
            if entry.fetched_at.elapsed() < BAR_TTL {
                return Ok(entry.value.clone());
            }
        }

        let bars = self.source.fetch_historical_data(symbol, timeframe, query).await?;
        self.bars.write().await.insert(
            key,
            CacheEntry {
                value: bars.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(bars)
    }

    pub async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        if let Some(entry) = self.quotes.read().await.get(symbol) {
            if entry.fetched_at.elapsed() < QUOTE_TTL {
                return Ok(Some(entry.value));
            }
        }

        let key_lock = Self::lock_for(&self.quote_locks, &symbol.to_string()).await;
        let _guard = key_lock.lock().await;

        if let Some(entry) = self.quotes.read().await.get(symbol) {
            if entry.fetched_at.elapsed() < QUOTE_TTL {
                return Ok(Some(entry.value));
            }
        }

        let quote = self.source.fetch_quote(symbol).await?;
        if let Some(q) = quote {
            self.quotes.write().await.insert(
                symbol.to_string(),
                CacheEntry {
                    value: q,
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(quote)
    }

    pub async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        let mut result = HashMap::new();
        let mut missing = Vec::new();
        {
            let cache = self.quotes.read().await;
            for symbol in symbols {
                match cache.get(symbol) {
                    Some(entry) if entry.fetched_at.elapsed() < QUOTE_TTL => {
                        result.insert(symbol.clone(), entry.value);
                    }
                    _ => missing.push(symbol.clone()),
                }
            }
        }
        if !missing.is_empty() {
            let fetched = self.source.fetch_quotes(&missing).await?;
            let mut cache = self.quotes.write().await;
            for (symbol, quote) in fetched {
                cache.insert(
                    symbol.clone(),
                    CacheEntry {
                        value: quote,
                        fetched_at: Instant::now(),
                    },
                );
                result.insert(symbol, quote);
            }
        }
        Ok(result)
    }
}
