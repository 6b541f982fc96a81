//! Infrastructure: the only layer allowed to know about SQLite, HTTP, and
//! wall-clock vendor APIs. Implements the domain's repository traits and
//! the application layer's `MarketDataSource`/`BrokerAdapter` ports.

pub mod broker;
pub mod http_client_factory;
pub mod market_data;
pub mod persistence;
