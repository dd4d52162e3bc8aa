//! Upstream price data: provider trait, Tiingo client, ticker list.

pub mod provider;
pub mod tickers;
pub mod tiingo;

pub use provider::{PriceProvider, RawPayload};
pub use tickers::{load_tickers, parse_tickers, TickerListError, DEFAULT_TICKERS_KEY};
pub use tiingo::TiingoProvider;
