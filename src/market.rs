pub mod yahoo;

use chrono::Duration;
use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::MarketError;
use crate::model::Quote;

/// Abstraction over a market-data provider.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn MarketData`).
pub trait MarketData: Send + Sync {
    /// Fetch the most recent price samples for `symbol`, covering roughly
    /// `lookback` at `granularity` resolution, ordered oldest first.
    ///
    /// The returned series may be empty when the provider has no data.
    fn fetch_recent_series(
        &self,
        symbol: &str,
        lookback: Duration,
        granularity: Duration,
    ) -> BoxFuture<'_, Result<Vec<Quote>, Report<MarketError>>>;
}
