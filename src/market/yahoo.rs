use chrono::{DateTime, Duration, Utc};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use crate::error::MarketError;
use crate::market::MarketData;
use crate::model::Quote;

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance v8 chart API client.
pub struct YahooMarketData {
    client: reqwest::Client,
}

impl YahooMarketData {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for YahooMarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketData for YahooMarketData {
    fn fetch_recent_series(
        &self,
        symbol: &str,
        lookback: Duration,
        granularity: Duration,
    ) -> BoxFuture<'_, Result<Vec<Quote>, Report<MarketError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let url = format!("{YAHOO_BASE_URL}/v8/finance/chart/{symbol}");
            let range = range_param(lookback);
            let interval = interval_param(granularity);
            let params = [("range", range.as_str()), ("interval", interval.as_str())];

            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .change_context(MarketError::Request)
                .attach_with(|| format!("symbol: {symbol}"))?;

            if !response.status().is_success() {
                return Err(Report::new(MarketError::Request)
                    .attach(format!("HTTP status: {}", response.status())));
            }

            let raw: ChartResponse = response
                .json()
                .await
                .change_context(MarketError::ResponseParse)
                .attach_with(|| format!("symbol: {symbol}"))?;

            let quotes = raw.into_quotes();
            debug!(symbol = %symbol, samples = quotes.len(), "chart fetch complete");
            Ok(quotes)
        })
    }
}

/// Yahoo's `range` parameter counts whole days; a sub-day lookback still
/// needs the current trading day.
fn range_param(lookback: Duration) -> String {
    let days = lookback.num_days().max(1);
    format!("{days}d")
}

fn interval_param(granularity: Duration) -> String {
    let minutes = granularity.num_minutes().max(1);
    format!("{minutes}m")
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    /// Yahoo pads gaps with nulls; those entries carry no usable price.
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_quotes(self) -> Vec<Quote> {
        let Some(results) = self.chart.result else {
            return Vec::new();
        };
        let Some(result) = results.into_iter().next() else {
            return Vec::new();
        };
        let Some(block) = result.indicators.quote.into_iter().next() else {
            return Vec::new();
        };

        result
            .timestamp
            .into_iter()
            .zip(block.close)
            .filter_map(|(ts, close)| {
                let close = close?;
                let timestamp = DateTime::<Utc>::from_timestamp(ts, 0)?;
                Some(Quote { timestamp, close })
            })
            .collect()
    }
}
