use chrono::{DateTime, Duration, Utc};
use error_stack::{Report, ResultExt};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::SchedulerError;
use crate::market::MarketData;
use crate::model::{Notification, Outcome};

/// Price history fetched per breakout check: the last trading day at
/// one-minute resolution, enough to read the most recent candle close.
const BREAKOUT_LOOKBACK_HOURS: i64 = 24;
const BREAKOUT_GRANULARITY_MINUTES: i64 = 1;

#[derive(Debug, Clone)]
pub enum ConditionKind {
    /// Last observed close strictly above `threshold`. No hysteresis: a
    /// single sample above the trigger fires immediately.
    PriceBreakout { symbol: String, threshold: f64 },
    /// Current UTC time at or past `target - lead`. The window never closes,
    /// so a late start still fires.
    TimeWindow {
        target: DateTime<Utc>,
        lead: Duration,
    },
}

/// A named one-shot alert condition.
///
/// `fired` starts false and is set true by the scheduler at most once; it is
/// never reset, which is what bounds the process to one notification per
/// condition.
#[derive(Debug, Clone)]
pub struct Condition {
    pub name: String,
    pub fired: bool,
    /// Most recent close seen by a breakout check, kept for the alert text.
    pub last_observed: Option<f64>,
    pub kind: ConditionKind,
}

impl Condition {
    /// Build the fixed condition set from a validated `AppConfig`.
    pub fn from_config(config: &AppConfig) -> Vec<Self> {
        vec![
            Condition {
                name: format!("{} breakout", config.breakout.symbol),
                fired: false,
                last_observed: None,
                kind: ConditionKind::PriceBreakout {
                    symbol: config.breakout.symbol.clone(),
                    threshold: config.breakout.threshold,
                },
            },
            Condition {
                name: config.event.name.clone(),
                fired: false,
                last_observed: None,
                kind: ConditionKind::TimeWindow {
                    target: config.event.target_utc,
                    lead: Duration::minutes(config.event.lead_minutes as i64),
                },
            },
        ]
    }

    /// Evaluate this condition once against the current external state.
    ///
    /// Not called again once `fired` is set. An empty or unusable price
    /// series is `DataUnavailable`, not an error; only a failed fetch
    /// surfaces as `SchedulerError::Evaluation`.
    pub async fn evaluate(
        &mut self,
        market: &dyn MarketData,
        now: DateTime<Utc>,
    ) -> Result<Outcome, Report<SchedulerError>> {
        match &self.kind {
            ConditionKind::PriceBreakout { symbol, threshold } => {
                let series = market
                    .fetch_recent_series(
                        symbol,
                        Duration::hours(BREAKOUT_LOOKBACK_HOURS),
                        Duration::minutes(BREAKOUT_GRANULARITY_MINUTES),
                    )
                    .await
                    .change_context(SchedulerError::Evaluation {
                        name: self.name.clone(),
                    })?;

                let Some(last) = series.last() else {
                    warn!(condition = %self.name, symbol = %symbol, "no price data, skipping check");
                    return Ok(Outcome::DataUnavailable);
                };

                if !last.close.is_finite() {
                    warn!(
                        condition = %self.name,
                        symbol = %symbol,
                        "last close is not a finite number, skipping check"
                    );
                    return Ok(Outcome::DataUnavailable);
                }

                info!(
                    condition = %self.name,
                    last_price = last.close,
                    threshold = *threshold,
                    "breakout check"
                );
                self.last_observed = Some(last.close);

                if last.close > *threshold {
                    Ok(Outcome::Triggered)
                } else {
                    Ok(Outcome::NotTriggered)
                }
            }
            ConditionKind::TimeWindow { target, lead } => {
                let window_start = *target - *lead;
                info!(
                    condition = %self.name,
                    now = %now.format("%Y-%m-%d %H:%M"),
                    window_opens = %window_start.format("%Y-%m-%d %H:%M"),
                    "event window check"
                );

                if now >= window_start {
                    Ok(Outcome::Triggered)
                } else {
                    Ok(Outcome::NotTriggered)
                }
            }
        }
    }

    /// Build the push message for this condition once it has triggered.
    pub fn notification(&self) -> Notification {
        match &self.kind {
            ConditionKind::PriceBreakout { symbol, threshold } => {
                let body = match self.last_observed {
                    Some(last) => format!(
                        "{symbol} has broken above the entry trigger of {threshold:.4}. \
                         Last price: {last:.4}"
                    ),
                    None => {
                        format!("{symbol} has broken above the entry trigger of {threshold:.4}.")
                    }
                };
                Notification {
                    title: format!("Breakout alert: {symbol}"),
                    body,
                    tags: "warning".into(),
                }
            }
            ConditionKind::TimeWindow { target, .. } => Notification {
                title: format!("Upcoming event: {}", self.name),
                body: format!(
                    "{} is scheduled for {} UTC. Monitor the market for the post-announcement move.",
                    self.name,
                    target.format("%Y-%m-%d %H:%M"),
                ),
                tags: "info".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::future::BoxFuture;

    use crate::error::MarketError;
    use crate::model::Quote;

    struct FixedMarket {
        closes: Vec<f64>,
    }

    impl MarketData for FixedMarket {
        fn fetch_recent_series(
            &self,
            _symbol: &str,
            _lookback: Duration,
            _granularity: Duration,
        ) -> BoxFuture<'_, Result<Vec<Quote>, Report<MarketError>>> {
            let quotes = self
                .closes
                .iter()
                .map(|&close| Quote {
                    timestamp: Utc::now(),
                    close,
                })
                .collect();
            Box::pin(async move { Ok(quotes) })
        }
    }

    struct FailingMarket;

    impl MarketData for FailingMarket {
        fn fetch_recent_series(
            &self,
            _symbol: &str,
            _lookback: Duration,
            _granularity: Duration,
        ) -> BoxFuture<'_, Result<Vec<Quote>, Report<MarketError>>> {
            Box::pin(async { Err(Report::new(MarketError::Request)) })
        }
    }

    fn breakout(threshold: f64) -> Condition {
        Condition {
            name: "CAD=X breakout".into(),
            fired: false,
            last_observed: None,
            kind: ConditionKind::PriceBreakout {
                symbol: "CAD=X".into(),
                threshold,
            },
        }
    }

    fn window(target: DateTime<Utc>, lead_minutes: i64) -> Condition {
        Condition {
            name: "BoE rate decision".into(),
            fired: false,
            last_observed: None,
            kind: ConditionKind::TimeWindow {
                target,
                lead: Duration::minutes(lead_minutes),
            },
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[tokio::test]
    async fn breakout_not_triggered_below_threshold() {
        let market = FixedMarket {
            closes: vec![1.3850, 1.3860, 1.3870],
        };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::NotTriggered);
    }

    #[tokio::test]
    async fn breakout_triggered_above_threshold() {
        let market = FixedMarket {
            closes: vec![1.3880, 1.3900],
        };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::Triggered);
        assert_eq!(condition.last_observed, Some(1.3900));
    }

    #[tokio::test]
    async fn breakout_not_triggered_at_exact_threshold() {
        let market = FixedMarket {
            closes: vec![1.3890],
        };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::NotTriggered);
    }

    #[tokio::test]
    async fn breakout_uses_most_recent_close_only() {
        // Earlier samples above the trigger do not matter; only the last one.
        let market = FixedMarket {
            closes: vec![1.3950, 1.3850],
        };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::NotTriggered);
    }

    #[tokio::test]
    async fn breakout_single_sample_series_is_valid() {
        let market = FixedMarket {
            closes: vec![1.3900],
        };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::Triggered);
    }

    #[tokio::test]
    async fn breakout_empty_series_is_data_unavailable() {
        let market = FixedMarket { closes: vec![] };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::DataUnavailable);
    }

    #[tokio::test]
    async fn breakout_nan_last_close_is_data_unavailable() {
        let market = FixedMarket {
            closes: vec![1.3900, f64::NAN],
        };
        let mut condition = breakout(1.3890);
        let outcome = condition.evaluate(&market, Utc::now()).await.unwrap();
        assert_eq!(outcome, Outcome::DataUnavailable);
    }

    #[tokio::test]
    async fn breakout_fetch_failure_is_an_evaluation_error() {
        let mut condition = breakout(1.3890);
        let result = condition.evaluate(&FailingMarket, Utc::now()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn time_window_not_triggered_before_window_opens() {
        let market = FixedMarket { closes: vec![] };
        let mut condition = window(utc(2025, 8, 7, 11, 0), 5);
        let outcome = condition
            .evaluate(&market, utc(2025, 8, 7, 10, 0))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::NotTriggered);
    }

    #[tokio::test]
    async fn time_window_triggered_inside_lead_window() {
        let market = FixedMarket { closes: vec![] };
        let mut condition = window(utc(2025, 8, 7, 11, 0), 5);
        let outcome = condition
            .evaluate(&market, utc(2025, 8, 7, 10, 56))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Triggered);
    }

    #[tokio::test]
    async fn time_window_triggered_exactly_at_window_start() {
        let market = FixedMarket { closes: vec![] };
        let mut condition = window(utc(2025, 8, 7, 11, 0), 5);
        let outcome = condition
            .evaluate(&market, utc(2025, 8, 7, 10, 55))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Triggered);
    }

    #[tokio::test]
    async fn time_window_stays_triggered_long_after_target() {
        // The window has no upper bound; being late still fires.
        let market = FixedMarket { closes: vec![] };
        let mut condition = window(utc(2025, 8, 7, 11, 0), 5);
        for now in [
            utc(2025, 8, 7, 11, 0),
            utc(2025, 8, 7, 12, 0),
            utc(2025, 9, 1, 0, 0),
        ] {
            let outcome = condition.evaluate(&market, now).await.unwrap();
            assert_eq!(outcome, Outcome::Triggered);
        }
    }

    #[tokio::test]
    async fn breakout_notification_carries_symbol_and_prices() {
        let market = FixedMarket {
            closes: vec![1.3900],
        };
        let mut condition = breakout(1.3890);
        condition.evaluate(&market, Utc::now()).await.unwrap();

        let notification = condition.notification();
        assert_eq!(notification.title, "Breakout alert: CAD=X");
        assert!(notification.body.contains("1.3890"));
        assert!(notification.body.contains("1.3900"));
        assert_eq!(notification.tags, "warning");
    }

    #[test]
    fn time_window_notification_names_the_event() {
        let condition = window(utc(2025, 8, 7, 11, 0), 5);
        let notification = condition.notification();
        assert_eq!(notification.title, "Upcoming event: BoE rate decision");
        assert!(notification.body.contains("2025-08-07 11:00"));
        assert_eq!(notification.tags, "info");
    }
}
