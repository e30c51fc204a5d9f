use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::condition::Condition;
use crate::market::MarketData;
use crate::model::Outcome;
use crate::notifier::Notifier;

/// Sequential polling loop over a fixed set of one-shot conditions.
///
/// One tick evaluates every not-yet-fired condition in order, delivers a
/// notification for each new trigger, and marks it fired. The loop ends when
/// every condition has fired or `cancel` is triggered.
pub struct AlertScheduler {
    tick_interval: Duration,
    error_cooldown: Duration,
}

impl AlertScheduler {
    pub fn new(tick_interval: Duration, error_cooldown: Duration) -> Self {
        Self {
            tick_interval,
            error_cooldown,
        }
    }

    /// Run to completion, returning the conditions with their final `fired`
    /// flags. Cancellation interrupts the between-tick sleep promptly.
    pub async fn run(
        self,
        mut conditions: Vec<Condition>,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
        cancel: CancellationToken,
    ) -> Vec<Condition> {
        loop {
            let pass = AssertUnwindSafe(tick(&mut conditions, market.as_ref(), notifier.as_ref()));
            let delay = match pass.catch_unwind().await {
                Ok(()) => self.tick_interval,
                Err(_) => {
                    error!("unexpected failure in scheduler tick, backing off before retry");
                    self.error_cooldown
                }
            };

            if conditions.iter().all(|c| c.fired) {
                info!("all alerts have been triggered, monitor finished");
                return conditions;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("monitor stopped by operator");
                    return conditions;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// One evaluate-all-conditions pass. A failure in one condition's check is
/// logged and does not affect the remaining conditions in the same pass.
async fn tick(conditions: &mut [Condition], market: &dyn MarketData, notifier: &dyn Notifier) {
    let now = Utc::now();

    for condition in conditions.iter_mut().filter(|c| !c.fired) {
        match condition.evaluate(market, now).await {
            Ok(Outcome::Triggered) => {
                let notification = condition.notification();
                if let Err(report) = notifier.send(&notification).await {
                    // Fired even when delivery fails; failed sends are not retried.
                    error!(
                        condition = %condition.name,
                        error = ?report,
                        "notification delivery failed, alert lost"
                    );
                }
                condition.fired = true;
                info!(condition = %condition.name, "alert fired");
            }
            Ok(Outcome::NotTriggered | Outcome::DataUnavailable) => {}
            Err(report) => {
                warn!(
                    condition = %condition.name,
                    error = ?report,
                    "condition check failed, will retry next tick"
                );
            }
        }
    }
}
