use chrono::{DateTime, Utc};

/// A single observed price sample. Produced by the market-data provider,
/// consumed on the tick that fetched it, never stored.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    #[allow(dead_code)]
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Result of evaluating a condition on one tick.
///
/// `DataUnavailable` means the check could not be performed (empty or
/// unusable price series); the caller treats it like `NotTriggered` and
/// retries on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Triggered,
    NotTriggered,
    DataUnavailable,
}

/// Push message built when a condition fires. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tags: String,
}
