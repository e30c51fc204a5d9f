pub mod ntfy;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::NotifyError;
use crate::model::Notification;

/// Sink for push notifications.
pub trait Notifier: Send + Sync {
    /// Deliver a single notification. The scheduler logs a failure and moves
    /// on; delivery is never retried.
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> BoxFuture<'a, Result<(), Report<NotifyError>>>;
}
