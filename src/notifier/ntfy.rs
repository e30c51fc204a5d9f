use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use tracing::info;

use crate::error::NotifyError;
use crate::model::Notification;
use crate::notifier::Notifier;

/// Push notifications via an ntfy relay.
///
/// Wire format follows the ntfy publish API: the message body is posted as
/// raw UTF-8 text, title and tags travel as request headers.
pub struct NtfyNotifier {
    client: reqwest::Client,
    url: String,
}

impl NtfyNotifier {
    pub fn new(base_url: &str, topic: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/{topic}", base_url.trim_end_matches('/')),
        }
    }
}

impl Notifier for NtfyNotifier {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .header("Title", &notification.title)
                .header("Tags", &notification.tags)
                .body(notification.body.clone())
                .send()
                .await
                .change_context(NotifyError::Request)?;

            let status = response.status();
            if !status.is_success() {
                return Err(Report::new(NotifyError::Status {
                    status: status.as_u16(),
                }));
            }

            info!(title = %notification.title, "notification sent");
            Ok(())
        })
    }
}
