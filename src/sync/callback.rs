use crate::config::CallbackConfig;
use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;

/// Body posted to the notification hook after a batch is indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchNotification<'a> {
    pub collection: &'a str,
    pub batch_start: usize,
    pub batch_size: usize,
    pub added: usize,
}

/// Best-effort HTTP hook. Nothing it does can fail the run.
#[derive(Clone)]
pub struct CallbackNotifier {
    http: Client,
    config: CallbackConfig,
}

impl CallbackNotifier {
    pub fn new(config: CallbackConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent("typesense-sync/0.1")
            .build()?;
        Ok(Self { http, config })
    }

    /// Skipped when the batch added nothing.
    pub async fn notify(&self, notification: &BatchNotification<'_>) {
        if notification.added == 0 {
            debug!(
                "callback: batch {} added no documents, not notifying",
                notification.batch_start
            );
            return;
        }

        let mut request = self.http.post(&self.config.url).json(notification);
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    "callback: notified {} for batch {}",
                    self.config.url, notification.batch_start
                );
            }
            Ok(response) => warn!(
                "callback: {} returned {} for batch {}",
                self.config.url,
                response.status(),
                notification.batch_start
            ),
            Err(err) => warn!(
                "callback: POST to {} failed for batch {}: {err}",
                self.config.url, notification.batch_start
            ),
        }
    }
}
