//! Fire-and-forget event publishing.

use std::time::Duration;

use reqwest::Client;
use roomproto::Event;

/// Accepts state-change and error events. Never blocks the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);
}

/// Writes events to the log (default when no event router is configured).
pub struct LogPublisher;

impl EventPublisher for LogPublisher {
    fn publish(&self, event: Event) {
        if event.is_error() {
            tracing::warn!(
                device = %event.device,
                key = %event.key,
                value = %event.value,
                requestor = %event.requestor,
                "error event"
            );
        } else {
            tracing::info!(
                device = %event.device,
                key = %event.key,
                value = %event.value,
                requestor = %event.requestor,
                "state event"
            );
        }
    }
}

/// POSTs events as JSON to an event router.
///
/// Each event goes out on its own task; delivery failures are logged and
/// dropped.
pub struct HttpEventPublisher {
    client: Client,
    url: String,
}

impl HttpEventPublisher {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl EventPublisher for HttpEventPublisher {
    fn publish(&self, event: Event) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(device = %event.device, "no runtime to publish event on, dropping");
            return;
        };

        let request = self.client.post(&self.url).json(&event);
        let url = self.url.clone();
        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(url = %url, status = %response.status(), "event router rejected event");
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to publish event");
                }
            }
        });
    }
}
