//! HTTP client for the school events API.

use domain::models::{MonthYearKey, RemoteEvent};
use domain::services::{EventSource, EventSourceError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::RemoteConfig;

/// The events API answers either with a `{"data": [...]}` envelope or a
/// bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventsPayload {
    Envelope { data: Vec<RemoteEvent> },
    Bare(Vec<RemoteEvent>),
}

pub(crate) fn parse_events_payload(body: &str) -> Result<Vec<RemoteEvent>, EventSourceError> {
    match serde_json::from_str::<EventsPayload>(body) {
        Ok(EventsPayload::Envelope { data }) | Ok(EventsPayload::Bare(data)) => Ok(data),
        Err(e) => Err(EventSourceError::InvalidResponse(e.to_string())),
    }
}

/// `GET {base}/api/eventos?Mes=<m>&Anio=<y>`.
pub struct HttpEventSource {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpEventSource {
    pub fn new(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.events_base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self) -> String {
        format!("{}/api/eventos", self.base_url)
    }
}

#[async_trait::async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_month(&self, key: &MonthYearKey) -> Result<Vec<RemoteEvent>, EventSourceError> {
        let url = self.url();
        debug!(url = %url, month = %key, "Fetching remote events");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("Mes", key.month().to_string()),
                ("Anio", key.year().to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EventSourceError::Unavailable(format!(
                        "Request timeout after {}ms",
                        self.timeout_ms
                    ))
                } else {
                    EventSourceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventSourceError::Unavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EventSourceError::InvalidResponse(e.to_string()))?;
        parse_events_payload(&body)
    }
}
