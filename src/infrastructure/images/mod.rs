//! Image source over HTTP

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::application::errors::{BotError, PlatformError};
use crate::domain::entities::Attachment;
use crate::domain::traits::ImageSource;

const FILENAME: &str = "minky.jpg";

/// Fetches a random image from a URL that serves a new one per request
pub struct HttpImageSource {
    url: String,
    client: Client,
}

impl HttpImageSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Network(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Request URL with a cache-busting timestamp
    fn request_url(&self, now_ms: i64) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}cb={}", self.url, separator, now_ms)
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(&self) -> Result<Attachment, PlatformError> {
        let url = self.request_url(chrono::Utc::now().timestamp_millis());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: format!("image fetch from {} failed", self.url),
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;
        tracing::debug!("Fetched {} byte image from {}", data.len(), self.url);

        Ok(Attachment {
            filename: FILENAME.to_string(),
            data: data.to_vec(),
        })
    }
}
