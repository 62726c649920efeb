/// OMDb API provider
///
/// One GET per lookup against the configured base URL with the IMDb id, full
/// plot and JSON output. The full response object is passed through untouched,
/// including OMDb's own `"Response": "False"` payloads for unknown ids.
use crate::{
    error::{AppError, AppResult},
    models::ImdbId,
    services::providers::{MetadataObject, MetadataProvider},
};
use reqwest::Client as HttpClient;
use std::time::Duration;

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl OmdbProvider {
    /// Creates a provider; `timeout` bounds each lookup when set
    pub fn new(api_key: String, api_url: String, timeout: Option<Duration>) -> AppResult<Self> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
            api_key,
            api_url,
        })
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OmdbProvider {
    async fn lookup(&self, imdb_id: &ImdbId) -> AppResult<MetadataObject> {
        let imdb_id = imdb_id.to_string();

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("i", imdb_id.as_str()),
                ("plot", "full"),
                ("r", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDb returned status {}: {}",
                status, body
            )));
        }

        match response.json::<serde_json::Value>().await? {
            serde_json::Value::Object(details) => {
                tracing::debug!(imdb_id = %imdb_id, provider = "omdb", "Metadata fetched");
                Ok(details)
            }
            other => Err(AppError::ExternalApi(format!(
                "OMDb returned a non-object response: {}",
                other
            ))),
        }
    }
}
