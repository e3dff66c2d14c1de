use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::{
    error::UpstreamError,
    model::{LocationQuery, WeatherPayload},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Client for the Visual Crossing timeline API.
#[derive(Debug, Clone)]
pub struct VisualCrossingProvider {
    api_key: String,
    base_url: Url,
    http: Client,
}

impl VisualCrossingProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| UpstreamError::Configuration(format!("base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Configuration(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }

    /// `{base}/{a},{b}?unitGroup={unit}&key={api_key}`
    fn request_url(&self, query: &LocationQuery) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Configuration("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .push(&query.location.to_string());
        url.query_pairs_mut()
            .append_pair("unitGroup", query.unit.as_str())
            .append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingProvider {
    async fn fetch(&self, query: &LocationQuery) -> Result<WeatherPayload, UpstreamError> {
        let url = self.request_url(query)?;

        // The URL carries the API key, so strip it from transport errors.
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = res.status();
        let body = res.text().await.map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
