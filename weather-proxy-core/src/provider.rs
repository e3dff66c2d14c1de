use crate::{
    Config,
    error::UpstreamError,
    model::{LocationQuery, WeatherPayload},
    provider::visualcrossing::VisualCrossingProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod visualcrossing;

/// Source of truth for weather data.
///
/// Each call performs exactly one outbound request; retries are left to the
/// caller.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, query: &LocationQuery) -> Result<WeatherPayload, UpstreamError>;
}

/// Construct the upstream provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key()?;

    let provider = VisualCrossingProvider::new(
        api_key.to_owned(),
        &config.upstream.base_url,
        config.upstream.timeout(),
    )?;

    Ok(Arc::new(provider))
}
