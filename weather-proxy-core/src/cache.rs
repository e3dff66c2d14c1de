use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{config::Config, error::CacheError};

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Key-value store holding serialized weather payloads.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait WeatherCache: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Construct the cache backend described by `config`.
///
/// Falls back to an in-process [`MemoryCache`] when no Redis section is set.
/// An unreachable Redis server does not fail construction; the returned cache
/// reports errors until it can connect.
pub async fn cache_from_config(config: &Config) -> Result<Arc<dyn WeatherCache>, CacheError> {
    match &config.redis {
        Some(redis) => {
            let cache = RedisCache::connect(redis).await?;
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("no redis configured, using in-process cache");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}
