//! Cache-aside orchestration.
//!
//! A request derives its [`CacheKey`], tries the cache, and on a miss asks the
//! provider and stores the result for [`CACHE_TTL`]. Cache failures in either
//! direction degrade to "no cache" and never fail the request. Concurrent
//! misses for the same key may each reach the provider; there is no request
//! coalescing.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    cache::WeatherCache,
    error::ProxyError,
    model::{CACHE_TTL, CacheKey, LocationQuery, WeatherPayload},
    provider::WeatherProvider,
    validate::WeatherParams,
};

#[derive(Debug, Clone)]
pub struct WeatherService {
    cache: Arc<dyn WeatherCache>,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(cache: Arc<dyn WeatherCache>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { cache, provider }
    }

    /// Validate raw parameters, then serve them via [`WeatherService::get_weather`].
    pub async fn handle(&self, params: &WeatherParams) -> Result<WeatherPayload, ProxyError> {
        let query = params.validate()?;
        self.get_weather(&query).await
    }

    pub async fn get_weather(&self, query: &LocationQuery) -> Result<WeatherPayload, ProxyError> {
        let key = query.cache_key();

        if let Some(payload) = self.read_cached(&key).await {
            return Ok(payload);
        }

        let payload = self
            .provider
            .fetch(query)
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "upstream fetch failed"))?;

        self.write_cached(&key, &payload).await;
        Ok(payload)
    }

    async fn read_cached(&self, key: &CacheKey) -> Option<WeatherPayload> {
        match self.cache.get(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(payload) => {
                    info!(key = %key, "cache hit");
                    Some(payload)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, fetching upstream");
                None
            }
        }
    }

    async fn write_cached(&self, key: &CacheKey, payload: &WeatherPayload) {
        let raw = match serde_json::to_string(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "payload not serializable, skipping cache write");
                return;
            }
        };

        match self.cache.set_with_ttl(key.as_str(), &raw, CACHE_TTL).await {
            Ok(()) => debug!(key = %key, ttl_secs = CACHE_TTL.as_secs(), "cached upstream payload"),
            Err(e) => warn!(key = %key, error = %e, "cache write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::MemoryCache,
        error::{CacheError, ErrorCategory, UpstreamError, ValidationError},
        model::Unit,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    fn redis_down() -> CacheError {
        CacheError::Command(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    #[derive(Debug, Default)]
    struct FakeCache {
        entries: Mutex<HashMap<String, String>>,
        writes: Mutex<Vec<(String, String, Duration)>>,
        gets: AtomicUsize,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl FakeCache {
        fn with_entry(key: &str, value: &str) -> Self {
            let cache = Self::default();
            cache
                .entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            cache
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl WeatherCache for FakeCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads {
                return Err(redis_down());
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_with_ttl(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string(), ttl));
            if self.fail_writes {
                return Err(redis_down());
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FakeProvider {
        payload: Option<WeatherPayload>,
        calls: AtomicUsize,
        seen: Mutex<Vec<LocationQuery>>,
    }

    impl FakeProvider {
        fn ok(payload: WeatherPayload) -> Self {
            Self {
                payload: Some(payload),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                payload: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch(&self, query: &LocationQuery) -> Result<WeatherPayload, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(query.clone());
            self.payload.clone().ok_or_else(|| UpstreamError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "down".into(),
            })
        }
    }

    fn service(cache: &Arc<FakeCache>, provider: &Arc<FakeProvider>) -> WeatherService {
        WeatherService::new(cache.clone(), provider.clone())
    }

    fn boston() -> LocationQuery {
        LocationQuery::by_name("Boston", "US", Unit::Metric)
    }

    #[tokio::test]
    async fn cold_cache_fetches_once_and_caches_for_an_hour() {
        let cache = Arc::new(FakeCache::default());
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 12.5 })));

        let got = service(&cache, &provider).get_weather(&boston()).await.unwrap();

        assert_eq!(got, json!({ "temp": 12.5 }));
        assert_eq!(provider.calls(), 1);

        let writes = cache.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (key, value, ttl) = &writes[0];
        assert_eq!(key, "Boston:US:metric");
        assert_eq!(serde_json::from_str::<WeatherPayload>(value).unwrap(), got);
        assert_eq!(*ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn warm_cache_skips_upstream() {
        let cache = Arc::new(FakeCache::with_entry("Boston:US:metric", r#"{"temp":20}"#));
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 99 })));

        let got = service(&cache, &provider).get_weather(&boston()).await.unwrap();

        assert_eq!(got, json!({ "temp": 20 }));
        assert_eq!(provider.calls(), 0);
        assert_eq!(cache.write_count(), 0);
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let cache = Arc::new(FakeCache::default());
        let provider = Arc::new(FakeProvider::ok(json!({ "days": [1, 2, 3] })));
        let svc = service(&cache, &provider);

        let first = svc.get_weather(&boston()).await.unwrap();
        let second = svc.get_weather(&boston()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.write_count(), 1);
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_and_not_cached() {
        let cache = Arc::new(FakeCache::default());
        let provider = Arc::new(FakeProvider::failing());

        let err = service(&cache, &provider)
            .get_weather(&boston())
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Upstream(UpstreamError::Status { .. })));
        assert_eq!(err.category(), ErrorCategory::ServerError);
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.write_count(), 0);
    }

    #[tokio::test]
    async fn cache_read_failure_falls_through_to_upstream() {
        let cache = Arc::new(FakeCache {
            fail_reads: true,
            ..Default::default()
        });
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 1 })));

        let got = service(&cache, &provider).get_weather(&boston()).await.unwrap();

        assert_eq!(got, json!({ "temp": 1 }));
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.write_count(), 1);
    }

    #[tokio::test]
    async fn cache_write_failure_still_returns_payload() {
        let cache = Arc::new(FakeCache {
            fail_writes: true,
            ..Default::default()
        });
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 2 })));

        let got = service(&cache, &provider).get_weather(&boston()).await.unwrap();

        assert_eq!(got, json!({ "temp": 2 }));
        assert_eq!(cache.write_count(), 1);
    }

    #[tokio::test]
    async fn unreadable_cache_entry_is_refetched_and_replaced() {
        let cache = Arc::new(FakeCache::with_entry("Boston:US:metric", "not json"));
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 3 })));

        let got = service(&cache, &provider).get_weather(&boston()).await.unwrap();

        assert_eq!(got, json!({ "temp": 3 }));
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            cache.entries.lock().unwrap().get("Boston:US:metric").map(String::as_str),
            Some(r#"{"temp":3}"#)
        );
    }

    #[tokio::test]
    async fn invalid_params_touch_no_collaborator() {
        let cache = Arc::new(FakeCache::default());
        let provider = Arc::new(FakeProvider::ok(json!({})));

        let err = service(&cache, &provider)
            .handle(&WeatherParams {
                city: Some("Boston".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProxyError::Validation(ValidationError::MissingLocation)
        ));
        assert_eq!(err.category(), ErrorCategory::BadRequest);
        assert_eq!(cache.gets.load(Ordering::SeqCst), 0);
        assert_eq!(cache.write_count(), 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn handle_passes_unit_to_upstream_and_key() {
        let cache = Arc::new(FakeCache::default());
        let provider = Arc::new(FakeProvider::ok(json!({})));

        service(&cache, &provider)
            .handle(&WeatherParams {
                latitude: Some("42.36".into()),
                longitude: Some("-71.06".into()),
                unit: Some("us".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].unit, Unit::Us);
        assert_eq!(cache.writes.lock().unwrap()[0].0, "42.36:-71.06:us");
    }

    #[tokio::test]
    async fn round_trips_through_memory_cache() {
        let cache = Arc::new(MemoryCache::new());
        let payload = json!({ "address": "Boston,US", "days": [{ "tempmax": 21.3, "conditions": "Clear" }] });
        let provider = Arc::new(FakeProvider::ok(payload.clone()));
        let svc = WeatherService::new(cache, provider.clone());

        assert_eq!(svc.get_weather(&boston()).await.unwrap(), payload);
        assert_eq!(svc.get_weather(&boston()).await.unwrap(), payload);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn unreachable_redis_still_serves_from_upstream() {
        let cache = crate::cache::RedisCache::connect(&crate::config::RedisConfig {
            host: "127.0.0.1".into(),
            port: 1,
            password: None,
        })
        .await
        .unwrap();
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 7 })));
        let svc = WeatherService::new(Arc::new(cache), provider.clone());

        assert_eq!(svc.get_weather(&boston()).await.unwrap(), json!({ "temp": 7 }));
        assert_eq!(svc.get_weather(&boston()).await.unwrap(), json!({ "temp": 7 }));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_are_independent() {
        let cache = Arc::new(FakeCache::default());
        let provider = Arc::new(FakeProvider::ok(json!({ "temp": 5 })));
        let svc = service(&cache, &provider);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    let q = LocationQuery::by_coordinates(i.to_string(), "0", Unit::Metric);
                    svc.get_weather(&q).await
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), json!({ "temp": 5 }));
        }
        assert_eq!(provider.calls(), 16);
        assert_eq!(cache.write_count(), 16);
    }
}
