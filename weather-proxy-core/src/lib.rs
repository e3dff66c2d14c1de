//! Core library for the `weather-proxy` service.
//!
//! This crate defines:
//! - Location validation and cache-key derivation
//! - The cache-aside [`WeatherService`] orchestrator
//! - Abstractions over the cache and the upstream weather provider
//! - Configuration & error types
//!
//! It is used by the `weather-proxy` binary, but the service can be embedded
//! in any async runtime with its own cache and provider implementations.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod validate;

pub use cache::{MemoryCache, RedisCache, WeatherCache, cache_from_config};
pub use config::{Config, RedisConfig, ServerConfig, UpstreamConfig};
pub use error::{CacheError, ErrorCategory, ProxyError, UpstreamError, ValidationError};
pub use model::{CACHE_TTL, CacheKey, Location, LocationQuery, Unit, WeatherPayload};
pub use provider::{WeatherProvider, provider_from_config, visualcrossing::VisualCrossingProvider};
pub use service::WeatherService;
pub use validate::WeatherParams;
