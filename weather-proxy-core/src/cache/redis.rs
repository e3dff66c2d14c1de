use ::redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo,
    aio::ConnectionManager,
};
use async_trait::async_trait;
use std::{fmt, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

use super::WeatherCache;
use crate::{config::RedisConfig, error::CacheError};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
/// Minimum gap between connection attempts while Redis is down.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ConnState {
    conn: Option<ConnectionManager>,
    last_attempt: Option<Instant>,
}

/// Redis-backed cache. Entries are written with `SETEX` so Redis owns expiry.
///
/// The connection is opened lazily. While Redis is unreachable every call
/// fails fast with a [`CacheError`], and a new connection attempt is made at
/// most once per [`RECONNECT_INTERVAL`].
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    state: Arc<Mutex<ConnState>>,
    addr: String,
}

impl RedisCache {
    /// Build the cache and try a first connection. An unreachable server is
    /// logged, not returned; only invalid connection settings fail here.
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        let client = Client::open(connection_info(config)).map_err(CacheError::Connection)?;
        let cache = Self {
            client,
            state: Arc::new(Mutex::new(ConnState::default())),
            addr: format!("{}:{}", config.host, config.port),
        };

        if let Err(e) = cache.connection().await {
            tracing::warn!(
                addr = %cache.addr,
                error = %e,
                "redis unavailable, serving without cache until it reconnects"
            );
        }

        Ok(cache)
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let mut state = self.state.lock().await;
        if let Some(conn) = &state.conn {
            return Ok(conn.clone());
        }

        if state
            .last_attempt
            .is_some_and(|last| last.elapsed() < RECONNECT_INTERVAL)
        {
            return Err(CacheError::Unavailable);
        }
        state.last_attempt = Some(Instant::now());

        let conn = ConnectionManager::new_with_backoff_and_timeouts(
            self.client.clone(),
            2,
            100,
            1,
            RESPONSE_TIMEOUT,
            CONNECTION_TIMEOUT,
        )
        .await
        .map_err(CacheError::Connection)?;

        tracing::info!(addr = %self.addr, "redis connected");
        state.conn = Some(conn.clone());
        Ok(conn)
    }
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache").field("addr", &self.addr).finish()
    }
}

#[async_trait]
impl WeatherCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }
}

fn connection_info(config: &RedisConfig) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            password: config.password.clone(),
            ..Default::default()
        },
    }
}
