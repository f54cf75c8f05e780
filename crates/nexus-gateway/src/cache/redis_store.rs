//! Shared key/value store backed by Redis.

use std::time::Duration;

use async_trait::async_trait;
use nexus_core::{CacheError, KeyValueStore};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, RedisError};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Process-wide Redis handle, connected lazily on first use.
///
/// Reconnection after a dropped connection is left to the
/// [`ConnectionManager`]; this type only logs what happens. Both the connect
/// and every command are bounded by `timeout`, so an unresponsive server
/// degrades a lookup instead of stalling it.
pub struct RedisStore {
    client: redis::Client,
    timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// Parses the URL. No connection is made until the first command.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::connection(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            connection: OnceCell::new(),
        })
    }

    fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_connection_timeout(self.timeout)
            .set_response_timeout(self.timeout)
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.connection
            .get_or_try_init(|| async {
                info!(timeout_ms = self.timeout.as_millis() as u64, "Connecting to cache");
                match ConnectionManager::new_with_config(self.client.clone(), self.manager_config())
                    .await
                {
                    Ok(manager) => {
                        info!("Cache connected");
                        Ok(manager)
                    },
                    Err(e) => {
                        error!(error = %e, "Cache connection failed");
                        Err(CacheError::connection(e.to_string()))
                    },
                }
            })
            .await
            .cloned()
    }

    /// Runs an arbitrary command, for collaborators that need more than
    /// GET/SET (sliding-window counters, scripts).
    pub async fn command(&self, cmd: &redis::Cmd) -> Result<redis::Value, CacheError> {
        let mut conn = self.connection().await?;
        let value: redis::Value = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| command_error("RAW", e))?;
        Ok(value)
    }
}

fn command_error(command: &str, e: RedisError) -> CacheError {
    if e.is_connection_dropped() || e.is_io_error() || e.is_timeout() {
        warn!(command, error = %e, "Cache connection lost, waiting for reconnect");
        CacheError::connection(e.to_string())
    } else {
        error!(command, error = %e, "Cache command failed");
        CacheError::command(command, e.to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| command_error("GET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let result = match ttl {
            // SET EX rounds down; keep at least one second.
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                    .await
            },
            // A plain SET also discards any previous expiry.
            None => conn.set::<_, _, ()>(key, value).await,
        };
        result.map_err(|e| command_error("SET", e))
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[test]
    fn test_open_rejects_invalid_url() {
        assert!(matches!(
            RedisStore::open("not-a-url", TIMEOUT),
            Err(CacheError::Connection(_))
        ));
    }

    #[test]
    fn test_open_is_lazy() {
        // Nothing listens here; opening must still succeed.
        let store = RedisStore::open("redis://127.0.0.1:1", TIMEOUT).unwrap();
        assert_eq!(store.name(), "redis");
        assert_eq!(store.timeout, TIMEOUT);
        assert!(store.connection.get().is_none());
    }

    #[tokio::test]
    async fn test_silent_server_fails_within_timeout() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let store = RedisStore::open(&format!("redis://{addr}"), TIMEOUT).unwrap();

        // Generous bound: the manager retries its first connect a few times,
        // each attempt capped by TIMEOUT. Without a response timeout this
        // never returns.
        let result = tokio::time::timeout(Duration::from_secs(30), store.get("customer:c1"))
            .await
            .expect("cache lookup was not bounded by the configured timeout");
        assert!(matches!(result, Err(CacheError::Connection(_))));

        let raw = tokio::time::timeout(
            Duration::from_secs(30),
            store.command(&redis::cmd("PING")),
        )
        .await
        .expect("raw command was not bounded by the configured timeout");
        assert!(raw.is_err());
    }
}
