use std::time::Duration;

use parking_lot::Mutex;
use redis::{Client, Connection, RedisError};

use super::{Store, StoreError};

/// Redis-backed cache.
///
/// Holds at most one connection, opened on first use and dropped whenever
/// the server stops answering, so the next call reconnects. Every socket
/// operation is bounded by the configured timeout.
pub struct RedisStore {
    client: Client,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Parse `url` (`redis://host:port/db`). No connection is made yet.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url)
            .map_err(|err| StoreError::backend(format!("invalid redis url: {err}")))?;
        Ok(Self {
            client,
            timeout,
            conn: Mutex::new(None),
        })
    }

    fn connect(&self) -> Result<Connection, RedisError> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        tracing::debug!("connected to redis");
        Ok(conn)
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, RedisError>,
    ) -> Result<T, StoreError> {
        let mut slot = self.conn.lock();
        if slot.is_none() {
            *slot = Some(self.connect().map_err(map_error)?);
        }
        let Some(conn) = slot.as_mut() else {
            return Err(StoreError::unavailable("redis connection missing"));
        };

        op(conn).map_err(|err| {
            if is_connection_error(&err) {
                *slot = None;
            }
            map_error(err)
        })
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
}

fn map_error(err: RedisError) -> StoreError {
    if is_connection_error(&err) {
        StoreError::unavailable(err.to_string())
    } else {
        StoreError::backend(err.to_string())
    }
}

impl Store for RedisStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_connection(|conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        self.with_connection(|conn| {
            redis::cmd("SETEX")
                .arg(key)
                .arg(seconds)
                .arg(value)
                .query(conn)
        })
    }

    fn available(&self) -> bool {
        match self.with_connection(|conn| redis::cmd("PING").query::<String>(conn)) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "redis ping failed");
                false
            }
        }
    }
}
