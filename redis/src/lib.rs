//! Redis-based live check-in store.
//!
//! # Architecture
//!
//! Each event owns two keys:
//! - **Checked-in set**: `event:{event_id}:checkedIn` → person ids
//! - **Time map**: `event:{event_id}:checkInTimes` → person id → ISO-8601 timestamp
//!
//! No other keyspace is used and nothing expires; state is removed by
//! checkout or by [`CheckInStore::purge`] when the event is deleted.
//! Writes touching both keys run as an atomic pipeline.
//!
//! # Example
//!
//! ```no_run
//! use youthgroup_redis::RedisCheckInStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisCheckInStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use youthgroup_core::checkin::{CheckInState, format_check_in_time};
use youthgroup_core::stores::{CheckInStore, StoreFuture};
use youthgroup_core::{Result, YouthGroupError};

/// Key of the checked-in set for an event.
#[must_use]
pub fn checked_in_key(event_id: i64) -> String {
    format!("event:{event_id}:checkedIn")
}

/// Key of the check-in time map for an event.
#[must_use]
pub fn check_in_times_key(event_id: i64) -> String {
    format!("event:{event_id}:checkInTimes")
}

/// Live check-in state in Redis.
///
/// Clones share the underlying `ConnectionManager`, which reconnects on
/// its own after transient failures.
#[derive(Clone)]
pub struct RedisCheckInStore {
    conn_manager: ConnectionManager,
}

impl RedisCheckInStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns an ephemeral store error if the URL is invalid or the
    /// initial connection fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            YouthGroupError::ephemeral(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            YouthGroupError::ephemeral(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::info!("Connected to Redis check-in store");
        Ok(Self { conn_manager })
    }
}

fn parse_ids(event_id: i64, members: Vec<String>) -> BTreeSet<i64> {
    members
        .into_iter()
        .filter_map(|member| match member.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(event_id, member = %member, "Ignoring non-numeric check-in member");
                None
            }
        })
        .collect()
}

impl CheckInStore for RedisCheckInStore {
    fn check_in(&self, event_id: i64, person_id: i64, at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let timestamp = format_check_in_time(at);

            let _: () = redis::pipe()
                .atomic()
                .sadd(checked_in_key(event_id), person_id)
                .ignore()
                .hset(check_in_times_key(event_id), person_id, &timestamp)
                .ignore()
                .query_async(&mut conn)
                .await
                .map_err(|e| YouthGroupError::ephemeral(format!("Failed to record check-in: {e}")))?;

            tracing::debug!(event_id, person_id, timestamp = %timestamp, "Recorded check-in in Redis");
            Ok(())
        })
    }

    fn check_out(&self, event_id: i64, person_id: i64) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();

            let (removed,): (i64,) = redis::pipe()
                .atomic()
                .srem(checked_in_key(event_id), person_id)
                .hdel(check_in_times_key(event_id), person_id)
                .ignore()
                .query_async(&mut conn)
                .await
                .map_err(|e| YouthGroupError::ephemeral(format!("Failed to remove check-in: {e}")))?;

            Ok(removed > 0)
        })
    }

    fn list_checked_in(&self, event_id: i64) -> StoreFuture<'_, CheckInState> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();

            let members: Vec<String> = conn
                .smembers(checked_in_key(event_id))
                .await
                .map_err(|e| YouthGroupError::ephemeral(format!("Failed to read check-ins: {e}")))?;
            let raw_times: HashMap<String, String> = conn
                .hgetall(check_in_times_key(event_id))
                .await
                .map_err(|e| {
                    YouthGroupError::ephemeral(format!("Failed to read check-in times: {e}"))
                })?;

            let person_ids = parse_ids(event_id, members);
            let times: BTreeMap<i64, String> = raw_times
                .into_iter()
                .filter_map(|(person, time)| person.parse::<i64>().ok().map(|id| (id, time)))
                .collect();

            Ok(CheckInState { person_ids, times })
        })
    }

    fn purge(&self, event_id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();

            let removed: i64 = conn
                .del(vec![checked_in_key(event_id), check_in_times_key(event_id)])
                .await
                .map_err(|e| YouthGroupError::ephemeral(format!("Failed to purge check-ins: {e}")))?;

            tracing::info!(event_id, keys_removed = removed, "Purged live check-in state");
            Ok(())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| YouthGroupError::ephemeral(format!("Redis ping failed: {e}")))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_event_naming() {
        assert_eq!(checked_in_key(12), "event:12:checkedIn");
        assert_eq!(check_in_times_key(12), "event:12:checkInTimes");
    }

    #[test]
    fn non_numeric_members_are_skipped() {
        let ids = parse_ids(1, vec!["3".to_string(), "x".to_string(), "1".to_string()]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
