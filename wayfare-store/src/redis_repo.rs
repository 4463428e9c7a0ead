use redis::{AsyncCommands, RedisResult};
use tracing::debug;
use uuid::Uuid;
use wayfare_core::flight::CabinClass;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn booked_key(flight_id: Uuid, cabin: CabinClass) -> String {
    format!("flight:{}:booked:{}", flight_id, cabin)
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    // ========================================================================
    // Availability cache
    // ========================================================================

    pub async fn get_booked_seats(&self, flight_id: Uuid, cabin: CabinClass) -> RedisResult<Option<i64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(booked_key(flight_id, cabin)).await
    }

    pub async fn set_booked_seats(
        &self,
        flight_id: Uuid,
        cabin: CabinClass,
        booked: i64,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(booked_key(flight_id, cabin), booked, ttl_seconds).await
    }

    /// Drops every cached count for the flight. Called after a commit that claimed or released seats.
    pub async fn invalidate_flight(&self, flight_id: Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = CabinClass::ALL.iter().map(|c| booked_key(flight_id, *c)).collect();
        conn.del::<_, ()>(keys).await?;
        debug!(%flight_id, "Availability cache invalidated");
        Ok(())
    }

    // ========================================================================
    // Rate limiting
    // ========================================================================

    /// Fixed-window counter. Returns false once `limit` hits have been seen in the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
