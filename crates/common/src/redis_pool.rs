use redis::Client;
use redis::aio::ConnectionManager;

/// Connect to the Redis instance that holds cross-device notification claims.
///
/// The manager reconnects on its own, so one handle can be shared by every
/// surface built from a `SurfaceHub`.
pub async fn connect_claim_store(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis claim store");
    Ok(manager)
}
