use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::Client;
use tracing::info;

pub type Redis = Client;

pub fn get_redis_client(redis_url: &str) -> Result<Redis> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Open a multiplexed connection that can be cloned across tasks.
pub async fn get_redis_connection(redis_url: &str) -> Result<MultiplexedConnection> {
    info!("Connecting to redis at: {}", redis_url);
    let client = get_redis_client(redis_url)?;
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(conn)
}
