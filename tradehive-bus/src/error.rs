use thiserror::Error;

/// All errors generated in the `tradehive-bus` module.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("bus is not connected to redis")]
    NotReady,

    #[error("failed to encode bus envelope: {0}")]
    Encode(#[from] serde_json::Error),
}
