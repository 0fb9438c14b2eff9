use thiserror::Error;
use tradehive_exchange::ExchangeError;
use tradehive_persistence::PersistenceError;

/// Errors raised from inside a strategy worker's tick loop (§4.4, §7).
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("exchange rate-limited, backing off")]
    RateLimited,

    #[error("exchange banned this client, worker cannot continue")]
    IpBanned,

    #[error("transient worker error: {0}")]
    Transient(String),

    #[error("exchange configuration/auth error: {0}")]
    ConfigAuth(String),

    #[error("strategy capability not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("worker configuration invalid: {0}")]
    InvalidConfig(String),
}

impl From<ExchangeError> for WorkerError {
    fn from(error: ExchangeError) -> Self {
        match error {
            ExchangeError::RateLimited => WorkerError::RateLimited,
            ExchangeError::IpBanned => WorkerError::IpBanned,
            ExchangeError::AlreadyGone(msg) => WorkerError::Transient(msg),
            ExchangeError::Transient(msg) => WorkerError::Transient(msg),
            ExchangeError::ConfigAuth(msg) => WorkerError::ConfigAuth(msg),
        }
    }
}

/// Errors raised from the agent manager's registry operations (§4.6).
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("agent {0} is already running")]
    AlreadyRunning(i64),

    #[error("agent {0} is not tracked as running")]
    NotRunning(i64),

    #[error("no strategy factory registered for kind '{0}'")]
    UnknownStrategyKind(String),

    #[error("exchange client is not ready")]
    ExchangeNotReady,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}
