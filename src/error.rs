use thiserror::Error;

/// Errors raised while loading pools or evaluating pool math
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("token {token} is not part of pool {pool_id}")]
    InvalidToken { pool_id: String, token: String },

    #[error("unknown pool: {0}")]
    UnknownPool(String),

    #[error("duplicate pool id in snapshot: {0}")]
    DuplicatePool(String),

    #[error("unsupported pool type '{pool_type}' for pool {pool_id}")]
    UnsupportedPoolType { pool_id: String, pool_type: String },

    #[error("pool {0} is missing the {1} parameter")]
    MissingParameter(String, &'static str),

    #[error("pair data of pool {0} does not match the pool type")]
    PairDataMismatch(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("invariant did not converge for pool {0}")]
    InvariantDidNotConverge(String),

    #[error("amount exceeds available balance of pool {0}")]
    InsufficientBalance(String),

    #[error("invalid pool snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("invalid configuration value for {key}: {value}")]
    Config { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, RouterError>;
