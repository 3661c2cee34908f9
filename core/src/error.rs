use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Invalid amount: {amount} (must be > 0)")]
    InvalidAmount { amount: f64 },

    #[error("Insufficient banked balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("Invalid pool: {0}")]
    InvalidPool(String),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComplianceError {
    /// Stable machine-readable kind, used by transports to map errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ComplianceError::InvalidInput(_)             => "invalid_input",
            ComplianceError::DivisionByZero(_)           => "division_by_zero",
            ComplianceError::InvalidAmount { .. }        => "invalid_amount",
            ComplianceError::InsufficientBalance { .. }  => "insufficient_balance",
            ComplianceError::InvalidPool(_)              => "invalid_pool",
            ComplianceError::Pool(_)                     => "pool_error",
            ComplianceError::NotFound { .. }             => "not_found",
            ComplianceError::Database(_)                 => "database",
            ComplianceError::Serialization(_)            => "serialization",
            ComplianceError::Other(_)                    => "other",
        }
    }

    /// True for business-rule and input failures the caller can act on,
    /// false for infrastructure faults.
    pub fn is_caller_error(&self) -> bool {
        !matches!(
            self,
            ComplianceError::Database(_)
                | ComplianceError::Serialization(_)
                | ComplianceError::Other(_)
        )
    }
}

pub type ComplianceResult<T> = Result<T, ComplianceError>;
