use thiserror::Error;

/// Failure kinds of the mutating ledger operations.
///
/// A call that returns one of these has left the ledger untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The debited account holds less than the requested amount.
    #[error("transfer amount exceeds balance")]
    InsufficientBalance,

    /// The spender was approved for less than the requested amount.
    #[error("insufficient allowance")]
    InsufficientAllowance,

    /// Transfers to the null account are rejected.
    #[error("transfer to the zero address")]
    InvalidRecipient,

    /// The null account is never a transfer source.
    #[error("transfer from the zero address")]
    InvalidSender,

    /// Only the issuer may mint.
    #[error("caller is not the issuer")]
    Unauthorized,

    /// The result would not fit in 256 bits.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("arrays length mismatch")]
    LengthMismatch,

    #[error("empty arrays")]
    EmptyBatch,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid account {0:?}: expected 20 bytes of hex")]
    InvalidAccount(String),

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("amount {0:?} has more than {1} fractional digits")]
    TooManyDecimals(String, u8),

    #[error("amount {0:?} does not fit in 256 bits")]
    AmountOverflow(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config value: {0}")]
    Value(#[from] ParseError),
}
