use thiserror::Error;
use zkdeposit::Digest;

use crate::account::Address;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reasons a ledger transaction is rejected. A rejected transaction leaves
/// no trace in contract state or balances.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("authorization failed: {0}")]
    AuthorizationError(String),

    #[error("contract already initialized")]
    AlreadyInitialized,

    #[error("contract not initialized")]
    NotInitialized,

    #[error("contract already deployed")]
    AlreadyDeployed,

    #[error("contract not deployed")]
    NotDeployed,

    #[error("proof verification failed: {0}")]
    InvalidProof(String),

    #[error("stored root {expected} does not match proof pre-root {found}")]
    RootMismatch { expected: Digest, found: Digest },

    #[error("witness does not reproduce the stored root")]
    WitnessMismatch,

    /// Each transaction must carry the next nonce of its originating account
    #[error("bad nonce: expected {expected}, found {found}")]
    InvalidNonce { expected: u64, found: u64 },

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("balance of {0} would overflow")]
    BalanceOverflow(Address),

    #[error("unknown account {0}")]
    UnknownAccount(Address),

    #[error("stored root changed: expected {expected}, found {found}")]
    StaleState { expected: Digest, found: Digest },

    #[error("verification key does not match ledger config: {0}")]
    ConfigMismatch(String),
}

impl LedgerError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::AuthorizationError(msg.into())
    }
}
