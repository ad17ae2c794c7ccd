use std::time::Duration;

use solana_client::client_error::ClientError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::SignerError;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("account not found: {0}")]
    NotFound(Pubkey),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to decode {kind} at {address}: {reason}")]
    Decode {
        kind: &'static str,
        address: Pubkey,
        reason: String,
    },

    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("failed to encode instruction arguments: {0}")]
    Encode(#[from] std::io::Error),
}

/// Raised before any network interaction.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("`{field}` exceeds maximum length of {max} bytes (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("decimals must be between 0 and {max}, got {got}")]
    InvalidDecimals { got: u8, max: u8 },

    #[error("amount overflow")]
    AmountOverflow,

    #[error("invalid amount `{0}`")]
    InvalidAmount(String),

    #[error("too many decimal places for a token with {0} decimals")]
    TooManyDecimals(u8),

    #[error("`{0}` must be greater than zero")]
    ZeroAmount(&'static str),

    #[error("`{0}` cannot be the default address")]
    NullAuthority(&'static str),

    #[error("transfer hook program is required when the transfer hook is enabled")]
    MissingTransferHookProgram,

    #[error("transaction has no instructions")]
    EmptyBatch,

    #[error("required signer {0} was not provided")]
    MissingSigner(Pubkey),
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DerivationError {
    #[error("no valid bump seed found for program {program_id}")]
    ExhaustedSearchSpace { program_id: Pubkey },
}

#[derive(Debug, ThisError)]
pub enum SubmissionError {
    #[error("rejected by network: {0}")]
    RejectedByNetwork(String),

    #[error("simulation failed: {message}")]
    SimulationFailed { message: String, logs: Vec<String> },

    #[error("transaction {signature} not confirmed after {waited:?}")]
    Timeout {
        signature: Signature,
        waited: Duration,
    },

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed {
        signature: Signature,
        reason: String,
    },

    /// Broadcast succeeded but the status query did not. The transaction may
    /// still land; poll `signature` to find out.
    #[error("transaction {signature} was sent but its status could not be read: {source}")]
    ConfirmationUnavailable {
        signature: Signature,
        source: LedgerError,
    },
}

impl SubmissionError {
    /// Present once the transaction has been broadcast.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::RejectedByNetwork(_) | Self::SimulationFailed { .. } => None,
            Self::Timeout { signature, .. }
            | Self::TransactionFailed { signature, .. }
            | Self::ConfirmationUnavailable { signature, .. } => Some(signature),
        }
    }
}

/// Transport-level failure talking to the ledger. Distinct from an account
/// simply not existing.
#[derive(Debug, ThisError)]
pub enum LedgerError {
    #[error(transparent)]
    Rpc(#[from] Box<ClientError>),

    #[error("{0}")]
    Other(String),
}

impl From<ClientError> for LedgerError {
    fn from(error: ClientError) -> Self {
        Self::Rpc(Box::new(error))
    }
}
