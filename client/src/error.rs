//! Error taxonomy of the client.
//!
//! Validation and derivation errors never touch the network. Submission errors are surfaced
//! exactly once and never retried here; retry policy belongs to the caller. Cache errors live in
//! the cache entry they belong to.

use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
};
use thiserror::Error;

/// A bad argument, caught before any network interaction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be an integer, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("Seed {0} is outside [0, 2^64 - 1]")]
    SeedOutOfRange(i128),

    #[error("Listing name can't be empty")]
    EmptyName,

    #[error("Listing name is {len} bytes long, at most {max} are allowed")]
    NameTooLong { len: usize, max: usize },

    #[error("Amount must be a positive integer, got {0}")]
    NonPositiveAmount(i128),

    #[error("Amount {amount} exceeds the maximum of {max} for this instruction")]
    AmountOutOfRange { amount: u128, max: u128 },

    #[error("{0:?} isn't a valid address")]
    InvalidAddress(String),

    #[error("Mint {actual} doesn't belong to this listing, expected {expected}")]
    MintMismatch { expected: Pubkey, actual: Pubkey },

    #[error("Couldn't encode instruction data: {0}")]
    Encoding(String),
}

/// The PDA search ran out of bump seeds. Fatal for the given seed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("No valid {tag:?} address exists for seed {seed} under program {program_id}")]
pub struct DerivationError {
    pub tag: &'static str,
    pub seed: u64,
    pub program_id: Pubkey,
}

/// Failure while validating arguments or deriving addresses. Nothing was sent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum SubmissionErrorKind {
    /// Preflight simulation failed. Nothing was broadcast and no fee was spent.
    Simulation,
    /// The signer declined to sign.
    Rejected,
    /// Sending failed, or the transaction landed with an error.
    Broadcast,
    /// The transaction wasn't confirmed within the configured interval. It may still land.
    ConfirmationTimeout,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct SubmissionError {
    pub kind: SubmissionErrorKind,
    pub message: String,
    /// Set once the transaction has been handed to the network.
    pub signature: Option<Signature>,
}

impl SubmissionError {
    pub fn new(kind: SubmissionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            signature: None,
        }
    }

    pub fn simulation(message: impl Into<String>) -> Self {
        Self::new(SubmissionErrorKind::Simulation, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(SubmissionErrorKind::Rejected, message)
    }

    pub fn broadcast(message: impl Into<String>) -> Self {
        Self::new(SubmissionErrorKind::Broadcast, message)
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// A failed cache refetch. The entry keeps its last good snapshot alongside this error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Couldn't fetch from the ledger: {0}")]
    Fetch(String),
    #[error("Account {address} isn't a listing account: {reason}")]
    Decode { address: Pubkey, reason: String },
}

/// Everything a mutation can fail with.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("Another mutation of listing {listing} is still pending")]
    Busy { listing: Pubkey },
}

impl From<BuildError> for MutationError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Validation(e) => Self::Validation(e),
            BuildError::Derivation(e) => Self::Derivation(e),
        }
    }
}

impl MutationError {
    pub fn submission_kind(&self) -> Option<SubmissionErrorKind> {
        match self {
            Self::Submission(e) => Some(e.kind),
            _ => None,
        }
    }
}
