//! Error types for trade hints.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::types::ReserveId;

/// Error type for trade hint building and parsing.
///
/// Messages follow the revert reasons of the on-chain hint handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("invalid hint type {hint_type}")]
    InvalidHintType { hint_type: U256 },

    #[error("reserveIds and splits must be empty")]
    IdsAndSplitsMustBeEmpty,

    #[error("reserveIds cannot be empty")]
    EmptyReserveIds,

    #[error("splits must be empty")]
    SplitsMustBeEmpty,

    #[error("reserveIds.length != splits.length")]
    SplitsLengthMismatch { ids: usize, splits: usize },

    #[error("total BPS != 10000")]
    TotalBps { total: U256 },

    #[error("duplicate reserveId")]
    DuplicateReserveId { id: ReserveId },

    #[error("reserveIds not in increasing order")]
    NotIncreasing { id: ReserveId },

    #[error("reserveId not found")]
    ReserveIdNotFound { id: ReserveId },

    #[error("token is not listed for reserveId")]
    TokenNotListed { id: ReserveId, token: Address },

    /// ETH on both sides of a hinted trade.
    #[error("invalid hint pair {src} -> {dest}")]
    InvalidPair { src: Address, dest: Address },

    #[error("hint decode error: {0}")]
    Decode(String),
}

impl From<alloy_sol_types::Error> for HintError {
    fn from(value: alloy_sol_types::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// Result type for trade hint building and parsing.
pub type HintResult<T> = Result<T, HintError>;
