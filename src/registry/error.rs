use alloy::primitives::Address;
use thiserror::Error;

use crate::types::{ReserveId, ReserveType};

/// Error type for reserve registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("zero reserve address")]
    ZeroReserveAddress,

    #[error("zero reserve id")]
    ZeroReserveId,

    #[error("bad reserve type {reserve_type:?}")]
    BadReserveType { reserve_type: ReserveType },

    /// Fee paying policy table was never set.
    #[error("fee paying data not set")]
    FeePayingNotSet,

    #[error("reserve {address} already has id {id}")]
    ReserveHasId { address: Address, id: ReserveId },

    #[error("reserve id {id} taken by {address}")]
    ReserveIdTaken { id: ReserveId, address: Address },

    #[error("unknown reserve {address}")]
    UnknownReserve { address: Address },

    #[error("unknown reserve id {id}")]
    UnknownReserveId { id: ReserveId },

    #[error("zero token address")]
    ZeroToken,
}

/// Result type for reserve registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
