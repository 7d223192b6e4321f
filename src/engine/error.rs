use alloy::primitives::Address;
use thiserror::Error;

use crate::{hint::HintError, num::RateError, types::Bps};

/// Error type for rate aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("src and dest are both {token}")]
    SameToken { token: Address },

    #[error("platform fee {platform_fee_bps} bps too high")]
    PlatformFeeHigh { platform_fee_bps: Bps },

    #[error("network fee {network_fee_bps} bps too high")]
    NetworkFeeHigh { network_fee_bps: Bps },

    #[error("fees too high: network {network_fee_bps} bps, platform {platform_fee_bps} bps")]
    FeesHigh {
        network_fee_bps: Bps,
        platform_fee_bps: Bps,
    },

    #[error("mask out of {masked} reserves, only {available} listed")]
    MaskOutTooLong { masked: usize, available: usize },

    #[error("negligible rate diff {bps} bps too high")]
    NegligibleRateDiffHigh { bps: Bps },

    #[error("hint error: {0}")]
    Hint(#[from] HintError),

    #[error("rate math error: {0}")]
    Rate(#[from] RateError),
}

/// Result type for rate aggregation.
pub type EngineResult<T> = Result<T, EngineError>;
