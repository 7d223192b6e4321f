use alloy::primitives::U256;

use super::{EngineError, EngineResult};
use crate::{
    num::{BPS, apply_bps},
    types::Bps,
};

/// Rejects fee settings that would take the whole trade.
///
/// The network fee counts twice since a token to token trade pays it on
/// both legs.
pub fn validate_fees(network_fee_bps: Bps, platform_fee_bps: Bps) -> EngineResult<()> {
    if platform_fee_bps > BPS {
        return Err(EngineError::PlatformFeeHigh { platform_fee_bps });
    }
    let network = u128::from(network_fee_bps) * 2;
    if network >= u128::from(BPS) {
        return Err(EngineError::NetworkFeeHigh { network_fee_bps });
    }
    if network + u128::from(platform_fee_bps) >= u128::from(BPS) {
        return Err(EngineError::FeesHigh {
            network_fee_bps,
            platform_fee_bps,
        });
    }
    Ok(())
}

/// Network fee charged on `trade_wei` when `fee_paying_bps` of it went
/// through fee paying reserves.
pub fn network_fee_wei(trade_wei: U256, network_fee_bps: Bps, fee_paying_bps: Bps) -> U256 {
    apply_bps(apply_bps(trade_wei, network_fee_bps), fee_paying_bps)
}

pub fn platform_fee_wei(trade_wei: U256, platform_fee_bps: Bps) -> U256 {
    apply_bps(trade_wei, platform_fee_bps)
}
