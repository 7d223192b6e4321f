use alloy::primitives::{Address, Bytes, U256};

use super::*;

/// Request to convert `src_qty` of `src` into `dest`.
///
/// The hint is kept in its encoded form and decoded once by the network,
/// see [`crate::hint`] for the encoding.
#[derive(Clone, derive_more::Debug)]
pub struct TradeRequest {
    src: Address,
    #[debug("{src_qty}")]
    src_qty: U256,
    dest: Address,
    dest_address: Address,
    #[debug("{max_dest_amount}")]
    max_dest_amount: U256,
    #[debug("{min_conversion_rate}")]
    min_conversion_rate: U256,
    platform_wallet: Address,
    platform_fee_bps: Bps,
    #[debug("{hint}")]
    hint: Bytes,
}

impl TradeRequest {
    /// Create a new trade request without a destination cap, minimum rate,
    /// platform fee or hint.
    pub fn new(src: Address, src_qty: U256, dest: Address, dest_address: Address) -> Self {
        Self {
            src,
            src_qty,
            dest,
            dest_address,
            max_dest_amount: U256::MAX,
            min_conversion_rate: U256::ZERO,
            platform_wallet: Address::ZERO,
            platform_fee_bps: 0,
            hint: Bytes::new(),
        }
    }

    /// Caps the amount of `dest` sent to the recipient; unused source is refunded.
    pub fn with_max_dest_amount(mut self, max_dest_amount: U256) -> Self {
        self.max_dest_amount = max_dest_amount;
        self
    }

    /// Fails the trade if the rate after all fees is below `min_conversion_rate`.
    pub fn with_min_conversion_rate(mut self, min_conversion_rate: U256) -> Self {
        self.min_conversion_rate = min_conversion_rate;
        self
    }

    /// Charges `platform_fee_bps` of the traded ETH value to `platform_wallet`.
    pub fn with_platform_fee(mut self, platform_wallet: Address, platform_fee_bps: Bps) -> Self {
        self.platform_wallet = platform_wallet;
        self.platform_fee_bps = platform_fee_bps;
        self
    }

    pub fn with_hint(mut self, hint: Bytes) -> Self {
        self.hint = hint;
        self
    }

    pub fn src(&self) -> Address {
        self.src
    }

    pub fn src_qty(&self) -> U256 {
        self.src_qty
    }

    pub fn dest(&self) -> Address {
        self.dest
    }

    pub fn dest_address(&self) -> Address {
        self.dest_address
    }

    pub fn max_dest_amount(&self) -> U256 {
        self.max_dest_amount
    }

    pub fn min_conversion_rate(&self) -> U256 {
        self.min_conversion_rate
    }

    pub fn platform_wallet(&self) -> Address {
        self.platform_wallet
    }

    pub fn platform_fee_bps(&self) -> Bps {
        self.platform_fee_bps
    }

    pub fn hint(&self) -> &Bytes {
        &self.hint
    }
}
