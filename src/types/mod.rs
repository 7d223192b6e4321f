mod request;
mod reserve;

pub use request::TradeRequest;
pub use reserve::{ReserveType, TradeSide, reserve_id};

use alloy::primitives::{Address, B64, address};

/// Sentinel address representing the native asset.
pub const ETH_ADDRESS: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Order ID within a single order list.
/// IDs are allocated monotonically and never reused.
pub type OrderId = u32;

/// Reserve ID: type prefix byte followed by the leading address bytes.
pub type ReserveId = B64;

/// Fraction in basis points, see [`crate::num::BPS`].
pub type Bps = u64;

/// Returns `true` if the token is the native asset.
pub fn is_eth(token: Address) -> bool {
    token == ETH_ADDRESS
}

/// Instant in chain history the request is evaluated at.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct BlockContext {
    block_number: u64,
    block_timestamp: u64,
}

impl BlockContext {
    pub fn new(block_number: u64, block_timestamp: u64) -> Self {
        Self {
            block_number,
            block_timestamp,
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }
}
