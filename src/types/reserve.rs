use alloy::primitives::Address;

use super::ReserveId;

/// Kind of liquidity source behind a reserve.
///
/// * [`ReserveType::Fpr`] is a fed price reserve, rates are set by its operator.
/// * [`ReserveType::Apr`] is an automated price reserve, rates follow its inventory.
/// * [`ReserveType::Bridge`] adapts an external liquidity source.
/// * [`ReserveType::Utility`] and [`ReserveType::Custom`] are operator defined.
/// * [`ReserveType::Orderbook`] matches against resting maker orders.
///
/// [`ReserveType::None`] is a placeholder and can never be registered.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ReserveType {
    #[default]
    None = 0,
    Fpr = 1,
    Apr = 2,
    Bridge = 3,
    Utility = 4,
    Custom = 5,
    Orderbook = 6,
}

impl ReserveType {
    /// All registrable types in policy table order.
    pub const ALL: [ReserveType; 6] = [
        ReserveType::Fpr,
        ReserveType::Apr,
        ReserveType::Bridge,
        ReserveType::Utility,
        ReserveType::Custom,
        ReserveType::Orderbook,
    ];

    /// Slot in the fee paying policy table, `None` for [`ReserveType::None`].
    pub(crate) fn policy_slot(&self) -> Option<usize> {
        match self {
            ReserveType::None => None,
            other => Some(*other as usize - 1),
        }
    }
}

impl TryFrom<u8> for ReserveType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReserveType::None),
            1 => Ok(ReserveType::Fpr),
            2 => Ok(ReserveType::Apr),
            3 => Ok(ReserveType::Bridge),
            4 => Ok(ReserveType::Utility),
            5 => Ok(ReserveType::Custom),
            6 => Ok(ReserveType::Orderbook),
            other => Err(other),
        }
    }
}

/// Side of the base asset a reserve is listed for.
///
/// A token-to-token trade is resolved as a [`TradeSide::TokenToEth`] leg
/// followed by a [`TradeSide::EthToToken`] leg.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TradeSide {
    TokenToEth,
    EthToToken,
}

/// Builds a reserve ID from a one byte prefix and the reserve address.
pub fn reserve_id(prefix: u8, address: Address) -> ReserveId {
    let mut bytes = [0u8; 8];
    bytes[0] = prefix;
    bytes[1..].copy_from_slice(&address.as_slice()[..7]);
    ReserveId::from(bytes)
}
