//! Error types for order book reserve operations.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::{num::RateError, order_list::OrderListError, types::OrderId};

/// Error type for order book reserve operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderBookError {
    /// Asset is neither ETH nor the reserve token.
    #[error("asset {asset} is not traded by this book")]
    UnsupportedAsset { asset: Address },

    #[error("maker {maker} has {free} free {asset}, {required} required")]
    InsufficientFunds {
        maker: Address,
        asset: Address,
        free: U256,
        required: U256,
    },

    /// Locked balance accounting went out of sync with the resting orders.
    /// This indicates internal inconsistency.
    #[error("maker {maker} has {locked} locked {asset}, {required} required")]
    InsufficientLocked {
        maker: Address,
        asset: Address,
        locked: U256,
        required: U256,
    },

    #[error("order worth {eth_amount} wei is below the minimum of {min_order_size_wei} wei")]
    OrderBelowMinimum {
        eth_amount: u128,
        min_order_size_wei: u128,
    },

    #[error("amount {amount} above max qty")]
    AmountTooHigh { amount: U256 },

    #[error("order amounts must be non-zero: src {src_amount}, dst {dst_amount}")]
    ZeroOrderAmount { src_amount: u128, dst_amount: u128 },

    /// Implied `dst / src` rate of an order is above the max rate.
    #[error("order rate {rate} above max rate")]
    RateTooHigh { rate: U256 },

    #[error("order rate error: {0}")]
    Rate(#[from] RateError),

    #[error("maker {maker} already has {max_orders} orders on this side")]
    TooManyOrders { maker: Address, max_orders: usize },

    #[error("order {order_id} does not belong to {maker}")]
    NotOrderMaker { order_id: OrderId, maker: Address },

    /// Book cannot fill the requested quantity, nothing was consumed.
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u128, available: u128 },

    #[error("zero take amount")]
    ZeroTakeAmount,

    #[error("order list error: {0}")]
    List(#[from] OrderListError),
}

/// Result type for order book reserve operations.
pub type OrderBookResult<T> = Result<T, OrderBookError>;
