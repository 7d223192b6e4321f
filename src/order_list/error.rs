//! Error types for order list operations.

use thiserror::Error;

use crate::types::OrderId;

/// Error type for order list operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderListError {
    /// Order ID is 0 or one of the HEAD/TAIL sentinels.
    #[error("order id {order_id} is reserved")]
    ReservedId { order_id: OrderId },

    /// Order ID was never handed out by [`super::OrderList::allocate_ids`].
    #[error("order id {order_id} was not allocated, next free id {next_free_id}")]
    NotAllocated {
        order_id: OrderId,
        next_free_id: OrderId,
    },

    /// Order ID already has a record, either in the list or removed.
    #[error("order {order_id} already exists")]
    OrderAlreadyExists { order_id: OrderId },

    /// Attempted to update or remove an order that is not in the list.
    #[error("order {order_id} not found in list")]
    OrderNotFound { order_id: OrderId },

    /// Order has a zero source or destination amount.
    #[error("order {order_id} has invalid amounts: src {src_amount}, dst {dst_amount}")]
    InvalidAmounts {
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
    },

    /// Position hint points at the order being updated.
    #[error("order {order_id} cannot be its own prev")]
    PrevIsSelf { order_id: OrderId },

    /// Allocation would run past the 32-bit id space.
    #[error("order ids exhausted: next free {next_free_id}, requested {how_many}")]
    IdsExhausted {
        next_free_id: OrderId,
        how_many: u32,
    },

    /// Order links to another order that has no record.
    /// This indicates internal inconsistency.
    #[error("order {order_id} has dangling {pointer} link to {referenced_id}")]
    DanglingLink {
        order_id: OrderId,
        referenced_id: OrderId,
        pointer: &'static str,
    },
}

/// Result type for order list operations.
pub type OrderListResult<T> = Result<T, OrderListError>;
