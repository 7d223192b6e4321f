//! Resting order record.

use alloy::primitives::Address;

use crate::types::OrderId;

/// Resting limit order in an [`super::OrderList`].
///
/// The maker gives `dst_amount` in exchange for `src_amount`, so the
/// taker-facing rate is `dst_amount / src_amount`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    maker: Address,
    src_amount: u128,
    dst_amount: u128,
    prev_id: OrderId,
    next_id: OrderId,
    in_list: bool,
}

impl Order {
    pub(crate) fn new(id: OrderId, maker: Address, src_amount: u128, dst_amount: u128) -> Self {
        Self {
            id,
            maker,
            src_amount,
            dst_amount,
            prev_id: 0,
            next_id: 0,
            in_list: true,
        }
    }

    /// HEAD/TAIL sentinel record.
    pub(crate) fn sentinel(id: OrderId, prev_id: OrderId, next_id: OrderId) -> Self {
        Self {
            id,
            maker: Address::ZERO,
            src_amount: 0,
            dst_amount: 0,
            prev_id,
            next_id,
            in_list: false,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn maker(&self) -> Address {
        self.maker
    }

    pub fn src_amount(&self) -> u128 {
        self.src_amount
    }

    pub fn dst_amount(&self) -> u128 {
        self.dst_amount
    }

    pub fn prev_id(&self) -> OrderId {
        self.prev_id
    }

    pub fn next_id(&self) -> OrderId {
        self.next_id
    }

    /// `false` for removed orders and for the sentinels.
    pub fn is_in_list(&self) -> bool {
        self.in_list
    }

    pub(crate) fn set_amounts(&mut self, src_amount: u128, dst_amount: u128) {
        self.src_amount = src_amount;
        self.dst_amount = dst_amount;
    }

    pub(crate) fn set_prev(&mut self, prev_id: OrderId) {
        self.prev_id = prev_id;
    }

    pub(crate) fn set_next(&mut self, next_id: OrderId) {
        self.next_id = next_id;
    }

    pub(crate) fn set_in_list(&mut self, in_list: bool) {
        self.in_list = in_list;
    }
}
