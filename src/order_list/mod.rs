//! Price-and-time priority order list.
//!
//! Orders live in an arena keyed by [`OrderId`] and are chained through
//! `prev`/`next` ids between the permanent [`HEAD_ID`] and [`TAIL_ID`]
//! sentinels. The chain is kept sorted best rate first; orders with equal
//! rates keep insertion order.
//!
//! Position hints (`add_after_id`, `update_with_position_hint`) are always
//! re-validated against the current chain, a stale hint is reported back
//! instead of corrupting the order.

mod error;
mod order;


pub use error::{OrderListError, OrderListResult};
pub use order::Order;

use std::{cmp::Ordering, collections::HashMap};

use alloy::primitives::{Address, U256};
use tracing::debug;

use crate::types::OrderId;

/// Sentinel closing the chain.
pub const TAIL_ID: OrderId = 1;

/// Sentinel opening the chain, `HEAD.next` is the best order.
pub const HEAD_ID: OrderId = 2;

const FIRST_FREE_ID: OrderId = 3;

/// Outcome of [`OrderList::update_with_position_hint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOutcome {
    /// Order still fits between its neighbours, only amounts changed.
    AmountsOnly,
    /// Order was relinked after the hinted order.
    Moved,
    /// Hint does not describe a valid position, nothing changed.
    Failed,
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        !matches!(self, UpdateOutcome::Failed)
    }
}

/// Doubly-linked order list sorted by rate.
#[derive(Clone, Debug)]
pub struct OrderList {
    orders: HashMap<OrderId, Order>,
    next_free_id: OrderId,
    len: usize,
}

impl Default for OrderList {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderList {
    pub fn new() -> Self {
        let mut orders = HashMap::new();
        orders.insert(HEAD_ID, Order::sentinel(HEAD_ID, HEAD_ID, TAIL_ID));
        orders.insert(TAIL_ID, Order::sentinel(TAIL_ID, HEAD_ID, TAIL_ID));
        Self {
            orders,
            next_free_id: FIRST_FREE_ID,
            len: 0,
        }
    }

    /// Compares two orders by rate without dividing.
    ///
    /// Returns [`Ordering::Less`] if order 1 is better (sorts first),
    /// [`Ordering::Greater`] if it is worse and [`Ordering::Equal`] for equal rates.
    pub fn compare_orders(src1: u128, dst1: u128, src2: u128, dst2: u128) -> Ordering {
        let key1 = U256::from(dst1) * U256::from(src2);
        let key2 = U256::from(dst2) * U256::from(src1);
        key2.cmp(&key1)
    }

    /// Reserves `how_many` consecutive ids and returns the first one.
    pub fn allocate_ids(&mut self, how_many: u32) -> OrderListResult<OrderId> {
        let first = self.next_free_id;
        self.next_free_id = first
            .checked_add(how_many)
            .ok_or(OrderListError::IdsExhausted {
                next_free_id: first,
                how_many,
            })?;
        Ok(first)
    }

    /// Next id [`Self::allocate_ids`] would return.
    pub fn next_free_id(&self) -> OrderId {
        self.next_free_id
    }

    /// Order record by id, including removed orders and the sentinels.
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Best order, `None` if the list is empty.
    pub fn first_order(&self) -> Option<OrderId> {
        self.orders
            .get(&HEAD_ID)
            .map(|head| head.next_id())
            .filter(|id| *id != TAIL_ID)
    }

    /// Orders from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = &Order> + '_ {
        std::iter::successors(self.orders.get(&HEAD_ID), move |order| {
            self.orders.get(&order.next_id())
        })
        .skip(1)
        .take_while(|order| order.id() != TAIL_ID)
    }

    /// Number of orders in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Id of the order a new order with these amounts would follow.
    /// Returns [`HEAD_ID`] if it would become the best order.
    pub fn find_prev_order_id(&self, src_amount: u128, dst_amount: u128) -> OrderId {
        self.iter()
            .take_while(|order| {
                Self::compare_orders(
                    order.src_amount(),
                    order.dst_amount(),
                    src_amount,
                    dst_amount,
                ) != Ordering::Greater
            })
            .last()
            .map(|order| order.id())
            .unwrap_or(HEAD_ID)
    }

    /// Inserts a new order at its sorted position, after all orders with
    /// the same or a better rate.
    pub fn add(
        &mut self,
        maker: Address,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
    ) -> OrderListResult<()> {
        self.check_new(order_id, src_amount, dst_amount)?;
        let prev_id = self.find_prev_order_id(src_amount, dst_amount);
        self.orders.insert(
            order_id,
            Order::new(order_id, maker, src_amount, dst_amount),
        );
        self.link_after(prev_id, order_id)?;
        self.len += 1;
        Ok(())
    }

    /// Inserts a new order right after `prev_id` if that keeps the list sorted.
    ///
    /// Returns `Ok(false)` without touching the list if the hint is stale,
    /// callers are expected to fall back to [`Self::add`].
    pub fn add_after_id(
        &mut self,
        maker: Address,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
        prev_id: OrderId,
    ) -> OrderListResult<bool> {
        self.check_new(order_id, src_amount, dst_amount)?;
        let Some(next_id) = self.hinted_next(prev_id, None) else {
            debug!(order_id, prev_id, "add hint rejected, prev not in list");
            return Ok(false);
        };
        if !self.fits_between(src_amount, dst_amount, prev_id, next_id) {
            debug!(order_id, prev_id, "add hint rejected, position breaks ordering");
            return Ok(false);
        }
        self.orders.insert(
            order_id,
            Order::new(order_id, maker, src_amount, dst_amount),
        );
        self.link_after(prev_id, order_id)?;
        self.len += 1;
        Ok(true)
    }

    /// Changes order amounts and moves it to its new sorted position.
    pub fn update(
        &mut self,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
    ) -> OrderListResult<()> {
        self.check_existing(order_id, src_amount, dst_amount)?;
        self.unlink(order_id)?;
        let prev_id = self.find_prev_order_id(src_amount, dst_amount);
        self.get_mut(order_id)?.set_amounts(src_amount, dst_amount);
        self.link_after(prev_id, order_id)
    }

    /// Changes order amounts, relying on `prev_id` if the order has to move.
    ///
    /// * [`UpdateOutcome::AmountsOnly`] if the order keeps its position.
    /// * [`UpdateOutcome::Moved`] if it was relinked right after `prev_id`.
    /// * [`UpdateOutcome::Failed`] if it has to move and `prev_id` is stale.
    ///   Nothing is changed, callers are expected to fall back to [`Self::update`].
    pub fn update_with_position_hint(
        &mut self,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
        prev_id: OrderId,
    ) -> OrderListResult<UpdateOutcome> {
        self.check_existing(order_id, src_amount, dst_amount)?;
        if prev_id == order_id {
            return Err(OrderListError::PrevIsSelf { order_id });
        }

        let current = *self.get(order_id)?;
        if self.stays_between(
            src_amount,
            dst_amount,
            current.prev_id(),
            current.next_id(),
        ) {
            self.get_mut(order_id)?.set_amounts(src_amount, dst_amount);
            return Ok(UpdateOutcome::AmountsOnly);
        }

        let Some(next_id) = self.hinted_next(prev_id, Some(&current)) else {
            debug!(order_id, prev_id, "update hint rejected, prev not in list");
            return Ok(UpdateOutcome::Failed);
        };
        if !self.fits_between(src_amount, dst_amount, prev_id, next_id) {
            debug!(order_id, prev_id, "update hint rejected, position breaks ordering");
            return Ok(UpdateOutcome::Failed);
        }

        self.unlink(order_id)?;
        self.get_mut(order_id)?.set_amounts(src_amount, dst_amount);
        self.link_after(prev_id, order_id)?;
        Ok(UpdateOutcome::Moved)
    }

    /// Unlinks the order. Its record stays readable via [`Self::order`],
    /// but the id can never be added again.
    pub fn remove(&mut self, order_id: OrderId) -> OrderListResult<()> {
        self.check_reserved(order_id)?;
        if !self.is_in_list(order_id) {
            return Err(OrderListError::OrderNotFound { order_id });
        }
        self.unlink(order_id)?;
        self.get_mut(order_id)?.set_in_list(false);
        self.len -= 1;
        Ok(())
    }

    fn is_in_list(&self, order_id: OrderId) -> bool {
        self.orders
            .get(&order_id)
            .is_some_and(|order| order.is_in_list())
    }

    fn check_reserved(&self, order_id: OrderId) -> OrderListResult<()> {
        if order_id == 0 || order_id == HEAD_ID || order_id == TAIL_ID {
            return Err(OrderListError::ReservedId { order_id });
        }
        Ok(())
    }

    fn check_amounts(
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
    ) -> OrderListResult<()> {
        if src_amount == 0 || dst_amount == 0 {
            return Err(OrderListError::InvalidAmounts {
                order_id,
                src_amount,
                dst_amount,
            });
        }
        Ok(())
    }

    fn check_new(
        &self,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
    ) -> OrderListResult<()> {
        self.check_reserved(order_id)?;
        if order_id >= self.next_free_id {
            return Err(OrderListError::NotAllocated {
                order_id,
                next_free_id: self.next_free_id,
            });
        }
        if self.orders.contains_key(&order_id) {
            return Err(OrderListError::OrderAlreadyExists { order_id });
        }
        Self::check_amounts(order_id, src_amount, dst_amount)
    }

    fn check_existing(
        &self,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
    ) -> OrderListResult<()> {
        self.check_reserved(order_id)?;
        if !self.is_in_list(order_id) {
            return Err(OrderListError::OrderNotFound { order_id });
        }
        Self::check_amounts(order_id, src_amount, dst_amount)
    }

    /// Order that would follow an order inserted after `prev_id`, with
    /// `moving` taken out of the chain. `None` if `prev_id` is not a valid anchor.
    fn hinted_next(&self, prev_id: OrderId, moving: Option<&Order>) -> Option<OrderId> {
        if prev_id != HEAD_ID && !self.is_in_list(prev_id) {
            return None;
        }
        let next_id = self.orders.get(&prev_id)?.next_id();
        match moving {
            Some(order) if order.id() == next_id => Some(order.next_id()),
            _ => Some(next_id),
        }
    }

    /// Position right after `prev_id` and before `next_id` keeps the list sorted
    /// and respects insertion order among equal rates.
    fn fits_between(
        &self,
        src_amount: u128,
        dst_amount: u128,
        prev_id: OrderId,
        next_id: OrderId,
    ) -> bool {
        self.not_better_than(prev_id, src_amount, dst_amount)
            && self.strictly_better_than(next_id, src_amount, dst_amount)
    }

    /// Same as [`Self::fits_between`] but an equal rate to the next order
    /// is fine, the order already precedes it.
    fn stays_between(
        &self,
        src_amount: u128,
        dst_amount: u128,
        prev_id: OrderId,
        next_id: OrderId,
    ) -> bool {
        self.not_better_than(prev_id, src_amount, dst_amount)
            && (next_id == TAIL_ID
                || self.orders.get(&next_id).is_some_and(|next| {
                    Self::compare_orders(
                        src_amount,
                        dst_amount,
                        next.src_amount(),
                        next.dst_amount(),
                    ) != Ordering::Greater
                }))
    }

    fn not_better_than(&self, prev_id: OrderId, src_amount: u128, dst_amount: u128) -> bool {
        prev_id == HEAD_ID
            || self.orders.get(&prev_id).is_some_and(|prev| {
                Self::compare_orders(prev.src_amount(), prev.dst_amount(), src_amount, dst_amount)
                    != Ordering::Greater
            })
    }

    fn strictly_better_than(&self, next_id: OrderId, src_amount: u128, dst_amount: u128) -> bool {
        next_id == TAIL_ID
            || self.orders.get(&next_id).is_some_and(|next| {
                Self::compare_orders(src_amount, dst_amount, next.src_amount(), next.dst_amount())
                    == Ordering::Less
            })
    }

    fn get(&self, order_id: OrderId) -> OrderListResult<&Order> {
        self.orders
            .get(&order_id)
            .ok_or(OrderListError::OrderNotFound { order_id })
    }

    fn get_mut(&mut self, order_id: OrderId) -> OrderListResult<&mut Order> {
        self.orders
            .get_mut(&order_id)
            .ok_or(OrderListError::OrderNotFound { order_id })
    }

    fn link_after(&mut self, prev_id: OrderId, order_id: OrderId) -> OrderListResult<()> {
        let next_id = self.get(prev_id)?.next_id();
        if !self.orders.contains_key(&next_id) {
            return Err(OrderListError::DanglingLink {
                order_id: prev_id,
                referenced_id: next_id,
                pointer: "next",
            });
        }
        self.get_mut(prev_id)?.set_next(order_id);
        self.get_mut(next_id)?.set_prev(order_id);
        let order = self.get_mut(order_id)?;
        order.set_prev(prev_id);
        order.set_next(next_id);
        Ok(())
    }

    fn unlink(&mut self, order_id: OrderId) -> OrderListResult<()> {
        let order = *self.get(order_id)?;
        for (referenced_id, pointer) in [(order.prev_id(), "prev"), (order.next_id(), "next")] {
            if !self.orders.contains_key(&referenced_id) {
                return Err(OrderListError::DanglingLink {
                    order_id,
                    referenced_id,
                    pointer,
                });
            }
        }
        self.get_mut(order.prev_id())?.set_next(order.next_id());
        self.get_mut(order.next_id())?.set_prev(order.prev_id());
        Ok(())
    }
}
