//! Order book reserve.
//!
//! One reserve per token, trading it against ETH through two [`OrderList`]s:
//!
//! * the buy list serves ETH -> token trades, orders pay out locked token
//!   (`dst`) for ETH (`src`);
//! * the sell list serves token -> ETH trades, orders pay out locked ETH
//!   (`dst`) for token (`src`).
//!
//! Takes are fill-or-fail: the walk over the list is planned read-only and
//! only applied once it is known to cover the whole quantity.

mod error;
mod funds;


pub use error::{OrderBookError, OrderBookResult};
pub use funds::MakerFunds;

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use itertools::{FoldWhile, Itertools};
use tracing::{debug, info};

use crate::{
    num::{self, ETH_DECIMALS, MAX_QTY, MAX_RATE},
    order_list::{Order, OrderList, OrderListError},
    reserve::{Reserve, ReserveError, ReserveResult},
    types::{BlockContext, ETH_ADDRESS, OrderId, TradeSide, is_eth},
};

/// Per maker limits of an [`OrderBookReserve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderBookLimits {
    /// Smallest ETH side of a resting order, smaller remainders are dropped.
    pub min_order_size_wei: u128,
    /// Active orders a maker may have on each side.
    pub max_orders_per_maker: usize,
}

/// Portion of a resting order consumed by a take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    pub order_id: OrderId,
    pub maker: Address,
    /// Paid by the taker.
    pub src_amount: u128,
    /// Paid by the maker.
    pub dst_amount: u128,
    /// Order is consumed completely.
    pub full: bool,
}

#[derive(Clone, Debug)]
pub struct OrderBookReserve {
    address: Address,
    token: Address,
    token_decimals: u8,
    limits: OrderBookLimits,
    buy_orders: OrderList,
    sell_orders: OrderList,
    funds: MakerFunds,
    maker_orders: HashMap<(Address, TradeSide), usize>,
}

impl OrderBookReserve {
    pub fn new(address: Address, token: Address, token_decimals: u8, limits: OrderBookLimits) -> Self {
        Self {
            address,
            token,
            token_decimals,
            limits,
            buy_orders: OrderList::new(),
            sell_orders: OrderList::new(),
            funds: MakerFunds::new(),
            maker_orders: HashMap::new(),
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn limits(&self) -> OrderBookLimits {
        self.limits
    }

    /// Orders serving `side`, best first.
    pub fn orders(&self, side: TradeSide) -> &OrderList {
        match side {
            TradeSide::EthToToken => &self.buy_orders,
            TradeSide::TokenToEth => &self.sell_orders,
        }
    }

    pub fn funds(&self) -> &MakerFunds {
        &self.funds
    }

    /// Active orders of `maker` on `side`.
    pub fn maker_order_count(&self, maker: Address, side: TradeSide) -> usize {
        self.maker_orders.get(&(maker, side)).copied().unwrap_or(0)
    }

    /// Side serving a `src` -> `dest` trade, `None` if the pair is not traded.
    pub fn side_for(&self, src: Address, dest: Address) -> Option<TradeSide> {
        if is_eth(src) && dest == self.token {
            Some(TradeSide::EthToToken)
        } else if src == self.token && is_eth(dest) {
            Some(TradeSide::TokenToEth)
        } else {
            None
        }
    }

    pub fn deposit(&mut self, maker: Address, asset: Address, amount: U256) -> OrderBookResult<()> {
        self.check_asset(asset)?;
        self.funds.deposit(maker, asset, amount);
        Ok(())
    }

    pub fn withdraw(&mut self, maker: Address, asset: Address, amount: U256) -> OrderBookResult<()> {
        self.check_asset(asset)?;
        self.funds.withdraw(maker, asset, amount)
    }

    /// Places a new order, locking its `dst_amount` from the maker's free funds.
    ///
    /// `hint` is the id the order is expected to follow, the list is scanned
    /// if the hint turns out to be stale.
    pub fn submit_order(
        &mut self,
        maker: Address,
        side: TradeSide,
        src_amount: u128,
        dst_amount: u128,
        hint: Option<OrderId>,
    ) -> OrderBookResult<OrderId> {
        self.check_order(side, src_amount, dst_amount)?;
        let count = self.maker_order_count(maker, side);
        if count >= self.limits.max_orders_per_maker {
            return Err(OrderBookError::TooManyOrders {
                maker,
                max_orders: self.limits.max_orders_per_maker,
            });
        }
        let locked_asset = self.payout_asset(side);
        let required = U256::from(dst_amount);
        let free = self.funds.free(maker, locked_asset);
        if free < required {
            return Err(OrderBookError::InsufficientFunds {
                maker,
                asset: locked_asset,
                free,
                required,
            });
        }

        let list = self.orders_mut(side);
        let order_id = list.allocate_ids(1)?;
        let hinted = match hint {
            Some(prev_id) => list.add_after_id(maker, order_id, src_amount, dst_amount, prev_id)?,
            None => false,
        };
        if !hinted {
            list.add(maker, order_id, src_amount, dst_amount)?;
        }
        self.funds.lock(maker, locked_asset, required)?;
        self.maker_orders.insert((maker, side), count + 1);

        info!(%maker, ?side, order_id, src_amount, dst_amount, "order submitted");
        Ok(order_id)
    }

    /// Changes order amounts, locking or releasing the `dst_amount` difference.
    pub fn update_order(
        &mut self,
        maker: Address,
        side: TradeSide,
        order_id: OrderId,
        src_amount: u128,
        dst_amount: u128,
        hint: Option<OrderId>,
    ) -> OrderBookResult<()> {
        let order = self.maker_order(maker, side, order_id)?;
        self.check_order(side, src_amount, dst_amount)?;
        let locked_asset = self.payout_asset(side);
        if dst_amount > order.dst_amount() {
            let required = U256::from(dst_amount - order.dst_amount());
            let free = self.funds.free(maker, locked_asset);
            if free < required {
                return Err(OrderBookError::InsufficientFunds {
                    maker,
                    asset: locked_asset,
                    free,
                    required,
                });
            }
        }

        let list = self.orders_mut(side);
        let updated = match hint {
            Some(prev_id) => list
                .update_with_position_hint(order_id, src_amount, dst_amount, prev_id)?
                .is_updated(),
            None => false,
        };
        if !updated {
            list.update(order_id, src_amount, dst_amount)?;
        }

        if dst_amount > order.dst_amount() {
            self.funds
                .lock(maker, locked_asset, U256::from(dst_amount - order.dst_amount()))?;
        } else {
            self.funds
                .release(maker, locked_asset, U256::from(order.dst_amount() - dst_amount))?;
        }
        debug!(%maker, ?side, order_id, src_amount, dst_amount, "order updated");
        Ok(())
    }

    /// Removes the order and releases its locked funds.
    pub fn cancel_order(
        &mut self,
        maker: Address,
        side: TradeSide,
        order_id: OrderId,
    ) -> OrderBookResult<()> {
        let order = self.maker_order(maker, side, order_id)?;
        self.drop_order(side, &order, order.dst_amount())?;
        info!(%maker, ?side, order_id, "order cancelled");
        Ok(())
    }

    /// Fills that would serve `qty` on `side`, best order first.
    ///
    /// Fails with [`OrderBookError::InsufficientLiquidity`] if the list runs
    /// out before `qty` is covered.
    pub fn plan_take(&self, side: TradeSide, qty: u128) -> OrderBookResult<Vec<Fill>> {
        if qty == 0 {
            return Err(OrderBookError::ZeroTakeAmount);
        }
        let (fills, unfilled) = self
            .orders(side)
            .iter()
            .fold_while((Vec::new(), qty), |(mut fills, unfilled), order| {
                if unfilled >= order.src_amount() {
                    fills.push(Fill {
                        order_id: order.id(),
                        maker: order.maker(),
                        src_amount: order.src_amount(),
                        dst_amount: order.dst_amount(),
                        full: true,
                    });
                    let unfilled = unfilled - order.src_amount();
                    if unfilled == 0 {
                        FoldWhile::Done((fills, 0))
                    } else {
                        FoldWhile::Continue((fills, unfilled))
                    }
                } else {
                    fills.push(Fill {
                        order_id: order.id(),
                        maker: order.maker(),
                        src_amount: unfilled,
                        dst_amount: partial_dst(order, unfilled),
                        full: false,
                    });
                    FoldWhile::Done((fills, 0))
                }
            })
            .into_inner();
        if unfilled > 0 {
            return Err(OrderBookError::InsufficientLiquidity {
                requested: qty,
                available: qty - unfilled,
            });
        }
        Ok(fills)
    }

    /// Total `dst` the book pays for `qty`, `None` if it cannot fill it.
    pub fn quote(&self, side: TradeSide, qty: u128) -> Option<u128> {
        self.plan_take(side, qty)
            .ok()
            .map(|fills| fills.iter().map(|fill| fill.dst_amount).sum())
    }

    /// Consumes orders for `qty` and returns the total `dst` paid out.
    ///
    /// Fully consumed orders are removed. A partially consumed order keeps its
    /// place unless the remaining ETH side drops below the minimum order size,
    /// then it is removed and the rest of its locked funds go back to the maker.
    pub fn take(&mut self, side: TradeSide, qty: u128) -> OrderBookResult<u128> {
        let fills = self.plan_take(side, qty)?;
        let (paid_asset, received_asset) = (self.payout_asset(side), self.payment_asset(side));

        let mut total = 0u128;
        for fill in &fills {
            let order = self.live_order(side, fill.order_id)?;
            self.funds.settle(
                fill.maker,
                paid_asset,
                U256::from(fill.dst_amount),
                received_asset,
                U256::from(fill.src_amount),
            )?;
            total += fill.dst_amount;

            if fill.full {
                self.drop_order(side, &order, 0)?;
                continue;
            }
            let src_left = order.src_amount() - fill.src_amount;
            let dst_left = order.dst_amount() - fill.dst_amount;
            if eth_side(side, src_left, dst_left) < self.limits.min_order_size_wei {
                debug!(?side, order_id = order.id(), src_left, dst_left, "dropping order remainder");
                self.drop_order(side, &order, dst_left)?;
                continue;
            }
            let list = self.orders_mut(side);
            if !list
                .update_with_position_hint(order.id(), src_left, dst_left, order.prev_id())?
                .is_updated()
            {
                list.update(order.id(), src_left, dst_left)?;
            }
        }

        info!(?side, qty, total, fills = fills.len(), "orders taken");
        Ok(total)
    }

    fn orders_mut(&mut self, side: TradeSide) -> &mut OrderList {
        match side {
            TradeSide::EthToToken => &mut self.buy_orders,
            TradeSide::TokenToEth => &mut self.sell_orders,
        }
    }

    /// Asset makers lock and pay out on `side`.
    fn payout_asset(&self, side: TradeSide) -> Address {
        match side {
            TradeSide::EthToToken => self.token,
            TradeSide::TokenToEth => ETH_ADDRESS,
        }
    }

    /// Asset takers pay on `side`.
    fn payment_asset(&self, side: TradeSide) -> Address {
        match side {
            TradeSide::EthToToken => ETH_ADDRESS,
            TradeSide::TokenToEth => self.token,
        }
    }

    fn decimals(&self, side: TradeSide) -> (u8, u8) {
        match side {
            TradeSide::EthToToken => (ETH_DECIMALS, self.token_decimals),
            TradeSide::TokenToEth => (self.token_decimals, ETH_DECIMALS),
        }
    }

    fn check_asset(&self, asset: Address) -> OrderBookResult<()> {
        if is_eth(asset) || asset == self.token {
            Ok(())
        } else {
            Err(OrderBookError::UnsupportedAsset { asset })
        }
    }

    fn check_order(&self, side: TradeSide, src_amount: u128, dst_amount: u128) -> OrderBookResult<()> {
        if src_amount == 0 || dst_amount == 0 {
            return Err(OrderBookError::ZeroOrderAmount {
                src_amount,
                dst_amount,
            });
        }
        for amount in [src_amount, dst_amount] {
            if U256::from(amount) > MAX_QTY {
                return Err(OrderBookError::AmountTooHigh {
                    amount: U256::from(amount),
                });
            }
        }
        let eth_amount = eth_side(side, src_amount, dst_amount);
        if eth_amount < self.limits.min_order_size_wei {
            return Err(OrderBookError::OrderBelowMinimum {
                eth_amount,
                min_order_size_wei: self.limits.min_order_size_wei,
            });
        }
        let (src_decimals, dst_decimals) = self.decimals(side);
        let rate = num::calc_rate_from_qty(
            U256::from(src_amount),
            U256::from(dst_amount),
            src_decimals,
            dst_decimals,
        )?;
        if rate > MAX_RATE {
            return Err(OrderBookError::RateTooHigh { rate });
        }
        Ok(())
    }

    fn live_order(&self, side: TradeSide, order_id: OrderId) -> OrderBookResult<Order> {
        self.orders(side)
            .order(order_id)
            .filter(|order| order.is_in_list())
            .copied()
            .ok_or(OrderBookError::List(OrderListError::OrderNotFound { order_id }))
    }

    fn maker_order(&self, maker: Address, side: TradeSide, order_id: OrderId) -> OrderBookResult<Order> {
        let order = self.live_order(side, order_id)?;
        if order.maker() != maker {
            return Err(OrderBookError::NotOrderMaker { order_id, maker });
        }
        Ok(order)
    }

    /// Unlinks the order and releases `unlock` of its locked funds.
    fn drop_order(&mut self, side: TradeSide, order: &Order, unlock: u128) -> OrderBookResult<()> {
        self.orders_mut(side).remove(order.id())?;
        if unlock > 0 {
            let asset = self.payout_asset(side);
            self.funds.release(order.maker(), asset, U256::from(unlock))?;
        }
        let count = self.maker_orders.entry((order.maker(), side)).or_default();
        *count = count.saturating_sub(1);
        Ok(())
    }
}

/// `dst` a taker receives for `qty` of the order's `src`, rounded down.
fn partial_dst(order: &Order, qty: u128) -> u128 {
    (U256::from(order.dst_amount()) * U256::from(qty) / U256::from(order.src_amount()))
        .saturating_to::<u128>()
}

/// ETH denominated size of an order on `side`.
fn eth_side(side: TradeSide, src_amount: u128, dst_amount: u128) -> u128 {
    match side {
        TradeSide::EthToToken => src_amount,
        TradeSide::TokenToEth => dst_amount,
    }
}

impl Reserve for OrderBookReserve {
    fn address(&self) -> Address {
        self.address
    }

    fn clone_box(&self) -> Box<dyn Reserve> {
        Box::new(self.clone())
    }

    fn get_conversion_rate(
        &self,
        src: Address,
        dest: Address,
        src_qty: U256,
        _block: BlockContext,
    ) -> U256 {
        let Some(side) = self.side_for(src, dest) else {
            return U256::ZERO;
        };
        if src_qty.is_zero() || src_qty > MAX_QTY {
            return U256::ZERO;
        }
        let Some(total_dst) = self.quote(side, src_qty.saturating_to::<u128>()) else {
            debug!(?side, %src_qty, "book cannot fill quantity");
            return U256::ZERO;
        };
        let (src_decimals, dest_decimals) = self.decimals(side);
        num::calc_rate_from_qty(src_qty, U256::from(total_dst), src_decimals, dest_decimals)
            .unwrap_or_default()
    }

    fn trade(
        &mut self,
        src: Address,
        src_qty: U256,
        dest: Address,
        conversion_rate: U256,
        validate: bool,
    ) -> ReserveResult<U256> {
        if validate && conversion_rate.is_zero() {
            return Err(ReserveError::ZeroRate);
        }
        let side = self
            .side_for(src, dest)
            .ok_or(ReserveError::UnsupportedPair { src, dest })?;
        if src_qty > MAX_QTY {
            return Err(OrderBookError::AmountTooHigh { amount: src_qty }.into());
        }
        let (src_decimals, dest_decimals) = self.decimals(side);
        let required = num::calc_dst_qty(src_qty, src_decimals, dest_decimals, conversion_rate)?;
        let available = self
            .quote(side, src_qty.saturating_to::<u128>())
            .map(U256::from)
            .unwrap_or_default();
        if available < required {
            return Err(ReserveError::RateUnavailable {
                rate: conversion_rate,
                available,
                required,
            });
        }
        let paid = self.take(side, src_qty.saturating_to::<u128>())?;
        Ok(U256::from(paid))
    }
}
