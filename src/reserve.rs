//! Liquidity sources the matching engine quotes and trades against.
//!
//! Every reserve trades a set of tokens against ETH. [`Reserve::get_conversion_rate`]
//! is read-only and reports `0` for anything it cannot serve, [`Reserve::trade`]
//! commits the conversion and reports how much destination asset it delivered.
//!
//! Asset movement itself is done by the caller through [`crate::ledger`],
//! reserves only keep their own inventory accounting.

use std::{collections::HashMap, fmt};

use alloy::primitives::{Address, U256};
use thiserror::Error;
use tracing::debug;

use crate::{
    num::{self, BPS, ETH_DECIMALS, MAX_RATE, RateError},
    orderbook::OrderBookError,
    types::{BlockContext, Bps, is_eth},
};

/// Error type for reserve trades.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReserveError {
    #[error("pair {src} -> {dest} is not served")]
    UnsupportedPair { src: Address, dest: Address },

    #[error("zero conversion rate")]
    ZeroRate,

    #[error("reserve has {available} of {asset}, {required} required")]
    InsufficientInventory {
        asset: Address,
        available: U256,
        required: U256,
    },

    /// Reserve cannot honour the conversion rate it was called with.
    #[error("rate {rate} not available, reserve delivers {available} of {required}")]
    RateUnavailable {
        rate: U256,
        available: U256,
        required: U256,
    },

    #[error("rate math error: {0}")]
    Rate(#[from] RateError),

    #[error("order book error: {0}")]
    OrderBook(#[from] OrderBookError),
}

/// Result type for reserve trades.
pub type ReserveResult<T> = Result<T, ReserveError>;

/// Liquidity source capability.
pub trait Reserve: fmt::Debug {
    fn address(&self) -> Address;

    /// Copy of the reserve state, used to trade without committing.
    fn clone_box(&self) -> Box<dyn Reserve>;

    /// Rate for converting `src_qty` of `src` into `dest`, scaled by
    /// [`num::PRECISION`]. `0` if the reserve cannot serve the request.
    fn get_conversion_rate(
        &self,
        src: Address,
        dest: Address,
        src_qty: U256,
        block: BlockContext,
    ) -> U256;

    /// Converts `src_qty` of `src` into `dest`.
    ///
    /// Returns the delivered amount of `dest`, never less than `src_qty`
    /// converted at `conversion_rate`. With `validate` a zero rate is rejected.
    fn trade(
        &mut self,
        src: Address,
        src_qty: U256,
        dest: Address,
        conversion_rate: U256,
        validate: bool,
    ) -> ReserveResult<U256>;
}

impl Clone for Box<dyn Reserve> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Reserves by address.
#[derive(Clone, Debug, Default)]
pub struct ReserveSet {
    reserves: HashMap<Address, Box<dyn Reserve>>,
}

impl ReserveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reserve, replacing any reserve with the same address.
    pub fn insert(&mut self, reserve: impl Reserve + 'static) {
        self.reserves.insert(reserve.address(), Box::new(reserve));
    }

    pub fn remove(&mut self, address: Address) -> Option<Box<dyn Reserve>> {
        self.reserves.remove(&address)
    }

    pub fn get(&self, address: Address) -> Option<&dyn Reserve> {
        self.reserves.get(&address).map(|reserve| reserve.as_ref())
    }

    pub fn get_mut(&mut self, address: Address) -> Option<&mut (dyn Reserve + 'static)> {
        self.reserves.get_mut(&address).map(|reserve| reserve.as_mut())
    }

    /// Rate quoted by the reserve at `address`, `0` for unknown reserves and
    /// quotes above [`MAX_RATE`].
    pub fn conversion_rate(
        &self,
        address: Address,
        src: Address,
        dest: Address,
        src_qty: U256,
        block: BlockContext,
    ) -> U256 {
        let rate = self
            .get(address)
            .map(|reserve| reserve.get_conversion_rate(src, dest, src_qty, block))
            .unwrap_or_default();
        debug!(%address, %src, %dest, %src_qty, %rate, "reserve quote");
        if rate > MAX_RATE {
            debug!(%address, %rate, "quote above max rate ignored");
            return U256::ZERO;
        }
        rate
    }

    pub fn len(&self) -> usize {
        self.reserves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty()
    }
}

/// Token listing of a [`FixedRateReserve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TokenRates {
    decimals: u8,
    /// ETH -> token.
    buy_rate: U256,
    /// Token -> ETH.
    sell_rate: U256,
}

/// Reserve quoting operator-set rates from its own inventory.
#[derive(Clone, Debug)]
pub struct FixedRateReserve {
    address: Address,
    tokens: HashMap<Address, TokenRates>,
    inventory: HashMap<Address, U256>,
}

impl FixedRateReserve {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            tokens: HashMap::new(),
            inventory: HashMap::new(),
        }
    }

    /// Lists `token` or replaces its rates.
    pub fn set_rates(&mut self, token: Address, decimals: u8, buy_rate: U256, sell_rate: U256) {
        self.tokens.insert(
            token,
            TokenRates {
                decimals,
                buy_rate,
                sell_rate,
            },
        );
    }

    pub fn deposit(&mut self, asset: Address, amount: U256) {
        let balance = self.inventory.entry(asset).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn inventory(&self, asset: Address) -> U256 {
        self.inventory.get(&asset).copied().unwrap_or_default()
    }

    /// Listed rate and decimals for the pair.
    fn pair(&self, src: Address, dest: Address) -> Option<(U256, u8, u8)> {
        match (is_eth(src), is_eth(dest)) {
            (true, false) => self
                .tokens
                .get(&dest)
                .map(|t| (t.buy_rate, ETH_DECIMALS, t.decimals)),
            (false, true) => self
                .tokens
                .get(&src)
                .map(|t| (t.sell_rate, t.decimals, ETH_DECIMALS)),
            _ => None,
        }
    }
}

impl Reserve for FixedRateReserve {
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
        let Some((rate, src_decimals, dest_decimals)) = self.pair(src, dest) else {
            return U256::ZERO;
        };
        match num::calc_dst_qty(src_qty, src_decimals, dest_decimals, rate) {
            Ok(dst_qty) if dst_qty <= self.inventory(dest) => rate,
            _ => U256::ZERO,
        }
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
        let (_, src_decimals, dest_decimals) = self
            .pair(src, dest)
            .ok_or(ReserveError::UnsupportedPair { src, dest })?;
        let dst_qty = num::calc_dst_qty(src_qty, src_decimals, dest_decimals, conversion_rate)?;
        let available = self.inventory(dest);
        if dst_qty > available {
            return Err(ReserveError::InsufficientInventory {
                asset: dest,
                available,
                required: dst_qty,
            });
        }
        self.inventory.insert(dest, available - dst_qty);
        self.deposit(src, src_qty);
        Ok(dst_qty)
    }
}

/// Constant product (`x * y = k`) pool of one token against ETH.
#[derive(Clone, Debug)]
pub struct ConstantProductReserve {
    address: Address,
    token: Address,
    token_decimals: u8,
    eth_balance: U256,
    token_balance: U256,
    fee_bps: Bps,
}

impl ConstantProductReserve {
    pub fn new(
        address: Address,
        token: Address,
        token_decimals: u8,
        eth_balance: U256,
        token_balance: U256,
        fee_bps: Bps,
    ) -> Self {
        Self {
            address,
            token,
            token_decimals,
            eth_balance,
            token_balance,
            fee_bps: fee_bps.min(BPS),
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn balances(&self) -> (U256, U256) {
        (self.eth_balance, self.token_balance)
    }

    /// Pool balances and decimals ordered as (src, dest).
    fn pair(&self, src: Address, dest: Address) -> Option<(U256, U256, u8, u8)> {
        if is_eth(src) && dest == self.token {
            Some((
                self.eth_balance,
                self.token_balance,
                ETH_DECIMALS,
                self.token_decimals,
            ))
        } else if src == self.token && is_eth(dest) {
            Some((
                self.token_balance,
                self.eth_balance,
                self.token_decimals,
                ETH_DECIMALS,
            ))
        } else {
            None
        }
    }

    /// Output of the curve for `src_qty` after the pool fee.
    fn amount_out(&self, src_qty: U256, src_balance: U256, dest_balance: U256) -> U256 {
        let src_after_fee = num::apply_bps(src_qty, BPS - self.fee_bps);
        num::mul_div(
            dest_balance,
            src_after_fee,
            src_balance.saturating_add(src_after_fee),
        )
    }
}

impl Reserve for ConstantProductReserve {
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
        let Some((src_balance, dest_balance, src_decimals, dest_decimals)) = self.pair(src, dest)
        else {
            return U256::ZERO;
        };
        if src_qty.is_zero() {
            return U256::ZERO;
        }
        let out = self.amount_out(src_qty, src_balance, dest_balance);
        num::calc_rate_from_qty(src_qty, out, src_decimals, dest_decimals)
            .ok()
            .filter(|rate| *rate <= MAX_RATE)
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
        let (src_balance, dest_balance, src_decimals, dest_decimals) = self
            .pair(src, dest)
            .ok_or(ReserveError::UnsupportedPair { src, dest })?;
        let out = self.amount_out(src_qty, src_balance, dest_balance);
        let required = num::calc_dst_qty(src_qty, src_decimals, dest_decimals, conversion_rate)?;
        if out < required {
            return Err(ReserveError::RateUnavailable {
                rate: conversion_rate,
                available: out,
                required,
            });
        }
        if is_eth(src) {
            self.eth_balance = src_balance.saturating_add(src_qty);
            self.token_balance = dest_balance - out;
        } else {
            self.token_balance = src_balance.saturating_add(src_qty);
            self.eth_balance = dest_balance - out;
        }
        Ok(out)
    }
}
