//! Network facade.
//!
//! Owns the registry, the reserves and the matching engine, quotes trades
//! and executes them against an [`AssetLedger`].
//!
//! A trade runs on copies of the reserves and the ledger and is committed
//! only once every transfer went through, so a failed trade leaves no trace.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    engine::{EngineError, MatchingEngine, RatesAndAmounts, ReserveSlice, TradeInfo, validate_fees},
    ledger::{AssetLedger, LedgerError},
    num::ETH_DECIMALS,
    registry::{RegistryError, ReserveRegistry},
    reserve::{Reserve, ReserveError, ReserveSet},
    types::{BlockContext, Bps, ETH_ADDRESS, ReserveId, ReserveType, TradeRequest, is_eth},
};

/// Error type for network operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("zero src qty")]
    ZeroSrcQty,

    #[error("unknown token {token}")]
    UnknownToken { token: Address },

    #[error("no liquidity for {src} -> {dest}")]
    NoLiquidity { src: Address, dest: Address },

    #[error("rate {rate} below min conversion rate {min_rate}")]
    MinRateNotMet { rate: U256, min_rate: U256 },

    #[error("taker holds {balance} of {token}, {required} required")]
    InsufficientBalance {
        token: Address,
        balance: U256,
        required: U256,
    },

    #[error("reserve {address} is registered but not deployed")]
    UnknownReserve { address: Address },

    #[error("reserve {address} delivered {delivered}, {expected} expected")]
    ReserveShortfall {
        address: Address,
        delivered: U256,
        expected: U256,
    },

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("reserve error: {0}")]
    Reserve(#[from] ReserveError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Rates of [`Network::get_expected_rate`], zero without liquidity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpectedRate {
    pub rate_with_network_fee: U256,
    pub rate_with_all_fees: U256,
}

/// Settled trade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeReceipt {
    pub taker: Address,
    pub src: Address,
    pub dest: Address,
    pub dest_address: Address,
    /// Source taken from the taker.
    pub src_amount: U256,
    /// Destination sent to `dest_address`.
    pub dest_amount: U256,
    pub trade_wei: U256,
    pub network_fee_wei: U256,
    pub platform_fee_wei: U256,
    pub rate_with_all_fees: U256,
    pub t2e_ids: Vec<ReserveId>,
    pub e2t_ids: Vec<ReserveId>,
}

#[derive(Debug)]
pub struct Network {
    /// Ledger account holding assets between the two legs.
    address: Address,
    registry: ReserveRegistry,
    reserves: ReserveSet,
    engine: MatchingEngine,
    network_fee_bps: Bps,
    fee_wallet: Address,
    decimals: HashMap<Address, u8>,
}

impl Network {
    pub fn new(
        address: Address,
        engine: MatchingEngine,
        network_fee_bps: Bps,
        fee_wallet: Address,
    ) -> NetworkResult<Self> {
        validate_fees(network_fee_bps, 0)?;
        Ok(Self {
            address,
            registry: ReserveRegistry::new(),
            reserves: ReserveSet::new(),
            engine,
            network_fee_bps,
            fee_wallet,
            decimals: HashMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> &ReserveRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ReserveRegistry {
        &mut self.registry
    }

    pub fn reserves(&self) -> &ReserveSet {
        &self.reserves
    }

    pub fn reserves_mut(&mut self) -> &mut ReserveSet {
        &mut self.reserves
    }

    pub fn engine_mut(&mut self) -> &mut MatchingEngine {
        &mut self.engine
    }

    pub fn network_fee_bps(&self) -> Bps {
        self.network_fee_bps
    }

    pub fn fee_wallet(&self) -> Address {
        self.fee_wallet
    }

    pub fn set_network_fee_bps(&mut self, network_fee_bps: Bps) -> NetworkResult<()> {
        validate_fees(network_fee_bps, 0)?;
        self.network_fee_bps = network_fee_bps;
        info!(network_fee_bps, "network fee set");
        Ok(())
    }

    /// Records the decimals of `token`. ETH always has [`ETH_DECIMALS`].
    pub fn set_token_decimals(&mut self, token: Address, decimals: u8) {
        self.decimals.insert(token, decimals);
    }

    pub fn token_decimals(&self, token: Address) -> Option<u8> {
        if is_eth(token) {
            return Some(ETH_DECIMALS);
        }
        self.decimals.get(&token).copied()
    }

    /// Registers and deploys `reserve`.
    pub fn add_reserve(
        &mut self,
        reserve: impl Reserve + 'static,
        id: ReserveId,
        reserve_type: ReserveType,
    ) -> NetworkResult<()> {
        self.registry
            .add_reserve(reserve.address(), id, reserve_type)?;
        self.reserves.insert(reserve);
        Ok(())
    }

    /// Unregisters and undeploys the reserve at `address`.
    pub fn remove_reserve(&mut self, address: Address) -> NetworkResult<Box<dyn Reserve>> {
        self.registry.remove_reserve(address)?;
        self.reserves
            .remove(address)
            .ok_or(NetworkError::UnknownReserve { address })
    }

    /// Quotes `src_qty` of `src` into `dest` with the current network fee.
    pub fn calc_rates_and_amounts(
        &self,
        src: Address,
        dest: Address,
        src_qty: U256,
        platform_fee_bps: Bps,
        hint: &[u8],
        block: BlockContext,
    ) -> NetworkResult<RatesAndAmounts> {
        let info = TradeInfo {
            src_qty,
            network_fee_bps: self.network_fee_bps,
            platform_fee_bps,
        };
        let rates = self.engine.calc_rates_and_amounts(
            &self.registry,
            &self.reserves,
            src,
            dest,
            self.decimals_of(src)?,
            self.decimals_of(dest)?,
            info,
            hint,
            block,
        )?;
        Ok(rates)
    }

    pub fn get_expected_rate(
        &self,
        src: Address,
        dest: Address,
        src_qty: U256,
        platform_fee_bps: Bps,
        hint: &[u8],
        block: BlockContext,
    ) -> NetworkResult<ExpectedRate> {
        let rates =
            self.calc_rates_and_amounts(src, dest, src_qty, platform_fee_bps, hint, block)?;
        Ok(ExpectedRate {
            rate_with_network_fee: rates.rate_with_network_fee,
            rate_with_all_fees: rates.rate_with_all_fees,
        })
    }

    /// Executes `request` for `taker`, all or nothing.
    pub fn trade<L>(
        &mut self,
        taker: Address,
        request: &TradeRequest,
        ledger: &mut L,
        block: BlockContext,
    ) -> NetworkResult<TradeReceipt>
    where
        L: AssetLedger + Clone,
    {
        let (src, dest) = (request.src(), request.dest());
        if request.src_qty().is_zero() {
            return Err(NetworkError::ZeroSrcQty);
        }

        let mut rates = self.calc_rates_and_amounts(
            src,
            dest,
            request.src_qty(),
            request.platform_fee_bps(),
            request.hint(),
            block,
        )?;
        if rates.actual_dest_amount.is_zero() {
            return Err(NetworkError::NoLiquidity { src, dest });
        }
        if rates.rate_with_all_fees < request.min_conversion_rate() {
            return Err(NetworkError::MinRateNotMet {
                rate: rates.rate_with_all_fees,
                min_rate: request.min_conversion_rate(),
            });
        }
        let src_amount = rates.cap_to_max_dest(request.max_dest_amount())?;

        let balance = ledger.balance_of(src, taker);
        if balance < src_amount {
            return Err(NetworkError::InsufficientBalance {
                token: src,
                balance,
                required: src_amount,
            });
        }

        let mut reserves = self.reserves.clone();
        let mut staged = ledger.clone();
        let network_fee_wei = self.settle(
            &mut reserves,
            &mut staged,
            taker,
            request,
            &rates,
            src_amount,
        )?;
        self.reserves = reserves;
        *ledger = staged;

        let receipt = TradeReceipt {
            taker,
            src,
            dest,
            dest_address: request.dest_address(),
            src_amount,
            dest_amount: rates.actual_dest_amount,
            trade_wei: rates.trade_wei,
            network_fee_wei,
            platform_fee_wei: rates.platform_fee_wei,
            rate_with_all_fees: rates.rate_with_all_fees,
            t2e_ids: rates.t2e.iter().map(|slice| slice.id).collect(),
            e2t_ids: rates.e2t.iter().map(|slice| slice.id).collect(),
        };
        info!(
            %taker, %src, %dest,
            src_amount = %receipt.src_amount,
            dest_amount = %receipt.dest_amount,
            network_fee_wei = %receipt.network_fee_wei,
            "trade executed"
        );
        Ok(receipt)
    }

    /// Moves the assets of a quoted trade. Returns the network fee paid.
    fn settle<L: AssetLedger>(
        &self,
        reserves: &mut ReserveSet,
        ledger: &mut L,
        taker: Address,
        request: &TradeRequest,
        rates: &RatesAndAmounts,
        src_amount: U256,
    ) -> NetworkResult<U256> {
        let (src, dest) = (request.src(), request.dest());
        ledger.transfer(src, taker, self.address, src_amount)?;

        let eth_in = if is_eth(src) {
            src_amount
        } else {
            self.trade_leg(reserves, ledger, &rates.t2e, src, ETH_ADDRESS)?
        };

        let (eth_out, dest_in) = if is_eth(dest) {
            (rates.actual_dest_amount, rates.actual_dest_amount)
        } else {
            let eth_out: U256 = rates.e2t.iter().map(|slice| slice.src_amount).sum();
            let dest_in = self.trade_leg(reserves, ledger, &rates.e2t, ETH_ADDRESS, dest)?;
            (eth_out, dest_in)
        };
        if dest_in < rates.actual_dest_amount {
            return Err(NetworkError::ReserveShortfall {
                address: self.address,
                delivered: dest_in,
                expected: rates.actual_dest_amount,
            });
        }

        let platform_fee_wei = rates.platform_fee_wei;
        ledger.transfer(
            ETH_ADDRESS,
            self.address,
            request.platform_wallet(),
            platform_fee_wei,
        )?;
        // Rounding of the per reserve fee deductions may leave less than the
        // nominal fee.
        let network_fee_wei = eth_in
            .saturating_sub(eth_out)
            .saturating_sub(platform_fee_wei)
            .min(rates.network_fee_wei);
        ledger.transfer(ETH_ADDRESS, self.address, self.fee_wallet, network_fee_wei)?;

        ledger.transfer(
            dest,
            self.address,
            request.dest_address(),
            rates.actual_dest_amount,
        )?;
        Ok(network_fee_wei)
    }

    /// Trades every slice of a leg, returning the destination amount
    /// received by the network.
    fn trade_leg<L: AssetLedger>(
        &self,
        reserves: &mut ReserveSet,
        ledger: &mut L,
        slices: &[ReserveSlice],
        src: Address,
        dest: Address,
    ) -> NetworkResult<U256> {
        let mut received = U256::ZERO;
        for slice in slices {
            let reserve = reserves
                .get_mut(slice.address)
                .ok_or(NetworkError::UnknownReserve {
                    address: slice.address,
                })?;
            ledger.transfer(src, self.address, slice.address, slice.src_amount)?;
            let delivered = reserve.trade(src, slice.src_amount, dest, slice.rate, true)?;
            if delivered < slice.dest_amount {
                return Err(NetworkError::ReserveShortfall {
                    address: slice.address,
                    delivered,
                    expected: slice.dest_amount,
                });
            }
            ledger.transfer(dest, slice.address, self.address, delivered)?;
            debug!(reserve = %slice.address, src_amount = %slice.src_amount, %delivered, "reserve traded");
            received += delivered;
        }
        Ok(received)
    }

    fn decimals_of(&self, token: Address) -> NetworkResult<u8> {
        self.token_decimals(token)
            .ok_or(NetworkError::UnknownToken { token })
    }
}
