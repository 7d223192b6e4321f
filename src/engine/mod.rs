//! Matching engine.
//!
//! Resolves a trade into the reserves that serve it and the amounts each of
//! them handles. Token to token trades run as two legs, token -> ETH first,
//! then ETH -> token on the ETH left after fees.
//!
//! Per leg the decoded [`TradeHint`] selects the candidates:
//!
//! * best of all, mask in and mask out quote every candidate at the full leg
//!   amount and keep the one delivering the most, see [`MatchingEngine::set_negligible_rate_diff_bps`]
//!   for how near ties are broken;
//! * split quotes every reserve at its share of the amount and keeps all of
//!   them, a single zero quote empties the leg.
//!
//! Missing liquidity is not an error, the result just carries zero amounts.

mod entropy;
mod error;
mod fees;


pub use entropy::{BlockEntropy, Entropy, FixedEntropy};
pub use error::{EngineError, EngineResult};
pub use fees::{network_fee_wei, platform_fee_wei, validate_fees};

use alloy::primitives::{Address, U256};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    hint::{TradeHint, TradeHints},
    num::{
        BPS, ETH_DECIMALS, MAX_QTY, RateError, RateResult, apply_bps, calc_dst_qty,
        calc_rate_from_qty, calc_src_qty, mul_div, mul_div_up,
    },
    registry::{ReserveDetails, ReserveRegistry},
    reserve::ReserveSet,
    types::{BlockContext, Bps, ETH_ADDRESS, ReserveId, TradeSide, is_eth},
};

/// Amount and fees of a quote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TradeInfo {
    pub src_qty: U256,
    pub network_fee_bps: Bps,
    pub platform_fee_bps: Bps,
}

/// Share of a leg handled by one reserve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReserveSlice {
    pub address: Address,
    pub id: ReserveId,
    pub rate: U256,
    /// Share of the leg, [`BPS`] unless the leg is split.
    pub split_bps: Bps,
    pub is_fee_paying: bool,
    pub src_amount: U256,
    pub dest_amount: U256,
}

/// Outcome of [`MatchingEngine::calc_rates_and_amounts`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RatesAndAmounts {
    /// ETH value of the trade.
    pub trade_wei: U256,
    pub network_fee_wei: U256,
    pub platform_fee_wei: U256,
    pub actual_dest_amount: U256,
    /// Rate net of network fees only.
    pub rate_with_network_fee: U256,
    pub rate_with_all_fees: U256,
    /// Split share routed through fee paying reserves, summed over both legs.
    pub fee_paying_bps: Bps,
    /// Token -> ETH leg, empty for ETH sources.
    pub t2e: Vec<ReserveSlice>,
    /// ETH -> token leg, empty for ETH destinations.
    pub e2t: Vec<ReserveSlice>,
    info: TradeInfo,
    src_decimals: u8,
    dest_decimals: u8,
}

impl RatesAndAmounts {
    /// `[trade_wei, network_fee_wei, platform_fee_wei, actual_dest_amount,
    /// rate_with_network_fee, rate_with_all_fees, fee_paying_bps]`
    pub fn results(&self) -> [U256; 7] {
        [
            self.trade_wei,
            self.network_fee_wei,
            self.platform_fee_wei,
            self.actual_dest_amount,
            self.rate_with_network_fee,
            self.rate_with_all_fees,
            U256::from(self.fee_paying_bps),
        ]
    }

    pub fn info(&self) -> TradeInfo {
        self.info
    }

    /// Reserves of both legs, token -> ETH first.
    pub fn reserves(&self) -> impl Iterator<Item = &ReserveSlice> {
        self.t2e.iter().chain(&self.e2t)
    }

    /// ETH left for the destination leg once fees are taken.
    pub fn actual_src_wei(&self) -> U256 {
        self.trade_wei
            .saturating_sub(self.network_fee_wei)
            .saturating_sub(self.platform_fee_wei)
    }

    /// Source amount the trade consumes.
    pub fn src_amount(&self) -> U256 {
        if self.t2e.is_empty() {
            self.trade_wei
        } else {
            self.t2e.iter().map(|slice| slice.src_amount).sum()
        }
    }

    /// Shrinks the trade so that it delivers `max_dest_amount`, returning the
    /// source amount needed. Does nothing if the trade delivers less.
    ///
    /// Reserve amounts are recomputed at the quoted rates. When a reserve
    /// would need more than it was quoted for, that leg keeps its amounts.
    pub fn cap_to_max_dest(&mut self, max_dest_amount: U256) -> EngineResult<U256> {
        if self.actual_dest_amount <= max_dest_amount {
            return Ok(self.src_amount());
        }
        self.actual_dest_amount = max_dest_amount;

        let trade_wei_after_fees = if self.e2t.is_empty() {
            max_dest_amount
        } else {
            fit_src_amounts(
                &mut self.e2t,
                max_dest_amount,
                ETH_DECIMALS,
                self.dest_decimals,
            )?
        };

        let bps = U256::from(BPS);
        let kept = (bps * bps)
            .saturating_sub(U256::from(self.info.network_fee_bps) * U256::from(self.fee_paying_bps))
            .saturating_sub(U256::from(self.info.platform_fee_bps) * bps);
        let trade_wei = mul_div_up(trade_wei_after_fees, bps * bps, kept);
        if trade_wei < self.trade_wei {
            self.trade_wei = trade_wei;
        }
        self.refresh_fees();

        let src_amount = if self.t2e.is_empty() {
            self.trade_wei
        } else {
            fit_src_amounts(
                &mut self.t2e,
                self.trade_wei,
                self.src_decimals,
                ETH_DECIMALS,
            )?
        };
        debug!(%max_dest_amount, %src_amount, trade_wei = %self.trade_wei, "trade capped");
        Ok(src_amount)
    }

    fn refresh_fees(&mut self) {
        self.network_fee_wei = network_fee_wei(
            self.trade_wei,
            self.info.network_fee_bps,
            self.fee_paying_bps,
        );
        self.platform_fee_wei = platform_fee_wei(self.trade_wei, self.info.platform_fee_bps);
    }
}

/// Resolves trades against the registered reserves.
#[derive(Debug)]
pub struct MatchingEngine {
    negligible_rate_diff_bps: Bps,
    entropy: Box<dyn Entropy>,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(BlockEntropy)
    }
}

impl MatchingEngine {
    pub fn new(entropy: impl Entropy + 'static) -> Self {
        Self {
            negligible_rate_diff_bps: 0,
            entropy: Box::new(entropy),
        }
    }

    pub fn negligible_rate_diff_bps(&self) -> Bps {
        self.negligible_rate_diff_bps
    }

    /// Destination amounts within `bps` of the best one count as ties; the
    /// winner among them is picked by entropy.
    pub fn set_negligible_rate_diff_bps(&mut self, bps: Bps) -> EngineResult<()> {
        if bps > BPS {
            return Err(EngineError::NegligibleRateDiffHigh { bps });
        }
        self.negligible_rate_diff_bps = bps;
        Ok(())
    }

    /// Quotes a `src` -> `dest` trade of `info.src_qty`.
    #[allow(clippy::too_many_arguments)]
    pub fn calc_rates_and_amounts(
        &self,
        registry: &ReserveRegistry,
        reserves: &ReserveSet,
        src: Address,
        dest: Address,
        src_decimals: u8,
        dest_decimals: u8,
        info: TradeInfo,
        hint: &[u8],
        block: BlockContext,
    ) -> EngineResult<RatesAndAmounts> {
        if src == dest {
            return Err(EngineError::SameToken { token: src });
        }
        validate_fees(info.network_fee_bps, info.platform_fee_bps)?;
        if info.src_qty > MAX_QTY {
            return Err(RateError::SrcQtyTooHigh { qty: info.src_qty }.into());
        }
        let hints = TradeHints::decode(registry, src, dest, hint)
            .inspect_err(|err| warn!(%err, %src, %dest, "hint rejected"))?;

        let mut result = RatesAndAmounts {
            info,
            src_decimals,
            dest_decimals,
            ..Default::default()
        };
        let quote = Quote { reserves, block };

        if is_eth(src) {
            result.trade_wei = info.src_qty;
        } else {
            let hint = leg_hint(&hints, TradeSide::TokenToEth);
            let candidates = self.trading_reserves(registry, src, TradeSide::TokenToEth, hint)?;
            let amounts = candidates.amounts(info.src_qty);
            result.t2e = self.resolve_leg(
                &quote,
                candidates,
                amounts,
                (src, src_decimals),
                (ETH_ADDRESS, ETH_DECIMALS),
                info.network_fee_bps,
            )?;
            result.trade_wei = result.t2e.iter().map(|slice| slice.dest_amount).sum();
        }
        if result.trade_wei.is_zero() {
            return Ok(result);
        }
        result.fee_paying_bps = fee_paying_bps(&result.t2e);
        result.refresh_fees();

        if is_eth(dest) {
            result.actual_dest_amount = result.actual_src_wei();
        } else {
            let hint = leg_hint(&hints, TradeSide::EthToToken);
            let candidates = self.trading_reserves(registry, dest, TradeSide::EthToToken, hint)?;
            let network_fee = apply_bps(result.trade_wei, info.network_fee_bps);
            let amounts = candidates
                .amounts(result.actual_src_wei())
                .into_iter()
                .zip(&candidates.reserves)
                .map(|(amount, (details, bps))| {
                    if details.is_fee_paying {
                        amount.saturating_sub(apply_bps(network_fee, *bps))
                    } else {
                        amount
                    }
                })
                .collect();
            result.e2t = self.resolve_leg(
                &quote,
                candidates,
                amounts,
                (ETH_ADDRESS, ETH_DECIMALS),
                (dest, dest_decimals),
                0,
            )?;
            result.actual_dest_amount = result.e2t.iter().map(|slice| slice.dest_amount).sum();
            result.fee_paying_bps += fee_paying_bps(&result.e2t);
        }
        if result.actual_dest_amount.is_zero() {
            return Ok(result);
        }
        result.refresh_fees();

        let qty_after_platform_fee = apply_bps(info.src_qty, BPS - info.platform_fee_bps);
        result.rate_with_network_fee = if qty_after_platform_fee.is_zero() {
            U256::ZERO
        } else {
            calc_rate_from_qty(
                qty_after_platform_fee,
                result.actual_dest_amount,
                src_decimals,
                dest_decimals,
            )?
        };
        result.rate_with_all_fees = calc_rate_from_qty(
            info.src_qty,
            result.actual_dest_amount,
            src_decimals,
            dest_decimals,
        )?;
        debug!(
            %src, %dest,
            src_qty = %info.src_qty,
            trade_wei = %result.trade_wei,
            actual_dest_amount = %result.actual_dest_amount,
            "rates and amounts"
        );
        Ok(result)
    }

    /// Reserves the hint allows for `token` on `side`.
    fn trading_reserves(
        &self,
        registry: &ReserveRegistry,
        token: Address,
        side: TradeSide,
        hint: &TradeHint,
    ) -> EngineResult<Candidates> {
        let listed = registry.reserves_for(token, side);
        let details = |address: &Address| registry.reserve_details(*address);
        let candidates = match hint {
            TradeHint::BestOfAll => Candidates::best_of(listed.iter().filter_map(details)),
            TradeHint::MaskIn(ids) => Candidates::best_of(
                ids.iter()
                    .filter_map(|id| registry.reserve_details_by_id(*id)),
            ),
            TradeHint::MaskOut(ids) => {
                if ids.len() > listed.len() {
                    return Err(EngineError::MaskOutTooLong {
                        masked: ids.len(),
                        available: listed.len(),
                    });
                }
                Candidates::best_of(
                    listed
                        .iter()
                        .filter_map(details)
                        .filter(|details| !ids.contains(&details.id)),
                )
            }
            TradeHint::Split { ids, bps } => Candidates {
                reserves: ids
                    .iter()
                    .zip(bps)
                    .filter_map(|(id, bps)| {
                        registry
                            .reserve_details_by_id(*id)
                            .map(|details| (details, *bps))
                    })
                    .collect(),
                split: true,
            },
        };
        Ok(candidates)
    }

    /// Quotes every candidate at its amount and keeps the reserves that
    /// trade. Candidates rank by destination amount, `rank_fee_bps`
    /// discounts the amount of fee paying reserves.
    fn resolve_leg(
        &self,
        quote: &Quote<'_>,
        candidates: Candidates,
        amounts: Vec<U256>,
        (src, src_decimals): (Address, u8),
        (dest, dest_decimals): (Address, u8),
        rank_fee_bps: Bps,
    ) -> EngineResult<Vec<ReserveSlice>> {
        let rates: Vec<U256> = candidates
            .reserves
            .iter()
            .zip(&amounts)
            .map(|((details, _), amount)| {
                quote
                    .reserves
                    .conversion_rate(details.address, src, dest, *amount, quote.block)
            })
            .collect();

        let slice = |index: usize, split_bps: Bps| -> RateResult<ReserveSlice> {
            let (details, _) = candidates.reserves[index];
            let src_amount = amounts[index];
            Ok(ReserveSlice {
                address: details.address,
                id: details.id,
                rate: rates[index],
                split_bps,
                is_fee_paying: details.is_fee_paying,
                src_amount,
                dest_amount: calc_dst_qty(src_amount, src_decimals, dest_decimals, rates[index])?,
            })
        };

        let slices = if candidates.split {
            if rates.iter().any(U256::is_zero) {
                Vec::new()
            } else {
                candidates
                    .reserves
                    .iter()
                    .enumerate()
                    .map(|(index, (_, bps))| slice(index, *bps))
                    .collect::<RateResult<_>>()?
            }
        } else {
            let ranked: Vec<U256> = candidates
                .reserves
                .iter()
                .zip(amounts.iter().zip(&rates))
                .map(|((details, _), (amount, rate))| {
                    let dest_amount = calc_dst_qty(*amount, src_decimals, dest_decimals, *rate)
                        .unwrap_or_default();
                    if details.is_fee_paying {
                        apply_bps(dest_amount, BPS.saturating_sub(rank_fee_bps))
                    } else {
                        dest_amount
                    }
                })
                .collect();
            match self.pick_best(&ranked, quote.block) {
                Some(index) => vec![slice(index, BPS)?],
                None => Vec::new(),
            }
        };

        debug!(
            %src, %dest,
            candidates = candidates.reserves.len(),
            selected = ?slices.iter().map(|slice| slice.id).collect::<Vec<_>>(),
            "leg resolved"
        );
        Ok(slices)
    }

    /// Index of the first best non-zero amount. Amounts strictly above the
    /// negligible band floor join it as ties, entropy picks among them.
    fn pick_best(&self, amounts: &[U256], block: BlockContext) -> Option<usize> {
        let best_amount = amounts.iter().max().filter(|amount| !amount.is_zero())?;
        let best = amounts.iter().position(|amount| amount == best_amount)?;
        let threshold = mul_div(
            *best_amount,
            U256::from(BPS),
            U256::from(BPS + self.negligible_rate_diff_bps),
        );
        let tied: Vec<usize> = std::iter::once(best)
            .chain(
                amounts
                    .iter()
                    .positions(|amount| *amount > threshold)
                    .filter(|index| *index != best),
            )
            .collect();
        let pick = self.entropy.entropy(block) % U256::from(tied.len());
        tied.get(pick.saturating_to::<usize>()).copied()
    }
}

/// Reserves a quote reads from.
struct Quote<'a> {
    reserves: &'a ReserveSet,
    block: BlockContext,
}

/// Reserves a leg may trade through with their split shares.
struct Candidates {
    reserves: Vec<(ReserveDetails, Bps)>,
    split: bool,
}

impl Candidates {
    fn best_of(reserves: impl Iterator<Item = ReserveDetails>) -> Self {
        Self {
            reserves: reserves.map(|details| (details, BPS)).collect(),
            split: false,
        }
    }

    /// Amount quoted per reserve. Split shares round down, the last reserve
    /// takes the remainder.
    fn amounts(&self, total: U256) -> Vec<U256> {
        if !self.split {
            return vec![total; self.reserves.len()];
        }
        let mut left = total;
        let last = self.reserves.len().saturating_sub(1);
        self.reserves
            .iter()
            .enumerate()
            .map(|(index, (_, bps))| {
                let amount = if index == last {
                    left
                } else {
                    apply_bps(total, *bps).min(left)
                };
                left -= amount;
                amount
            })
            .collect()
    }
}

fn leg_hint(hints: &TradeHints, side: TradeSide) -> &TradeHint {
    const BEST_OF_ALL: &TradeHint = &TradeHint::BestOfAll;
    hints.leg(side).unwrap_or(BEST_OF_ALL)
}

fn fee_paying_bps(slices: &[ReserveSlice]) -> Bps {
    slices
        .iter()
        .filter(|slice| slice.is_fee_paying)
        .map(|slice| slice.split_bps)
        .sum()
}

/// Recomputes source amounts so that the slices deliver `dest_amount`,
/// sharing it by each slice's `src * rate` weight. Returns the new total
/// source amount, or the current one if any slice would grow.
fn fit_src_amounts(
    slices: &mut [ReserveSlice],
    dest_amount: U256,
    src_decimals: u8,
    dest_decimals: u8,
) -> RateResult<U256> {
    let weights: Vec<U256> = slices
        .iter()
        .map(|slice| slice.src_amount.saturating_mul(slice.rate))
        .collect();
    let total_weight = weights
        .iter()
        .fold(U256::ZERO, |total, weight| total.saturating_add(*weight));

    let mut left = dest_amount;
    let mut src_amounts = Vec::with_capacity(slices.len());
    for (index, (slice, weight)) in slices.iter().zip(&weights).enumerate() {
        let share = if index + 1 == slices.len() {
            left
        } else {
            mul_div(dest_amount, *weight, total_weight).min(left)
        };
        left -= share;
        let src_amount = calc_src_qty(share, src_decimals, dest_decimals, slice.rate)?;
        if src_amount > slice.src_amount {
            debug!(id = %slice.id, %src_amount, quoted = %slice.src_amount, "keeping quoted amounts");
            return Ok(slices.iter().map(|slice| slice.src_amount).sum());
        }
        src_amounts.push(src_amount);
    }

    for (slice, src_amount) in slices.iter_mut().zip(src_amounts) {
        slice.src_amount = src_amount;
        slice.dest_amount = calc_dst_qty(src_amount, src_decimals, dest_decimals, slice.rate)?;
    }
    Ok(slices.iter().map(|slice| slice.src_amount).sum())
}
