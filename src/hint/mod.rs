//! Trade hints.
//!
//! A hint narrows the reserves the matching engine considers for each leg of
//! a trade. Hints travel ABI encoded:
//!
//! * one leg (token -> ETH or ETH -> token):
//!   `abi.encode(uint8 hintType, bytes8[] reserveIds, uint256[] splits)`, the
//!   type read as a full word and rejected above 3;
//! * two legs (token -> token):
//!   `abi.encode(t2eType, t2eIds, t2eSplits, e2tType, e2tIds, e2tSplits)`.
//!
//! Empty bytes stand for [`TradeHint::BestOfAll`] on every leg.
//!
//! Builders sort split reserves by id, parsers expect them sorted.

mod error;

#[cfg(test)]
mod tests;

pub use error::{HintError, HintResult};

use alloy::primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use itertools::Itertools;

use crate::{
    num::BPS,
    registry::ReserveRegistry,
    types::{Bps, ReserveId, TradeSide, is_eth},
};

/// Wire code of a [`TradeHint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HintType {
    BestOfAll = 0,
    MaskIn = 1,
    MaskOut = 2,
    Split = 3,
}

impl TryFrom<U256> for HintType {
    type Error = HintError;

    /// Decodes the 256-bit ABI word, codes above [`HintType::Split`] are invalid.
    fn try_from(value: U256) -> Result<Self, Self::Error> {
        match value.try_into() {
            Ok(0u8) => Ok(HintType::BestOfAll),
            Ok(1u8) => Ok(HintType::MaskIn),
            Ok(2u8) => Ok(HintType::MaskOut),
            Ok(3u8) => Ok(HintType::Split),
            _ => Err(HintError::InvalidHintType { hint_type: value }),
        }
    }
}

/// Reserve selection for one leg of a trade.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TradeHint {
    /// Best quote among all listed reserves.
    #[default]
    BestOfAll,
    /// Best quote among exactly these reserves.
    MaskIn(Vec<ReserveId>),
    /// Best quote among listed reserves except these.
    MaskOut(Vec<ReserveId>),
    /// Trade through every reserve, `bps[i]` of the amount through `ids[i]`.
    Split { ids: Vec<ReserveId>, bps: Vec<Bps> },
}

type RawHint = (U256, Vec<ReserveId>, Vec<U256>);

impl TradeHint {
    /// Hint from its wire parts, rejecting ids or splits the type does not take.
    pub fn new(hint_type: HintType, ids: Vec<ReserveId>, splits: Vec<Bps>) -> HintResult<Self> {
        match hint_type {
            HintType::BestOfAll => {
                if !ids.is_empty() || !splits.is_empty() {
                    return Err(HintError::IdsAndSplitsMustBeEmpty);
                }
                Ok(TradeHint::BestOfAll)
            }
            HintType::MaskIn | HintType::MaskOut => {
                if hint_type == HintType::MaskIn && ids.is_empty() {
                    return Err(HintError::EmptyReserveIds);
                }
                if !splits.is_empty() {
                    return Err(HintError::SplitsMustBeEmpty);
                }
                Ok(match hint_type {
                    HintType::MaskIn => TradeHint::MaskIn(ids),
                    _ => TradeHint::MaskOut(ids),
                })
            }
            HintType::Split => Ok(TradeHint::Split { ids, bps: splits }),
        }
    }

    pub fn hint_type(&self) -> HintType {
        match self {
            TradeHint::BestOfAll => HintType::BestOfAll,
            TradeHint::MaskIn(_) => HintType::MaskIn,
            TradeHint::MaskOut(_) => HintType::MaskOut,
            TradeHint::Split { .. } => HintType::Split,
        }
    }

    pub fn reserve_ids(&self) -> &[ReserveId] {
        match self {
            TradeHint::BestOfAll => &[],
            TradeHint::MaskIn(ids) | TradeHint::MaskOut(ids) => ids,
            TradeHint::Split { ids, .. } => ids,
        }
    }

    /// Checks the hint shape and that every reserve is registered and listed
    /// for `token` on `side`.
    pub fn validate(
        &self,
        registry: &ReserveRegistry,
        token: Address,
        side: TradeSide,
    ) -> HintResult<()> {
        match self {
            TradeHint::BestOfAll | TradeHint::MaskOut(_) => {}
            TradeHint::MaskIn(ids) => {
                if ids.is_empty() {
                    return Err(HintError::EmptyReserveIds);
                }
            }
            TradeHint::Split { ids, bps } => {
                if ids.is_empty() {
                    return Err(HintError::EmptyReserveIds);
                }
                if ids.len() != bps.len() {
                    return Err(HintError::SplitsLengthMismatch {
                        ids: ids.len(),
                        splits: bps.len(),
                    });
                }
                let total: U256 = bps.iter().map(|bps| U256::from(*bps)).sum();
                if total != U256::from(BPS) {
                    return Err(HintError::TotalBps { total });
                }
            }
        }

        if let Some(id) = self.reserve_ids().iter().duplicates().next() {
            return Err(HintError::DuplicateReserveId { id: *id });
        }
        for id in self.reserve_ids() {
            let address = registry
                .reserve_address(*id)
                .ok_or(HintError::ReserveIdNotFound { id: *id })?;
            if !registry.is_listed(address, token, side) {
                return Err(HintError::TokenNotListed { id: *id, token });
            }
        }
        Ok(())
    }

    /// Split reserves ordered by id, other hints unchanged.
    fn sorted(self) -> Self {
        match self {
            TradeHint::Split { ids, bps } => {
                let (ids, bps) = ids.into_iter().zip(bps).sorted().unzip();
                TradeHint::Split { ids, bps }
            }
            other => other,
        }
    }

    fn check_sorted(&self) -> HintResult<()> {
        if let TradeHint::Split { ids, .. } = self {
            if let Some((_, id)) = ids.iter().tuple_windows().find(|(a, b)| a >= b) {
                return Err(HintError::NotIncreasing { id: *id });
            }
        }
        Ok(())
    }

    fn to_raw(&self) -> RawHint {
        let splits = match self {
            TradeHint::Split { bps, .. } => bps.iter().map(|bps| U256::from(*bps)).collect(),
            _ => Vec::new(),
        };
        (
            U256::from(self.hint_type() as u8),
            self.reserve_ids().to_vec(),
            splits,
        )
    }

    fn from_raw((hint_type, ids, splits): RawHint) -> HintResult<Self> {
        let splits = splits
            .into_iter()
            .map(|split| split.saturating_to::<Bps>())
            .collect();
        Self::new(HintType::try_from(hint_type)?, ids, splits)
    }
}

/// Decoded hint for every leg of a trade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TradeHints {
    TokenToEth(TradeHint),
    EthToToken(TradeHint),
    TokenToToken { t2e: TradeHint, e2t: TradeHint },
}

impl TradeHints {
    /// Decodes and validates the hint of a `src` -> `dest` trade.
    pub fn decode(
        registry: &ReserveRegistry,
        src: Address,
        dest: Address,
        data: &[u8],
    ) -> HintResult<Self> {
        match (is_eth(src), is_eth(dest)) {
            (false, true) => parse_token_to_eth_hint(registry, src, data).map(Self::TokenToEth),
            (true, false) => parse_eth_to_token_hint(registry, dest, data).map(Self::EthToToken),
            (false, false) => parse_token_to_token_hint(registry, src, dest, data)
                .map(|(t2e, e2t)| Self::TokenToToken { t2e, e2t }),
            (true, true) => Err(HintError::InvalidPair { src, dest }),
        }
    }

    /// Hint for the leg on `side`, `None` if the trade has no such leg.
    pub fn leg(&self, side: TradeSide) -> Option<&TradeHint> {
        match (self, side) {
            (TradeHints::TokenToEth(hint), TradeSide::TokenToEth)
            | (TradeHints::EthToToken(hint), TradeSide::EthToToken)
            | (TradeHints::TokenToToken { t2e: hint, .. }, TradeSide::TokenToEth)
            | (TradeHints::TokenToToken { e2t: hint, .. }, TradeSide::EthToToken) => Some(hint),
            _ => None,
        }
    }
}

pub fn build_token_to_eth_hint(
    registry: &ReserveRegistry,
    token_src: Address,
    hint: TradeHint,
) -> HintResult<Bytes> {
    hint.validate(registry, token_src, TradeSide::TokenToEth)?;
    Ok(hint.sorted().to_raw().abi_encode_params().into())
}

pub fn build_eth_to_token_hint(
    registry: &ReserveRegistry,
    token_dest: Address,
    hint: TradeHint,
) -> HintResult<Bytes> {
    hint.validate(registry, token_dest, TradeSide::EthToToken)?;
    Ok(hint.sorted().to_raw().abi_encode_params().into())
}

pub fn build_token_to_token_hint(
    registry: &ReserveRegistry,
    token_src: Address,
    t2e: TradeHint,
    token_dest: Address,
    e2t: TradeHint,
) -> HintResult<Bytes> {
    t2e.validate(registry, token_src, TradeSide::TokenToEth)?;
    e2t.validate(registry, token_dest, TradeSide::EthToToken)?;
    let (t2e_type, t2e_ids, t2e_splits) = t2e.sorted().to_raw();
    let (e2t_type, e2t_ids, e2t_splits) = e2t.sorted().to_raw();
    Ok((t2e_type, t2e_ids, t2e_splits, e2t_type, e2t_ids, e2t_splits)
        .abi_encode_params()
        .into())
}

pub fn parse_token_to_eth_hint(
    registry: &ReserveRegistry,
    token_src: Address,
    data: &[u8],
) -> HintResult<TradeHint> {
    parse_leg(registry, token_src, TradeSide::TokenToEth, data)
}

pub fn parse_eth_to_token_hint(
    registry: &ReserveRegistry,
    token_dest: Address,
    data: &[u8],
) -> HintResult<TradeHint> {
    parse_leg(registry, token_dest, TradeSide::EthToToken, data)
}

pub fn parse_token_to_token_hint(
    registry: &ReserveRegistry,
    token_src: Address,
    token_dest: Address,
    data: &[u8],
) -> HintResult<(TradeHint, TradeHint)> {
    if data.is_empty() {
        return Ok((TradeHint::BestOfAll, TradeHint::BestOfAll));
    }
    let (t2e_type, t2e_ids, t2e_splits, e2t_type, e2t_ids, e2t_splits) =
        <(U256, Vec<ReserveId>, Vec<U256>, U256, Vec<ReserveId>, Vec<U256>)>::abi_decode_params(data)?;
    let t2e = checked_leg(
        registry,
        token_src,
        TradeSide::TokenToEth,
        (t2e_type, t2e_ids, t2e_splits),
    )?;
    let e2t = checked_leg(
        registry,
        token_dest,
        TradeSide::EthToToken,
        (e2t_type, e2t_ids, e2t_splits),
    )?;
    Ok((t2e, e2t))
}

fn parse_leg(
    registry: &ReserveRegistry,
    token: Address,
    side: TradeSide,
    data: &[u8],
) -> HintResult<TradeHint> {
    if data.is_empty() {
        return Ok(TradeHint::BestOfAll);
    }
    checked_leg(registry, token, side, RawHint::abi_decode_params(data)?)
}

fn checked_leg(
    registry: &ReserveRegistry,
    token: Address,
    side: TradeSide,
    raw: RawHint,
) -> HintResult<TradeHint> {
    let hint = TradeHint::from_raw(raw)?;
    hint.validate(registry, token, side)?;
    hint.check_sorted()?;
    Ok(hint)
}
