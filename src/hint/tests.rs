//! Tests for hint building and parsing.

use alloy::primitives::{Address, U256};
use alloy_sol_types::SolValue;

use super::*;
use crate::types::{ETH_ADDRESS, ReserveType};

const TOKEN: Address = Address::with_last_byte(0x70);
const OTHER_TOKEN: Address = Address::with_last_byte(0x71);

fn reserve(n: u8) -> Address {
    Address::with_last_byte(n)
}

fn id(n: u8) -> ReserveId {
    ReserveId::from([0xaa, 0, 0, 0, 0, 0, 0, n])
}

/// Reserves 1..=3 listed both ways for TOKEN, reserve 4 only ETH -> OTHER_TOKEN.
fn registry() -> ReserveRegistry {
    let mut registry = ReserveRegistry::new();
    registry.set_fee_paying_per_reserve_type(true, true, false, false, true, true);
    for n in 1..=4 {
        registry.add_reserve(reserve(n), id(n), ReserveType::Fpr).unwrap();
    }
    for n in 1..=3 {
        registry
            .list_pair_for_reserve(reserve(n), TOKEN, true, true, true)
            .unwrap();
    }
    registry
        .list_pair_for_reserve(reserve(4), OTHER_TOKEN, true, false, true)
        .unwrap();
    registry
}

fn raw(hint_type: u64, ids: &[ReserveId], splits: &[u64]) -> Vec<u8> {
    let splits: Vec<U256> = splits.iter().map(|bps| U256::from(*bps)).collect();
    (U256::from(hint_type), ids.to_vec(), splits).abi_encode_params()
}

fn split(ids: &[ReserveId], bps: &[Bps]) -> TradeHint {
    TradeHint::Split {
        ids: ids.to_vec(),
        bps: bps.to_vec(),
    }
}

/// Asserts a single leg hint parses to an error on both sides.
macro_rules! assert_parse_err {
    ($registry:expr, $data:expr => $err:expr) => {
        assert_eq!(parse_token_to_eth_hint(&$registry, TOKEN, &$data), Err($err));
        assert_eq!(parse_eth_to_token_hint(&$registry, TOKEN, &$data), Err($err));
    };
}

// ============================================================================
// HINT CONSTRUCTION
// ============================================================================

#[test]
fn hint_type_from_code() {
    assert_eq!(HintType::try_from(U256::ZERO), Ok(HintType::BestOfAll));
    assert_eq!(HintType::try_from(U256::from(3)), Ok(HintType::Split));
    for code in [U256::from(4), U256::from(256), U256::from(259), U256::MAX] {
        assert_eq!(
            HintType::try_from(code),
            Err(HintError::InvalidHintType { hint_type: code })
        );
    }
}

#[test]
fn new_rejects_extra_parts() {
    assert_eq!(
        TradeHint::new(HintType::BestOfAll, vec![id(1)], vec![]),
        Err(HintError::IdsAndSplitsMustBeEmpty)
    );
    assert_eq!(
        TradeHint::new(HintType::BestOfAll, vec![], vec![BPS]),
        Err(HintError::IdsAndSplitsMustBeEmpty)
    );
    assert_eq!(
        TradeHint::new(HintType::MaskIn, vec![], vec![]),
        Err(HintError::EmptyReserveIds)
    );
    assert_eq!(
        TradeHint::new(HintType::MaskIn, vec![id(1)], vec![BPS]),
        Err(HintError::SplitsMustBeEmpty)
    );
    assert_eq!(
        TradeHint::new(HintType::MaskOut, vec![id(1)], vec![BPS]),
        Err(HintError::SplitsMustBeEmpty)
    );
    assert_eq!(
        TradeHint::new(HintType::MaskOut, vec![], vec![]),
        Ok(TradeHint::MaskOut(vec![]))
    );
}

#[test]
fn validate_split_shape() {
    let registry = registry();
    let validate = |hint: TradeHint| hint.validate(&registry, TOKEN, TradeSide::TokenToEth);

    assert_eq!(validate(split(&[], &[])), Err(HintError::EmptyReserveIds));
    assert_eq!(
        validate(split(&[id(1), id(2)], &[BPS])),
        Err(HintError::SplitsLengthMismatch { ids: 2, splits: 1 })
    );
    assert_eq!(
        validate(split(&[id(1), id(2)], &[5000, 4999])),
        Err(HintError::TotalBps {
            total: U256::from(9999)
        })
    );
    assert_eq!(
        validate(split(&[id(1), id(2)], &[u64::MAX, 10001])),
        Err(HintError::TotalBps {
            total: U256::from(u64::MAX) + U256::from(10001)
        })
    );
    assert_eq!(validate(split(&[id(2), id(1)], &[3000, 7000])), Ok(()));
}

#[test]
fn validate_rejects_duplicates_for_every_type() {
    let registry = registry();
    let validate = |hint: TradeHint| hint.validate(&registry, TOKEN, TradeSide::EthToToken);
    let err = Err(HintError::DuplicateReserveId { id: id(1) });

    assert_eq!(validate(TradeHint::MaskIn(vec![id(1), id(2), id(1)])), err);
    assert_eq!(validate(TradeHint::MaskOut(vec![id(1), id(1)])), err);
    assert_eq!(validate(split(&[id(1), id(1)], &[5000, 5000])), err);
}

#[test]
fn validate_checks_registry() {
    let registry = registry();

    assert_eq!(
        TradeHint::MaskIn(vec![id(9)]).validate(&registry, TOKEN, TradeSide::TokenToEth),
        Err(HintError::ReserveIdNotFound { id: id(9) })
    );
    // Reserve 4 only serves ETH -> OTHER_TOKEN.
    assert_eq!(
        TradeHint::MaskOut(vec![id(4)]).validate(&registry, TOKEN, TradeSide::EthToToken),
        Err(HintError::TokenNotListed {
            id: id(4),
            token: TOKEN
        })
    );
    assert_eq!(
        TradeHint::MaskIn(vec![id(4)]).validate(&registry, OTHER_TOKEN, TradeSide::TokenToEth),
        Err(HintError::TokenNotListed {
            id: id(4),
            token: OTHER_TOKEN
        })
    );
    assert_eq!(
        TradeHint::MaskIn(vec![id(4)]).validate(&registry, OTHER_TOKEN, TradeSide::EthToToken),
        Ok(())
    );
}

#[test]
fn removed_reserve_not_found() {
    let mut registry = registry();
    registry.remove_reserve(reserve(2)).unwrap();
    assert_eq!(
        build_token_to_eth_hint(&registry, TOKEN, TradeHint::MaskIn(vec![id(2)])),
        Err(HintError::ReserveIdNotFound { id: id(2) })
    );
}

// ============================================================================
// BUILD AND PARSE
// ============================================================================

#[test]
fn empty_hint_is_best_of_all() {
    let registry = registry();
    assert_eq!(
        parse_token_to_eth_hint(&registry, TOKEN, &[]),
        Ok(TradeHint::BestOfAll)
    );
    assert_eq!(
        parse_eth_to_token_hint(&registry, TOKEN, &[]),
        Ok(TradeHint::BestOfAll)
    );
    assert_eq!(
        parse_token_to_token_hint(&registry, TOKEN, OTHER_TOKEN, &[]),
        Ok((TradeHint::BestOfAll, TradeHint::BestOfAll))
    );
}

#[test]
fn build_encodes_wire_layout() {
    let registry = registry();
    let data =
        build_token_to_eth_hint(&registry, TOKEN, TradeHint::MaskIn(vec![id(3), id(1)])).unwrap();
    assert_eq!(data.as_ref(), raw(1, &[id(3), id(1)], &[]).as_slice());

    let data = build_eth_to_token_hint(&registry, TOKEN, TradeHint::BestOfAll).unwrap();
    assert_eq!(data.as_ref(), raw(0, &[], &[]).as_slice());
}

#[test]
fn build_sorts_split_ids() {
    let registry = registry();
    let hint = split(&[id(3), id(1), id(2)], &[1000, 2000, 7000]);

    let data = build_eth_to_token_hint(&registry, TOKEN, hint).unwrap();
    assert_eq!(
        data.as_ref(),
        raw(3, &[id(1), id(2), id(3)], &[2000, 7000, 1000]).as_slice()
    );
    assert_eq!(
        parse_eth_to_token_hint(&registry, TOKEN, &data),
        Ok(split(&[id(1), id(2), id(3)], &[2000, 7000, 1000]))
    );
}

#[test]
fn build_then_parse_mask_hints() {
    let registry = registry();
    for hint in [
        TradeHint::BestOfAll,
        TradeHint::MaskIn(vec![id(2)]),
        TradeHint::MaskOut(vec![]),
        TradeHint::MaskOut(vec![id(3), id(1)]),
    ] {
        let data = build_token_to_eth_hint(&registry, TOKEN, hint.clone()).unwrap();
        assert_eq!(parse_token_to_eth_hint(&registry, TOKEN, &data), Ok(hint));
    }
}

#[test]
fn parse_rejects_malformed_hints() {
    let registry = registry();

    assert_parse_err!(
        registry,
        raw(4, &[], &[]) => HintError::InvalidHintType { hint_type: U256::from(4) }
    );
    // Codes wider than a byte are not truncated onto valid ones.
    assert_parse_err!(
        registry,
        raw(256, &[], &[]) => HintError::InvalidHintType { hint_type: U256::from(256) }
    );
    assert_parse_err!(
        registry,
        raw(257, &[id(1)], &[]) => HintError::InvalidHintType { hint_type: U256::from(257) }
    );
    assert_parse_err!(registry, raw(0, &[id(1)], &[]) => HintError::IdsAndSplitsMustBeEmpty);
    assert_parse_err!(registry, raw(1, &[], &[]) => HintError::EmptyReserveIds);
    assert_parse_err!(registry, raw(2, &[id(1)], &[BPS]) => HintError::SplitsMustBeEmpty);
    assert_parse_err!(registry, raw(3, &[], &[]) => HintError::EmptyReserveIds);
    assert_parse_err!(
        registry,
        raw(3, &[id(1)], &[5000, 5000]) => HintError::SplitsLengthMismatch { ids: 1, splits: 2 }
    );
    assert_parse_err!(
        registry,
        raw(3, &[id(1), id(2)], &[5000, 5001]) => HintError::TotalBps { total: U256::from(10001) }
    );
    assert_parse_err!(
        registry,
        raw(3, &[id(2), id(2)], &[5000, 5000]) => HintError::DuplicateReserveId { id: id(2) }
    );
    assert_parse_err!(
        registry,
        raw(3, &[id(2), id(1)], &[5000, 5000]) => HintError::NotIncreasing { id: id(1) }
    );
    assert_parse_err!(registry, raw(1, &[id(7)], &[]) => HintError::ReserveIdNotFound { id: id(7) });
}

#[test]
fn parse_rejects_oversized_split() {
    let registry = registry();
    let data = (
        U256::from(3),
        vec![id(1), id(2)],
        vec![U256::MAX, U256::from(BPS)],
    )
        .abi_encode_params();
    assert!(matches!(
        parse_token_to_eth_hint(&registry, TOKEN, &data),
        Err(HintError::TotalBps { .. })
    ));
}

#[test]
fn parse_rejects_garbage() {
    let registry = registry();
    assert!(matches!(
        parse_token_to_eth_hint(&registry, TOKEN, &[0xde, 0xad]),
        Err(HintError::Decode(_))
    ));
}

// ============================================================================
// TOKEN TO TOKEN
// ============================================================================

#[test]
fn token_to_token_round_trip() {
    let registry = registry();
    let t2e = split(&[id(2), id(1)], &[4000, 6000]);
    let e2t = TradeHint::MaskIn(vec![id(4)]);

    let data =
        build_token_to_token_hint(&registry, TOKEN, t2e, OTHER_TOKEN, e2t.clone()).unwrap();
    assert_eq!(
        parse_token_to_token_hint(&registry, TOKEN, OTHER_TOKEN, &data),
        Ok((split(&[id(1), id(2)], &[6000, 4000]), e2t))
    );
}

#[test]
fn token_to_token_checks_each_leg() {
    let registry = registry();
    assert_eq!(
        build_token_to_token_hint(
            &registry,
            TOKEN,
            TradeHint::BestOfAll,
            OTHER_TOKEN,
            TradeHint::MaskIn(vec![id(1)]),
        ),
        Err(HintError::TokenNotListed {
            id: id(1),
            token: OTHER_TOKEN
        })
    );
    assert_eq!(
        build_token_to_token_hint(
            &registry,
            OTHER_TOKEN,
            TradeHint::MaskOut(vec![id(4)]),
            TOKEN,
            TradeHint::BestOfAll,
        ),
        Err(HintError::TokenNotListed {
            id: id(4),
            token: OTHER_TOKEN
        })
    );
}

#[test]
fn decode_by_trade_direction() {
    let registry = registry();
    let hint = TradeHint::MaskIn(vec![id(1)]);
    let single = build_token_to_eth_hint(&registry, TOKEN, hint.clone()).unwrap();

    let hints = TradeHints::decode(&registry, TOKEN, ETH_ADDRESS, &single).unwrap();
    assert_eq!(hints, TradeHints::TokenToEth(hint.clone()));
    assert_eq!(hints.leg(TradeSide::TokenToEth), Some(&hint));
    assert_eq!(hints.leg(TradeSide::EthToToken), None);

    let hints = TradeHints::decode(&registry, ETH_ADDRESS, TOKEN, &single).unwrap();
    assert_eq!(hints.leg(TradeSide::EthToToken), Some(&hint));

    let hints = TradeHints::decode(&registry, TOKEN, OTHER_TOKEN, &[]).unwrap();
    assert_eq!(hints.leg(TradeSide::TokenToEth), Some(&TradeHint::BestOfAll));
    assert_eq!(hints.leg(TradeSide::EthToToken), Some(&TradeHint::BestOfAll));

    assert_eq!(
        TradeHints::decode(&registry, ETH_ADDRESS, ETH_ADDRESS, &[]),
        Err(HintError::InvalidPair {
            src: ETH_ADDRESS,
            dest: ETH_ADDRESS
        })
    );
}
