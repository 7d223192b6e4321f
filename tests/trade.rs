//! End to end trades through the network against every reserve kind.

use alloy::primitives::{Address, U256};
use dex_aggregator::{
    engine::{FixedEntropy, MatchingEngine},
    hint::{TradeHint, build_token_to_eth_hint, build_token_to_token_hint},
    ledger::{AssetLedger, InMemoryLedger},
    network::{Network, NetworkError},
    num::PRECISION,
    orderbook::{OrderBookLimits, OrderBookReserve},
    reserve::{ConstantProductReserve, FixedRateReserve, Reserve},
    types::{BlockContext, ETH_ADDRESS, ReserveId, ReserveType, TradeRequest, TradeSide, reserve_id},
};

const NETWORK: Address = Address::with_last_byte(0xee);
const FEE_WALLET: Address = Address::with_last_byte(0xfe);
const TAKER: Address = Address::with_last_byte(0xa1);
const RECIPIENT: Address = Address::with_last_byte(0xa2);
const MAKER: Address = Address::with_last_byte(0xb1);

const TOKEN_A: Address = Address::with_last_byte(0x0a);
const TOKEN_B: Address = Address::with_last_byte(0x0b);

const FPR: Address = Address::with_last_byte(0x11);
const POOL: Address = Address::with_last_byte(0x22);
const BOOK: Address = Address::with_last_byte(0x33);

const E18: u128 = 1_000_000_000_000_000_000;

const ACCOUNTS: [Address; 8] = [NETWORK, FEE_WALLET, TAKER, RECIPIENT, MAKER, FPR, POOL, BOOK];

fn e18(n: u64) -> U256 {
    U256::from(n) * PRECISION
}

fn fpr_id() -> ReserveId {
    reserve_id(ReserveType::Fpr as u8, FPR)
}

fn book_id() -> ReserveId {
    reserve_id(ReserveType::Orderbook as u8, BOOK)
}

/// Network with 25 bps network fee and three reserves:
///
/// * fixed rate reserve for TOKEN_A at 100 A per ETH and 0.01 ETH per A;
/// * order book for TOKEN_A paying 5.5 ETH for 500 A (0.011 ETH per A);
/// * constant product pool of 1000 ETH against 2,000,000 TOKEN_B (6 decimals).
fn setup() -> (Network, InMemoryLedger) {
    let mut network = Network::new(
        NETWORK,
        MatchingEngine::new(FixedEntropy(U256::ZERO)),
        25,
        FEE_WALLET,
    )
    .unwrap();
    network
        .registry_mut()
        .set_fee_paying_per_reserve_type(true, true, false, false, true, true);
    network.set_token_decimals(TOKEN_A, 18);
    network.set_token_decimals(TOKEN_B, 6);
    let mut ledger = InMemoryLedger::new();

    let mut fpr = FixedRateReserve::new(FPR);
    fpr.set_rates(TOKEN_A, 18, e18(100), PRECISION / U256::from(100));
    for (asset, amount) in [(TOKEN_A, e18(1000)), (ETH_ADDRESS, e18(100))] {
        fpr.deposit(asset, amount);
        ledger.mint(asset, FPR, amount);
    }
    network.add_reserve(fpr, fpr_id(), ReserveType::Fpr).unwrap();

    let pool = ConstantProductReserve::new(
        POOL,
        TOKEN_B,
        6,
        e18(1000),
        U256::from(2_000_000_000_000u64),
        0,
    );
    ledger.mint(ETH_ADDRESS, POOL, e18(1000));
    ledger.mint(TOKEN_B, POOL, U256::from(2_000_000_000_000u64));
    network
        .add_reserve(pool, reserve_id(ReserveType::Apr as u8, POOL), ReserveType::Apr)
        .unwrap();

    let mut book = OrderBookReserve::new(
        BOOK,
        TOKEN_A,
        18,
        OrderBookLimits {
            min_order_size_wei: 0,
            max_orders_per_maker: 5,
        },
    );
    book.deposit(MAKER, ETH_ADDRESS, e18(100)).unwrap();
    ledger.mint(ETH_ADDRESS, BOOK, e18(100));
    book.submit_order(MAKER, TradeSide::TokenToEth, 500 * E18, 55 * E18 / 10, None)
        .unwrap();
    network
        .add_reserve(book, book_id(), ReserveType::Orderbook)
        .unwrap();

    for (reserve, token) in [(FPR, TOKEN_A), (POOL, TOKEN_B), (BOOK, TOKEN_A)] {
        network
            .registry_mut()
            .list_pair_for_reserve(reserve, token, true, true, true)
            .unwrap();
    }
    (network, ledger)
}

fn supply(ledger: &InMemoryLedger, token: Address) -> U256 {
    ACCOUNTS
        .iter()
        .map(|account| ledger.balance_of(token, *account))
        .sum()
}

/// Asserts that no asset was created or destroyed by the block.
macro_rules! assert_conserved {
    ($ledger:expr => $($body:tt)*) => {{
        let before: Vec<U256> = [ETH_ADDRESS, TOKEN_A, TOKEN_B]
            .iter()
            .map(|token| supply(&$ledger, *token))
            .collect();
        let result = { $($body)* };
        let after: Vec<U256> = [ETH_ADDRESS, TOKEN_A, TOKEN_B]
            .iter()
            .map(|token| supply(&$ledger, *token))
            .collect();
        assert_eq!(before, after, "supply changed");
        result
    }};
}

// ============================================================================
// TOKEN -> ETH
// ============================================================================

#[test]
fn best_rate_goes_to_order_book() {
    let (mut network, mut ledger) = setup();
    ledger.mint(TOKEN_A, TAKER, e18(100));
    let request = TradeRequest::new(TOKEN_A, e18(100), ETH_ADDRESS, RECIPIENT);

    let receipt = assert_conserved!(ledger =>
        network
            .trade(TAKER, &request, &mut ledger, BlockContext::default())
            .unwrap()
    );
    assert_eq!(receipt.t2e_ids, vec![book_id()]);
    assert_eq!(receipt.trade_wei, U256::from(11 * E18 / 10));
    assert_eq!(receipt.network_fee_wei, U256::from(2_750_000_000_000_000u128));
    assert_eq!(receipt.dest_amount, U256::from(1_097_250_000_000_000_000u128));

    assert_eq!(ledger.balance_of(TOKEN_A, TAKER), U256::ZERO);
    assert_eq!(ledger.balance_of(TOKEN_A, BOOK), e18(100));
    assert_eq!(ledger.balance_of(ETH_ADDRESS, RECIPIENT), receipt.dest_amount);
    assert_eq!(ledger.balance_of(ETH_ADDRESS, FEE_WALLET), receipt.network_fee_wei);
    assert_eq!(ledger.balance_of(ETH_ADDRESS, NETWORK), U256::ZERO);
}

#[test]
fn split_trade_pays_every_reserve() {
    let (mut network, mut ledger) = setup();
    ledger.mint(TOKEN_A, TAKER, e18(200));
    let hint = build_token_to_eth_hint(
        network.registry(),
        TOKEN_A,
        TradeHint::Split {
            ids: vec![fpr_id(), book_id()],
            bps: vec![5000, 5000],
        },
    )
    .unwrap();
    let request = TradeRequest::new(TOKEN_A, e18(200), ETH_ADDRESS, RECIPIENT).with_hint(hint);

    let receipt = assert_conserved!(ledger =>
        network
            .trade(TAKER, &request, &mut ledger, BlockContext::default())
            .unwrap()
    );
    // 1 ETH from the fixed rate reserve, 1.1 ETH from the book.
    assert_eq!(receipt.trade_wei, U256::from(21 * E18 / 10));
    assert_eq!(receipt.network_fee_wei, U256::from(5_250_000_000_000_000u128));
    assert_eq!(receipt.dest_amount, U256::from(2_094_750_000_000_000_000u128));
    assert_eq!(ledger.balance_of(TOKEN_A, FPR), e18(1100));
    assert_eq!(ledger.balance_of(TOKEN_A, BOOK), e18(100));

    let book = network.reserves().get(BOOK).unwrap();
    assert_eq!(
        book.get_conversion_rate(TOKEN_A, ETH_ADDRESS, e18(400), BlockContext::default()),
        U256::from(11 * E18 / 1000)
    );
    assert_eq!(
        book.get_conversion_rate(TOKEN_A, ETH_ADDRESS, e18(401), BlockContext::default()),
        U256::ZERO
    );
}

// ============================================================================
// TOKEN -> TOKEN
// ============================================================================

#[test]
fn token_to_token_through_pool() {
    let (mut network, mut ledger) = setup();
    ledger.mint(TOKEN_A, TAKER, e18(10));
    let hint = build_token_to_token_hint(
        network.registry(),
        TOKEN_A,
        TradeHint::MaskIn(vec![fpr_id()]),
        TOKEN_B,
        TradeHint::BestOfAll,
    )
    .unwrap();
    let request = TradeRequest::new(TOKEN_A, e18(10), TOKEN_B, RECIPIENT).with_hint(hint);

    let receipt = assert_conserved!(ledger =>
        network
            .trade(TAKER, &request, &mut ledger, BlockContext::default())
            .unwrap()
    );
    assert_eq!(receipt.t2e_ids, vec![fpr_id()]);
    assert_eq!(receipt.e2t_ids, vec![reserve_id(ReserveType::Apr as u8, POOL)]);
    // Network fee on both legs of 0.1 ETH.
    assert_eq!(receipt.network_fee_wei, U256::from(500_000_000_000_000u128));
    assert_eq!(ledger.balance_of(ETH_ADDRESS, FEE_WALLET), receipt.network_fee_wei);
    assert_eq!(ledger.balance_of(TOKEN_B, RECIPIENT), receipt.dest_amount);
    // About 2000 B per ETH on 0.0995 ETH.
    assert!(receipt.dest_amount > U256::from(198_000_000u64));
    assert!(receipt.dest_amount < U256::from(199_000_000u64));
    assert_eq!(ledger.balance_of(ETH_ADDRESS, POOL), e18(1000) + U256::from(995 * E18 / 10_000));
}

#[test]
fn token_to_token_capped_by_max_dest() {
    let (mut network, mut ledger) = setup();
    ledger.mint(TOKEN_A, TAKER, e18(10));
    let max_dest = U256::from(100_000_000u64);
    let request =
        TradeRequest::new(TOKEN_A, e18(10), TOKEN_B, RECIPIENT).with_max_dest_amount(max_dest);

    let receipt = assert_conserved!(ledger =>
        network
            .trade(TAKER, &request, &mut ledger, BlockContext::default())
            .unwrap()
    );
    assert_eq!(receipt.dest_amount, max_dest);
    assert!(receipt.src_amount < e18(6));
    assert_eq!(ledger.balance_of(TOKEN_A, TAKER), e18(10) - receipt.src_amount);
    assert_eq!(ledger.balance_of(TOKEN_B, RECIPIENT), max_dest);
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn rejected_trade_leaves_state_untouched() {
    let (mut network, mut ledger) = setup();
    ledger.mint(TOKEN_A, TAKER, e18(10));
    let request = TradeRequest::new(TOKEN_A, e18(10), ETH_ADDRESS, RECIPIENT)
        .with_min_conversion_rate(e18(1));

    assert!(matches!(
        network.trade(TAKER, &request, &mut ledger, BlockContext::default()),
        Err(NetworkError::MinRateNotMet { .. })
    ));
    assert_eq!(ledger.balance_of(TOKEN_A, TAKER), e18(10));
    assert_eq!(ledger.balance_of(ETH_ADDRESS, BOOK), e18(100));

    let request = TradeRequest::new(TOKEN_A, e18(10), TOKEN_A, RECIPIENT);
    assert!(matches!(
        network.trade(TAKER, &request, &mut ledger, BlockContext::default()),
        Err(NetworkError::Engine(_))
    ));
}

#[test]
fn removed_reserve_stops_quoting() {
    let (mut network, _) = setup();
    let block = BlockContext::default();
    let before = network
        .get_expected_rate(TOKEN_A, ETH_ADDRESS, e18(10), 0, &[], block)
        .unwrap();
    network.remove_reserve(BOOK).unwrap();
    let after = network
        .get_expected_rate(TOKEN_A, ETH_ADDRESS, e18(10), 0, &[], block)
        .unwrap();
    assert!(after.rate_with_all_fees < before.rate_with_all_fees);
    assert!(network.reserves().get(BOOK).is_none());
}
