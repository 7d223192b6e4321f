//! DEX aggregation core.
//!
//! # Overview
//!
//! In-memory model of a liquidity aggregation network: a [`registry`] of
//! reserves listed per token, a [`engine`] picking the reserves that serve
//! a trade, and a [`network`] facade quoting and executing trades against
//! an [`ledger::AssetLedger`].
//!
//! Every trade is priced through ETH. Token to token trades run two legs,
//! token -> ETH then ETH -> token, and pay the network fee on both of them.
//!
//! Reserves implement [`reserve::Reserve`]. The crate ships fixed rate and
//! constant product reserves plus an [`orderbook::OrderBookReserve`] backed
//! by the price-time priority [`order_list`].
//!
//! Callers steer reserve selection with encoded [`hint`]s: best of all,
//! mask in, mask out or split.
//!
//! # Limitations/follow-ups
//!
//! * Reserve ids are not recycled after removal, an id keeps its address
//!   history.
//!
//! * Ledger movements are all or nothing per trade, there are no partial
//!   fills across reserves.

pub mod engine;
pub mod error;
pub mod hint;
pub mod ledger;
pub mod network;
pub mod num;
pub mod order_list;
pub mod orderbook;
pub mod registry;
pub mod reserve;
pub mod types;
