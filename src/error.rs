use crate::{
    engine::EngineError, hint::HintError, ledger::LedgerError, network::NetworkError,
    num::RateError, order_list::OrderListError, orderbook::OrderBookError,
    registry::RegistryError, reserve::ReserveError,
};

/// Any error raised by the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DexError {
    #[error("rate math error: {0}")]
    Rate(#[from] RateError),

    #[error("order list error: {0}")]
    OrderList(#[from] OrderListError),

    #[error("order book error: {0}")]
    OrderBook(#[from] OrderBookError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("hint error: {0}")]
    Hint(#[from] HintError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("reserve error: {0}")]
    Reserve(#[from] ReserveError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),
}

pub type DexResult<T> = Result<T, DexError>;
