//! Asset balances of takers, reserves and fee wallets.
//!
//! ETH is tracked under [`crate::types::ETH_ADDRESS`] like any other token.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use thiserror::Error;
use tracing::debug;

/// Error type for asset transfers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{account} holds {balance} of {token}, {required} required")]
    InsufficientBalance {
        token: Address,
        account: Address,
        balance: U256,
        required: U256,
    },
}

/// Result type for asset transfers.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Fungible asset balances.
pub trait AssetLedger {
    fn balance_of(&self, token: Address, account: Address) -> U256;

    /// Moves `amount` of `token`, failing without changes if `from` holds less.
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<()>;

    /// Credits `amount` of `token` out of thin air.
    fn mint(&mut self, token: Address, account: Address, amount: U256);
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(Address, Address), U256>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.balances
            .get(&(token, account))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<()> {
        let balance = self.balance_of(token, from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                token,
                account: from,
                balance,
                required: amount,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        self.balances.insert((token, from), balance - amount);
        self.mint(token, to, amount);
        debug!(%token, %from, %to, %amount, "transfer");
        Ok(())
    }

    fn mint(&mut self, token: Address, account: Address, amount: U256) {
        let balance = self.balances.entry((token, account)).or_default();
        *balance = balance.saturating_add(amount);
    }
}
