//! Maker balances held by an order book reserve.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

use super::{OrderBookError, OrderBookResult};

/// Per maker, per asset balances.
///
/// `free` funds can be withdrawn or committed to new orders, `locked` funds
/// back resting orders and only leave through [`MakerFunds::settle`] or
/// [`MakerFunds::release`].
#[derive(Clone, Debug, Default)]
pub struct MakerFunds {
    free: HashMap<(Address, Address), U256>,
    locked: HashMap<(Address, Address), U256>,
}

impl MakerFunds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn free(&self, maker: Address, asset: Address) -> U256 {
        self.free.get(&(maker, asset)).copied().unwrap_or_default()
    }

    pub fn locked(&self, maker: Address, asset: Address) -> U256 {
        self.locked.get(&(maker, asset)).copied().unwrap_or_default()
    }

    pub(crate) fn deposit(&mut self, maker: Address, asset: Address, amount: U256) {
        let free = self.free.entry((maker, asset)).or_default();
        *free = free.saturating_add(amount);
    }

    pub(crate) fn withdraw(
        &mut self,
        maker: Address,
        asset: Address,
        amount: U256,
    ) -> OrderBookResult<()> {
        self.take_free(maker, asset, amount)
    }

    /// Moves free funds into the locked balance.
    pub(crate) fn lock(&mut self, maker: Address, asset: Address, amount: U256) -> OrderBookResult<()> {
        self.take_free(maker, asset, amount)?;
        let locked = self.locked.entry((maker, asset)).or_default();
        *locked = locked.saturating_add(amount);
        Ok(())
    }

    /// Moves locked funds back into the free balance.
    pub(crate) fn release(
        &mut self,
        maker: Address,
        asset: Address,
        amount: U256,
    ) -> OrderBookResult<()> {
        self.take_locked(maker, asset, amount)?;
        self.deposit(maker, asset, amount);
        Ok(())
    }

    /// Pays `paid` locked `paid_asset` out to a taker and credits the
    /// maker with `received` of `received_asset`.
    pub(crate) fn settle(
        &mut self,
        maker: Address,
        paid_asset: Address,
        paid: U256,
        received_asset: Address,
        received: U256,
    ) -> OrderBookResult<()> {
        self.take_locked(maker, paid_asset, paid)?;
        self.deposit(maker, received_asset, received);
        Ok(())
    }

    fn take_free(&mut self, maker: Address, asset: Address, amount: U256) -> OrderBookResult<()> {
        let free = self.free(maker, asset);
        let left = free
            .checked_sub(amount)
            .ok_or(OrderBookError::InsufficientFunds {
                maker,
                asset,
                free,
                required: amount,
            })?;
        self.free.insert((maker, asset), left);
        Ok(())
    }

    fn take_locked(&mut self, maker: Address, asset: Address, amount: U256) -> OrderBookResult<()> {
        let locked = self.locked(maker, asset);
        let left = locked
            .checked_sub(amount)
            .ok_or(OrderBookError::InsufficientLocked {
                maker,
                asset,
                locked,
                required: amount,
            })?;
        self.locked.insert((maker, asset), left);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAKER: Address = Address::with_last_byte(1);
    const ASSET: Address = Address::with_last_byte(2);
    const OTHER: Address = Address::with_last_byte(3);

    #[test]
    fn test_lock_and_release() {
        let mut funds = MakerFunds::new();
        funds.deposit(MAKER, ASSET, U256::from(100));

        funds.lock(MAKER, ASSET, U256::from(60)).unwrap();
        assert_eq!(funds.free(MAKER, ASSET), U256::from(40));
        assert_eq!(funds.locked(MAKER, ASSET), U256::from(60));

        assert_eq!(
            funds.lock(MAKER, ASSET, U256::from(41)),
            Err(OrderBookError::InsufficientFunds {
                maker: MAKER,
                asset: ASSET,
                free: U256::from(40),
                required: U256::from(41),
            })
        );

        funds.release(MAKER, ASSET, U256::from(10)).unwrap();
        assert_eq!(funds.free(MAKER, ASSET), U256::from(50));
        assert_eq!(funds.locked(MAKER, ASSET), U256::from(50));
        assert!(matches!(
            funds.release(MAKER, ASSET, U256::from(51)),
            Err(OrderBookError::InsufficientLocked { .. })
        ));
    }

    #[test]
    fn test_settle_moves_value() {
        let mut funds = MakerFunds::new();
        funds.deposit(MAKER, ASSET, U256::from(100));
        funds.lock(MAKER, ASSET, U256::from(100)).unwrap();

        funds
            .settle(MAKER, ASSET, U256::from(30), OTHER, U256::from(7))
            .unwrap();
        assert_eq!(funds.locked(MAKER, ASSET), U256::from(70));
        assert_eq!(funds.free(MAKER, ASSET), U256::ZERO);
        assert_eq!(funds.free(MAKER, OTHER), U256::from(7));
    }

    #[test]
    fn test_withdraw() {
        let mut funds = MakerFunds::new();
        funds.deposit(MAKER, ASSET, U256::from(5));
        assert!(funds.withdraw(MAKER, ASSET, U256::from(6)).is_err());
        funds.withdraw(MAKER, ASSET, U256::from(5)).unwrap();
        assert_eq!(funds.free(MAKER, ASSET), U256::ZERO);
    }
}
