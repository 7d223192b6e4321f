//! Reserve registry.
//!
//! Tracks registered reserves, the tokens each one is listed for on either
//! side of ETH, and which reserve types pay the network fee.

mod error;

pub use error::{RegistryError, RegistryResult};

use std::collections::HashMap;

use alloy::primitives::Address;
use tracing::info;

use crate::types::{ReserveId, ReserveType, TradeSide};

/// Registered reserve as seen by the matching engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReserveDetails {
    pub address: Address,
    pub id: ReserveId,
    pub reserve_type: ReserveType,
    pub is_fee_paying: bool,
}

#[derive(Clone, Copy, Debug)]
struct ReserveRecord {
    id: ReserveId,
    reserve_type: ReserveType,
}

#[derive(Clone, Debug, Default)]
pub struct ReserveRegistry {
    /// Fee paying flag per [`ReserveType::policy_slot`], `None` until set.
    fee_paying: Option<[bool; 6]>,
    /// Active reserves.
    reserves: HashMap<Address, ReserveRecord>,
    /// Every address an id was registered with, newest first.
    id_addresses: HashMap<ReserveId, Vec<Address>>,
    /// Reserves serving token -> ETH, in listing order.
    token_src: HashMap<Address, Vec<Address>>,
    /// Reserves serving ETH -> token, in listing order.
    token_dest: HashMap<Address, Vec<Address>>,
}

impl ReserveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets which reserve types pay the network fee.
    ///
    /// Applies to already registered reserves as well.
    pub fn set_fee_paying_per_reserve_type(
        &mut self,
        fpr: bool,
        apr: bool,
        bridge: bool,
        utility: bool,
        custom: bool,
        orderbook: bool,
    ) {
        let table = [fpr, apr, bridge, utility, custom, orderbook];
        info!(?table, "fee paying policy set");
        self.fee_paying = Some(table);
    }

    pub fn add_reserve(
        &mut self,
        address: Address,
        id: ReserveId,
        reserve_type: ReserveType,
    ) -> RegistryResult<()> {
        if address.is_zero() {
            return Err(RegistryError::ZeroReserveAddress);
        }
        if id.is_zero() {
            return Err(RegistryError::ZeroReserveId);
        }
        if reserve_type.policy_slot().is_none() {
            return Err(RegistryError::BadReserveType { reserve_type });
        }
        if self.fee_paying.is_none() {
            return Err(RegistryError::FeePayingNotSet);
        }
        if let Some(record) = self.reserves.get(&address) {
            return Err(RegistryError::ReserveHasId {
                address,
                id: record.id,
            });
        }
        if let Some(current) = self.reserve_address(id) {
            return Err(RegistryError::ReserveIdTaken {
                id,
                address: current,
            });
        }

        self.reserves.insert(address, ReserveRecord { id, reserve_type });
        self.id_addresses.entry(id).or_default().insert(0, address);
        info!(%address, %id, ?reserve_type, "reserve added");
        Ok(())
    }

    /// Deactivates the reserve and delists it from every token.
    /// The id keeps the address in its history.
    pub fn remove_reserve(&mut self, address: Address) -> RegistryResult<ReserveId> {
        let record = self
            .reserves
            .remove(&address)
            .ok_or(RegistryError::UnknownReserve { address })?;
        for reserves in self.token_src.values_mut().chain(self.token_dest.values_mut()) {
            reserves.retain(|reserve| *reserve != address);
        }
        info!(%address, id = %record.id, "reserve removed");
        Ok(record.id)
    }

    /// Lists or delists the reserve for `token`.
    ///
    /// `eth_to_token` and `token_to_eth` select the sides to change, repeated
    /// calls with the same arguments have no further effect.
    pub fn list_pair_for_reserve(
        &mut self,
        address: Address,
        token: Address,
        eth_to_token: bool,
        token_to_eth: bool,
        add: bool,
    ) -> RegistryResult<()> {
        if !self.reserves.contains_key(&address) {
            return Err(RegistryError::UnknownReserve { address });
        }
        if token.is_zero() {
            return Err(RegistryError::ZeroToken);
        }
        if eth_to_token {
            toggle(self.token_dest.entry(token).or_default(), address, add);
        }
        if token_to_eth {
            toggle(self.token_src.entry(token).or_default(), address, add);
        }
        info!(%address, %token, eth_to_token, token_to_eth, add, "pair listing changed");
        Ok(())
    }

    /// Reserves listed for `token` -> ETH.
    pub fn reserves_per_token_src(&self, token: Address) -> &[Address] {
        self.token_src.get(&token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reserves listed for ETH -> `token`.
    pub fn reserves_per_token_dest(&self, token: Address) -> &[Address] {
        self.token_dest.get(&token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reserves listed for `token` on `side`.
    pub fn reserves_for(&self, token: Address, side: TradeSide) -> &[Address] {
        match side {
            TradeSide::TokenToEth => self.reserves_per_token_src(token),
            TradeSide::EthToToken => self.reserves_per_token_dest(token),
        }
    }

    pub fn is_listed(&self, address: Address, token: Address, side: TradeSide) -> bool {
        self.reserves_for(token, side).contains(&address)
    }

    pub fn reserve_details(&self, address: Address) -> Option<ReserveDetails> {
        self.reserves.get(&address).map(|record| ReserveDetails {
            address,
            id: record.id,
            reserve_type: record.reserve_type,
            is_fee_paying: self.type_pays_fee(record.reserve_type),
        })
    }

    pub fn reserve_details_by_id(&self, id: ReserveId) -> Option<ReserveDetails> {
        self.reserve_address(id)
            .and_then(|address| self.reserve_details(address))
    }

    /// Active address registered under `id`.
    pub fn reserve_address(&self, id: ReserveId) -> Option<Address> {
        self.id_addresses
            .get(&id)
            .and_then(|addresses| addresses.first())
            .copied()
            .filter(|address| {
                self.reserves
                    .get(address)
                    .is_some_and(|record| record.id == id)
            })
    }

    /// All addresses ever registered under `id`, newest first.
    pub fn reserve_addresses(&self, id: ReserveId) -> &[Address] {
        self.id_addresses
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reserve_id(&self, address: Address) -> Option<ReserveId> {
        self.reserves.get(&address).map(|record| record.id)
    }

    /// `false` for unknown reserves.
    pub fn is_fee_paying(&self, address: Address) -> bool {
        self.reserve_details(address)
            .is_some_and(|details| details.is_fee_paying)
    }

    /// Details of active reserves by id, failing on the first unknown id.
    pub fn fee_paying_data(&self, ids: &[ReserveId]) -> RegistryResult<Vec<ReserveDetails>> {
        ids.iter()
            .map(|id| {
                self.reserve_details_by_id(*id)
                    .ok_or(RegistryError::UnknownReserveId { id: *id })
            })
            .collect()
    }

    fn type_pays_fee(&self, reserve_type: ReserveType) -> bool {
        match (self.fee_paying, reserve_type.policy_slot()) {
            (Some(table), Some(slot)) => table[slot],
            _ => false,
        }
    }
}

fn toggle(reserves: &mut Vec<Address>, address: Address, add: bool) {
    let listed = reserves.contains(&address);
    if add && !listed {
        reserves.push(address);
    } else if !add && listed {
        reserves.retain(|reserve| *reserve != address);
    }
}
