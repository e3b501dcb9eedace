// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Relayer Store Module 🕸️
//!
//! A module for managing the storage of the relayer.
//!
//! ## Overview
//!
//! The relayer store module persists how far each deposit watcher has
//! scanned, so restarts resume from the last confirmed block instead of
//! re-scanning from genesis. Two backends are provided: an in-memory
//! store for tests and a [Sled](https://sled.rs)-based store for
//! production.

use std::fmt::{Debug, Display};

use ethereum_types::Address;
use spanbridge_relayer_types::DomainId;
pub use spanbridge_relayer_utils::Result;

/// A module for managing in-memory storage of the relayer.
pub mod mem;
/// A module for setting up and managing a [Sled](https://sled.rs)-based database.
pub mod sled;

/// A store that uses in memory data structures as the backend.
pub use mem::InMemoryStore;
/// A store that uses [`sled`](https://sled.rs) as the backend.
pub use self::sled::SledStore;

/// HistoryStoreKey contains the keys used to store the scan history of
/// a deposit watcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HistoryStoreKey {
    /// Scan history for a whole source domain.
    Domain {
        /// The domain the history is for.
        domain_id: DomainId,
    },
    /// Scan history for one watched contract on a source domain.
    Contract {
        /// The domain the contract lives on.
        domain_id: DomainId,
        /// The watched contract address.
        address: Address,
    },
}

impl HistoryStoreKey {
    /// Returns the domain id of the chain this key is for.
    pub fn domain_id(&self) -> DomainId {
        match self {
            Self::Domain { domain_id } => *domain_id,
            Self::Contract { domain_id, .. } => *domain_id,
        }
    }

    /// Returns the bytes of the key.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut vec = vec![];
        match self {
            Self::Domain { domain_id } => {
                vec.push(*domain_id);
            }
            Self::Contract { domain_id, address } => {
                vec.push(*domain_id);
                vec.extend_from_slice(address.as_bytes());
            }
        }
        vec
    }
}

impl Display for HistoryStoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain { domain_id } => {
                write!(f, "Domain({domain_id})")
            }
            Self::Contract { domain_id, address } => {
                write!(f, "Contract({domain_id}, {address})")
            }
        }
    }
}

impl From<DomainId> for HistoryStoreKey {
    fn from(domain_id: DomainId) -> Self {
        Self::Domain { domain_id }
    }
}

impl From<(DomainId, Address)> for HistoryStoreKey {
    fn from((domain_id, address): (DomainId, Address)) -> Self {
        Self::Contract { domain_id, address }
    }
}

/// HistoryStore is a simple trait for storing and retrieving history
/// of block numbers.
pub trait HistoryStore: Clone + Send + Sync {
    /// Sets the new block number for that chain in the store and returns
    /// the old one.
    fn set_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> Result<u64>;

    /// Get the last block number for that chain.
    /// if not found, returns the `default_block_number`.
    fn get_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> Result<u64>;

    /// Sets the Target Block number (Usually the latest block number of
    /// the watched chain). This is used to be able to check if we are
    /// fully synced with the chain or not.
    fn set_target_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> Result<u64>;

    /// Get the target block number.
    /// if not found, returns the `default_block_number`.
    fn get_target_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> Result<u64>;
}
