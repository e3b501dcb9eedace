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

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{HistoryStore, HistoryStoreKey};

/// InMemoryStore is a store that keeps scan history in memory.
///
/// Nothing survives a restart; watchers fall back to their configured
/// start block. Mainly useful for tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    last_block_numbers: Arc<RwLock<HashMap<HistoryStoreKey, u64>>>,
    target_block_numbers: Arc<RwLock<HashMap<HistoryStoreKey, u64>>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl HistoryStore for InMemoryStore {
    #[tracing::instrument(skip(self))]
    fn get_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> crate::Result<u64> {
        let guard = self.last_block_numbers.read();
        let val = guard
            .get(&key.into())
            .copied()
            .unwrap_or(default_block_number);
        Ok(val)
    }

    #[tracing::instrument(skip(self))]
    fn set_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> crate::Result<u64> {
        let mut guard = self.last_block_numbers.write();
        let val = guard.entry(key.into()).or_insert(block_number);
        let old = *val;
        *val = block_number;
        Ok(old)
    }

    #[tracing::instrument(skip(self))]
    fn set_target_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> crate::Result<u64> {
        let mut guard = self.target_block_numbers.write();
        let val = guard.entry(key.into()).or_insert(block_number);
        let old = *val;
        *val = block_number;
        Ok(old)
    }

    #[tracing::instrument(skip(self))]
    fn get_target_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> crate::Result<u64> {
        let guard = self.target_block_numbers.read();
        let val = guard
            .get(&key.into())
            .copied()
            .unwrap_or(default_block_number);
        Ok(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_when_no_history() {
        let store = InMemoryStore::default();
        let block = store.get_last_block_number(1u8, 42).unwrap();
        assert_eq!(block, 42);
    }

    #[test]
    fn set_returns_previous_value() {
        let store = InMemoryStore::default();
        let key = HistoryStoreKey::from(1u8);
        let old = store.set_last_block_number(key, 100).unwrap();
        assert_eq!(old, 100);
        let old = store.set_last_block_number(key, 110).unwrap();
        assert_eq!(old, 100);
        assert_eq!(store.get_last_block_number(key, 0).unwrap(), 110);
    }

    #[test]
    fn domains_do_not_share_history() {
        let store = InMemoryStore::default();
        store.set_last_block_number(1u8, 100).unwrap();
        store.set_target_block_number(1u8, 200).unwrap();
        assert_eq!(store.get_last_block_number(2u8, 0).unwrap(), 0);
        assert_eq!(store.get_target_block_number(1u8, 0).unwrap(), 200);
    }
}
