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

use std::fmt::Debug;
use std::path::Path;

use super::{HistoryStore, HistoryStoreKey};

const LAST_BLOCK_NUMBERS_TREE: &str = "last_block_numbers";
const TARGET_BLOCK_NUMBERS_TREE: &str = "target_block_numbers";

/// SledStore is a store that persists scan history in a
/// [Sled](https://sled.rs)-based database.
#[derive(Clone)]
pub struct SledStore {
    db: ::sled::Db,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish()
    }
}

impl SledStore {
    /// Create a new SledStore.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let db = ::sled::Config::new()
            .path(path)
            .temporary(cfg!(test))
            .mode(::sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db })
    }

    /// Creates a temporary SledStore.
    pub fn temporary() -> crate::Result<Self> {
        let dir = tempfile::tempdir()?;
        Self::open(dir.path())
    }

    /// Gets the total amount of data stored on disk.
    pub fn get_data_stored_size(&self) -> u64 {
        self.db.size_on_disk().unwrap_or_default()
    }

    fn set_block_number(
        &self,
        tree: &str,
        key: HistoryStoreKey,
        block_number: u64,
    ) -> crate::Result<u64> {
        let tree = self.db.open_tree(tree)?;
        let bytes = block_number.to_be_bytes();
        let old = tree.insert(key.to_bytes(), &bytes)?;
        match old {
            Some(v) => Ok(decode_block_number(&v, block_number)),
            None => Ok(block_number),
        }
    }

    fn get_block_number(
        &self,
        tree: &str,
        key: HistoryStoreKey,
        default_block_number: u64,
    ) -> crate::Result<u64> {
        let tree = self.db.open_tree(tree)?;
        let val = tree.get(key.to_bytes())?;
        match val {
            Some(v) => Ok(decode_block_number(&v, default_block_number)),
            None => Ok(default_block_number),
        }
    }
}

fn decode_block_number(bytes: &[u8], fallback: u64) -> u64 {
    match <[u8; 8]>::try_from(bytes) {
        Ok(be) => u64::from_be_bytes(be),
        Err(_) => fallback,
    }
}

impl HistoryStore for SledStore {
    #[tracing::instrument(skip(self))]
    fn set_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> crate::Result<u64> {
        self.set_block_number(LAST_BLOCK_NUMBERS_TREE, key.into(), block_number)
    }

    #[tracing::instrument(skip(self))]
    fn get_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> crate::Result<u64> {
        self.get_block_number(
            LAST_BLOCK_NUMBERS_TREE,
            key.into(),
            default_block_number,
        )
    }

    #[tracing::instrument(skip(self))]
    fn set_target_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> crate::Result<u64> {
        self.set_block_number(
            TARGET_BLOCK_NUMBERS_TREE,
            key.into(),
            block_number,
        )
    }

    #[tracing::instrument(skip(self))]
    fn get_target_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> crate::Result<u64> {
        self.get_block_number(
            TARGET_BLOCK_NUMBERS_TREE,
            key.into(),
            default_block_number,
        )
    }
}
