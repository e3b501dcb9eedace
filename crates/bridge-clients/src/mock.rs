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

//! Scripted in-memory implementations of [`ChainClient`] and
//! [`BridgeContract`] used by the workspace test suites.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use ethereum_types::{Address, H256};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use spanbridge_relayer_types::{
    Proposal, ProposalState, ProposalStatus, ResourceId,
};
use spanbridge_relayer_utils::{Error, Result};

use crate::{
    BridgeContract, ChainClient, RawLog, TransactionStatus, TxOptions,
    VoteCall,
};

/// The 4-byte selector the mock bridge recognizes as its vote method.
pub const VOTE_CALL_SELECTOR: [u8; 4] = [0x73, 0xc4, 0x5c, 0x98];

/// Encodes a vote invocation the way [`MockBridgeContract`] decodes it:
/// `selector || source || nonce_be || resource_id`.
pub fn encode_vote_call(call: &VoteCall) -> Vec<u8> {
    let mut input = Vec::with_capacity(4 + 1 + 8 + 32);
    input.extend_from_slice(&VOTE_CALL_SELECTOR);
    input.push(call.source);
    input.extend_from_slice(&call.deposit_nonce.to_be_bytes());
    input.extend_from_slice(call.resource_id.as_bytes());
    input
}

/// A chain client whose heads, logs and transactions are scripted by
/// the test.
#[derive(Debug, Default)]
pub struct MockChainClient {
    latest_block: AtomicU64,
    logs: Mutex<Vec<RawLog>>,
    transactions: Mutex<HashMap<H256, TransactionStatus>>,
    pending_feed: Mutex<Vec<H256>>,
}

impl MockChainClient {
    /// A client whose chain head is at `latest_block`.
    pub fn new(latest_block: u64) -> Self {
        Self {
            latest_block: AtomicU64::new(latest_block),
            ..Default::default()
        }
    }

    /// Moves the chain head.
    pub fn set_latest_block(&self, block_number: u64) {
        self.latest_block.store(block_number, Ordering::SeqCst);
    }

    /// Adds a log returned by block-range queries covering its block.
    pub fn push_log(&self, log: RawLog) {
        self.logs.lock().push(log);
    }

    /// Adds a transaction visible to [`ChainClient::transaction_by_hash`].
    pub fn insert_transaction(&self, hash: H256, input: Vec<u8>) {
        self.transactions.lock().insert(
            hash,
            TransactionStatus {
                hash,
                input,
                is_pending: true,
            },
        );
    }

    /// Marks a previously inserted transaction as mined.
    pub fn set_transaction_mined(&self, hash: H256) {
        if let Some(tx) = self.transactions.lock().get_mut(&hash) {
            tx.is_pending = false;
        }
    }

    /// Queues a hash on the pending-transaction feed.
    pub fn queue_pending_transaction(&self, hash: H256) {
        self.pending_feed.lock().push(hash);
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChainClient {
    async fn latest_block_number(&self) -> Result<u64> {
        Ok(self.latest_block.load(Ordering::SeqCst))
    }

    async fn fetch_event_logs(
        &self,
        _contract: Address,
        _event_signature: H256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>> {
        let logs = self.logs.lock();
        Ok(logs
            .iter()
            .filter(|log| {
                log.block_number >= from_block && log.block_number <= to_block
            })
            .cloned()
            .collect())
    }

    async fn subscribe_pending_transactions(
        &self,
    ) -> Result<BoxStream<'static, H256>> {
        // drain whatever the test queued, then stay open forever.
        let queued: Vec<H256> = self.pending_feed.lock().drain(..).collect();
        Ok(stream::iter(queued).chain(stream::pending()).boxed())
    }

    async fn transaction_by_hash(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionStatus>> {
        Ok(self.transactions.lock().get(&hash).cloned())
    }
}

/// A bridge contract with scripted resources, statuses and call
/// counters inspectable by the test.
#[derive(Debug)]
pub struct MockBridgeContract {
    address: Address,
    handlers: Mutex<HashMap<ResourceId, Address>>,
    voted: AtomicBool,
    statuses: Mutex<VecDeque<ProposalStatus>>,
    last_status: Mutex<ProposalStatus>,
    threshold: AtomicU64,
    simulation_fails: AtomicBool,
    /// How many times `simulate_vote_proposal` was called.
    pub simulate_calls: AtomicUsize,
    /// How many times `vote_proposal` was called.
    pub vote_calls: AtomicUsize,
    /// How many times `execute_proposal` was called.
    pub execute_calls: AtomicUsize,
}

impl MockBridgeContract {
    /// A bridge at `address` with threshold 1, an `Active` zero-vote
    /// status and no registered resources.
    pub fn new(address: Address) -> Self {
        let active = ProposalStatus {
            status: ProposalState::Active,
            ..ProposalStatus::inactive()
        };
        Self {
            address,
            handlers: Mutex::new(HashMap::new()),
            voted: AtomicBool::new(false),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(active),
            threshold: AtomicU64::new(1),
            simulation_fails: AtomicBool::new(false),
            simulate_calls: AtomicUsize::new(0),
            vote_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    /// Registers a handler address for a resource.
    pub fn register_resource(&self, resource_id: ResourceId, handler: Address) {
        self.handlers.lock().insert(resource_id, handler);
    }

    /// Scripts whether this relayer already voted.
    pub fn set_voted(&self, voted: bool) {
        self.voted.store(voted, Ordering::SeqCst);
    }

    /// Scripts the vote threshold.
    pub fn set_threshold(&self, threshold: u64) {
        self.threshold.store(threshold, Ordering::SeqCst);
    }

    /// Queues a status returned by the next `proposal_status` call; once
    /// the queue drains the last status repeats.
    pub fn push_status(&self, status: ProposalStatus) {
        self.statuses.lock().push_back(status);
    }

    /// Scripts every simulation call to fail.
    pub fn fail_simulation(&self) {
        self.simulation_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BridgeContract for MockBridgeContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn handler_address_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> Result<Address> {
        let handlers = self.handlers.lock();
        Ok(handlers.get(&resource_id).copied().unwrap_or_default())
    }

    async fn is_proposal_voted_by(
        &self,
        _relayer: Address,
        _proposal: &Proposal,
    ) -> Result<bool> {
        Ok(self.voted.load(Ordering::SeqCst))
    }

    async fn proposal_status(
        &self,
        _proposal: &Proposal,
    ) -> Result<ProposalStatus> {
        let mut statuses = self.statuses.lock();
        let mut last = self.last_status.lock();
        if let Some(next) = statuses.pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    async fn vote_threshold(&self) -> Result<u64> {
        Ok(self.threshold.load(Ordering::SeqCst))
    }

    async fn simulate_vote_proposal(
        &self,
        _proposal: &Proposal,
    ) -> Result<()> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        if self.simulation_fails.load(Ordering::SeqCst) {
            return Err(Error::BridgeContract(
                "execution reverted: simulated vote rejected".into(),
            ));
        }
        Ok(())
    }

    async fn vote_proposal(
        &self,
        _proposal: &Proposal,
        _opts: TxOptions,
    ) -> Result<H256> {
        self.vote_calls.fetch_add(1, Ordering::SeqCst);
        Ok(H256::repeat_byte(0xAB))
    }

    async fn execute_proposal(
        &self,
        _proposal: &Proposal,
        _opts: TxOptions,
    ) -> Result<H256> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        Ok(H256::repeat_byte(0xEC))
    }

    fn decode_vote_call(&self, input: &[u8]) -> Option<VoteCall> {
        if input.len() != 4 + 1 + 8 + 32 {
            return None;
        }
        if input[..4] != VOTE_CALL_SELECTOR {
            return None;
        }
        let source = input[4];
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&input[5..13]);
        let mut resource_id = [0u8; 32];
        resource_id.copy_from_slice(&input[13..45]);
        Some(VoteCall {
            source,
            deposit_nonce: u64::from_be_bytes(nonce),
            resource_id: ResourceId(resource_id),
        })
    }
}
