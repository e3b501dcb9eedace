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

//! # Bridge Clients 🕸️
//!
//! The capability traits the relayer core is written against: a
//! [`ChainClient`] for raw chain access (logs, heads, the pending
//! transaction feed) and a [`BridgeContract`] for everything the bridge
//! contract exposes (handler resolution, proposal status, voting).
//!
//! Concrete RPC-backed implementations live outside this workspace; the
//! [`mock`] module provides scripted in-memory implementations used by
//! the test suites of downstream crates.

use ethereum_types::{Address, H256};
use futures::stream::BoxStream;
use spanbridge_relayer_types::{
    DepositNonce, DomainId, Proposal, ProposalStatus, ResourceId,
};
use spanbridge_relayer_utils::Result;

/// Scripted in-memory implementations of the capability traits.
pub mod mock;

/// A raw event log fetched from a chain, opaque to everything but the
/// deposit event decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// The contract that emitted the log.
    pub address: Address,
    /// The block the log was included in.
    pub block_number: u64,
    /// The transaction that emitted the log.
    pub transaction_hash: H256,
    /// The ABI-encoded event payload.
    pub data: Vec<u8>,
}

/// A transaction looked up by hash, with its current inclusion state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatus {
    /// The transaction hash.
    pub hash: H256,
    /// The transaction call data.
    pub input: Vec<u8>,
    /// Whether the transaction is still waiting to be mined.
    pub is_pending: bool,
}

/// Options forwarded to transaction submission.
///
/// Fee selection itself is a concern of the concrete client; the core
/// only carries the priority hint through from deposit metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// A fee-priority hint from the deposit's metadata.
    pub priority: u8,
}

/// A peer relayer's vote invocation recognized in raw call data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteCall {
    /// The voted proposal's source domain.
    pub source: DomainId,
    /// The voted proposal's deposit nonce.
    pub deposit_nonce: DepositNonce,
    /// The voted proposal's resource id.
    pub resource_id: ResourceId,
}

/// Raw access to a chain, as much of it as the relayer core needs.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// The current chain head height.
    async fn latest_block_number(&self) -> Result<u64>;

    /// Fetches the logs a contract emitted for one event signature over
    /// an inclusive block range.
    async fn fetch_event_logs(
        &self,
        contract: Address,
        event_signature: H256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>>;

    /// Subscribes to the chain's pending-transaction feed.
    ///
    /// Clients that cannot offer the subscription should return an
    /// error; the pending-vote tracker degrades gracefully without it.
    async fn subscribe_pending_transactions(
        &self,
    ) -> Result<BoxStream<'static, H256>>;

    /// Looks up a transaction by hash, `None` if the chain no longer
    /// knows it.
    async fn transaction_by_hash(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionStatus>>;
}

/// Everything the relayer core needs from a deployed bridge contract.
#[async_trait::async_trait]
pub trait BridgeContract: Send + Sync + 'static {
    /// The address of the bridge contract itself.
    fn address(&self) -> Address;

    /// Asks the bridge which handler contract is registered for a
    /// resource. The zero address means "none".
    async fn handler_address_for_resource(
        &self,
        resource_id: ResourceId,
    ) -> Result<Address>;

    /// Whether the given relayer has already voted on this proposal's
    /// data hash.
    async fn is_proposal_voted_by(
        &self,
        relayer: Address,
        proposal: &Proposal,
    ) -> Result<bool>;

    /// The current on-chain voting state of a proposal.
    async fn proposal_status(
        &self,
        proposal: &Proposal,
    ) -> Result<ProposalStatus>;

    /// The minimum number of distinct yes votes a proposal needs.
    async fn vote_threshold(&self) -> Result<u64>;

    /// Simulates the vote call read-only, without any state change.
    async fn simulate_vote_proposal(&self, proposal: &Proposal)
        -> Result<()>;

    /// Submits the real vote transaction.
    async fn vote_proposal(
        &self,
        proposal: &Proposal,
        opts: TxOptions,
    ) -> Result<H256>;

    /// Submits an execute transaction for a passed proposal.
    async fn execute_proposal(
        &self,
        proposal: &Proposal,
        opts: TxOptions,
    ) -> Result<H256>;

    /// Recognizes this bridge's vote method in raw transaction call
    /// data; `None` for anything else.
    fn decode_vote_call(&self, input: &[u8]) -> Option<VoteCall>;
}
