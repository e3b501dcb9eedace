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

//! Tracking of in-flight peer votes.
//!
//! The tracker watches the destination chain's pending-transaction feed
//! for peer vote calls and keeps a per-proposal counter of votes that
//! are submitted but not yet mined. The voter engine adds that counter
//! to the on-chain tally when estimating whether quorum will be met
//! without it. The counter is advisory only: losing a pending feed or a
//! transaction never blocks voting, it just makes the estimate more
//! conservative.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethereum_types::H256;
use futures::StreamExt;
use parking_lot::Mutex;
use spanbridge_bridge_clients::{BridgeContract, ChainClient};
use spanbridge_relayer_types::proposal_id;
use spanbridge_relayer_utils::shutdown::Shutdown;
use spanbridge_relayer_utils::{probe, Error, Result};

/// Per-proposal counters of peer votes seen in the mempool but not yet
/// mined.
#[derive(Debug, Default)]
pub struct PendingVotes {
    counts: Mutex<HashMap<H256, u64>>,
}

impl PendingVotes {
    /// An empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more in-flight vote for a proposal.
    pub fn increment(&self, proposal_id: H256) {
        let mut counts = self.counts.lock();
        *counts.entry(proposal_id).or_insert(0) += 1;
    }

    /// Releases one in-flight vote for a proposal.
    pub fn decrement(&self, proposal_id: H256) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(&proposal_id) {
            *count -= 1;
            if *count == 0 {
                counts.remove(&proposal_id);
            }
        }
    }

    /// The current in-flight vote count for a proposal.
    pub fn get(&self, proposal_id: H256) -> u64 {
        self.counts.lock().get(&proposal_id).copied().unwrap_or(0)
    }

    /// Drops the counter for a proposal entirely.
    pub fn clear(&self, proposal_id: H256) {
        self.counts.lock().remove(&proposal_id);
    }
}

/// Watches the pending-transaction feed for peer vote calls.
pub struct PendingVoteTracker<C, B>
where
    C: ChainClient,
    B: BridgeContract,
{
    client: Arc<C>,
    bridge: Arc<B>,
    pending_votes: Arc<PendingVotes>,
    poll_interval: Duration,
}

impl<C, B> PendingVoteTracker<C, B>
where
    C: ChainClient,
    B: BridgeContract,
{
    /// Creates a tracker polling mined-state every `poll_interval`.
    pub fn new(
        client: Arc<C>,
        bridge: Arc<B>,
        pending_votes: Arc<PendingVotes>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            bridge,
            pending_votes,
            poll_interval,
        }
    }

    /// Runs the tracker until shutdown is signalled.
    pub async fn run(&self, mut shutdown: Shutdown) -> Result<()> {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::trace!("pending vote tracker received shutdown signal");
                Ok(())
            }
            result = self.track() => result,
        }
    }

    async fn track(&self) -> Result<()> {
        let mut stream = self.client.subscribe_pending_transactions().await?;
        while let Some(tx_hash) = stream.next().await {
            // best effort, a vanished transaction is not our problem
            if let Err(e) = self.inspect_transaction(tx_hash).await {
                tracing::trace!(%tx_hash, "ignoring pending transaction: {e}");
            }
        }
        Err(Error::TaskStoppedAbnormally)
    }

    async fn inspect_transaction(&self, tx_hash: H256) -> Result<()> {
        let Some(tx) = self.client.transaction_by_hash(tx_hash).await? else {
            return Ok(());
        };
        if !tx.is_pending {
            return Ok(());
        }
        let Some(vote) = self.bridge.decode_vote_call(&tx.input) else {
            return Ok(());
        };
        let id = proposal_id(vote.source, vote.deposit_nonce);
        self.pending_votes.increment(id);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::PendingVotes,
            source = vote.source,
            deposit_nonce = vote.deposit_nonce,
            %tx_hash,
        );
        self.watch_until_mined(tx_hash, id);
        Ok(())
    }

    /// Releases the counter once the vote transaction leaves the
    /// pending state, or once the chain forgets it.
    fn watch_until_mined(&self, tx_hash: H256, id: H256) {
        let client = self.client.clone();
        let pending_votes = self.pending_votes.clone();
        let poll_interval = self.poll_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                match client.transaction_by_hash(tx_hash).await {
                    Ok(Some(tx)) if tx.is_pending => continue,
                    _ => break,
                }
            }
            pending_votes.decrement(id);
        });
    }
}
