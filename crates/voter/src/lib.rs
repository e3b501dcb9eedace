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

//! # Voter Engine 🕸️
//!
//! Turns normalized messages into destination proposals and decides,
//! per proposal, whether this relayer should cast a vote.
//!
//! The decision avoids redundant votes two ways: the bridge contract is
//! asked whether this relayer already voted, and the quorum estimate
//! counts in-flight peer votes observed by the
//! [`PendingVoteTracker`](pending::PendingVoteTracker). Both checks err
//! on the side of voting, since a duplicate vote is wasted gas while a
//! missing one stalls the transfer.

use std::sync::Arc;
use std::time::Duration;

use ethereum_types::Address;
use futures::future::BoxFuture;
use rand::Rng;
use spanbridge_bridge_clients::{BridgeContract, TxOptions};
use spanbridge_message_handlers::HandlerRegistry;
use spanbridge_relayer_types::{Message, Proposal, ProposalState};
use spanbridge_relayer_utils::retry::ConstantWithMaxRetryCount;
use spanbridge_relayer_utils::{probe, Error, Result};
use typed_builder::TypedBuilder;

/// A module tracking in-flight peer votes.
pub mod pending;

#[cfg(test)]
mod tests;

pub use pending::{PendingVoteTracker, PendingVotes};

/// How many times the quorum estimate is re-checked before the engine
/// votes regardless.
pub const MAX_SHOULD_VOTE_CHECKS: usize = 40;
/// How many retries the vote simulation gets after its initial attempt.
pub const MAX_SIMULATE_VOTE_RETRIES: usize = 5;
/// The default upper bound of the random pre-check delay.
pub const DEFAULT_MAX_VOTE_DELAY: Duration = Duration::from_secs(15);

/// The sleeping primitive used between quorum checks, injectable so
/// tests run without real delays.
pub type SleepFn =
    Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn default_sleep() -> SleepFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Votes on proposals derived from incoming messages.
#[derive(TypedBuilder)]
pub struct Voter<B>
where
    B: BridgeContract,
{
    bridge: Arc<B>,
    registry: Arc<HandlerRegistry>,
    pending_votes: Arc<PendingVotes>,
    /// This relayer's on-chain identity, used for the already-voted
    /// check.
    relayer_address: Address,
    #[builder(default = DEFAULT_MAX_VOTE_DELAY)]
    max_vote_delay: Duration,
    #[builder(default = default_sleep())]
    sleep: SleepFn,
}

impl<B> Voter<B>
where
    B: BridgeContract,
{
    /// Processes one message end to end: build the proposal, decide
    /// whether to vote, simulate, then submit.
    ///
    /// Safe to call more than once for the same message; duplicates
    /// short-circuit on the already-voted check.
    #[tracing::instrument(skip(self, message), fields(%message))]
    pub async fn execute(&self, message: &Message) -> Result<()> {
        let proposal = self
            .registry
            .handle_message(self.bridge.as_ref(), message)
            .await?;
        let voted = self
            .bridge
            .is_proposal_voted_by(self.relayer_address, &proposal)
            .await?;
        if voted {
            tracing::debug!(%proposal, "already voted, nothing to do");
            return Ok(());
        }
        if !self.should_vote(&proposal).await? {
            tracing::debug!(
                %proposal,
                "skipping vote, proposal no longer needs us",
            );
            return Ok(());
        }
        self.simulate_vote(&proposal).await?;
        self.submit_vote(&proposal, message.metadata.priority).await
    }

    /// Decides whether this relayer's vote is still needed.
    async fn should_vote(&self, proposal: &Proposal) -> Result<bool> {
        let decision = self.poll_vote_decision(proposal).await;
        // the in-flight estimate served its purpose for this proposal
        self.pending_votes.clear(proposal.id());
        decision
    }

    async fn poll_vote_decision(&self, proposal: &Proposal) -> Result<bool> {
        let max_delay =
            u64::try_from(self.max_vote_delay.as_millis()).unwrap_or(u64::MAX);
        for check in 0..MAX_SHOULD_VOTE_CHECKS {
            let delay = if max_delay == 0 {
                Duration::ZERO
            } else {
                let millis = rand::thread_rng().gen_range(0..=max_delay);
                Duration::from_millis(millis)
            };
            (self.sleep)(delay).await;
            let status = self.bridge.proposal_status(proposal).await?;
            if matches!(
                status.status,
                ProposalState::Executed | ProposalState::Canceled
            ) {
                tracing::debug!(
                    %proposal,
                    status = ?status.status,
                    "proposal reached a terminal state without us",
                );
                return Ok(false);
            }
            let threshold = self.bridge.vote_threshold().await?;
            let pending = self.pending_votes.get(proposal.id());
            if u64::from(status.yes_votes_total) + pending >= threshold {
                tracing::trace!(
                    %proposal,
                    check,
                    yes_votes = status.yes_votes_total,
                    pending,
                    threshold,
                    "quorum looks satisfied, waiting it out",
                );
                continue;
            }
            return Ok(true);
        }
        // every check saw enough votes in flight yet the proposal never
        // reached a terminal state; vote anyway, since a redundant vote
        // costs gas while a stalled transfer costs the bridge.
        Ok(true)
    }

    async fn simulate_vote(&self, proposal: &Proposal) -> Result<()> {
        let backoff = ConstantWithMaxRetryCount::new(
            Duration::ZERO,
            MAX_SIMULATE_VOTE_RETRIES,
        );
        backoff::future::retry(backoff, || async {
            self.bridge
                .simulate_vote_proposal(proposal)
                .await
                .map_err(backoff::Error::transient)
        })
        .await
        .map_err(|e| {
            let attempts = MAX_SIMULATE_VOTE_RETRIES + 1;
            tracing::error!(
                %proposal,
                attempts,
                "vote simulation kept failing: {e}",
            );
            Error::SimulationFailed {
                source_domain: proposal.source,
                deposit_nonce: proposal.deposit_nonce,
                attempts,
            }
        })
    }

    async fn submit_vote(
        &self,
        proposal: &Proposal,
        priority: u8,
    ) -> Result<()> {
        match self
            .bridge
            .vote_proposal(proposal, TxOptions { priority })
            .await
        {
            Ok(tx_hash) => {
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::Voting,
                    source = proposal.source,
                    deposit_nonce = proposal.deposit_nonce,
                    %tx_hash,
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(%proposal, "vote submission failed: {e}");
                Err(Error::VoteSubmission {
                    source_domain: proposal.source,
                    deposit_nonce: proposal.deposit_nonce,
                    reason: e.to_string(),
                })
            }
        }
    }
}
