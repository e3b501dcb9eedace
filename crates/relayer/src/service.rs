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

//! Wires one chain's tasks together: the deposit watcher feeding a
//! bounded message channel, the consumer driving the voter engine, and
//! the pending-vote tracker feeding the quorum estimate.

use std::sync::Arc;
use std::time::Duration;

use ethereum_types::Address;
use spanbridge_bridge_clients::{BridgeContract, ChainClient};
use spanbridge_event_watcher::DepositEventWatcher;
use spanbridge_relayer_store::HistoryStore;
use spanbridge_relayer_types::Message;
use spanbridge_relayer_utils::{probe, Result};
use spanbridge_voter::{PendingVoteTracker, PendingVotes, Voter};
use tokio::sync::mpsc;

use crate::config::EvmChainConfig;
use crate::context::RelayerContext;

/// How many message batches the deposit channel buffers before the
/// watcher blocks; backpressure, not a queue.
pub const DEPOSIT_CHANNEL_CAPACITY: usize = 16;

/// Starts all background tasks for one configured chain.
///
/// Tasks observe the context's shutdown signal; dropping the returned
/// `Ok(())` does not stop them.
pub fn ignite_chain<C, B, S>(
    ctx: &RelayerContext,
    chain: &EvmChainConfig,
    client: Arc<C>,
    bridge: Arc<B>,
    store: S,
    relayer_address: Address,
) -> Result<()>
where
    C: ChainClient,
    B: BridgeContract,
    S: HistoryStore + 'static,
{
    if !chain.enabled {
        tracing::debug!(domain = chain.domain_id, "chain disabled, skipping");
        return Ok(());
    }
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        domain = chain.domain_id,
        "starting chain tasks",
    );
    let registry = Arc::new(chain.handler_registry());
    let pending_votes = Arc::new(PendingVotes::new());
    let (messages_tx, messages_rx) =
        mpsc::channel::<Vec<Message>>(DEPOSIT_CHANNEL_CAPACITY);
    let voter = Arc::new(
        Voter::builder()
            .bridge(bridge.clone())
            .registry(registry.clone())
            .pending_votes(pending_votes.clone())
            .relayer_address(relayer_address)
            .max_vote_delay(Duration::from_millis(chain.max_vote_delay))
            .build(),
    );

    if chain.events_watcher.enabled {
        spawn_deposit_watcher(
            ctx, chain, client.clone(), bridge.clone(), store, registry,
            messages_tx,
        );
    }
    spawn_message_consumer(ctx, voter, messages_rx);
    spawn_pending_vote_tracker(ctx, chain, client, bridge, pending_votes);
    Ok(())
}

fn spawn_deposit_watcher<C, B, S>(
    ctx: &RelayerContext,
    chain: &EvmChainConfig,
    client: Arc<C>,
    bridge: Arc<B>,
    store: S,
    registry: Arc<spanbridge_message_handlers::HandlerRegistry>,
    messages: mpsc::Sender<Vec<Message>>,
) where
    C: ChainClient,
    B: BridgeContract,
    S: HistoryStore + 'static,
{
    let watcher = DepositEventWatcher::new(
        client,
        bridge,
        store,
        registry,
        chain.watcher_config(),
    );
    let shutdown = ctx.shutdown_signal();
    tokio::spawn(async move {
        if let Err(e) = watcher.run(messages, shutdown).await {
            tracing::error!("deposit watcher stopped: {e}");
        }
    });
}

fn spawn_message_consumer<B>(
    ctx: &RelayerContext,
    voter: Arc<Voter<B>>,
    mut messages: mpsc::Receiver<Vec<Message>>,
) where
    B: BridgeContract,
{
    let mut shutdown = ctx.shutdown_signal();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                batch = messages.recv() => {
                    let Some(batch) = batch else { break };
                    for message in batch {
                        // each message decides and votes on its own
                        // schedule, so batches never block each other
                        let voter = voter.clone();
                        tokio::spawn(async move {
                            if let Err(e) = voter.execute(&message).await {
                                tracing::error!(
                                    %message,
                                    "failed to process message: {e}",
                                );
                            }
                        });
                    }
                }
            }
        }
    });
}

fn spawn_pending_vote_tracker<C, B>(
    ctx: &RelayerContext,
    chain: &EvmChainConfig,
    client: Arc<C>,
    bridge: Arc<B>,
    pending_votes: Arc<PendingVotes>,
) where
    C: ChainClient,
    B: BridgeContract,
{
    let tracker = PendingVoteTracker::new(
        client,
        bridge,
        pending_votes,
        Duration::from_millis(chain.pending_tx_poll_interval),
    );
    let shutdown = ctx.shutdown_signal();
    tokio::spawn(async move {
        // the tracker only sharpens the quorum estimate; losing it
        // leaves the relayer correct but chattier
        if let Err(e) = tracker.run(shutdown).await {
            tracing::warn!("pending vote tracker stopped: {e}");
        }
    });
}
