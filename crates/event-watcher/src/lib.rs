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

//! # Deposit Event Watcher 🕸️
//!
//! Polls a source chain's bridge contract for `Deposit` events, decodes
//! them through the handler registry into normalized messages and
//! forwards them to the voter engine.
//!
//! The watcher keeps its scan cursor in a [`HistoryStore`], so restarts
//! resume from the last fully processed block. Delivery downstream is
//! at-least-once: a crash between forwarding a batch and persisting the
//! cursor re-emits that batch on restart, and the voter's idempotency
//! checks absorb the duplicates.

use std::cmp;
use std::sync::Arc;
use std::time::{Duration, Instant};

use spanbridge_bridge_clients::{BridgeContract, ChainClient, RawLog};
use spanbridge_message_handlers::HandlerRegistry;
use spanbridge_relayer_store::{HistoryStore, HistoryStoreKey};
use spanbridge_relayer_types::{DomainId, Message};
use spanbridge_relayer_utils::shutdown::Shutdown;
use spanbridge_relayer_utils::{probe, Error, Result};
use tokio::sync::mpsc;

/// A module for decoding the bridge's `Deposit` event.
pub mod event;


pub use event::{deposit_event_signature, DepositLog};

/// Tuning knobs for one chain's deposit watcher.
#[derive(Debug, Clone)]
pub struct DepositWatcherConfig {
    /// The domain id of the watched source chain.
    pub source_domain: DomainId,
    /// The block scanning starts from on a fresh store, the current
    /// head when unset.
    pub start_block: Option<u64>,
    /// How many blocks behind the head the watcher stays.
    pub confirmations: u64,
    /// How long to wait before polling for a new chain head.
    pub polling_interval: Duration,
    /// How long to wait before restarting the scan after an error.
    pub retry_interval: Duration,
    /// The largest block range fetched in one query.
    pub max_blocks_per_step: u64,
    /// How often sync progress is logged.
    pub print_progress_interval: Duration,
}

impl Default for DepositWatcherConfig {
    fn default() -> Self {
        Self {
            source_domain: 0,
            start_block: None,
            confirmations: 0,
            polling_interval: Duration::from_millis(6000),
            retry_interval: Duration::from_millis(6000),
            max_blocks_per_step: 100,
            print_progress_interval: Duration::from_millis(7000),
        }
    }
}

/// Watches one source chain's bridge contract for deposits.
pub struct DepositEventWatcher<C, B, S>
where
    C: ChainClient,
    B: BridgeContract,
    S: HistoryStore,
{
    client: Arc<C>,
    bridge: Arc<B>,
    store: S,
    registry: Arc<HandlerRegistry>,
    config: DepositWatcherConfig,
}

impl<C, B, S> DepositEventWatcher<C, B, S>
where
    C: ChainClient,
    B: BridgeContract,
    S: HistoryStore,
{
    /// Creates a watcher over one source chain.
    pub fn new(
        client: Arc<C>,
        bridge: Arc<B>,
        store: S,
        registry: Arc<HandlerRegistry>,
        config: DepositWatcherConfig,
    ) -> Self {
        Self {
            client,
            bridge,
            store,
            registry,
            config,
        }
    }

    /// Runs the watcher until shutdown is signalled.
    ///
    /// Scan errors restart the scan from the persisted cursor after the
    /// configured retry interval; only a closed message channel stops
    /// the watcher for good.
    pub async fn run(
        &self,
        messages: mpsc::Sender<Vec<Message>>,
        mut shutdown: Shutdown,
    ) -> Result<()> {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::trace!(
                    source = self.config.source_domain,
                    "deposit watcher received shutdown signal",
                );
                Ok(())
            }
            result = self.watch(&messages) => result,
        }
    }

    async fn watch(&self, messages: &mpsc::Sender<Vec<Message>>) -> Result<()> {
        let backoff = backoff::backoff::Constant::new(self.config.retry_interval);
        backoff::future::retry(backoff, || async {
            self.scan(messages).await.map_err(|e| {
                if matches!(e, backoff::Error::Transient { .. }) {
                    tracing::event!(
                        target: probe::TARGET,
                        tracing::Level::DEBUG,
                        kind = %probe::Kind::Retry,
                        source = self.config.source_domain,
                    );
                }
                e
            })
        })
        .await
    }

    #[tracing::instrument(
        skip_all,
        fields(source = self.config.source_domain),
    )]
    async fn scan(
        &self,
        messages: &mpsc::Sender<Vec<Message>>,
    ) -> std::result::Result<(), backoff::Error<Error>> {
        let contract = self.bridge.address();
        let key = HistoryStoreKey::from((self.config.source_domain, contract));
        let mut target_block = self.client.latest_block_number().await?;
        // a fresh store without a configured start block scans forward
        // from the current head only
        let start_block = self.config.start_block.unwrap_or(target_block);
        self.store.set_target_block_number(key, target_block)?;
        let mut progress_logged_at = Instant::now();
        loop {
            let last = self.store.get_last_block_number(key, start_block)?;
            let confirmed_head =
                target_block.saturating_sub(self.config.confirmations);
            if confirmed_head <= last {
                // fully synced, wait for the chain to move.
                tokio::time::sleep(self.config.polling_interval).await;
                target_block = self.client.latest_block_number().await?;
                self.store.set_target_block_number(key, target_block)?;
                continue;
            }
            let from = last + 1;
            let to = cmp::min(
                last + self.config.max_blocks_per_step,
                confirmed_head,
            );
            let logs = self
                .client
                .fetch_event_logs(
                    contract,
                    deposit_event_signature(),
                    from,
                    to,
                )
                .await?;
            let mut batch = Vec::with_capacity(logs.len());
            for log in &logs {
                match self.process_log(log).await {
                    Ok(message) => batch.push(message),
                    Err(
                        e @ (Error::NoHandlerForResource { .. }
                        | Error::NoRegisteredHandler { .. }),
                    ) => {
                        tracing::error!(
                            block_number = log.block_number,
                            "skipping deposit with no usable handler: {e}",
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            block_number = log.block_number,
                            "skipping malformed deposit: {e}",
                        );
                    }
                }
            }
            if !batch.is_empty() {
                messages.send(batch).await.map_err(|_| {
                    backoff::Error::permanent(Error::Generic(
                        "deposit message channel closed",
                    ))
                })?;
            }
            self.store.set_last_block_number(key, to)?;
            if progress_logged_at.elapsed()
                > self.config.print_progress_interval
            {
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::DEBUG,
                    kind = %probe::Kind::Sync,
                    source = self.config.source_domain,
                    block_number = to,
                    target_block,
                );
                progress_logged_at = Instant::now();
            }
            if to == confirmed_head {
                tokio::time::sleep(self.config.polling_interval).await;
                target_block = self.client.latest_block_number().await?;
                self.store.set_target_block_number(key, target_block)?;
            }
        }
    }

    async fn process_log(&self, log: &RawLog) -> Result<Message> {
        let deposit = DepositLog::decode(log)?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Deposit,
            source = self.config.source_domain,
            destination = deposit.destination,
            deposit_nonce = deposit.deposit_nonce,
            resource_id = %deposit.resource_id,
        );
        self.registry
            .handle_deposit(
                self.bridge.as_ref(),
                self.config.source_domain,
                deposit.destination,
                deposit.deposit_nonce,
                deposit.resource_id,
                &deposit.calldata,
                &deposit.handler_response,
            )
            .await
    }
}
