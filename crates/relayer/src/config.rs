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

//! Relayer configuration: one section per watched chain, loaded from a
//! file plus `SPANBRIDGE_`-prefixed environment overrides.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use spanbridge_event_watcher::DepositWatcherConfig;
use spanbridge_message_handlers::{HandlerKind, HandlerRegistry};
use spanbridge_relayer_types::DomainId;
use spanbridge_relayer_utils::Result;

/// The root configuration of the relayer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerConfig {
    /// The chains this relayer serves, keyed by a human-readable name.
    #[serde(default)]
    pub evm: HashMap<String, EvmChainConfig>,
}

/// Configuration of one watched chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EvmChainConfig {
    /// Whether this chain's tasks are started at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The bridge-level domain id of this chain.
    pub domain_id: DomainId,
    /// The RPC endpoint a concrete chain client connects to.
    pub http_endpoint: String,
    /// The deployed bridge contract address.
    pub bridge: Address,
    /// The handler contracts this relayer understands on this chain.
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
    /// Deposit scanning knobs.
    #[serde(default)]
    pub events_watcher: EventsWatcherConfig,
    /// How many blocks behind the head the deposit watcher stays.
    #[serde(default = "default_block_confirmations")]
    pub block_confirmations: u64,
    /// The block scanning starts from on a fresh store.
    #[serde(default)]
    pub start_block: Option<u64>,
    /// The upper bound of the voter's random pre-check delay, in
    /// milliseconds.
    #[serde(default = "default_max_vote_delay")]
    pub max_vote_delay: u64,
    /// How often the pending-vote tracker re-checks an in-flight vote
    /// transaction, in milliseconds.
    #[serde(default = "default_pending_tx_poll_interval")]
    pub pending_tx_poll_interval: u64,
}

impl EvmChainConfig {
    /// Builds the handler registry from the configured handler list.
    pub fn handler_registry(&self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        for handler in &self.handlers {
            registry.register(handler.address, handler.handler_type.kind());
        }
        registry
    }

    /// Builds the deposit watcher configuration for this chain.
    pub fn watcher_config(&self) -> DepositWatcherConfig {
        DepositWatcherConfig {
            source_domain: self.domain_id,
            start_block: self.start_block,
            confirmations: self.block_confirmations,
            polling_interval: Duration::from_millis(
                self.events_watcher.polling_interval,
            ),
            retry_interval: Duration::from_millis(
                self.events_watcher.retry_interval,
            ),
            max_blocks_per_step: self.events_watcher.max_blocks_per_step,
            print_progress_interval: Duration::from_millis(
                self.events_watcher.print_progress_interval,
            ),
        }
    }
}

/// One configured handler contract and the codec it speaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HandlerConfig {
    /// The handler contract address.
    pub address: Address,
    /// Which built-in codec the handler speaks.
    #[serde(rename = "type")]
    pub handler_type: HandlerType,
}

/// The built-in handler codecs selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerType {
    /// The fungible (amount + recipient) codec.
    Erc20,
    /// The non-fungible (token id + recipient + metadata) codec.
    Erc721,
    /// The generic (metadata only) codec.
    Generic,
}

impl HandlerType {
    /// The registry kind this configured type maps to.
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Erc20 => HandlerKind::Fungible,
            Self::Erc721 => HandlerKind::NonFungible,
            Self::Generic => HandlerKind::Generic,
        }
    }
}

/// Deposit scanning knobs for one chain, all intervals in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventsWatcherConfig {
    /// Whether deposit scanning runs for this chain.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How long to wait before polling for a new chain head.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    /// How long to wait before restarting the scan after an error.
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,
    /// The largest block range fetched in one query.
    #[serde(default = "default_max_blocks_per_step")]
    pub max_blocks_per_step: u64,
    /// How often sync progress is logged.
    #[serde(default = "default_print_progress_interval")]
    pub print_progress_interval: u64,
}

impl Default for EventsWatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            polling_interval: default_polling_interval(),
            retry_interval: default_retry_interval(),
            max_blocks_per_step: default_max_blocks_per_step(),
            print_progress_interval: default_print_progress_interval(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_block_confirmations() -> u64 {
    0
}

const fn default_max_vote_delay() -> u64 {
    15_000
}

const fn default_pending_tx_poll_interval() -> u64 {
    1_000
}

const fn default_polling_interval() -> u64 {
    6_000
}

const fn default_retry_interval() -> u64 {
    6_000
}

const fn default_max_blocks_per_step() -> u64 {
    100
}

const fn default_print_progress_interval() -> u64 {
    7_000
}

/// Loads the relayer configuration from a file, with `SPANBRIDGE_`
/// environment variables overriding file values.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RelayerConfig> {
    let config = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix("SPANBRIDGE").separator("__"),
        )
        .build()?;
    Ok(config.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> RelayerConfig {
        config::Config::builder()
            .add_source(config::File::from_str(
                toml,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn parses_a_chain_section_with_defaults() {
        let config = parse(
            r#"
            [evm.goerli]
            domain-id = 1
            http-endpoint = "http://localhost:8545"
            bridge = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [[evm.goerli.handlers]]
            address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
            type = "erc20"
            "#,
        );
        let chain = &config.evm["goerli"];
        assert!(chain.enabled);
        assert_eq!(chain.domain_id, 1);
        assert_eq!(chain.handlers.len(), 1);
        assert_eq!(chain.handlers[0].handler_type, HandlerType::Erc20);
        assert_eq!(chain.block_confirmations, 0);
        assert_eq!(chain.max_vote_delay, 15_000);
        assert!(chain.events_watcher.enabled);
        assert_eq!(chain.events_watcher.polling_interval, 6_000);
        assert_eq!(chain.events_watcher.max_blocks_per_step, 100);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = parse(
            r#"
            [evm.local]
            domain-id = 2
            http-endpoint = "http://localhost:8545"
            bridge = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            block-confirmations = 12
            start-block = 1000
            max-vote-delay = 500

            [evm.local.events-watcher]
            polling-interval = 100
            max-blocks-per-step = 10
            "#,
        );
        let chain = &config.evm["local"];
        assert_eq!(chain.block_confirmations, 12);
        assert_eq!(chain.start_block, Some(1000));
        assert_eq!(chain.max_vote_delay, 500);
        assert_eq!(chain.events_watcher.polling_interval, 100);
        assert_eq!(chain.events_watcher.max_blocks_per_step, 10);
        let watcher = chain.watcher_config();
        assert_eq!(watcher.source_domain, 2);
        assert_eq!(watcher.confirmations, 12);
        assert_eq!(watcher.start_block, Some(1000));
    }

    #[test]
    fn handler_types_map_to_registry_kinds() {
        let config = parse(
            r#"
            [evm.local]
            domain-id = 2
            http-endpoint = "http://localhost:8545"
            bridge = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [[evm.local.handlers]]
            address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
            type = "erc721"

            [[evm.local.handlers]]
            address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
            type = "generic"
            "#,
        );
        let chain = &config.evm["local"];
        let registry = chain.handler_registry();
        for handler in &chain.handlers {
            assert!(registry.kind_of(handler.address).is_ok());
        }
    }
}
