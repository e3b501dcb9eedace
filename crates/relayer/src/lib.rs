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

//! # Spanbridge Relayer 🕸️
//!
//! The top-level glue of the relayer: configuration loading, the shared
//! task context and the per-chain service wiring. Embedders hand
//! [`service::ignite_chain`] a concrete chain client and bridge
//! contract, and the relayer runs its watcher, voter and tracker tasks
//! against them until the context signals shutdown.

/// Relayer configuration loading and per-chain sections.
pub mod config;
/// The shared context of all spawned tasks.
pub mod context;
/// Per-chain task wiring.
pub mod service;

pub use config::{load, RelayerConfig};
pub use context::RelayerContext;
