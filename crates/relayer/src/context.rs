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

use spanbridge_relayer_utils::shutdown::{Shutdown, ShutdownNotifier};

use crate::config::RelayerConfig;

/// The context every spawned relayer task shares: the loaded
/// configuration and the graceful-shutdown channel.
#[derive(Debug, Clone)]
pub struct RelayerContext {
    /// The loaded configuration.
    pub config: RelayerConfig,
    notify_shutdown: ShutdownNotifier,
}

impl RelayerContext {
    /// Creates a context around a loaded configuration.
    pub fn new(config: RelayerConfig) -> Self {
        Self {
            config,
            notify_shutdown: ShutdownNotifier::new(),
        }
    }

    /// A [`Shutdown`] handle a task awaits on.
    pub fn shutdown_signal(&self) -> Shutdown {
        self.notify_shutdown.subscribe()
    }

    /// Signals every spawned task to shut down.
    pub fn shutdown(&self) {
        self.notify_shutdown.notify();
    }
}
