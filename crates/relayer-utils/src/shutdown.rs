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

use tokio::sync::broadcast;

/// Broadcasts a shutdown signal to all active background tasks.
///
/// When a task is spawned, it is handed a [`Shutdown`] receiver via
/// [`ShutdownNotifier::subscribe`]. When a graceful shutdown is
/// initiated, a `()` value is sent to every subscriber; each task
/// reaches a safe terminal state and completes.
#[derive(Debug, Clone)]
pub struct ShutdownNotifier {
    notify: broadcast::Sender<()>,
}

impl ShutdownNotifier {
    /// Creates a new notifier with no subscribers yet.
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(2);
        Self { notify }
    }

    /// Creates a [`Shutdown`] handle observing this notifier.
    pub fn subscribe(&self) -> Shutdown {
        Shutdown::new(self.notify.subscribe())
    }

    /// Signals every subscribed task to shut down.
    pub fn notify(&self) {
        let _ = self.notify.send(());
    }
}

impl Default for ShutdownNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Listens for the relayer shutdown signal.
///
/// Only a single value is ever sent. The `Shutdown` struct listens for
/// the signal and remembers that it has been received, so callers may
/// poll it more than once.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,
    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }
}
