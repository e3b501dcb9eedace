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

//! # Relayer Utils 🕸️
//!
//! Shared plumbing for the spanbridge relayer: the workspace error type,
//! retry policies, the structured-probe logging target and the shutdown
//! signal observed by every background task.

use ethereum_types::Address;
use spanbridge_relayer_types::{DepositNonce, DomainId, ResourceId};

/// A module used for debugging relayer lifecycle, sync state, or other
/// relayer state.
pub mod probe;
/// Retry functionality
pub mod retry;
/// The shutdown signal observed by long-running tasks.
pub mod shutdown;

/// An enum of all possible errors that could be encountered during the
/// execution of the spanbridge relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Sled database error.
    #[error(transparent)]
    Sled(#[from] sled::Error),
    /// A deposit payload that does not follow its handler's layout.
    #[error("malformed deposit payload: {reason}")]
    MalformedPayload {
        /// Which layout rule the payload broke.
        reason: String,
    },
    /// A payload field with the wrong runtime type on the encode path.
    #[error("wrong format for payload field `{field}`, expected bytes")]
    WrongFieldFormat {
        /// The offending field.
        field: &'static str,
    },
    /// A deposit event log whose fixed fields cannot be decoded.
    #[error("invalid deposit event log: {reason}")]
    InvalidDepositLog {
        /// Which part of the log was unreadable.
        reason: String,
    },
    /// The bridge contract knows no handler for this resource.
    #[error("no handler registered on the bridge for resource {resource_id}")]
    NoHandlerForResource {
        /// The resource the lookup was for.
        resource_id: ResourceId,
    },
    /// A handler is deployed on-chain but this relayer was not configured
    /// to understand it.
    #[error("handler {handler} is deployed but not configured on this relayer")]
    NoRegisteredHandler {
        /// The unconfigured handler address.
        handler: Address,
    },
    /// Vote simulation exhausted its retry budget.
    #[error(
        "vote simulation for proposal {source_domain}/{deposit_nonce} \
         still failing after {attempts} attempts"
    )]
    SimulationFailed {
        /// The proposal's source domain.
        source_domain: DomainId,
        /// The proposal's deposit nonce.
        deposit_nonce: DepositNonce,
        /// How many simulation attempts were made.
        attempts: usize,
    },
    /// Submitting the real vote transaction failed.
    #[error("failed to submit vote for proposal {source_domain}/{deposit_nonce}: {reason}")]
    VoteSubmission {
        /// The proposal's source domain.
        source_domain: DomainId,
        /// The proposal's deposit nonce.
        deposit_nonce: DepositNonce,
        /// The underlying submission failure.
        reason: String,
    },
    /// An error raised by a chain client capability.
    #[error("chain client error: {0}")]
    ChainClient(String),
    /// An error raised by a bridge contract capability.
    #[error("bridge contract error: {0}")]
    BridgeContract(String),
    /// a background task failed and stopped abnormally.
    #[error("Task Stopped Abnormally")]
    TaskStoppedAbnormally,
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
}

/// A type alias for the result of the spanbridge relayer, that uses the
/// [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;
