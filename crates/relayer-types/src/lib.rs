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

//! # Relayer Types 🕸️
//!
//! Core value types shared across the spanbridge relayer: the normalized
//! [`Message`] produced by the deposit scanner, the destination-facing
//! [`Proposal`] the voter engine acts on, and the identifiers binding
//! them together.

use std::fmt;

use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

/// A module for the normalized cross-chain [`Message`] and its payload.
pub mod message;
/// A module for the destination-chain [`Proposal`] and its on-chain status.
pub mod proposal;

pub use message::{Message, Metadata, PayloadField, TransferType};
pub use proposal::{proposal_id, Proposal, ProposalState, ProposalStatus};

/// A numeric identifier for a specific chain participating in the bridge.
pub type DomainId = u8;
/// A monotonically increasing per-source-domain deposit sequence number.
///
/// Together with the source [`DomainId`] it identifies a transfer.
pub type DepositNonce = u64;

/// A 32-byte opaque key selecting which asset/handler pair a deposit
/// concerns.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct ResourceId(pub [u8; 32]);

impl ResourceId {
    /// Returns the underlying bytes of this resource id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ResourceId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId(0x{})", hex::encode(self.0))
    }
}

/// Computes the keccak256 hash of the given bytes.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(bytes);
    let mut output = [0u8; 32];
    keccak.finalize(&mut output);
    output
}
