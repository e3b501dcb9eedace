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

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DepositNonce, DomainId, ResourceId};

/// The asset class a transfer concerns, selecting which calldata codec
/// applies to its payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TransferType {
    /// An ERC20-like transfer: amount + recipient.
    FungibleTransfer,
    /// An ERC721-like transfer: token id + recipient + metadata.
    NonFungibleTransfer,
    /// A generic data transfer: metadata only.
    GenericTransfer,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FungibleTransfer => write!(f, "fungible"),
            Self::NonFungibleTransfer => write!(f, "non-fungible"),
            Self::GenericTransfer => write!(f, "generic"),
        }
    }
}

/// One typed field of a [`Message`] payload.
///
/// Deposit codecs only ever produce [`PayloadField::Bytes`]; the `Text`
/// variant exists for custom handlers, and a `Text` value in a slot that
/// expects raw bytes is rejected on the encode path with
/// `WrongFieldFormat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadField {
    /// A raw byte sequence (amounts, token ids, recipients, metadata).
    Bytes(Vec<u8>),
    /// A UTF-8 string field.
    Text(String),
}

impl PayloadField {
    /// Returns the raw bytes of this field, or `None` if it is not a
    /// byte field.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Text(_) => None,
        }
    }
}

/// Auxiliary out-of-band fields carried next to the payload but not part
/// of the on-chain calldata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// A fee-priority hint forwarded to transaction submission.
    pub priority: u8,
}

/// A normalized description of a single cross-chain transfer intent,
/// constructed once by a calldata codec from a raw deposit log and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The domain the deposit was made on.
    pub source: DomainId,
    /// The domain the transfer is destined for.
    pub destination: DomainId,
    /// The deposit sequence number on the source domain.
    pub deposit_nonce: DepositNonce,
    /// Selects the asset/handler pair this transfer concerns.
    pub resource_id: ResourceId,
    /// The asset class of the transfer.
    pub transfer_type: TransferType,
    /// Ordered typed fields, shape depends on `transfer_type`.
    pub payload: Vec<PayloadField>,
    /// Out-of-band fields, zero-valued unless the deposit carried them.
    pub metadata: Metadata,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message(src: {}, dest: {}, nonce: {}, type: {}, resource: {})",
            self.source,
            self.destination,
            self.deposit_nonce,
            self.transfer_type,
            self.resource_id,
        )
    }
}
