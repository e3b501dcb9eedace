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

//! # Message Handlers 🕸️
//!
//! The calldata codecs that translate between raw deposit calldata and
//! the normalized [`Message`], and the [`HandlerRegistry`] that maps
//! on-chain handler contract addresses to those codecs.
//!
//! Three codecs are built in, one per asset class; anything else plugs
//! in through [`HandlerKind::Custom`].

use std::collections::HashMap;
use std::sync::Arc;

use ethereum_types::{Address, U256};
use spanbridge_bridge_clients::BridgeContract;
use spanbridge_relayer_types::{
    DepositNonce, DomainId, Message, PayloadField, Proposal, ResourceId,
};
use spanbridge_relayer_utils::{Error, Result};

/// The fungible (ERC20-like) calldata codec.
pub mod erc20;
/// The non-fungible (ERC721-like) calldata codec.
pub mod erc721;
/// The generic data-only calldata codec.
pub mod generic;

/// A codec between raw deposit calldata and the normalized [`Message`],
/// and back from a [`Message`] to destination proposal data.
///
/// Both directions are pure; everything chain-facing stays in the
/// registry.
pub trait HandlerCodec: Send + Sync {
    /// Decodes one deposit's calldata into a normalized message.
    fn decode_deposit(
        &self,
        source: DomainId,
        destination: DomainId,
        deposit_nonce: DepositNonce,
        resource_id: ResourceId,
        calldata: &[u8],
        handler_response: &[u8],
    ) -> Result<Message>;

    /// Encodes a message's payload into destination proposal data.
    fn encode_proposal_data(&self, message: &Message) -> Result<Vec<u8>>;
}

/// Which codec a configured handler contract speaks.
#[derive(Clone)]
pub enum HandlerKind {
    /// The fungible (amount + recipient) layout.
    Fungible,
    /// The non-fungible (token id + recipient + metadata) layout.
    NonFungible,
    /// The generic (metadata only) layout.
    Generic,
    /// A caller-provided codec for handler contracts the built-in
    /// layouts do not cover.
    Custom(Arc<dyn HandlerCodec>),
}

impl std::fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fungible => write!(f, "Fungible"),
            Self::NonFungible => write!(f, "NonFungible"),
            Self::Generic => write!(f, "Generic"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl HandlerKind {
    /// Decodes deposit calldata with this kind's codec.
    pub fn decode_deposit(
        &self,
        source: DomainId,
        destination: DomainId,
        deposit_nonce: DepositNonce,
        resource_id: ResourceId,
        calldata: &[u8],
        handler_response: &[u8],
    ) -> Result<Message> {
        match self {
            Self::Fungible => erc20::decode_deposit(
                source,
                destination,
                deposit_nonce,
                resource_id,
                calldata,
            ),
            Self::NonFungible => erc721::decode_deposit(
                source,
                destination,
                deposit_nonce,
                resource_id,
                calldata,
            ),
            Self::Generic => generic::decode_deposit(
                source,
                destination,
                deposit_nonce,
                resource_id,
                calldata,
            ),
            Self::Custom(codec) => codec.decode_deposit(
                source,
                destination,
                deposit_nonce,
                resource_id,
                calldata,
                handler_response,
            ),
        }
    }

    /// Encodes a message's payload with this kind's codec.
    pub fn encode_proposal_data(&self, message: &Message) -> Result<Vec<u8>> {
        match self {
            Self::Fungible => erc20::encode_proposal_data(message),
            Self::NonFungible => erc721::encode_proposal_data(message),
            Self::Generic => generic::encode_proposal_data(message),
            Self::Custom(codec) => codec.encode_proposal_data(message),
        }
    }
}

/// Maps handler contract addresses to the codec they speak.
///
/// Populated once from configuration at startup and shared read-only by
/// the deposit watcher and the voter engine.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Address, HandlerKind>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a codec for a handler contract address.
    pub fn register(&mut self, handler: Address, kind: HandlerKind) {
        self.handlers.insert(handler, kind);
    }

    /// Looks up the codec for a handler contract address.
    pub fn kind_of(&self, handler: Address) -> Result<&HandlerKind> {
        self.handlers
            .get(&handler)
            .ok_or(Error::NoRegisteredHandler { handler })
    }

    /// Asks the bridge which handler contract serves `resource_id` and
    /// checks that a codec is configured for it.
    pub async fn resolve(
        &self,
        bridge: &dyn BridgeContract,
        resource_id: ResourceId,
    ) -> Result<(Address, &HandlerKind)> {
        let handler = bridge.handler_address_for_resource(resource_id).await?;
        if handler.is_zero() {
            return Err(Error::NoHandlerForResource { resource_id });
        }
        let kind = self.kind_of(handler)?;
        Ok((handler, kind))
    }

    /// Turns one decoded deposit into a normalized [`Message`], routing
    /// through the codec registered for the deposit's resource.
    #[tracing::instrument(skip(self, bridge, calldata, handler_response))]
    pub async fn handle_deposit(
        &self,
        bridge: &dyn BridgeContract,
        source: DomainId,
        destination: DomainId,
        deposit_nonce: DepositNonce,
        resource_id: ResourceId,
        calldata: &[u8],
        handler_response: &[u8],
    ) -> Result<Message> {
        let (_, kind) = self.resolve(bridge, resource_id).await?;
        kind.decode_deposit(
            source,
            destination,
            deposit_nonce,
            resource_id,
            calldata,
            handler_response,
        )
    }

    /// Turns a normalized [`Message`] into the destination-facing
    /// [`Proposal`] the voter engine acts on.
    #[tracing::instrument(skip(self, bridge, message), fields(%message))]
    pub async fn handle_message(
        &self,
        bridge: &dyn BridgeContract,
        message: &Message,
    ) -> Result<Proposal> {
        let (handler_address, kind) =
            self.resolve(bridge, message.resource_id).await?;
        let data = kind.encode_proposal_data(message)?;
        Ok(Proposal {
            source: message.source,
            deposit_nonce: message.deposit_nonce,
            resource_id: message.resource_id,
            data,
            handler_address,
            bridge_address: bridge.address(),
        })
    }
}

/// Reads the 32-byte big-endian length word at `offset`.
pub(crate) fn read_len(calldata: &[u8], offset: usize) -> Result<usize> {
    let word = calldata.get(offset..offset + 32).ok_or_else(|| {
        Error::MalformedPayload {
            reason: format!("missing length word at offset {offset}"),
        }
    })?;
    let len = U256::from_big_endian(word);
    if len > U256::from(u32::MAX) {
        return Err(Error::MalformedPayload {
            reason: format!("unreasonable length {len} at offset {offset}"),
        });
    }
    Ok(len.as_usize())
}

/// Writes `len` as a 32-byte big-endian word.
pub(crate) fn encode_len(out: &mut Vec<u8>, len: usize) {
    let mut word = [0u8; 32];
    U256::from(len).to_big_endian(&mut word);
    out.extend_from_slice(&word);
}

/// Extracts the raw bytes of one payload field on the encode path.
pub(crate) fn field_bytes<'a>(
    field: &'a PayloadField,
    name: &'static str,
) -> Result<&'a [u8]> {
    field
        .as_bytes()
        .ok_or(Error::WrongFieldFormat { field: name })
}

/// Left-pads `bytes` into a 32-byte word.
pub(crate) fn left_pad32(bytes: &[u8], name: &'static str) -> Result<[u8; 32]> {
    if bytes.len() > 32 {
        return Err(Error::MalformedPayload {
            reason: format!(
                "field `{name}` is {} bytes, does not fit a 32-byte word",
                bytes.len()
            ),
        });
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(word)
}

#[cfg(test)]
mod tests {
    use spanbridge_bridge_clients::mock::MockBridgeContract;
    use spanbridge_relayer_types::{Metadata, TransferType};

    use super::*;

    fn erc20_calldata(amount: u8, recipient: &[u8]) -> Vec<u8> {
        let mut calldata = vec![0u8; 32];
        calldata[31] = amount;
        encode_len(&mut calldata, recipient.len());
        calldata.extend_from_slice(recipient);
        calldata
    }

    fn registry_with(handler: Address, kind: HandlerKind) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(handler, kind);
        registry
    }

    #[tokio::test]
    async fn deposit_routes_through_registered_codec() {
        let handler = Address::repeat_byte(0x11);
        let bridge = MockBridgeContract::new(Address::repeat_byte(0xBB));
        let resource_id = ResourceId([5u8; 32]);
        bridge.register_resource(resource_id, handler);
        let registry = registry_with(handler, HandlerKind::Fungible);

        let calldata = erc20_calldata(42, &[0xAA; 20]);
        let message = registry
            .handle_deposit(&bridge, 1, 2, 7, resource_id, &calldata, &[])
            .await
            .unwrap();
        assert_eq!(message.transfer_type, TransferType::FungibleTransfer);
        assert_eq!(message.source, 1);
        assert_eq!(message.destination, 2);
        assert_eq!(message.deposit_nonce, 7);
        assert_eq!(message.payload.len(), 2);
    }

    #[tokio::test]
    async fn unknown_resource_is_rejected() {
        let bridge = MockBridgeContract::new(Address::repeat_byte(0xBB));
        let registry = HandlerRegistry::new();
        let resource_id = ResourceId([5u8; 32]);

        let err = registry
            .handle_deposit(&bridge, 1, 2, 7, resource_id, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoHandlerForResource { resource_id: r } if r == resource_id
        ));
    }

    #[tokio::test]
    async fn unconfigured_handler_is_rejected() {
        let handler = Address::repeat_byte(0x11);
        let bridge = MockBridgeContract::new(Address::repeat_byte(0xBB));
        let resource_id = ResourceId([5u8; 32]);
        bridge.register_resource(resource_id, handler);
        let registry = HandlerRegistry::new();

        let err = registry
            .handle_deposit(&bridge, 1, 2, 7, resource_id, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoRegisteredHandler { handler: h } if h == handler
        ));
    }

    #[tokio::test]
    async fn message_becomes_proposal_bound_to_resolved_handler() {
        let handler = Address::repeat_byte(0x11);
        let bridge_address = Address::repeat_byte(0xBB);
        let bridge = MockBridgeContract::new(bridge_address);
        let resource_id = ResourceId([5u8; 32]);
        bridge.register_resource(resource_id, handler);
        let registry = registry_with(handler, HandlerKind::Fungible);

        let message = Message {
            source: 1,
            destination: 2,
            deposit_nonce: 7,
            resource_id,
            transfer_type: TransferType::FungibleTransfer,
            payload: vec![
                PayloadField::Bytes(vec![42]),
                PayloadField::Bytes(vec![0xAA; 20]),
            ],
            metadata: Metadata::default(),
        };
        let proposal = registry.handle_message(&bridge, &message).await.unwrap();
        assert_eq!(proposal.handler_address, handler);
        assert_eq!(proposal.bridge_address, bridge_address);
        assert_eq!(proposal.source, 1);
        assert_eq!(proposal.deposit_nonce, 7);
        // amount word + recipient length word + 20 recipient bytes
        assert_eq!(proposal.data.len(), 84);
    }

    #[test]
    fn custom_codec_is_dispatched() {
        struct Upper;
        impl HandlerCodec for Upper {
            fn decode_deposit(
                &self,
                source: DomainId,
                destination: DomainId,
                deposit_nonce: DepositNonce,
                resource_id: ResourceId,
                calldata: &[u8],
                _handler_response: &[u8],
            ) -> Result<Message> {
                Ok(Message {
                    source,
                    destination,
                    deposit_nonce,
                    resource_id,
                    transfer_type: TransferType::GenericTransfer,
                    payload: vec![PayloadField::Bytes(calldata.to_vec())],
                    metadata: Metadata::default(),
                })
            }

            fn encode_proposal_data(
                &self,
                message: &Message,
            ) -> Result<Vec<u8>> {
                field_bytes(&message.payload[0], "raw").map(<[u8]>::to_vec)
            }
        }

        let kind = HandlerKind::Custom(Arc::new(Upper));
        let message = kind
            .decode_deposit(1, 2, 3, ResourceId([0u8; 32]), &[9, 9], &[])
            .unwrap();
        assert_eq!(kind.encode_proposal_data(&message).unwrap(), vec![9, 9]);
    }
}
