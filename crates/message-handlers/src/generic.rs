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

//! Codec for generic data-only transfers.
//!
//! Deposit calldata layout:
//!
//! ```text
//! [metadata_len:32][metadata:metadata_len]
//! ```

use spanbridge_relayer_types::{
    DepositNonce, DomainId, Message, Metadata, PayloadField, ResourceId,
    TransferType,
};
use spanbridge_relayer_utils::{Error, Result};

use crate::{encode_len, field_bytes, read_len};

const MIN_CALLDATA_LEN: usize = 32;

/// Decodes generic deposit calldata into a normalized message with a
/// single `[metadata]` payload field.
pub fn decode_deposit(
    source: DomainId,
    destination: DomainId,
    deposit_nonce: DepositNonce,
    resource_id: ResourceId,
    calldata: &[u8],
) -> Result<Message> {
    if calldata.len() < MIN_CALLDATA_LEN {
        return Err(Error::MalformedPayload {
            reason: format!(
                "generic deposit calldata is {} bytes, expected at least {MIN_CALLDATA_LEN}",
                calldata.len()
            ),
        });
    }
    let metadata_len = read_len(calldata, 0)?;
    let metadata_end =
        32usize
            .checked_add(metadata_len)
            .ok_or(Error::MalformedPayload {
                reason: "metadata length overflows".into(),
            })?;
    let metadata =
        calldata
            .get(32..metadata_end)
            .ok_or(Error::MalformedPayload {
                reason: format!(
                    "metadata length {metadata_len} overruns calldata"
                ),
            })?;
    Ok(Message {
        source,
        destination,
        deposit_nonce,
        resource_id,
        transfer_type: TransferType::GenericTransfer,
        payload: vec![PayloadField::Bytes(metadata.to_vec())],
        metadata: Metadata::default(),
    })
}

/// Encodes a generic message payload into destination proposal data.
pub fn encode_proposal_data(message: &Message) -> Result<Vec<u8>> {
    let [metadata] = message.payload.as_slice() else {
        return Err(Error::MalformedPayload {
            reason: format!(
                "generic transfer payload expects 1 field, got {}",
                message.payload.len()
            ),
        });
    };
    let metadata = field_bytes(metadata, "metadata")?;

    let mut data = Vec::with_capacity(32 + metadata.len());
    encode_len(&mut data, metadata.len());
    data.extend_from_slice(metadata);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calldata(metadata: &[u8]) -> Vec<u8> {
        let mut calldata = Vec::new();
        encode_len(&mut calldata, metadata.len());
        calldata.extend_from_slice(metadata);
        calldata
    }

    #[test]
    fn decodes_metadata() {
        let message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(b"hello"))
                .unwrap();
        assert_eq!(message.transfer_type, TransferType::GenericTransfer);
        assert_eq!(
            message.payload,
            vec![PayloadField::Bytes(b"hello".to_vec())]
        );
    }

    #[test]
    fn accepts_empty_metadata() {
        let message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(b""))
                .unwrap();
        assert_eq!(message.payload, vec![PayloadField::Bytes(vec![])]);
    }

    #[test]
    fn rejects_short_calldata() {
        let err = decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &[0u8; 31])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_metadata_overrunning_calldata() {
        let mut calldata = Vec::new();
        encode_len(&mut calldata, 100);
        calldata.extend_from_slice(b"short");
        let err = decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn encode_roundtrips_decode() {
        let original =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(b"meta"))
                .unwrap();
        let data = encode_proposal_data(&original).unwrap();
        let reparsed =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &data).unwrap();
        assert_eq!(reparsed.payload, original.payload);
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(b"m"))
                .unwrap();
        message.payload.push(PayloadField::Bytes(vec![]));
        let err = encode_proposal_data(&message).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }
}
