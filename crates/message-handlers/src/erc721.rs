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

//! Codec for non-fungible (ERC721-like) transfers.
//!
//! Deposit calldata layout:
//!
//! ```text
//! [token_id:32][recipient_len:32][recipient:recipient_len]
//! [metadata_len:32][metadata:metadata_len][priority:1]?
//! ```

use spanbridge_relayer_types::{
    DepositNonce, DomainId, Message, Metadata, PayloadField, ResourceId,
    TransferType,
};
use spanbridge_relayer_utils::{Error, Result};

use crate::{encode_len, field_bytes, left_pad32, read_len};

const MIN_CALLDATA_LEN: usize = 64;

/// Decodes non-fungible deposit calldata into a normalized message with
/// a `[token_id, recipient, metadata]` payload.
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
                "non-fungible deposit calldata is {} bytes, expected at least {MIN_CALLDATA_LEN}",
                calldata.len()
            ),
        });
    }
    let token_id = &calldata[..32];
    let recipient_len = read_len(calldata, 32)?;
    let recipient_end =
        64usize
            .checked_add(recipient_len)
            .ok_or(Error::MalformedPayload {
                reason: "recipient length overflows".into(),
            })?;
    let recipient =
        calldata
            .get(64..recipient_end)
            .ok_or(Error::MalformedPayload {
                reason: format!(
                    "recipient length {recipient_len} overruns calldata"
                ),
            })?;
    let token_metadata_len = read_len(calldata, recipient_end)?;
    let token_metadata_start = recipient_end + 32;
    let token_metadata_end = token_metadata_start
        .checked_add(token_metadata_len)
        .ok_or(Error::MalformedPayload {
            reason: "metadata length overflows".into(),
        })?;
    let token_metadata = calldata
        .get(token_metadata_start..token_metadata_end)
        .ok_or(Error::MalformedPayload {
            reason: format!(
                "metadata length {token_metadata_len} overruns calldata"
            ),
        })?;
    let mut metadata = Metadata::default();
    if calldata.len() > token_metadata_end {
        metadata.priority = calldata[calldata.len() - 1];
    }
    Ok(Message {
        source,
        destination,
        deposit_nonce,
        resource_id,
        transfer_type: TransferType::NonFungibleTransfer,
        payload: vec![
            PayloadField::Bytes(token_id.to_vec()),
            PayloadField::Bytes(recipient.to_vec()),
            PayloadField::Bytes(token_metadata.to_vec()),
        ],
        metadata,
    })
}

/// Encodes a non-fungible message payload into destination proposal
/// data.
pub fn encode_proposal_data(message: &Message) -> Result<Vec<u8>> {
    let [token_id, recipient, token_metadata] = message.payload.as_slice()
    else {
        return Err(Error::MalformedPayload {
            reason: format!(
                "non-fungible transfer payload expects 3 fields, got {}",
                message.payload.len()
            ),
        });
    };
    let token_id = left_pad32(field_bytes(token_id, "token_id")?, "token_id")?;
    let recipient = field_bytes(recipient, "recipient")?;
    let token_metadata = field_bytes(token_metadata, "metadata")?;

    let mut data = Vec::with_capacity(
        96 + recipient.len() + token_metadata.len(),
    );
    data.extend_from_slice(&token_id);
    encode_len(&mut data, recipient.len());
    data.extend_from_slice(recipient);
    encode_len(&mut data, token_metadata.len());
    data.extend_from_slice(token_metadata);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calldata(token_id: u8, recipient: &[u8], metadata: &[u8]) -> Vec<u8> {
        let mut calldata = vec![0u8; 32];
        calldata[31] = token_id;
        encode_len(&mut calldata, recipient.len());
        calldata.extend_from_slice(recipient);
        encode_len(&mut calldata, metadata.len());
        calldata.extend_from_slice(metadata);
        calldata
    }

    #[test]
    fn decodes_all_three_fields() {
        let message = decode_deposit(
            1,
            2,
            7,
            ResourceId([0u8; 32]),
            &calldata(5, &[0xAA; 20], b"ipfs://token/5"),
        )
        .unwrap();
        let mut token_id = vec![0u8; 32];
        token_id[31] = 5;
        assert_eq!(message.payload[0], PayloadField::Bytes(token_id));
        assert_eq!(
            message.payload[1],
            PayloadField::Bytes(vec![0xAA; 20])
        );
        assert_eq!(
            message.payload[2],
            PayloadField::Bytes(b"ipfs://token/5".to_vec())
        );
    }

    #[test]
    fn trailing_byte_becomes_priority() {
        let mut calldata = calldata(5, &[0xAA; 20], b"m");
        calldata.push(9);
        let message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata).unwrap();
        assert_eq!(message.metadata.priority, 9);
    }

    #[test]
    fn rejects_short_calldata() {
        let err = decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &[0u8; 63])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_missing_metadata_section() {
        // recipient parses, then no metadata length word remains
        let mut calldata = vec![0u8; 32];
        encode_len(&mut calldata, 20);
        calldata.extend_from_slice(&[0xAA; 20]);
        let err = decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn encode_roundtrips_decode() {
        let original = decode_deposit(
            1,
            2,
            7,
            ResourceId([0u8; 32]),
            &calldata(5, &[0xCC; 20], b"meta"),
        )
        .unwrap();
        let data = encode_proposal_data(&original).unwrap();
        let reparsed =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &data).unwrap();
        assert_eq!(reparsed.payload, original.payload);
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut message = decode_deposit(
            1,
            2,
            7,
            ResourceId([0u8; 32]),
            &calldata(5, &[0xAA; 20], b"m"),
        )
        .unwrap();
        message.payload.truncate(2);
        let err = encode_proposal_data(&message).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_text_field_on_encode() {
        let mut message = decode_deposit(
            1,
            2,
            7,
            ResourceId([0u8; 32]),
            &calldata(5, &[0xAA; 20], b"m"),
        )
        .unwrap();
        message.payload[0] = PayloadField::Text("5".into());
        let err = encode_proposal_data(&message).unwrap_err();
        assert!(matches!(
            err,
            Error::WrongFieldFormat { field: "token_id" }
        ));
    }
}
