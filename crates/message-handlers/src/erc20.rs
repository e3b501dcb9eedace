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

//! Codec for fungible (ERC20-like) transfers.
//!
//! Deposit calldata layout:
//!
//! ```text
//! [amount:32][recipient_len:32][recipient:recipient_len][priority:1]?
//! ```
//!
//! The trailing priority byte is optional and out of band: it lands in
//! the message metadata, not the payload.

use spanbridge_relayer_types::{
    DepositNonce, DomainId, Message, Metadata, PayloadField, ResourceId,
    TransferType,
};
use spanbridge_relayer_utils::{Error, Result};

use crate::{encode_len, field_bytes, left_pad32, read_len};

const MIN_CALLDATA_LEN: usize = 84;

/// Decodes fungible deposit calldata into a normalized message with an
/// `[amount, recipient]` payload.
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
                "fungible deposit calldata is {} bytes, expected at least {MIN_CALLDATA_LEN}",
                calldata.len()
            ),
        });
    }
    let amount = &calldata[..32];
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
    let mut metadata = Metadata::default();
    if calldata.len() > recipient_end {
        metadata.priority = calldata[calldata.len() - 1];
    }
    Ok(Message {
        source,
        destination,
        deposit_nonce,
        resource_id,
        transfer_type: TransferType::FungibleTransfer,
        payload: vec![
            PayloadField::Bytes(amount.to_vec()),
            PayloadField::Bytes(recipient.to_vec()),
        ],
        metadata,
    })
}

/// Encodes a fungible message payload into destination proposal data.
pub fn encode_proposal_data(message: &Message) -> Result<Vec<u8>> {
    let [amount, recipient] = message.payload.as_slice() else {
        return Err(Error::MalformedPayload {
            reason: format!(
                "fungible transfer payload expects 2 fields, got {}",
                message.payload.len()
            ),
        });
    };
    let amount = left_pad32(field_bytes(amount, "amount")?, "amount")?;
    let recipient = field_bytes(recipient, "recipient")?;

    let mut data = Vec::with_capacity(64 + recipient.len());
    data.extend_from_slice(&amount);
    encode_len(&mut data, recipient.len());
    data.extend_from_slice(recipient);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calldata(amount: u8, recipient: &[u8]) -> Vec<u8> {
        let mut calldata = vec![0u8; 32];
        calldata[31] = amount;
        encode_len(&mut calldata, recipient.len());
        calldata.extend_from_slice(recipient);
        calldata
    }

    #[test]
    fn decodes_amount_and_recipient() {
        let recipient = [0xAA; 20];
        let message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(42, &recipient))
                .unwrap();
        let mut amount = vec![0u8; 32];
        amount[31] = 42;
        assert_eq!(message.payload[0], PayloadField::Bytes(amount));
        assert_eq!(
            message.payload[1],
            PayloadField::Bytes(recipient.to_vec())
        );
        assert_eq!(message.metadata.priority, 0);
    }

    #[test]
    fn trailing_byte_becomes_priority() {
        let mut calldata = calldata(1, &[0xAA; 20]);
        calldata.push(3);
        let message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata).unwrap();
        assert_eq!(message.metadata.priority, 3);
    }

    #[test]
    fn rejects_short_calldata() {
        let err = decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &[0u8; 83])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_recipient_overrunning_calldata() {
        // recipient length word claims 200 bytes, only 20 present
        let mut calldata = vec![0u8; 32];
        encode_len(&mut calldata, 200);
        calldata.extend_from_slice(&[0xAA; 20]);
        let err = decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn encode_roundtrips_decode() {
        let original =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(9, &[0xCC; 20]))
                .unwrap();
        let data = encode_proposal_data(&original).unwrap();
        let reparsed =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &data).unwrap();
        assert_eq!(reparsed.payload, original.payload);
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(1, &[0xAA; 20]))
                .unwrap();
        message.payload.pop();
        let err = encode_proposal_data(&message).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_text_field_on_encode() {
        let mut message =
            decode_deposit(1, 2, 7, ResourceId([0u8; 32]), &calldata(1, &[0xAA; 20]))
                .unwrap();
        message.payload[1] = PayloadField::Text("0xdead".into());
        let err = encode_proposal_data(&message).unwrap_err();
        assert!(matches!(
            err,
            Error::WrongFieldFormat { field: "recipient" }
        ));
    }
}
