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

//! Decoding of the bridge contract's `Deposit` event.

use ethereum_types::{Address, H256, U256};
use spanbridge_bridge_clients::RawLog;
use spanbridge_relayer_types::{
    keccak256, DepositNonce, DomainId, ResourceId,
};
use spanbridge_relayer_utils::{Error, Result};

/// The signature hash of the bridge's deposit event:
/// `Deposit(uint8,bytes32,uint64,address,bytes,bytes)`.
pub fn deposit_event_signature() -> H256 {
    H256(keccak256(b"Deposit(uint8,bytes32,uint64,address,bytes,bytes)"))
}

/// One decoded `Deposit` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositLog {
    /// The domain the transfer is destined for.
    pub destination: DomainId,
    /// The resource the deposit concerns.
    pub resource_id: ResourceId,
    /// The deposit sequence number assigned by the bridge.
    pub deposit_nonce: DepositNonce,
    /// The account that made the deposit.
    pub sender: Address,
    /// The handler-specific deposit calldata.
    pub calldata: Vec<u8>,
    /// The handler's response data, opaque to the core.
    pub handler_response: Vec<u8>,
}

impl DepositLog {
    /// Decodes a raw event log's ABI-encoded data section.
    pub fn decode(log: &RawLog) -> Result<Self> {
        let data = log.data.as_slice();
        let destination_word = word(data, 0)?;
        let resource_word = word(data, 1)?;
        let nonce_word = word(data, 2)?;
        let sender_word = word(data, 3)?;
        let calldata_offset = offset(word(data, 4)?, "calldata")?;
        let response_offset = offset(word(data, 5)?, "handler response")?;

        let mut resource_id = [0u8; 32];
        resource_id.copy_from_slice(resource_word);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&nonce_word[24..]);

        Ok(Self {
            destination: destination_word[31],
            resource_id: ResourceId(resource_id),
            deposit_nonce: u64::from_be_bytes(nonce),
            sender: Address::from_slice(&sender_word[12..]),
            calldata: dynamic_bytes(data, calldata_offset, "calldata")?,
            handler_response: dynamic_bytes(
                data,
                response_offset,
                "handler response",
            )?,
        })
    }
}

fn word(data: &[u8], index: usize) -> Result<&[u8]> {
    data.get(index * 32..(index + 1) * 32)
        .ok_or_else(|| Error::InvalidDepositLog {
            reason: format!("missing head word {index}"),
        })
}

fn offset(word: &[u8], section: &str) -> Result<usize> {
    let offset = U256::from_big_endian(word);
    if offset > U256::from(u32::MAX) {
        return Err(Error::InvalidDepositLog {
            reason: format!("unreasonable {section} offset {offset}"),
        });
    }
    Ok(offset.as_usize())
}

fn dynamic_bytes(data: &[u8], offset: usize, section: &str) -> Result<Vec<u8>> {
    let len_word =
        data.get(offset..offset + 32)
            .ok_or_else(|| Error::InvalidDepositLog {
                reason: format!("{section} offset {offset} out of bounds"),
            })?;
    let len = U256::from_big_endian(len_word);
    if len > U256::from(u32::MAX) {
        return Err(Error::InvalidDepositLog {
            reason: format!("unreasonable {section} length {len}"),
        });
    }
    let start = offset + 32;
    let bytes = data.get(start..start + len.as_usize()).ok_or_else(|| {
        Error::InvalidDepositLog {
            reason: format!("{section} length {len} overruns event data"),
        }
    })?;
    Ok(bytes.to_vec())
}
