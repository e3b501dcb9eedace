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

use ethereum_types::{Address, H256, U256};

use crate::{keccak256, DepositNonce, DomainId, ResourceId};

/// The destination-chain-facing representation of a [`crate::Message`],
/// bound to a specific handler contract.
///
/// Never mutated after construction; identified on-chain by
/// [`Proposal::data_hash`] and relayer-side by [`Proposal::id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// The source domain the deposit originated from.
    pub source: DomainId,
    /// The deposit sequence number on the source domain.
    pub deposit_nonce: DepositNonce,
    /// The resource the transfer concerns.
    pub resource_id: ResourceId,
    /// Encoded payload ready for the destination handler contract.
    pub data: Vec<u8>,
    /// The destination handler contract this proposal targets.
    pub handler_address: Address,
    /// The destination bridge contract this proposal is voted on.
    pub bridge_address: Address,
}

impl Proposal {
    /// The content-addressed identity the destination contract keys its
    /// vote bookkeeping by: `keccak256(handler_address || data)`.
    ///
    /// Two proposals with identical `(handler_address, data)` are
    /// indistinguishable on-chain.
    pub fn data_hash(&self) -> H256 {
        let mut input =
            Vec::with_capacity(Address::len_bytes() + self.data.len());
        input.extend_from_slice(self.handler_address.as_bytes());
        input.extend_from_slice(&self.data);
        H256(keccak256(&input))
    }

    /// The relayer-side identity used for deduplication and pending-vote
    /// tracking, derived from `(source, deposit_nonce)`.
    pub fn id(&self) -> H256 {
        proposal_id(self.source, self.deposit_nonce)
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Proposal(src: {}, nonce: {}, resource: {})",
            self.source, self.deposit_nonce, self.resource_id,
        )
    }
}

/// Derives the relayer-side proposal identity from the transfer identity
/// `(source, deposit_nonce)`.
///
/// The pending-vote tracker derives the same identity from decoded peer
/// vote calldata, so both sides of the quorum estimate agree on the key.
pub fn proposal_id(source: DomainId, deposit_nonce: DepositNonce) -> H256 {
    let mut input = [0u8; 9];
    input[0] = source;
    input[1..].copy_from_slice(&deposit_nonce.to_be_bytes());
    H256(keccak256(&input))
}

/// The lifecycle state of a proposal as reported by the bridge contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    /// No vote has been cast yet.
    Inactive,
    /// Voting is in progress.
    Active,
    /// The vote threshold has been reached.
    Passed,
    /// The proposal has been executed on the destination chain.
    Executed,
    /// The proposal has been cancelled.
    Canceled,
}

/// A snapshot of a proposal's on-chain voting state.
///
/// The voter engine treats this as opaque and never caches it beyond a
/// single decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalStatus {
    /// The proposal lifecycle state.
    pub status: ProposalState,
    /// Bitmap of relayers that have voted yes.
    pub yes_votes: U256,
    /// The number of distinct yes votes cast so far.
    pub yes_votes_total: u8,
    /// The block the proposal was created at.
    pub proposed_block: U256,
}

impl ProposalStatus {
    /// A status snapshot for a proposal nobody has voted on yet.
    pub fn inactive() -> Self {
        Self {
            status: ProposalState::Inactive,
            yes_votes: U256::zero(),
            yes_votes_total: 0,
            proposed_block: U256::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(handler: u8, data: Vec<u8>) -> Proposal {
        Proposal {
            source: 1,
            deposit_nonce: 42,
            resource_id: ResourceId([7u8; 32]),
            data,
            handler_address: Address::repeat_byte(handler),
            bridge_address: Address::repeat_byte(0xBB),
        }
    }

    #[test]
    fn data_hash_is_keyed_by_handler_and_data() {
        let a = proposal(0x01, vec![1, 2, 3]);
        let same = proposal(0x01, vec![1, 2, 3]);
        let other_handler = proposal(0x02, vec![1, 2, 3]);
        let other_data = proposal(0x01, vec![9, 9, 9]);
        assert_eq!(a.data_hash(), same.data_hash());
        assert_ne!(a.data_hash(), other_handler.data_hash());
        assert_ne!(a.data_hash(), other_data.data_hash());
    }

    #[test]
    fn id_is_keyed_by_source_and_nonce() {
        let a = proposal(0x01, vec![]);
        assert_eq!(a.id(), proposal_id(1, 42));
        assert_ne!(a.id(), proposal_id(2, 42));
        assert_ne!(a.id(), proposal_id(1, 43));
    }
}
