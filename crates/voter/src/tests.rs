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

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ethereum_types::{Address, H256, U256};
use spanbridge_bridge_clients::mock::{
    encode_vote_call, MockBridgeContract, MockChainClient,
};
use spanbridge_bridge_clients::VoteCall;
use spanbridge_message_handlers::{HandlerKind, HandlerRegistry};
use spanbridge_relayer_types::{
    proposal_id, Message, Metadata, PayloadField, ProposalState,
    ProposalStatus, ResourceId, TransferType,
};
use spanbridge_relayer_utils::shutdown::ShutdownNotifier;
use spanbridge_relayer_utils::Error;

use crate::{PendingVoteTracker, PendingVotes, SleepFn, Voter};

const RESOURCE: ResourceId = ResourceId([7u8; 32]);
const HANDLER: Address = Address::repeat_byte(0x11);
const BRIDGE: Address = Address::repeat_byte(0xBB);
const RELAYER: Address = Address::repeat_byte(0x99);

fn instant_sleep() -> SleepFn {
    Arc::new(|_| Box::pin(futures::future::ready(())))
}

fn message() -> Message {
    Message {
        source: 1,
        destination: 2,
        deposit_nonce: 7,
        resource_id: RESOURCE,
        transfer_type: TransferType::FungibleTransfer,
        payload: vec![
            PayloadField::Bytes(vec![42]),
            PayloadField::Bytes(vec![0xAA; 20]),
        ],
        metadata: Metadata { priority: 1 },
    }
}

fn bridge() -> Arc<MockBridgeContract> {
    let bridge = Arc::new(MockBridgeContract::new(BRIDGE));
    bridge.register_resource(RESOURCE, HANDLER);
    bridge
}

fn voter(
    bridge: Arc<MockBridgeContract>,
    pending_votes: Arc<PendingVotes>,
) -> Voter<MockBridgeContract> {
    let mut registry = HandlerRegistry::new();
    registry.register(HANDLER, HandlerKind::Fungible);
    Voter::builder()
        .bridge(bridge)
        .registry(Arc::new(registry))
        .pending_votes(pending_votes)
        .relayer_address(RELAYER)
        .sleep(instant_sleep())
        .build()
}

fn active_status(yes_votes_total: u8) -> ProposalStatus {
    ProposalStatus {
        status: ProposalState::Active,
        yes_votes: U256::zero(),
        yes_votes_total,
        proposed_block: U256::from(100),
    }
}

#[tokio::test]
async fn votes_on_a_fresh_proposal() {
    let bridge = bridge();
    let voter = voter(bridge.clone(), Arc::new(PendingVotes::new()));

    voter.execute(&message()).await.unwrap();
    assert_eq!(bridge.simulate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.vote_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_messages_are_idempotent() {
    let bridge = bridge();
    bridge.set_voted(true);
    let voter = voter(bridge.clone(), Arc::new(PendingVotes::new()));

    voter.execute(&message()).await.unwrap();
    voter.execute(&message()).await.unwrap();
    assert_eq!(bridge.simulate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(bridge.vote_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn simulation_failure_exhausts_exactly_six_attempts() {
    let bridge = bridge();
    bridge.fail_simulation();
    let voter = voter(bridge.clone(), Arc::new(PendingVotes::new()));

    let err = voter.execute(&message()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::SimulationFailed {
            source_domain: 1,
            deposit_nonce: 7,
            attempts: 6,
        }
    ));
    assert_eq!(bridge.simulate_calls.load(Ordering::SeqCst), 6);
    assert_eq!(bridge.vote_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn in_flight_peer_vote_completes_quorum_without_us() {
    let bridge = bridge();
    bridge.set_threshold(2);
    // one vote on-chain, one in flight; the in-flight vote then lands
    // and executes the proposal
    bridge.push_status(active_status(1));
    bridge.push_status(ProposalStatus {
        status: ProposalState::Executed,
        ..active_status(2)
    });
    let pending_votes = Arc::new(PendingVotes::new());
    let id = proposal_id(1, 7);
    pending_votes.increment(id);
    let voter = voter(bridge.clone(), pending_votes.clone());

    voter.execute(&message()).await.unwrap();
    assert_eq!(bridge.vote_calls.load(Ordering::SeqCst), 0);
    assert_eq!(bridge.simulate_calls.load(Ordering::SeqCst), 0);
    // the estimate is dropped once the decision is made
    assert_eq!(pending_votes.get(id), 0);
}

#[tokio::test]
async fn missing_quorum_still_votes() {
    let bridge = bridge();
    bridge.set_threshold(3);
    bridge.push_status(active_status(1));

    let voter = voter(bridge.clone(), Arc::new(PendingVotes::new()));
    voter.execute(&message()).await.unwrap();
    assert_eq!(bridge.vote_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tracker_counts_votes_until_they_are_mined() {
    let client = Arc::new(MockChainClient::new(100));
    let bridge = bridge();
    let pending_votes = Arc::new(PendingVotes::new());
    let tx_hash = H256::repeat_byte(0x42);
    let vote = VoteCall {
        source: 1,
        deposit_nonce: 7,
        resource_id: RESOURCE,
    };
    client.insert_transaction(tx_hash, encode_vote_call(&vote));
    client.queue_pending_transaction(tx_hash);

    let tracker = PendingVoteTracker::new(
        client.clone(),
        bridge,
        pending_votes.clone(),
        Duration::from_millis(10),
    );
    let notifier = ShutdownNotifier::new();
    let shutdown = notifier.subscribe();
    let handle = tokio::spawn(async move { tracker.run(shutdown).await });

    let id = proposal_id(1, 7);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pending_votes.get(id), 1);

    client.set_transaction_mined(tx_hash);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pending_votes.get(id), 0);

    notifier.notify();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn tracker_ignores_unrelated_transactions() {
    let client = Arc::new(MockChainClient::new(100));
    let bridge = bridge();
    let pending_votes = Arc::new(PendingVotes::new());
    let tx_hash = H256::repeat_byte(0x43);
    client.insert_transaction(tx_hash, vec![0xde, 0xad, 0xbe, 0xef]);
    client.queue_pending_transaction(tx_hash);

    let tracker = PendingVoteTracker::new(
        client,
        bridge,
        pending_votes.clone(),
        Duration::from_millis(10),
    );
    let notifier = ShutdownNotifier::new();
    let shutdown = notifier.subscribe();
    let handle = tokio::spawn(async move { tracker.run(shutdown).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pending_votes.get(proposal_id(1, 7)), 0);

    notifier.notify();
    assert!(handle.await.unwrap().is_ok());
}
