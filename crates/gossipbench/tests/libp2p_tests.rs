mod common;

use std::time::Duration;

use gossipbench::{
    derive_keypair, fingerprint, publish::random_payload, GossipParams, Host, Libp2pNode, PeerEndpoint,
    Subscription, Topic, TOPIC_NAME,
};
use libp2p::{multiaddr::Protocol, Multiaddr};
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(20);

fn loopback() -> Multiaddr {
    "/ip4/127.0.0.1/tcp/0".parse().unwrap()
}

fn params() -> GossipParams {
    GossipParams::with_degree(4, Duration::from_millis(100))
}

async fn spawn(ordinal: u64) -> Libp2pNode {
    Libp2pNode::spawn(derive_keypair(ordinal).unwrap(), loopback(), &params()).unwrap()
}

/// Dialable endpoint of a node listening on loopback
async fn endpoint_of(ordinal: u64, node: &Libp2pNode) -> PeerEndpoint {
    let address = tokio::time::timeout(TIMEOUT, async {
        loop {
            if let Some(address) = node.listen_addresses().await.unwrap().into_iter().next() {
                return address;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    let peer_id = node.local_peer_id();
    PeerEndpoint { ordinal, address: address.with(Protocol::P2p(peer_id)), peer_id }
}

async fn wait_for_peers(node: &Libp2pNode, expected: usize) {
    tokio::time::timeout(TIMEOUT, async {
        while node.connected_peer_count().await.unwrap() != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_nodes_connect_over_loopback() {
    common::init_tracing();
    let node0 = spawn(0).await;
    let node1 = spawn(1).await;
    assert_eq!(node0.local_peer_id(), derive_keypair(0).unwrap().public().to_peer_id());

    let endpoint = endpoint_of(1, &node1).await;
    node0.connect(&endpoint, TIMEOUT).await.unwrap();

    assert_eq!(node0.connected_peer_count().await.unwrap(), 1);
    wait_for_peers(&node1, 1).await;

    // Dialing a connected peer is a no-op
    node0.connect(&endpoint, TIMEOUT).await.unwrap();
    assert_eq!(node0.connected_peer_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dial_to_closed_port_fails() {
    let node0 = spawn(0).await;
    let node1 = spawn(1).await;
    let mut endpoint = endpoint_of(1, &node1).await;
    drop(node1);

    // Nothing listens on port 1 of loopback
    endpoint.address = format!("/ip4/127.0.0.1/tcp/1/p2p/{}", endpoint.peer_id).parse().unwrap();

    assert!(node0.connect(&endpoint, TIMEOUT).await.is_err());
    assert_eq!(node0.connected_peer_count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_published_message_reaches_peer() {
    common::init_tracing();
    let node0 = spawn(0).await;
    let node1 = spawn(1).await;

    let topic0 = node0.join(TOPIC_NAME).unwrap();
    let _subscription0 = topic0.subscribe().await.unwrap();
    let topic1 = node1.join(TOPIC_NAME).unwrap();
    let mut subscription1 = topic1.subscribe().await.unwrap();

    node0.connect(&endpoint_of(1, &node1).await, TIMEOUT).await.unwrap();

    // Publishing fails until the subscription of node 1 has propagated
    let payload = tokio::time::timeout(TIMEOUT, async {
        loop {
            let payload = random_payload(16).unwrap();
            if topic0.publish(payload.clone()).await.is_ok() {
                return payload;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .unwrap();

    let cancel = CancellationToken::new();
    let delivery = tokio::time::timeout(TIMEOUT, subscription1.next(&cancel)).await.unwrap().unwrap().unwrap();

    assert_eq!(delivery.topic, TOPIC_NAME);
    assert_eq!(fingerprint(&delivery.payload), fingerprint(&payload));
    assert_eq!(delivery.payload, payload);
    assert_eq!(delivery.source, None);
    assert_eq!(delivery.propagation_source, node0.local_peer_id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_rejects_empty_topic() {
    let node = spawn(0).await;
    assert!(node.join("").is_err());
}
