//! In-process proximity bus.
//!
//! Models the phone/watch message client: nodes register under a name, can
//! be toggled connected or disconnected, and receive raw `(path, body)`
//! frames in their own inbox. Only connected nodes see each other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use super::{PeerDelivery, Transport, TransportError};
use crate::codec::{MessageCodec, SyncMessage};

/// Raw frame as received by a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// Receiving half of a node registration
pub type NodeInbox = mpsc::UnboundedReceiver<InboundMessage>;

struct Node {
    connected: bool,
    inbox: mpsc::UnboundedSender<InboundMessage>,
}

/// Shared hub every endpoint talks through
#[derive(Clone, Default)]
pub struct LocalMessageBus {
    nodes: Arc<RwLock<HashMap<String, Node>>>,
}

impl LocalMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node_id`, replacing any previous registration of that name.
    ///
    /// New nodes start connected.
    pub async fn register(
        &self,
        node_id: impl Into<String>,
        codec: MessageCodec,
    ) -> (BusEndpoint, NodeInbox) {
        let node_id = node_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.nodes.write().await.insert(
            node_id.clone(),
            Node {
                connected: true,
                inbox: sender,
            },
        );
        tracing::debug!(node = %node_id, "Registered bus node");

        let endpoint = BusEndpoint {
            node_id,
            bus: self.clone(),
            codec,
        };
        (endpoint, receiver)
    }

    /// Toggle whether `node_id` can send and receive.
    pub async fn set_connected(&self, node_id: &str, connected: bool) {
        if let Some(node) = self.nodes.write().await.get_mut(node_id) {
            node.connected = connected;
            tracing::debug!(node = %node_id, connected, "Bus node connectivity changed");
        }
    }

    pub async fn is_connected(&self, node_id: &str) -> bool {
        self.nodes
            .read()
            .await
            .get(node_id)
            .is_some_and(|node| node.connected)
    }

    /// Connected nodes other than `node_id`, sorted by name.
    pub async fn connected_peers(&self, node_id: &str) -> Vec<String> {
        let nodes = self.nodes.read().await;
        let mut peers: Vec<String> = nodes
            .iter()
            .filter(|(id, node)| id.as_str() != node_id && node.connected)
            .map(|(id, _)| id.clone())
            .collect();
        peers.sort();
        peers
    }
}

/// One node's sending half; implements [`Transport`]
#[derive(Clone)]
pub struct BusEndpoint {
    node_id: String,
    bus: LocalMessageBus,
    codec: MessageCodec,
}

impl BusEndpoint {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub const fn bus(&self) -> &LocalMessageBus {
        &self.bus
    }

    /// Send an already-encoded frame to every connected peer.
    ///
    /// A disconnected sender reaches nobody.
    pub async fn send_raw(&self, path: &str, body: &[u8]) -> Vec<PeerDelivery> {
        let nodes = self.bus.nodes.read().await;
        if !nodes.get(&self.node_id).is_some_and(|node| node.connected) {
            return Vec::new();
        }

        let mut deliveries: Vec<PeerDelivery> = nodes
            .iter()
            .filter(|(id, node)| id.as_str() != self.node_id && node.connected)
            .map(|(id, node)| {
                let message = InboundMessage {
                    from: self.node_id.clone(),
                    path: path.to_string(),
                    body: body.to_vec(),
                };
                match node.inbox.send(message) {
                    Ok(()) => PeerDelivery::ok(id.clone()),
                    Err(_) => PeerDelivery::failed(id.clone(), TransportError::BusClosed(id.clone())),
                }
            })
            .collect();
        deliveries.sort_by(|a, b| a.peer.cmp(&b.peer));
        deliveries
    }

    /// Send to one named peer.
    pub async fn send_to(&self, peer: &str, message: &SyncMessage) -> PeerDelivery {
        let frame = match self.codec.encode(message) {
            Ok(frame) => frame,
            Err(error) => return PeerDelivery::failed(peer, error.into()),
        };

        let nodes = self.bus.nodes.read().await;
        let sender_connected = nodes.get(&self.node_id).is_some_and(|node| node.connected);
        match nodes.get(peer) {
            Some(node) if sender_connected && node.connected => {
                let inbound = InboundMessage {
                    from: self.node_id.clone(),
                    path: frame.path().to_string(),
                    body: frame.body,
                };
                match node.inbox.send(inbound) {
                    Ok(()) => PeerDelivery::ok(peer),
                    Err(_) => PeerDelivery::failed(peer, TransportError::BusClosed(peer.to_string())),
                }
            }
            _ => PeerDelivery::failed(peer, TransportError::NotConnected(peer.to_string())),
        }
    }
}

#[async_trait]
impl Transport for BusEndpoint {
    fn name(&self) -> &str {
        "bus"
    }

    async fn send_to_all(&self, message: &SyncMessage) -> Vec<PeerDelivery> {
        match self.codec.encode(message) {
            Ok(frame) => self.send_raw(frame.path(), &frame.body).await,
            Err(error) => vec![PeerDelivery::failed(self.node_id.clone(), error.into())],
        }
    }

    async fn is_any_peer_reachable(&self) -> bool {
        self.bus.is_connected(&self.node_id).await
            && !self.bus.connected_peers(&self.node_id).await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReminderId;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn delivers_to_every_connected_peer() {
        let bus = LocalMessageBus::new();
        let (phone, _phone_inbox) = bus.register("phone", MessageCodec::default()).await;
        let (_watch, mut watch_inbox) = bus.register("watch", MessageCodec::default()).await;
        let (_tablet, mut tablet_inbox) = bus.register("tablet", MessageCodec::default()).await;

        let deliveries = phone
            .send_to_all(&SyncMessage::Delete(ReminderId::new(5)))
            .await;

        assert_eq!(deliveries.len(), 2);
        assert!(deliveries.iter().all(PeerDelivery::is_ok));
        for inbox in [&mut watch_inbox, &mut tablet_inbox] {
            let received = inbox.recv().await.unwrap();
            assert_eq!(received.from, "phone");
            assert_eq!(received.path, "delete_reminder");
            assert_eq!(received.body, b"5");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disconnected_nodes_are_unreachable() {
        let bus = LocalMessageBus::new();
        let (phone, _phone_inbox) = bus.register("phone", MessageCodec::default()).await;
        let (_watch, mut watch_inbox) = bus.register("watch", MessageCodec::default()).await;

        bus.set_connected("watch", false).await;
        assert!(!phone.is_any_peer_reachable().await);
        assert!(phone
            .send_to_all(&SyncMessage::PeerConnected)
            .await
            .is_empty());
        assert!(watch_inbox.try_recv().is_err());

        let direct = phone.send_to("watch", &SyncMessage::PeerConnected).await;
        assert!(matches!(direct.result, Err(TransportError::NotConnected(_))));

        bus.set_connected("watch", true).await;
        assert!(phone.is_any_peer_reachable().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_closed_inbox_does_not_stop_others() {
        let bus = LocalMessageBus::new();
        let (phone, _phone_inbox) = bus.register("phone", MessageCodec::default()).await;
        let (_gone, gone_inbox) = bus.register("a-gone", MessageCodec::default()).await;
        let (_watch, mut watch_inbox) = bus.register("watch", MessageCodec::default()).await;
        drop(gone_inbox);

        let deliveries = phone.send_to_all(&SyncMessage::RequestFullSync).await;

        assert_eq!(deliveries.len(), 2);
        assert!(matches!(
            deliveries[0].result,
            Err(TransportError::BusClosed(_))
        ));
        assert!(deliveries[1].is_ok());
        assert_eq!(watch_inbox.recv().await.unwrap().path, "request_full_sync");
    }
}
