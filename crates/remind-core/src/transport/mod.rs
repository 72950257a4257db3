//! Peer transports.
//!
//! A [`Transport`] delivers one [`SyncMessage`] to every peer it can reach
//! right now and reports the per-peer outcome. Delivery is best-effort:
//! failures are returned, never retried here.

mod bus;
mod discovery;
mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::codec::{CodecError, SyncMessage};

pub use bus::{BusEndpoint, InboundMessage, LocalMessageBus, NodeInbox};
pub use discovery::{
    discovery_from_settings, MdnsAdvertiser, MdnsDiscovery, ProbeDiscovery, StaticDiscovery, TvDiscovery,
    TV_SERVICE_TYPE,
};
pub use http::{build_client, probe_status, HttpTvTransport, DELETE_PATH, STATUS_PATH, SYNC_PATH};

/// Errors reported for a single peer delivery or discovery step
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("peer {peer} answered HTTP {status}")]
    Status { peer: String, status: u16 },

    #[error("peer {0} is not connected")]
    NotConnected(String),

    #[error("inbox of {0} is closed")]
    BusClosed(String),

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("could not encode message: {0}")]
    Codec(#[from] CodecError),
}

/// Outcome of sending one message to one peer
#[derive(Debug)]
pub struct PeerDelivery {
    pub peer: String,
    pub result: Result<(), TransportError>,
}

impl PeerDelivery {
    pub fn ok(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            result: Ok(()),
        }
    }

    pub fn failed(peer: impl Into<String>, error: TransportError) -> Self {
        Self {
            peer: peer.into(),
            result: Err(error),
        }
    }

    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A channel to a set of peers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Send `message` to every currently reachable peer.
    ///
    /// One peer failing never stops delivery to the others. An empty result
    /// means nothing was attempted (no peers, or a message this channel does
    /// not carry).
    async fn send_to_all(&self, message: &SyncMessage) -> Vec<PeerDelivery>;

    /// Whether at least one peer looks reachable right now
    async fn is_any_peer_reachable(&self) -> bool;
}
