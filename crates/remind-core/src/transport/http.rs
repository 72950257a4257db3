//! Best-effort HTTP push to TV receivers.
//!
//! The TV only understands full snapshots (`POST /sync`) and deletes
//! (`POST /delete_recordatorio`). Single upserts and control messages are not
//! carried; the snapshot that follows every flush covers them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use super::{PeerDelivery, Transport, TransportError, TvDiscovery};
use crate::codec::{MessageCodec, SyncMessage};
use crate::config::TvSettings;
use crate::util::unix_millis_now;

pub const STATUS_PATH: &str = "/status";
pub const SYNC_PATH: &str = "/sync";
pub const DELETE_PATH: &str = "/delete_recordatorio";

/// `true` only when `GET {base_url}/status` answers 200.
pub async fn probe_status(client: &reqwest::Client, base_url: &str) -> bool {
    match client.get(format!("{base_url}{STATUS_PATH}")).send().await {
        Ok(response) => response.status() == StatusCode::OK,
        Err(error) => {
            tracing::trace!(%base_url, %error, "TV status probe failed");
            false
        }
    }
}

/// HTTP client with the probe/send timeouts from `settings`.
pub fn build_client(settings: &TvSettings) -> Result<reqwest::Client, TransportError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout())
        .timeout(settings.read_timeout())
        .build()?)
}

enum TvRequest {
    Snapshot(Vec<u8>),
    Delete(String),
}

/// Pushes snapshots and deletes to every discovered TV
pub struct HttpTvTransport {
    client: reqwest::Client,
    discovery: Arc<dyn TvDiscovery>,
    codec: MessageCodec,
}

impl HttpTvTransport {
    pub const fn new(
        client: reqwest::Client,
        discovery: Arc<dyn TvDiscovery>,
        codec: MessageCodec,
    ) -> Self {
        Self {
            client,
            discovery,
            codec,
        }
    }

    pub fn from_settings(
        settings: &TvSettings,
        discovery: Arc<dyn TvDiscovery>,
        codec: MessageCodec,
    ) -> Result<Self, TransportError> {
        Ok(Self::new(build_client(settings)?, discovery, codec))
    }

    async fn endpoints(&self) -> Vec<String> {
        match self.discovery.discover().await {
            Ok(endpoints) => endpoints,
            Err(error) => {
                tracing::warn!(discovery = self.discovery.name(), %error, "TV discovery failed");
                Vec::new()
            }
        }
    }

    async fn post(&self, base_url: &str, request: &TvRequest) -> Result<(), TransportError> {
        let builder = match request {
            TvRequest::Snapshot(body) => self
                .client
                .post(format!("{base_url}{SYNC_PATH}"))
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone()),
            TvRequest::Delete(id) => self
                .client
                .post(format!("{base_url}{DELETE_PATH}"))
                .header(CONTENT_TYPE, "text/plain")
                .body(id.clone()),
        };

        let response = builder.send().await?;
        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(TransportError::Status {
                peer: base_url.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl Transport for HttpTvTransport {
    fn name(&self) -> &str {
        "tv-http"
    }

    async fn send_to_all(&self, message: &SyncMessage) -> Vec<PeerDelivery> {
        let request = match message {
            SyncMessage::ReplaceAll(reminders) => {
                match self
                    .codec
                    .encode_snapshot_envelope(reminders, unix_millis_now())
                {
                    Ok(body) => TvRequest::Snapshot(body),
                    Err(error) => return vec![PeerDelivery::failed("tv", error.into())],
                }
            }
            SyncMessage::Delete(id) => TvRequest::Delete(id.to_string()),
            other => {
                tracing::debug!(path = other.message_type().path(), "TV does not take this message");
                return Vec::new();
            }
        };

        let endpoints = self.endpoints().await;
        let request = &request;
        join_all(endpoints.into_iter().map(|base_url| async move {
            let result = self.post(&base_url, request).await;
            PeerDelivery {
                peer: base_url,
                result,
            }
        }))
        .await
    }

    async fn is_any_peer_reachable(&self) -> bool {
        let endpoints = self.endpoints().await;
        if self.discovery.confirms_reachability() {
            return !endpoints.is_empty();
        }
        for base_url in endpoints {
            if probe_status(&self.client, &base_url).await {
                return true;
            }
        }
        false
    }
}
