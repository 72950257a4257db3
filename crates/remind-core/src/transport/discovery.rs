//! TV endpoint discovery strategies.
//!
//! Each strategy yields candidate base URLs (`http://host:port`). The HTTP
//! transport decides reachability by probing `GET /status` on them.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::http::probe_status;
use super::TransportError;
use crate::config::{TvDiscoveryMode, TvSettings};

/// mDNS service type the TV receiver advertises
pub const TV_SERVICE_TYPE: &str = "_remind-tv._tcp.local.";

const PROBE_HOSTS: RangeInclusive<u8> = 2..=254;

/// Strategy for locating TV receivers
#[async_trait]
pub trait TvDiscovery: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidate base URLs; an empty list means no TV is known
    async fn discover(&self) -> Result<Vec<String>, TransportError>;

    /// Whether every URL from [`Self::discover`] has just answered `GET /status`.
    fn confirms_reachability(&self) -> bool {
        false
    }
}

/// A single configured address
pub struct StaticDiscovery {
    base_url: String,
}

impl StaticDiscovery {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TvDiscovery for StaticDiscovery {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn discover(&self) -> Result<Vec<String>, TransportError> {
        Ok(vec![self.base_url.clone()])
    }
}

/// Browse the local network for advertised receivers
pub struct MdnsDiscovery {
    daemon: ServiceDaemon,
    window: Duration,
}

impl MdnsDiscovery {
    pub fn new(window: Duration) -> Result<Self, TransportError> {
        let daemon = ServiceDaemon::new().map_err(discovery_error)?;
        Ok(Self { daemon, window })
    }
}

#[async_trait]
impl TvDiscovery for MdnsDiscovery {
    fn name(&self) -> &'static str {
        "mdns"
    }

    async fn discover(&self) -> Result<Vec<String>, TransportError> {
        let browser = self
            .daemon
            .browse(TV_SERVICE_TYPE)
            .map_err(discovery_error)?;
        let deadline = tokio::time::Instant::now() + self.window;
        let mut endpoints = Vec::new();

        while let Ok(event) = tokio::time::timeout_at(deadline, browser.recv_async()).await {
            match event {
                Ok(ServiceEvent::ServiceResolved(info)) => {
                    for address in info.get_addresses() {
                        let socket = SocketAddr::new(IpAddr::from(*address), info.get_port());
                        let url = format!("http://{socket}");
                        if !endpoints.contains(&url) {
                            tracing::debug!(service = %info.get_fullname(), %url, "Resolved TV receiver");
                            endpoints.push(url);
                        }
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "mDNS browse channel closed");
                    break;
                }
            }
        }

        if let Err(error) = self.daemon.stop_browse(TV_SERVICE_TYPE) {
            tracing::debug!(%error, "Failed to stop mDNS browse");
        }
        Ok(endpoints)
    }
}

/// Registers the TV receiver on mDNS until dropped
pub struct MdnsAdvertiser {
    daemon: ServiceDaemon,
    fullname: String,
}

impl MdnsAdvertiser {
    pub fn register(instance: &str, ip: IpAddr, port: u16) -> Result<Self, TransportError> {
        let daemon = ServiceDaemon::new().map_err(discovery_error)?;
        let properties = HashMap::from([("status_path".to_string(), "/status".to_string())]);
        let info = ServiceInfo::new(
            TV_SERVICE_TYPE,
            instance,
            &format!("{instance}.local."),
            ip.to_string(),
            port,
            Some(properties),
        )
        .map_err(discovery_error)?;
        let fullname = info.get_fullname().to_string();

        daemon.register(info).map_err(discovery_error)?;
        tracing::info!(service = %fullname, %ip, port, "Advertising TV receiver over mDNS");
        Ok(Self { daemon, fullname })
    }
}

impl Drop for MdnsAdvertiser {
    fn drop(&mut self) {
        if let Err(error) = self.daemon.unregister(&self.fullname) {
            tracing::debug!(%error, "Failed to unregister mDNS service");
        }
        if let Err(error) = self.daemon.shutdown() {
            tracing::debug!(%error, "Failed to stop mDNS daemon");
        }
    }
}

/// Bounded concurrent `GET /status` sweep over /24 prefixes.
///
/// A sweep result, empty or not, is reused until `cache_ttl` runs out. After
/// that the previous hits are re-checked first, and the full sweep only runs
/// when none of them answer.
pub struct ProbeDiscovery {
    client: reqwest::Client,
    prefixes: Vec<[u8; 3]>,
    hosts: RangeInclusive<u8>,
    port: u16,
    concurrency: usize,
    cache_ttl: Duration,
    last_scan: Mutex<Option<ProbeScan>>,
}

struct ProbeScan {
    at: Instant,
    found: Vec<String>,
}

impl ProbeDiscovery {
    pub fn new(client: reqwest::Client, prefixes: Vec<[u8; 3]>, port: u16, concurrency: usize) -> Self {
        Self {
            client,
            prefixes,
            hosts: PROBE_HOSTS,
            port,
            concurrency: concurrency.max(1),
            cache_ttl: Duration::ZERO,
            last_scan: Mutex::new(None),
        }
    }

    /// Restrict the host octets probed in each prefix.
    #[must_use]
    pub const fn with_hosts(mut self, hosts: RangeInclusive<u8>) -> Self {
        self.hosts = hosts;
        self
    }

    #[must_use]
    pub const fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    fn candidates(&self) -> Vec<String> {
        self.prefixes
            .iter()
            .flat_map(|[a, b, c]| {
                self.hosts.clone().map(move |host| {
                    let ip = Ipv4Addr::new(*a, *b, *c, host);
                    format!("http://{}", SocketAddr::from((ip, self.port)))
                })
            })
            .collect()
    }

    async fn sweep(&self, candidates: Vec<String>) -> Vec<String> {
        let mut found: Vec<String> = stream::iter(candidates)
            .map(|url| async move { probe_status(&self.client, &url).await.then_some(url) })
            .buffer_unordered(self.concurrency)
            .filter_map(|hit| async move { hit })
            .collect()
            .await;
        found.sort();
        found
    }
}

#[async_trait]
impl TvDiscovery for ProbeDiscovery {
    fn name(&self) -> &'static str {
        "probe"
    }

    async fn discover(&self) -> Result<Vec<String>, TransportError> {
        // held across the sweep so concurrent callers share one result
        let mut last_scan = self.last_scan.lock().await;
        if let Some(scan) = last_scan.as_ref() {
            if scan.at.elapsed() < self.cache_ttl {
                return Ok(scan.found.clone());
            }
        }

        let previous = last_scan.take().map(|scan| scan.found).unwrap_or_default();
        let mut found = self.sweep(previous).await;
        if found.is_empty() {
            let candidates = self.candidates();
            tracing::debug!(candidates = candidates.len(), "Probing subnets for TV receivers");
            found = self.sweep(candidates).await;
            tracing::info!(found = found.len(), "TV probe finished");
        }

        *last_scan = Some(ProbeScan {
            at: Instant::now(),
            found: found.clone(),
        });
        Ok(found)
    }

    fn confirms_reachability(&self) -> bool {
        true
    }
}

/// Build the discovery strategy selected in `settings`; `None` disables TV fan-out.
pub fn discovery_from_settings(
    settings: &TvSettings,
    client: &reqwest::Client,
) -> Result<Option<Arc<dyn TvDiscovery>>, TransportError> {
    let discovery: Arc<dyn TvDiscovery> = match settings.discovery {
        TvDiscoveryMode::Disabled => return Ok(None),
        TvDiscoveryMode::Static => {
            let base_url = settings.static_base_url().ok_or_else(|| {
                TransportError::Discovery("no static TV address configured".to_string())
            })?;
            Arc::new(StaticDiscovery::new(base_url))
        }
        TvDiscoveryMode::Mdns => Arc::new(MdnsDiscovery::new(settings.mdns_browse_window())?),
        TvDiscoveryMode::Probe => Arc::new(
            ProbeDiscovery::new(
                client.clone(),
                settings.parsed_probe_prefixes(),
                settings.port,
                settings.probe_concurrency,
            )
            .with_cache_ttl(settings.probe_cache_ttl()),
        ),
    };
    Ok(Some(discovery))
}

fn discovery_error(error: mdns_sd::Error) -> TransportError {
    TransportError::Discovery(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread")]
    async fn static_discovery_returns_trimmed_address() {
        let discovery = StaticDiscovery::new("http://10.0.0.7:8080/");
        assert_eq!(
            discovery.discover().await.unwrap(),
            vec!["http://10.0.0.7:8080".to_string()]
        );
    }

    #[test]
    fn settings_select_strategy() {
        let client = reqwest::Client::new();
        let mut settings = TvSettings::default();
        assert!(discovery_from_settings(&settings, &client).unwrap().is_none());

        settings.discovery = TvDiscoveryMode::Probe;
        let discovery = discovery_from_settings(&settings, &client).unwrap().unwrap();
        assert_eq!(discovery.name(), "probe");

        settings.discovery = TvDiscoveryMode::Static;
        assert!(matches!(
            discovery_from_settings(&settings, &client),
            Err(TransportError::Discovery(_))
        ));
        settings.address = Some("10.1.1.9".to_string());
        let discovery = discovery_from_settings(&settings, &client).unwrap().unwrap();
        assert_eq!(discovery.name(), "static");
    }

    #[test]
    fn probe_candidates_cover_every_prefix() {
        let discovery = ProbeDiscovery::new(
            reqwest::Client::new(),
            vec![[192, 168, 1], [10, 0, 0]],
            8080,
            8,
        );
        let candidates = discovery.candidates();

        assert_eq!(candidates.len(), 2 * 253);
        assert_eq!(candidates[0], "http://192.168.1.2:8080");
        assert_eq!(candidates[candidates.len() - 1], "http://10.0.0.254:8080");
    }

    async fn spawn_status_server() -> (u16, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = axum::Router::new().route(
            "/status",
            axum::routing::get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (port, hits)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_finds_loopback_receiver_and_reuses_it() {
        let (port, hits) = spawn_status_server().await;
        let discovery = ProbeDiscovery::new(reqwest::Client::new(), vec![[127, 0, 0]], port, 4)
            .with_hosts(1..=1)
            .with_cache_ttl(Duration::from_secs(60));

        let expected = vec![format!("http://127.0.0.1:{port}")];
        assert_eq!(discovery.discover().await.unwrap(), expected);
        assert_eq!(discovery.discover().await.unwrap(), expected);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(discovery.confirms_reachability());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn probe_rechecks_previous_hit_once_cache_expires() {
        let (port, hits) = spawn_status_server().await;
        let discovery = ProbeDiscovery::new(reqwest::Client::new(), vec![[127, 0, 0]], port, 4)
            .with_hosts(1..=1);

        let expected = vec![format!("http://127.0.0.1:{port}")];
        assert_eq!(discovery.discover().await.unwrap(), expected);
        assert_eq!(discovery.discover().await.unwrap(), expected);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_sweep_is_cached_too() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let discovery = ProbeDiscovery::new(reqwest::Client::new(), vec![[127, 0, 0]], port, 4)
            .with_hosts(1..=1)
            .with_cache_ttl(Duration::from_secs(60));

        assert!(discovery.discover().await.unwrap().is_empty());
        let scanned_at = discovery.last_scan.lock().await.as_ref().unwrap().at;
        assert!(discovery.discover().await.unwrap().is_empty());
        assert_eq!(
            discovery.last_scan.lock().await.as_ref().unwrap().at,
            scanned_at
        );
    }
}
