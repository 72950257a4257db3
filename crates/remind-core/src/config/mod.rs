//! Sync configuration shared by the phone CLI and secondary device builds.
//!
//! `SyncSettings` is read from an optional JSON file; a few values can be
//! overridden from the environment through [`SyncSettings::with_overrides`],
//! which takes a lookup function so tests never touch the process env.

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::WireVersion;
use crate::util::normalize_text_option;
use crate::{Error, Result};

pub const ENV_TV_ADDR: &str = "REMIND_TV_ADDR";

const DEFAULT_TV_PORT: u16 = 8080;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
const DEFAULT_PROBE_CONCURRENCY: usize = 32;
const DEFAULT_PROBE_CACHE_SECS: u64 = 120;
const DEFAULT_MDNS_BROWSE_MS: u64 = 1_500;

/// Which device this process runs as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    /// Primary device: owns the pending log and relays to the TV
    #[default]
    Phone,
    Watch,
    Tv,
}

impl DeviceRole {
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Phone)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Watch => "watch",
            Self::Tv => "tv",
        }
    }
}

/// How the TV endpoint is located
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TvDiscoveryMode {
    /// No TV fan-out
    #[default]
    Disabled,
    /// Fixed `address`
    Static,
    /// Browse for the advertised `_remind-tv._tcp` service
    Mdns,
    /// Probe every host of the configured /24 prefixes
    Probe,
}

impl TvDiscoveryMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Static => "static",
            Self::Mdns => "mdns",
            Self::Probe => "probe",
        }
    }
}

/// TV endpoint discovery and HTTP timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TvSettings {
    #[serde(default)]
    pub discovery: TvDiscoveryMode,
    /// `host:port` or a full base URL
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_tv_port")]
    pub port: u16,
    /// First three octets of each subnet to probe, e.g. `192.168.1`
    #[serde(default = "default_probe_prefixes")]
    pub probe_prefixes: Vec<String>,
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
    /// How long a subnet sweep result, including "no TV", is reused
    #[serde(default = "default_probe_cache_secs")]
    pub probe_cache_secs: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_mdns_browse_ms")]
    pub mdns_browse_ms: u64,
}

impl Default for TvSettings {
    fn default() -> Self {
        Self {
            discovery: TvDiscoveryMode::default(),
            address: None,
            port: DEFAULT_TV_PORT,
            probe_prefixes: default_probe_prefixes(),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_cache_secs: DEFAULT_PROBE_CACHE_SECS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            mdns_browse_ms: DEFAULT_MDNS_BROWSE_MS,
        }
    }
}

impl TvSettings {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub const fn probe_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.probe_cache_secs)
    }

    pub const fn mdns_browse_window(&self) -> Duration {
        Duration::from_millis(self.mdns_browse_ms)
    }

    /// Base URL for the configured static address.
    pub fn static_base_url(&self) -> Option<String> {
        let address = normalize_text_option(self.address.clone())?;
        Some(base_url_for(&address, self.port))
    }

    /// Parsed probe prefixes; invalid entries are reported by [`SyncSettings::validate`].
    pub fn parsed_probe_prefixes(&self) -> Vec<[u8; 3]> {
        self.probe_prefixes
            .iter()
            .filter_map(|prefix| parse_prefix(prefix))
            .collect()
    }
}

/// Sync subsystem settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    #[serde(default)]
    pub role: DeviceRole,
    #[serde(default)]
    pub wire_version: WireVersion,
    /// Wait after a foreground event before pushing a snapshot
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Periodic reconcile interval; `0` disables it
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    #[serde(default)]
    pub tv: TvSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            role: DeviceRole::default(),
            wire_version: WireVersion::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            tv: TvSettings::default(),
        }
    }
}

impl SyncSettings {
    /// Parse settings from a JSON document.
    pub fn from_json(payload: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(payload)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(payload) => Self::from_json(&payload),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No sync settings file; using defaults");
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Apply environment overrides; `REMIND_TV_ADDR` forces static discovery.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(address) = normalize_text_option(lookup(ENV_TV_ADDR)) {
            self.tv.discovery = TvDiscoveryMode::Static;
            self.tv.address = Some(address);
        }
        self
    }

    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// `None` when periodic reconciliation is disabled.
    pub const fn reconcile_interval(&self) -> Option<Duration> {
        if self.reconcile_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.reconcile_interval_secs))
        }
    }

    /// Reject combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.tv.discovery == TvDiscoveryMode::Static && self.tv.static_base_url().is_none() {
            return Err(Error::InvalidInput(
                "tv.address is required for static TV discovery".to_string(),
            ));
        }
        if let Some(bad) = self
            .tv
            .probe_prefixes
            .iter()
            .find(|prefix| parse_prefix(prefix).is_none())
        {
            return Err(Error::InvalidInput(format!(
                "tv.probe_prefixes entry '{bad}' is not three IPv4 octets"
            )));
        }
        if self.tv.probe_concurrency == 0 {
            return Err(Error::InvalidInput(
                "tv.probe_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build an HTTP base URL from `host`, `host:port` or a full URL.
pub fn base_url_for(address: &str, default_port: u16) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.contains("://") {
        address.to_string()
    } else if address.contains(':') {
        format!("http://{address}")
    } else {
        format!("http://{address}:{default_port}")
    }
}

fn parse_prefix(prefix: &str) -> Option<[u8; 3]> {
    let ip: Ipv4Addr = format!("{}.0", prefix.trim().trim_end_matches('.'))
        .parse()
        .ok()?;
    let [a, b, c, _] = ip.octets();
    Some([a, b, c])
}

const fn default_tv_port() -> u16 {
    DEFAULT_TV_PORT
}

fn default_probe_prefixes() -> Vec<String> {
    ["192.168.1", "192.168.0", "10.0.0", "172.16.0"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

const fn default_probe_concurrency() -> usize {
    DEFAULT_PROBE_CONCURRENCY
}

const fn default_probe_cache_secs() -> u64 {
    DEFAULT_PROBE_CACHE_SECS
}

const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

const fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

const fn default_mdns_browse_ms() -> u64 {
    DEFAULT_MDNS_BROWSE_MS
}

const fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

const fn default_reconcile_interval_secs() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_SECS
}
