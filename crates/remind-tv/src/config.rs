use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

pub const ENV_BIND_ADDR: &str = "REMIND_TV_BIND_ADDR";
pub const ENV_DB_PATH: &str = "REMIND_TV_DB_PATH";
pub const ENV_MDNS: &str = "REMIND_TV_MDNS";
pub const ENV_ADVERTISE_IP: &str = "REMIND_TV_ADVERTISE_IP";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where to advertise the receiver over mDNS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnsConfig {
    pub instance_name: String,
    pub ip: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub mdns: Option<MdnsConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, ENV_BIND_ADDR, DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|_| {
            ConfigError::Invalid(format!("{ENV_BIND_ADDR} '{bind_addr}' is not host:port"))
        })?;

        let db_path = match optional_trimmed(&lookup, ENV_DB_PATH) {
            Some(path) => PathBuf::from(path),
            None => dirs::data_dir()
                .map(|dir| dir.join("remind").join("remind-tv.db"))
                .ok_or(ConfigError::Missing(ENV_DB_PATH))?,
        };

        let mdns = if parse_flag(&lookup, ENV_MDNS)? {
            Some(mdns_config(&lookup, bind_addr)?)
        } else {
            None
        };

        Ok(Self {
            bind_addr,
            db_path,
            mdns,
        })
    }
}

fn mdns_config(
    lookup: impl Fn(&str) -> Option<String>,
    bind_addr: SocketAddr,
) -> Result<MdnsConfig, ConfigError> {
    let ip = match optional_trimmed(&lookup, ENV_ADVERTISE_IP) {
        Some(raw) => raw.parse::<IpAddr>().map_err(|_| {
            ConfigError::Invalid(format!("{ENV_ADVERTISE_IP} '{raw}' is not an IP address"))
        })?,
        None if !bind_addr.ip().is_unspecified() => bind_addr.ip(),
        None => return Err(ConfigError::Missing(ENV_ADVERTISE_IP)),
    };

    let suffix = Uuid::now_v7().simple().to_string();
    Ok(MdnsConfig {
        instance_name: format!("remind-tv-{}", &suffix[suffix.len() - 8..]),
        ip,
        port: bind_addr.port(),
    })
}

fn parse_flag(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<bool, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{name} must be true or false, got '{raw}'"
        ))),
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
