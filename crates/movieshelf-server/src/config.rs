use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MONGO_DB: &str = "jdmovies";
pub const DEFAULT_MONGO_COLLECTION: &str = "movies";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub http_addr: SocketAddr,
    /// Allowed CORS origin; any origin when unset.
    pub site_url: Option<String>,
    pub mongo_uri: Option<String>,
    pub mongo_db: String,
    pub mongo_collection: String,
    /// Snapshot served from memory when no Mongo URI is configured.
    pub data_file: Option<PathBuf>,
    pub request_timeout: Duration,
    pub tls: Option<TlsPaths>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // blank values count as unset
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let http_addr = get("HTTP_ADDR")
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string())
            .parse()
            .context("HTTP_ADDR must be host:port")?;
        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        let tls = match (get("TLS_CERT_PATH"), get("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
        };

        Ok(Self {
            http_addr,
            site_url: get("SITEURL"),
            mongo_uri: get("MONGOURI"),
            mongo_db: get("MONGO_DB").unwrap_or_else(|| DEFAULT_MONGO_DB.to_string()),
            mongo_collection: get("MONGO_COLLECTION")
                .unwrap_or_else(|| DEFAULT_MONGO_COLLECTION.to_string()),
            data_file: get("DATA_FILE").map(PathBuf::from),
            request_timeout: Duration::from_secs(request_timeout),
            tls,
        })
    }
}
