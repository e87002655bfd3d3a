//! Node connection settings loaded from environment variables.
//!
//! Defaults match a stock lnd install, so a local node needs no
//! configuration at all.

use std::path::PathBuf;

use directories::BaseDirs;

/// How to reach the node's REST gateway.
#[derive(Debug, Clone)]
pub struct LndConfig {
    /// Base URL of the REST gateway.
    /// Env: `LND_REST_URL`
    /// Default: `https://localhost:8080`
    pub rest_url: String,

    /// lnd data directory.
    /// Env: `LND_DIR`
    /// Default: `~/.lnd`
    pub lnd_dir: PathBuf,

    /// Bitcoin network, used to locate the macaroon.
    /// Env: `LND_NETWORK`
    /// Default: `mainnet`
    pub network: String,

    /// TLS certificate of the node (PEM).
    /// Env: `LND_TLS_CERT`
    /// Default: `<lnd_dir>/tls.cert`
    pub tls_cert_path: Option<PathBuf>,

    /// Macaroon granting access to the router, signer and invoice services.
    /// Env: `LND_MACAROON`
    /// Default: `<lnd_dir>/data/chain/bitcoin/<network>/admin.macaroon`
    pub macaroon_path: Option<PathBuf>,
}

impl Default for LndConfig {
    fn default() -> Self {
        let lnd_dir = BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".lnd"))
            .unwrap_or_else(|| PathBuf::from(".lnd"));

        Self {
            rest_url: "https://localhost:8080".to_string(),
            lnd_dir,
            network: "mainnet".to_string(),
            tls_cert_path: None,
            macaroon_path: None,
        }
    }
}

impl LndConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("LND_REST_URL") {
            config.rest_url = url;
        }

        if let Ok(dir) = std::env::var("LND_DIR") {
            config.lnd_dir = PathBuf::from(dir);
        }

        if let Ok(network) = std::env::var("LND_NETWORK") {
            if !network.is_empty() {
                config.network = network.to_lowercase();
            }
        }

        if let Ok(path) = std::env::var("LND_TLS_CERT") {
            config.tls_cert_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("LND_MACAROON") {
            config.macaroon_path = Some(PathBuf::from(path));
        }

        config
    }

    pub fn tls_cert_path(&self) -> PathBuf {
        self.tls_cert_path
            .clone()
            .unwrap_or_else(|| self.lnd_dir.join("tls.cert"))
    }

    pub fn macaroon_path(&self) -> PathBuf {
        self.macaroon_path.clone().unwrap_or_else(|| {
            self.lnd_dir
                .join("data")
                .join("chain")
                .join("bitcoin")
                .join(&self.network)
                .join("admin.macaroon")
        })
    }

    /// Join an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.rest_url.trim_end_matches('/'), path)
    }
}
