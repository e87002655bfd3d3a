//! # lnchat
//!
//! Terminal chat over Lightning keysend payments, talking to a local lnd
//! node through its REST gateway.

mod output;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lnchat_client::{ChatConfig, ChatSession, DispatchSettings, ProtocolKind};
use lnchat_lnd::{LndConfig, LndRestClient, NodeServices};
use lnchat_shared::constants::DEFAULT_MESSAGE_AMOUNT_MSAT;

/// Chat with other Lightning nodes; every message is a keysend payment.
#[derive(Parser, Debug)]
#[command(name = "lnchat", version, about, long_about = None)]
struct Args {
    /// Peer to start talking to: hex node key or alias
    recipient: Option<String>,

    /// Minimum payment per message, in millisatoshi
    #[arg(
        long = "amt-msat",
        env = "LNCHAT_AMT_MSAT",
        default_value_t = DEFAULT_MESSAGE_AMOUNT_MSAT,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    amt_msat: i64,

    /// Append sent and received messages to this file
    #[arg(long, env = "LNCHAT_LOG")]
    log: Option<PathBuf>,

    /// Chat protocol: signed (default) or the legacy unsigned one
    #[arg(long, env = "LNCHAT_PROTOCOL", default_value = "signed")]
    protocol: ProtocolKind,

    /// lnd REST gateway URL
    #[arg(long = "rest-url", env = "LND_REST_URL")]
    rest_url: Option<String>,

    /// lnd data directory
    #[arg(long, env = "LND_DIR")]
    lnddir: Option<PathBuf>,

    /// Bitcoin network the node runs on
    #[arg(long, env = "LND_NETWORK")]
    network: Option<String>,

    /// Path to the node's TLS certificate
    #[arg(long = "tlscertpath", env = "LND_TLS_CERT")]
    tls_cert: Option<PathBuf>,

    /// Path to the macaroon
    #[arg(long = "macaroonpath", env = "LND_MACAROON")]
    macaroon: Option<PathBuf>,
}

impl Args {
    fn lnd_config(&self) -> LndConfig {
        let mut config = LndConfig::from_env();
        if let Some(url) = &self.rest_url {
            config.rest_url = url.clone();
        }
        if let Some(dir) = &self.lnddir {
            config.lnd_dir = dir.clone();
        }
        if let Some(network) = &self.network {
            config.network = network.to_lowercase();
        }
        if let Some(path) = &self.tls_cert {
            config.tls_cert_path = Some(path.clone());
        }
        if let Some(path) = &self.macaroon {
            config.macaroon_path = Some(path.clone());
        }
        config
    }

    fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            dispatch: DispatchSettings::with_min_amount(self.amt_msat),
            protocol: self.protocol,
            log_file: self.log.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout belongs to the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lnchat_client=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting lnchat v{}", env!("CARGO_PKG_VERSION"));

    let lnd_config = args.lnd_config();
    info!(?lnd_config, "Loaded node configuration");

    let node = LndRestClient::connect(lnd_config).context("Failed to load node credentials")?;
    let session = ChatSession::start(
        NodeServices::from_node(node),
        args.chat_config(),
        args.recipient.as_deref(),
    )
    .await
    .context("Failed to start chat session")?;

    repl::run(session).await
}
