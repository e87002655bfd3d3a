use thiserror::Error;

use lnchat_lnd::RpcError;
use lnchat_shared::IdentityError;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Node RPC failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("Invalid node key {pub_key:?}: {source}")]
    InvalidNodeKey {
        pub_key: String,
        #[source]
        source: IdentityError,
    },

    #[error("No node found for {0:?}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No message at transcript index {0}")]
    UnknownMessage(usize),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Node RPC failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("Signing failed: {0}")]
    Signing(#[source] RpcError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("No destination selected; type /<pubkey or alias> first")]
    NoDestination,

    #[error("Transcript log error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the inbound path stopped.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// The settlement stream failed while reading. Outbound sends still work.
    #[error("Invoice stream failed: {0}")]
    Stream(#[source] RpcError),

    /// The signer could not check a signature. Neither accepting nor
    /// rejecting the message is safe, so the session must stop.
    #[error("Signature verification unavailable: {0}")]
    Verification(#[source] RpcError),
}

impl ListenerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ListenerError::Verification(_))
    }
}
