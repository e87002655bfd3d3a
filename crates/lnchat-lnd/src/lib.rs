//! # lnchat-lnd
//!
//! The boundary between lnchat and its Lightning node. Payment routing,
//! settlement and key management all happen inside the node; this crate
//! only describes the calls lnchat makes and implements them against the
//! lnd REST gateway.

pub mod config;
pub mod error;
pub mod models;
pub mod rest;
pub mod rpc;
pub mod stream;

mod wire;

pub use config::LndConfig;
pub use error::RpcError;
pub use models::{
    FailureReason, Graph, GraphNode, HtlcState, Invoice, InvoiceHtlc, InvoiceState, KeyLocator,
    NodeInfo, PaymentStatus, SendPaymentRequest,
};
pub use rest::LndRestClient;
pub use rpc::{Lightning, NodeServices, Router, RpcStream, Signer};
