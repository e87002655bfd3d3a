//! The node services lnchat depends on.
//!
//! Each trait mirrors one lnd sub-server. Everything above this layer talks
//! to the node only through these traits, so the REST client and the
//! in-memory test node are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use lnchat_shared::NodeId;

use crate::error::RpcError;
use crate::models::{Graph, Invoice, KeyLocator, NodeInfo, PaymentStatus, SendPaymentRequest};

/// A server-pushed stream of updates.
pub type RpcStream<T> = BoxStream<'static, Result<T, RpcError>>;

/// Graph, node info and invoice settlement.
#[async_trait]
pub trait Lightning: Send + Sync {
    async fn describe_graph(&self) -> Result<Graph, RpcError>;

    async fn get_info(&self) -> Result<NodeInfo, RpcError>;

    /// Open the long-lived invoice subscription.
    async fn subscribe_invoices(&self) -> Result<RpcStream<Invoice>, RpcError>;
}

/// Outbound payments.
#[async_trait]
pub trait Router: Send + Sync {
    /// Dispatch a payment and return its status stream.
    async fn send_payment(
        &self,
        request: SendPaymentRequest,
    ) -> Result<RpcStream<PaymentStatus>, RpcError>;
}

/// Message signing with the node's keys.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_message(&self, msg: &[u8], key_loc: KeyLocator) -> Result<Vec<u8>, RpcError>;

    /// `Ok(false)` means the signature is invalid; `Err` means the check
    /// itself could not be performed.
    async fn verify_message(
        &self,
        msg: &[u8],
        signature: &[u8],
        pubkey: &NodeId,
    ) -> Result<bool, RpcError>;
}

/// Handles to the three services of one node.
#[derive(Clone)]
pub struct NodeServices {
    pub lightning: Arc<dyn Lightning>,
    pub router: Arc<dyn Router>,
    pub signer: Arc<dyn Signer>,
}

impl NodeServices {
    /// Use one value implementing all three services.
    pub fn from_node<N>(node: N) -> Self
    where
        N: Lightning + Router + Signer + 'static,
    {
        let node = Arc::new(node);
        Self {
            lightning: node.clone(),
            router: node.clone(),
            signer: node,
        }
    }
}
