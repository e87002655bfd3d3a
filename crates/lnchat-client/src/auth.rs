//! Message authentication through the node's signer.

use std::sync::Arc;

use lnchat_lnd::{KeyLocator, RpcError, Signer};
use lnchat_shared::{canonical_payload, NodeId};

#[derive(Clone)]
pub struct AuthService {
    signer: Arc<dyn Signer>,
}

impl AuthService {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self { signer }
    }

    pub fn payload(
        sender: &NodeId,
        recipient: &NodeId,
        timestamp: &[u8],
        message: &[u8],
    ) -> Vec<u8> {
        canonical_payload(sender, recipient, timestamp, message)
    }

    /// Sign with the node identity key.
    pub async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, RpcError> {
        self.signer
            .sign_message(payload, KeyLocator::node_key())
            .await
    }

    /// `Ok(false)` for a bad signature, `Err` when the signer is unreachable.
    pub async fn verify(
        &self,
        payload: &[u8],
        signature: &[u8],
        claimed_sender: &NodeId,
    ) -> Result<bool, RpcError> {
        self.signer
            .verify_message(payload, signature, claimed_sender)
            .await
    }
}
