//! In-memory node used by the unit tests.
//!
//! Signatures are ed25519 over the raw payload; a test identity is `0x02`
//! followed by the 32-byte verifying key, so any peer's key can be
//! recovered from its `NodeId` alone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use lnchat_lnd::{
    Graph, GraphNode, HtlcState, Invoice, InvoiceHtlc, InvoiceState, KeyLocator, Lightning,
    NodeInfo, NodeServices, PaymentStatus, Router, RpcError, RpcStream, SendPaymentRequest,
    Signer,
};
use lnchat_shared::{canonical_payload, records, NodeId, Preimage};

#[derive(Clone)]
pub struct TestKey {
    signing: SigningKey,
}

impl TestKey {
    pub fn from_seed(seed: u8) -> Self {
        Self {
            signing: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn node_id(&self) -> NodeId {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[1..].copy_from_slice(&self.signing.verifying_key().to_bytes());
        NodeId(bytes)
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signing.sign(msg).to_bytes().to_vec()
    }
}

fn verify_with_node_id(msg: &[u8], signature: &[u8], pubkey: &NodeId) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(&pubkey.0[1..]) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(msg, &signature).is_ok()
}

/// What the node answers to a payment towards one destination.
pub enum ScriptedPayment {
    Updates(Vec<Result<PaymentStatus, RpcError>>),
    Channel(mpsc::UnboundedReceiver<Result<PaymentStatus, RpcError>>),
    OpenError,
}

pub struct MockNode {
    pub key: TestKey,
    pub alias: String,
    pub graph: Graph,
    invoice_rx: Mutex<Option<mpsc::UnboundedReceiver<Result<Invoice, RpcError>>>>,
    invoice_tx: mpsc::UnboundedSender<Result<Invoice, RpcError>>,
    payments: Mutex<HashMap<NodeId, ScriptedPayment>>,
    sent: Mutex<Vec<SendPaymentRequest>>,
    pub fail_sign: AtomicBool,
    pub fail_verify: AtomicBool,
    pub fail_subscribe: AtomicBool,
}

impl MockNode {
    pub fn new(key: TestKey, alias: &str, peers: &[(&TestKey, &str)]) -> Arc<Self> {
        let mut nodes = vec![GraphNode {
            pub_key: key.node_id().to_hex(),
            alias: alias.to_string(),
        }];
        nodes.extend(peers.iter().map(|(peer, alias)| GraphNode {
            pub_key: peer.node_id().to_hex(),
            alias: alias.to_string(),
        }));

        let (invoice_tx, invoice_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            key,
            alias: alias.to_string(),
            graph: Graph { nodes },
            invoice_rx: Mutex::new(Some(invoice_rx)),
            invoice_tx,
            payments: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            fail_sign: AtomicBool::new(false),
            fail_verify: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
        })
    }

    pub fn services(self: &Arc<Self>) -> NodeServices {
        NodeServices {
            lightning: self.clone(),
            router: self.clone(),
            signer: self.clone(),
        }
    }

    pub fn script_payment(&self, dest: NodeId, script: ScriptedPayment) {
        self.payments.lock().unwrap().insert(dest, script);
    }

    /// Stream updates for `dest` through a channel the test drives.
    pub fn payment_channel(
        &self,
        dest: NodeId,
    ) -> mpsc::UnboundedSender<Result<PaymentStatus, RpcError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script_payment(dest, ScriptedPayment::Channel(rx));
        tx
    }

    pub fn push_invoice(&self, invoice: Result<Invoice, RpcError>) {
        let _ = self.invoice_tx.send(invoice);
    }

    pub fn sent(&self) -> Vec<SendPaymentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

fn channel_stream<T: Send + 'static>(rx: mpsc::UnboundedReceiver<T>) -> stream::BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

#[async_trait]
impl Lightning for MockNode {
    async fn describe_graph(&self) -> Result<Graph, RpcError> {
        Ok(self.graph.clone())
    }

    async fn get_info(&self) -> Result<NodeInfo, RpcError> {
        Ok(NodeInfo {
            identity_pubkey: self.key.node_id().to_hex(),
            alias: self.alias.clone(),
        })
    }

    async fn subscribe_invoices(&self) -> Result<RpcStream<Invoice>, RpcError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(RpcError::Status {
                status: 503,
                message: "invoices unavailable".to_string(),
            });
        }
        let rx = self
            .invoice_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| RpcError::Decode("already subscribed".to_string()))?;
        Ok(channel_stream(rx))
    }
}

#[async_trait]
impl Router for MockNode {
    async fn send_payment(
        &self,
        request: SendPaymentRequest,
    ) -> Result<RpcStream<PaymentStatus>, RpcError> {
        let dest = request.dest;
        self.sent.lock().unwrap().push(request);

        let script = self.payments.lock().unwrap().remove(&dest);
        match script {
            Some(ScriptedPayment::OpenError) => Err(RpcError::Status {
                status: 500,
                message: "router unavailable".to_string(),
            }),
            Some(ScriptedPayment::Channel(rx)) => Ok(channel_stream(rx)),
            Some(ScriptedPayment::Updates(updates)) => Ok(stream::iter(updates).boxed()),
            None => Ok(stream::iter(vec![
                Ok(PaymentStatus::InFlight),
                Ok(PaymentStatus::Succeeded { fee_msat: 1 }),
            ])
            .boxed()),
        }
    }
}

#[async_trait]
impl Signer for MockNode {
    async fn sign_message(&self, msg: &[u8], key_loc: KeyLocator) -> Result<Vec<u8>, RpcError> {
        if self.fail_sign.load(Ordering::SeqCst) || key_loc != KeyLocator::node_key() {
            return Err(RpcError::Status {
                status: 500,
                message: "signer unavailable".to_string(),
            });
        }
        Ok(self.key.sign(msg))
    }

    async fn verify_message(
        &self,
        msg: &[u8],
        signature: &[u8],
        pubkey: &NodeId,
    ) -> Result<bool, RpcError> {
        if self.fail_verify.load(Ordering::SeqCst) {
            return Err(RpcError::Status {
                status: 500,
                message: "signer unavailable".to_string(),
            });
        }
        Ok(verify_with_node_id(msg, signature, pubkey))
    }
}

/// A settled invoice carrying a chat message from `sender` to `recipient`.
pub fn signed_invoice(
    sender: &TestKey,
    recipient: &NodeId,
    text: &str,
    timestamp_nanos: i64,
    amt_paid_msat: i64,
) -> Invoice {
    let timestamp = records::encode_timestamp(timestamp_nanos);
    let payload = canonical_payload(&sender.node_id(), recipient, &timestamp, text.as_bytes());
    let signature = sender.sign(&payload);
    let custom_records = records::encode(
        text.as_bytes(),
        &sender.node_id(),
        timestamp_nanos,
        Some(&signature),
        &Preimage::generate(),
    );
    settled_invoice(custom_records, amt_paid_msat)
}

pub fn settled_invoice(custom_records: lnchat_shared::CustomRecords, amt_paid_msat: i64) -> Invoice {
    Invoice {
        state: InvoiceState::Settled,
        amt_paid_msat,
        htlcs: vec![InvoiceHtlc {
            state: HtlcState::Settled,
            amt_msat: amt_paid_msat,
            custom_records,
        }],
    }
}
