//! Node-facing data models.
//!
//! These are the shapes the rest of lnchat works with. The JSON encoding
//! used by the REST gateway lives in `wire` and is converted into these.

use lnchat_shared::constants::KEY_FAMILY_NODE_KEY;
use lnchat_shared::{CustomRecords, NodeId, PaymentHash};

/// One-time snapshot of the public channel graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
}

/// A graph node as announced on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Hex-encoded public key, not yet validated.
    pub pub_key: String,
    pub alias: String,
}

/// Information about the local node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Hex-encoded public key, not yet validated.
    pub identity_pubkey: String,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceState {
    Open,
    Settled,
    Canceled,
    Accepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtlcState {
    Accepted,
    Settled,
    Canceled,
}

#[derive(Debug, Clone)]
pub struct InvoiceHtlc {
    pub state: HtlcState,
    pub amt_msat: i64,
    pub custom_records: CustomRecords,
}

/// An invoice update from the settlement subscription.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub state: InvoiceState,
    pub amt_paid_msat: i64,
    pub htlcs: Vec<InvoiceHtlc>,
}

impl Invoice {
    /// Records of the first settled HTLC. Later HTLCs are not inspected.
    pub fn first_settled_records(&self) -> Option<&CustomRecords> {
        self.htlcs
            .iter()
            .find(|htlc| htlc.state == HtlcState::Settled)
            .map(|htlc| &htlc.custom_records)
    }
}

/// Outbound keysend payment.
#[derive(Debug, Clone)]
pub struct SendPaymentRequest {
    pub payment_hash: PaymentHash,
    pub amt_msat: i64,
    pub final_cltv_delta: i32,
    pub dest: NodeId,
    pub fee_limit_msat: i64,
    pub timeout_seconds: i32,
    pub dest_custom_records: CustomRecords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Unknown,
    Timeout,
    NoRoute,
    Error,
    IncorrectPaymentDetails,
    InsufficientBalance,
}

/// One update on a payment's status stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Initiated or in flight; not terminal.
    InFlight,
    Succeeded { fee_msat: i64 },
    Failed(FailureReason),
}

/// Which key the signer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLocator {
    pub key_family: i32,
    pub key_index: i32,
}

impl KeyLocator {
    /// The node's identity key.
    pub fn node_key() -> Self {
        Self {
            key_family: KEY_FAMILY_NODE_KEY,
            key_index: 0,
        }
    }
}
