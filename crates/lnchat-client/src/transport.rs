//! Chat protocols carried over keysend payments.
//!
//! Both protocol generations produce and accept custom record sets; they
//! differ only in whether a signature is attached and checked.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use lnchat_lnd::{RpcError, Signer};
use lnchat_shared::records::{self, encode_timestamp};
use lnchat_shared::{CustomRecords, NodeId, Preimage};

use crate::auth::AuthService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolKind {
    #[default]
    Signed,
    Unsigned,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Signed => f.write_str("signed"),
            ProtocolKind::Unsigned => f.write_str("unsigned"),
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signed" => Ok(ProtocolKind::Signed),
            "unsigned" => Ok(ProtocolKind::Unsigned),
            other => Err(format!(
                "unknown protocol {other:?}, expected \"signed\" or \"unsigned\""
            )),
        }
    }
}

/// An outbound message before its records are built.
#[derive(Debug)]
pub struct OutboundDraft<'a> {
    pub sender: NodeId,
    pub recipient: NodeId,
    pub message: &'a [u8],
    pub timestamp_nanos: i64,
    pub preimage: &'a Preimage,
}

/// A chat message accepted from an inbound payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedChat {
    pub sender: NodeId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn kind(&self) -> ProtocolKind;

    /// Build the custom records for an outbound payment.
    async fn send(&self, draft: &OutboundDraft<'_>) -> Result<CustomRecords, RpcError>;

    /// Accept records from a settled payment. `Ok(None)` means "not a chat
    /// message for us" and is never an error.
    async fn receive(&self, records: &CustomRecords) -> Result<Option<ReceivedChat>, RpcError>;
}

pub fn transport_for(
    kind: ProtocolKind,
    signer: Arc<dyn Signer>,
    self_id: NodeId,
) -> Arc<dyn ChatTransport> {
    match kind {
        ProtocolKind::Signed => Arc::new(SignedKeysend::new(AuthService::new(signer), self_id)),
        ProtocolKind::Unsigned => Arc::new(UnsignedKeysend),
    }
}

/// Current protocol: every message is signed by the sender's node key and
/// checked against the claimed sender on receipt.
pub struct SignedKeysend {
    auth: AuthService,
    self_id: NodeId,
}

impl SignedKeysend {
    pub fn new(auth: AuthService, self_id: NodeId) -> Self {
        Self { auth, self_id }
    }
}

#[async_trait]
impl ChatTransport for SignedKeysend {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Signed
    }

    async fn send(&self, draft: &OutboundDraft<'_>) -> Result<CustomRecords, RpcError> {
        let timestamp = encode_timestamp(draft.timestamp_nanos);
        let payload =
            AuthService::payload(&draft.sender, &draft.recipient, &timestamp, draft.message);
        let signature = self.auth.sign(&payload).await?;

        Ok(records::encode(
            draft.message,
            &draft.sender,
            draft.timestamp_nanos,
            Some(&signature),
            draft.preimage,
        ))
    }

    async fn receive(&self, records: &CustomRecords) -> Result<Option<ReceivedChat>, RpcError> {
        let Some(chat) = records::decode(records) else {
            return Ok(None);
        };
        let Some(signature) = chat.signature.as_deref() else {
            return Ok(None);
        };

        let payload =
            AuthService::payload(&chat.sender, &self.self_id, &chat.timestamp, &chat.message);
        if !self.auth.verify(&payload, signature, &chat.sender).await? {
            debug!(sender = %chat.sender, "Discarding message with invalid signature");
            return Ok(None);
        }

        Ok(Some(ReceivedChat {
            sender: chat.sender,
            text: chat.text(),
            sent_at: chat.sent_at(),
        }))
    }
}

/// Legacy protocol: the sender record is trusted as-is.
pub struct UnsignedKeysend;

#[async_trait]
impl ChatTransport for UnsignedKeysend {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Unsigned
    }

    async fn send(&self, draft: &OutboundDraft<'_>) -> Result<CustomRecords, RpcError> {
        Ok(records::encode(
            draft.message,
            &draft.sender,
            draft.timestamp_nanos,
            None,
            draft.preimage,
        ))
    }

    async fn receive(&self, records: &CustomRecords) -> Result<Option<ReceivedChat>, RpcError> {
        Ok(records::decode_unsigned(records).map(|chat| ReceivedChat {
            sender: chat.sender,
            text: chat.text(),
            sent_at: chat.sent_at(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockNode, TestKey};
    use lnchat_shared::constants::{TLV_MESSAGE, TLV_SENDER, TLV_SIGNATURE};

    const TS: i64 = 1_700_000_000_000_000_001;

    fn draft<'a>(sender: NodeId, recipient: NodeId, preimage: &'a Preimage) -> OutboundDraft<'a> {
        OutboundDraft {
            sender,
            recipient,
            message: b"hi bob",
            timestamp_nanos: TS,
            preimage,
        }
    }

    #[test]
    fn test_protocol_kind_parse() {
        assert_eq!("signed".parse::<ProtocolKind>(), Ok(ProtocolKind::Signed));
        assert_eq!("Unsigned".parse::<ProtocolKind>(), Ok(ProtocolKind::Unsigned));
        assert!("free".parse::<ProtocolKind>().is_err());
        assert_eq!(ProtocolKind::default().to_string(), "signed");
    }

    #[tokio::test]
    async fn test_signed_message_accepted_by_recipient() {
        let alice = MockNode::new(TestKey::from_seed(1), "alice", &[]);
        let bob = MockNode::new(TestKey::from_seed(2), "bob", &[]);
        let alice_id = alice.key.node_id();
        let bob_id = bob.key.node_id();

        let outbound = transport_for(ProtocolKind::Signed, alice.services().signer, alice_id);
        let inbound = transport_for(ProtocolKind::Signed, bob.services().signer, bob_id);

        let preimage = Preimage::generate();
        let records = outbound
            .send(&draft(alice_id, bob_id, &preimage))
            .await
            .unwrap();
        assert!(records.contains_key(&TLV_SIGNATURE));

        let received = inbound.receive(&records).await.unwrap().unwrap();
        assert_eq!(received.sender, alice_id);
        assert_eq!(received.text, "hi bob");
        assert_eq!(received.sent_at.timestamp_nanos_opt(), Some(TS));
    }

    #[tokio::test]
    async fn test_message_for_someone_else_rejected() {
        let alice = MockNode::new(TestKey::from_seed(1), "alice", &[]);
        let carol = MockNode::new(TestKey::from_seed(3), "carol", &[]);
        let alice_id = alice.key.node_id();
        let bob_id = TestKey::from_seed(2).node_id();

        let outbound = transport_for(ProtocolKind::Signed, alice.services().signer, alice_id);
        let preimage = Preimage::generate();
        let records = outbound
            .send(&draft(alice_id, bob_id, &preimage))
            .await
            .unwrap();

        // Replayed to carol: the payload commits to bob as recipient.
        let carol_side =
            transport_for(ProtocolKind::Signed, carol.services().signer, carol.key.node_id());
        assert!(carol_side.receive(&records).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_forged_sender_rejected() {
        let alice = MockNode::new(TestKey::from_seed(1), "alice", &[]);
        let bob = MockNode::new(TestKey::from_seed(2), "bob", &[]);
        let alice_id = alice.key.node_id();
        let bob_id = bob.key.node_id();

        let outbound = transport_for(ProtocolKind::Signed, alice.services().signer, alice_id);
        let preimage = Preimage::generate();
        let mut records = outbound
            .send(&draft(alice_id, bob_id, &preimage))
            .await
            .unwrap();
        let mallory = TestKey::from_seed(4).node_id();
        records.insert(TLV_SENDER, mallory.0.to_vec());

        let inbound = transport_for(ProtocolKind::Signed, bob.services().signer, bob_id);
        assert!(inbound.receive(&records).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_error_propagates() {
        let bob = MockNode::new(TestKey::from_seed(2), "bob", &[]);
        bob.fail_verify
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let alice = TestKey::from_seed(1);
        let invoice = crate::test_support::signed_invoice(&alice, &bob.key.node_id(), "x", TS, 1);
        let records = invoice.first_settled_records().unwrap();

        let inbound = transport_for(ProtocolKind::Signed, bob.services().signer, bob.key.node_id());
        assert!(inbound.receive(records).await.is_err());
    }

    #[tokio::test]
    async fn test_non_chat_records_ignored() {
        let bob = MockNode::new(TestKey::from_seed(2), "bob", &[]);
        let inbound = transport_for(ProtocolKind::Signed, bob.services().signer, bob.key.node_id());
        let mut records = CustomRecords::new();
        records.insert(TLV_MESSAGE, b"no sender".to_vec());
        assert!(inbound.receive(&records).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsigned_protocol() {
        let alice_id = TestKey::from_seed(1).node_id();
        let bob_id = TestKey::from_seed(2).node_id();
        let transport = UnsignedKeysend;
        assert_eq!(transport.kind(), ProtocolKind::Unsigned);

        let preimage = Preimage::generate();
        let records = transport
            .send(&draft(alice_id, bob_id, &preimage))
            .await
            .unwrap();
        assert!(!records.contains_key(&TLV_SIGNATURE));

        let received = transport.receive(&records).await.unwrap().unwrap();
        assert_eq!(received.sender, alice_id);
        assert_eq!(received.text, "hi bob");
    }
}
