//! Inbound path: settled invoices to transcript entries.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use lnchat_lnd::{Invoice, InvoiceState, Lightning, RpcError, RpcStream};

use crate::error::ListenerError;
use crate::ledger::{ChatMessage, ConversationLedger};
use crate::transport::ChatTransport;

pub struct InvoiceListener {
    transport: Arc<dyn ChatTransport>,
    ledger: ConversationLedger,
    updates: RpcStream<Invoice>,
}

impl InvoiceListener {
    /// Open the invoice subscription. Failing here is a setup failure.
    pub async fn subscribe(
        lightning: &dyn Lightning,
        transport: Arc<dyn ChatTransport>,
        ledger: ConversationLedger,
    ) -> Result<Self, RpcError> {
        let updates = lightning.subscribe_invoices().await?;
        info!(protocol = %transport.kind(), "Subscribed to invoice settlements");
        Ok(Self {
            transport,
            ledger,
            updates,
        })
    }

    /// Consume settlements until the stream ends or fails. An update that
    /// cannot be decoded is dropped; receiving continues.
    pub async fn run(mut self) -> Result<(), ListenerError> {
        while let Some(update) = self.updates.next().await {
            let invoice = match update {
                Ok(invoice) => invoice,
                Err(RpcError::Decode(reason)) => {
                    warn!(%reason, "Skipping undecodable invoice update");
                    continue;
                }
                Err(e) => return Err(ListenerError::Stream(e)),
            };
            handle_invoice(self.transport.as_ref(), &self.ledger, &invoice).await?;
        }
        warn!("Invoice subscription ended");
        Ok(())
    }
}

/// Process one invoice update. Returns the transcript index of the accepted
/// message, if any.
pub async fn handle_invoice(
    transport: &dyn ChatTransport,
    ledger: &ConversationLedger,
    invoice: &Invoice,
) -> Result<Option<usize>, ListenerError> {
    if invoice.state != InvoiceState::Settled {
        return Ok(None);
    }
    let Some(records) = invoice.first_settled_records() else {
        return Ok(None);
    };

    let received = match transport.receive(records).await {
        Ok(Some(received)) => received,
        Ok(None) => {
            debug!(amt_paid_msat = invoice.amt_paid_msat, "Settlement without chat message");
            return Ok(None);
        }
        Err(e) => return Err(ListenerError::Verification(e)),
    };

    let index = ledger.record_inbound(ChatMessage::inbound(
        received.text,
        received.sender,
        received.sent_at,
        invoice.amt_paid_msat,
    ));
    info!(
        index,
        sender = %received.sender,
        amt_paid_msat = invoice.amt_paid_msat,
        "Message received"
    );
    Ok(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{settled_invoice, signed_invoice, MockNode, TestKey};
    use crate::transport::{transport_for, ProtocolKind};
    use lnchat_lnd::{HtlcState, InvoiceHtlc};
    use lnchat_shared::constants::TLV_MESSAGE;
    use lnchat_shared::{CustomRecords, DeliveryState};
    use std::sync::atomic::Ordering;

    const TS: i64 = 1_700_000_000_000_000_000;

    fn bob_side() -> (Arc<MockNode>, Arc<dyn ChatTransport>, ConversationLedger) {
        let bob = MockNode::new(TestKey::from_seed(2), "bob", &[]);
        let transport = transport_for(ProtocolKind::Signed, bob.services().signer, bob.key.node_id());
        (bob, transport, ConversationLedger::new())
    }

    #[tokio::test]
    async fn test_valid_message_recorded() {
        let (bob, transport, ledger) = bob_side();
        let alice = TestKey::from_seed(1);
        let invoice = signed_invoice(&alice, &bob.key.node_id(), "hello", TS, 2500);

        let index = handle_invoice(transport.as_ref(), &ledger, &invoice)
            .await
            .unwrap()
            .unwrap();

        let message = ledger.message(index).unwrap();
        assert_eq!(message.text, "hello");
        assert_eq!(message.sender, alice.node_id());
        assert_eq!(message.state, DeliveryState::Delivered);
        assert!(!message.is_outbound());
        assert_eq!(ledger.balance(&alice.node_id()), 2500);
        assert_eq!(ledger.current_destination(), Some(alice.node_id()));
    }

    #[tokio::test]
    async fn test_invalid_signature_discarded() {
        let (bob, transport, ledger) = bob_side();
        let alice = TestKey::from_seed(1);
        let mallory = TestKey::from_seed(4);

        // Signed by mallory but claiming to be from alice.
        let mut invoice = signed_invoice(&mallory, &bob.key.node_id(), "trust me", TS, 1000);
        invoice.htlcs[0]
            .custom_records
            .insert(lnchat_shared::constants::TLV_SENDER, alice.node_id().0.to_vec());

        let result = handle_invoice(transport.as_ref(), &ledger, &invoice)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(ledger.is_empty());
        assert_eq!(ledger.balance(&alice.node_id()), 0);
        assert!(ledger.current_destination().is_none());
    }

    #[tokio::test]
    async fn test_unsettled_and_plain_payments_ignored() {
        let (bob, transport, ledger) = bob_side();
        let alice = TestKey::from_seed(1);

        let mut open = signed_invoice(&alice, &bob.key.node_id(), "early", TS, 1000);
        open.state = InvoiceState::Open;
        assert!(handle_invoice(transport.as_ref(), &ledger, &open)
            .await
            .unwrap()
            .is_none());

        let plain = settled_invoice(CustomRecords::new(), 50_000);
        assert!(handle_invoice(transport.as_ref(), &ledger, &plain)
            .await
            .unwrap()
            .is_none());

        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_only_first_settled_htlc_inspected() {
        let (bob, transport, ledger) = bob_side();
        let alice = TestKey::from_seed(1);
        let good = signed_invoice(&alice, &bob.key.node_id(), "second", TS, 1000);

        let mut junk = CustomRecords::new();
        junk.insert(TLV_MESSAGE, b"not chat".to_vec());
        let mut invoice = settled_invoice(junk, 2000);
        invoice.htlcs.push(InvoiceHtlc {
            state: HtlcState::Settled,
            amt_msat: 1000,
            custom_records: good.htlcs[0].custom_records.clone(),
        });

        assert!(handle_invoice(transport.as_ref(), &ledger, &invoice)
            .await
            .unwrap()
            .is_none());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_verification_error_is_fatal() {
        let (bob, transport, ledger) = bob_side();
        bob.fail_verify.store(true, Ordering::SeqCst);
        let alice = TestKey::from_seed(1);
        let invoice = signed_invoice(&alice, &bob.key.node_id(), "hello", TS, 1000);

        let err = handle_invoice(transport.as_ref(), &ledger, &invoice)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_stream_error() {
        let (bob, transport, ledger) = bob_side();
        let alice = TestKey::from_seed(1);
        let listener = InvoiceListener::subscribe(bob.as_ref(), transport, ledger.clone())
            .await
            .unwrap();

        bob.push_invoice(Ok(signed_invoice(&alice, &bob.key.node_id(), "one", TS, 1000)));
        bob.push_invoice(Err(RpcError::Stream {
            code: 14,
            message: "unavailable".to_string(),
        }));
        bob.push_invoice(Ok(signed_invoice(&alice, &bob.key.node_id(), "two", TS, 1000)));

        let err = listener.run().await.unwrap_err();
        assert!(matches!(err, ListenerError::Stream(_)));
        assert!(!err.is_fatal());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_update_skipped() {
        let (bob, transport, ledger) = bob_side();
        let alice = TestKey::from_seed(1);
        let listener = InvoiceListener::subscribe(bob.as_ref(), transport, ledger.clone())
            .await
            .unwrap();

        bob.push_invoice(Err(RpcError::Decode("unknown htlc state X".to_string())));
        bob.push_invoice(Ok(signed_invoice(&alice, &bob.key.node_id(), "after", TS, 1000)));
        bob.push_invoice(Err(RpcError::Stream {
            code: 14,
            message: "unavailable".to_string(),
        }));

        let err = listener.run().await.unwrap_err();
        assert!(matches!(err, ListenerError::Stream(RpcError::Stream { .. })));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.message(0).unwrap().text, "after");
    }
}
