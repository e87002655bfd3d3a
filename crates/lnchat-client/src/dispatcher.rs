//! Outbound payments carrying chat messages.
//!
//! Each dispatch appends a pending message, builds its records, and spawns
//! a task that owns the payment's status stream and drives the message to
//! its final state.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lnchat_lnd::{PaymentStatus, Router, SendPaymentRequest};
use lnchat_shared::constants::{
    DEFAULT_MESSAGE_AMOUNT_MSAT, FEE_LIMIT_MULTIPLIER, FINAL_CLTV_DELTA, MAX_AMOUNT_MULTIPLIER,
    PAYMENT_TIMEOUT_SECS,
};
use lnchat_shared::{DeliveryState, NodeId, Preimage};

use crate::error::{LedgerError, SessionError};
use crate::ledger::{ChatMessage, ConversationLedger};
use crate::transport::{ChatTransport, OutboundDraft};

/// Payment parameters applied to every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub min_amount_msat: i64,
    pub max_amount_multiplier: i64,
    pub fee_limit_multiplier: i64,
    pub timeout_seconds: i32,
    pub final_cltv_delta: i32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            min_amount_msat: DEFAULT_MESSAGE_AMOUNT_MSAT,
            max_amount_multiplier: MAX_AMOUNT_MULTIPLIER,
            fee_limit_multiplier: FEE_LIMIT_MULTIPLIER,
            timeout_seconds: PAYMENT_TIMEOUT_SECS,
            final_cltv_delta: FINAL_CLTV_DELTA,
        }
    }
}

impl DispatchSettings {
    pub fn with_min_amount(min_amount_msat: i64) -> Self {
        Self {
            min_amount_msat,
            ..Self::default()
        }
    }

    /// What to pay a peer we currently hold `balance_msat` with.
    ///
    /// A peer who has paid us more gets paid back more, up to the cap; the
    /// minimum always applies.
    pub fn amount_for(&self, balance_msat: i64) -> i64 {
        let max = self
            .min_amount_msat
            .saturating_mul(self.max_amount_multiplier);
        payment_amount(balance_msat, self.min_amount_msat, max)
    }

    pub fn fee_limit_msat(&self) -> i64 {
        self.min_amount_msat
            .saturating_mul(self.fee_limit_multiplier)
    }
}

/// `balance` clamped to `[min, max]`. `min` wins if the bounds cross.
pub fn payment_amount(balance_msat: i64, min_msat: i64, max_msat: i64) -> i64 {
    balance_msat.min(max_msat).max(min_msat)
}

/// A dispatched message and the task tracking its payment.
#[derive(Debug)]
pub struct DispatchHandle {
    pub index: usize,
    pub amount_msat: i64,
    pub task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct PaymentDispatcher {
    router: Arc<dyn Router>,
    transport: Arc<dyn ChatTransport>,
    ledger: ConversationLedger,
    self_id: NodeId,
    settings: DispatchSettings,
}

impl PaymentDispatcher {
    pub fn new(
        router: Arc<dyn Router>,
        transport: Arc<dyn ChatTransport>,
        ledger: ConversationLedger,
        self_id: NodeId,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            router,
            transport,
            ledger,
            self_id,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Send `text` to `recipient`.
    ///
    /// Returns once the payment has been handed to a tracking task. A
    /// signing failure marks the message failed and is returned here;
    /// everything after that is reflected only in the ledger.
    pub async fn dispatch(
        &self,
        recipient: NodeId,
        text: &str,
    ) -> Result<DispatchHandle, SessionError> {
        let amount_msat = self.settings.amount_for(self.ledger.balance(&recipient));
        let now = Utc::now();
        let timestamp_nanos = now.timestamp_nanos_opt().unwrap_or_default();

        let index = self.ledger.append_message(ChatMessage::outbound(
            text,
            self.self_id,
            recipient,
            now,
            amount_msat,
        ));

        let preimage = Preimage::generate();
        let draft = OutboundDraft {
            sender: self.self_id,
            recipient,
            message: text.as_bytes(),
            timestamp_nanos,
            preimage: &preimage,
        };

        let dest_custom_records = match self.transport.send(&draft).await {
            Ok(records) => records,
            Err(e) => {
                warn!(index, error = %e, "Failed to sign message");
                self.ledger.update_state(index, DeliveryState::Failed, 0)?;
                return Err(SessionError::Signing(e));
            }
        };

        let request = SendPaymentRequest {
            payment_hash: preimage.hash(),
            amt_msat: amount_msat,
            final_cltv_delta: self.settings.final_cltv_delta,
            dest: recipient,
            fee_limit_msat: self.settings.fee_limit_msat(),
            timeout_seconds: self.settings.timeout_seconds,
            dest_custom_records,
        };

        info!(
            index,
            dest = %recipient,
            amount_msat,
            hash = %request.payment_hash,
            "Dispatching message payment"
        );

        let task = tokio::spawn(track_payment(
            self.router.clone(),
            self.ledger.clone(),
            index,
            request,
        ));

        Ok(DispatchHandle {
            index,
            amount_msat,
            task,
        })
    }
}

async fn track_payment(
    router: Arc<dyn Router>,
    ledger: ConversationLedger,
    index: usize,
    request: SendPaymentRequest,
) {
    let hash = request.payment_hash;
    let mut updates = match router.send_payment(request).await {
        Ok(updates) => updates,
        Err(e) => {
            warn!(index, hash = %hash, error = %e, "Failed to start payment");
            if let Err(e) = ledger.update_state(index, DeliveryState::Failed, 0) {
                warn!(index, error = %e, "Could not mark message failed");
            }
            return;
        }
    };

    while let Some(update) = updates.next().await {
        match update {
            Ok(status) => {
                if let Err(e) = apply_status(&ledger, index, status) {
                    warn!(index, error = %e, "Could not apply payment status");
                    return;
                }
            }
            Err(e) => {
                // No synthetic terminal state: the message keeps whatever
                // state it last reached.
                warn!(index, hash = %hash, error = %e, "Payment status stream failed");
                return;
            }
        }
    }

    debug!(index, hash = %hash, "Payment status stream ended");
}

/// Apply one status update to message `index`. Returns whether anything
/// changed.
pub fn apply_status(
    ledger: &ConversationLedger,
    index: usize,
    status: PaymentStatus,
) -> Result<bool, LedgerError> {
    match status {
        PaymentStatus::InFlight => Ok(false),
        PaymentStatus::Succeeded { fee_msat } => {
            let changed = ledger.complete_delivery(index, fee_msat)?;
            if changed {
                info!(index, fee_msat, "Message delivered");
            }
            Ok(changed)
        }
        PaymentStatus::Failed(reason) => {
            let changed = ledger.update_state(index, DeliveryState::Failed, 0)?;
            if changed {
                info!(index, reason = ?reason, "Message payment failed");
            }
            Ok(changed)
        }
    }
}
