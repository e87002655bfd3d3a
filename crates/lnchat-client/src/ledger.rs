//! Conversation ledger.
//!
//! One handle owned by the session and cloned into every background task.
//! It holds the transcript, the current destination and the per-peer
//! running balances. Every mutation takes the lock once, commits, and
//! publishes a [`LedgerEvent`] before releasing it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use lnchat_shared::{DeliveryState, NodeId};

use crate::error::LedgerError;
use crate::events::LedgerEvent;

const EVENT_CAPACITY: usize = 256;

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub sender: NodeId,
    /// Set only on messages this node sent.
    pub recipient: Option<NodeId>,
    pub timestamp: DateTime<Utc>,
    pub state: DeliveryState,
    /// Amount carried by the payment: sent for outbound, received for inbound.
    pub amount_msat: i64,
    /// Routing fee, meaningful once delivered.
    pub fee_msat: i64,
}

impl ChatMessage {
    /// A freshly dispatched outbound message.
    pub fn outbound(
        text: impl Into<String>,
        sender: NodeId,
        recipient: NodeId,
        timestamp: DateTime<Utc>,
        amount_msat: i64,
    ) -> Self {
        Self {
            text: text.into(),
            sender,
            recipient: Some(recipient),
            timestamp,
            state: DeliveryState::Pending,
            amount_msat,
            fee_msat: 0,
        }
    }

    /// A message received on a settled invoice.
    pub fn inbound(
        text: impl Into<String>,
        sender: NodeId,
        timestamp: DateTime<Utc>,
        amount_msat: i64,
    ) -> Self {
        Self {
            text: text.into(),
            sender,
            recipient: None,
            timestamp,
            state: DeliveryState::Delivered,
            amount_msat,
            fee_msat: 0,
        }
    }

    pub fn is_outbound(&self) -> bool {
        self.recipient.is_some()
    }
}

/// A consistent copy of the ledger at one point in time.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub messages: Vec<ChatMessage>,
    pub destination: Option<NodeId>,
    pub balances: HashMap<NodeId, i64>,
}

#[derive(Debug, Default)]
struct LedgerState {
    transcript: Vec<ChatMessage>,
    destination: Option<NodeId>,
    balances: HashMap<NodeId, i64>,
}

impl LedgerState {
    fn adjust_balance(&mut self, peer: NodeId, delta_msat: i64) -> i64 {
        let balance = self.balances.entry(peer).or_insert(0);
        *balance = balance.saturating_add(delta_msat);
        *balance
    }
}

#[derive(Clone)]
pub struct ConversationLedger {
    state: Arc<Mutex<LedgerState>>,
    events: broadcast::Sender<LedgerEvent>,
}

impl Default for ConversationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLedger {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    // A panic elsewhere must not take the transcript down with it.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: LedgerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn append_message(&self, message: ChatMessage) -> usize {
        let mut state = self.lock();
        let index = state.transcript.len();
        state.transcript.push(message.clone());
        self.publish(LedgerEvent::MessageAdded { index, message });
        index
    }

    /// Move a pending message to `new_state`.
    ///
    /// Returns `Ok(false)` when the message is already terminal or the
    /// state would not change. Balances are untouched; use
    /// [`complete_delivery`](Self::complete_delivery) for success.
    pub fn update_state(
        &self,
        index: usize,
        new_state: DeliveryState,
        fee_msat: i64,
    ) -> Result<bool, LedgerError> {
        let mut state = self.lock();
        let message = state
            .transcript
            .get_mut(index)
            .ok_or(LedgerError::UnknownMessage(index))?;

        if message.state.is_terminal() || message.state == new_state {
            return Ok(false);
        }
        message.state = new_state;
        message.fee_msat = fee_msat;

        self.publish(LedgerEvent::StateChanged {
            index,
            state: new_state,
            fee_msat,
        });
        Ok(true)
    }

    /// Mark an outbound message delivered, record its fee and debit its
    /// recipient by the amount sent, all in one step.
    ///
    /// Returns `Ok(false)` if the message already reached a final state, so
    /// repeated success updates debit only once.
    pub fn complete_delivery(&self, index: usize, fee_msat: i64) -> Result<bool, LedgerError> {
        let mut state = self.lock();
        let message = state
            .transcript
            .get_mut(index)
            .ok_or(LedgerError::UnknownMessage(index))?;

        if message.state.is_terminal() {
            return Ok(false);
        }
        message.state = DeliveryState::Delivered;
        message.fee_msat = fee_msat;
        let recipient = message.recipient;
        let amount_msat = message.amount_msat;

        self.publish(LedgerEvent::StateChanged {
            index,
            state: DeliveryState::Delivered,
            fee_msat,
        });

        if let Some(peer) = recipient {
            let balance_msat = state.adjust_balance(peer, -amount_msat);
            debug!(peer = %peer, balance_msat, "Debited peer balance");
            self.publish(LedgerEvent::BalanceChanged { peer, balance_msat });
        }
        Ok(true)
    }

    /// Append an authenticated inbound message, select its sender as the
    /// destination if none is selected, and credit the sender.
    pub fn record_inbound(&self, message: ChatMessage) -> usize {
        let mut state = self.lock();
        let peer = message.sender;
        let amount_msat = message.amount_msat;

        let index = state.transcript.len();
        state.transcript.push(message.clone());
        self.publish(LedgerEvent::MessageAdded { index, message });

        if state.destination.is_none() {
            state.destination = Some(peer);
            info!(destination = %peer, "Destination selected from inbound message");
            self.publish(LedgerEvent::DestinationChanged { destination: peer });
        }

        let balance_msat = state.adjust_balance(peer, amount_msat);
        self.publish(LedgerEvent::BalanceChanged { peer, balance_msat });
        index
    }

    pub fn current_destination(&self) -> Option<NodeId> {
        self.lock().destination
    }

    pub fn set_destination(&self, destination: NodeId) {
        let mut state = self.lock();
        state.destination = Some(destination);
        self.publish(LedgerEvent::DestinationChanged { destination });
    }

    /// Running balance with `peer`; zero if never seen.
    pub fn balance(&self, peer: &NodeId) -> i64 {
        self.lock().balances.get(peer).copied().unwrap_or(0)
    }

    pub fn message(&self, index: usize) -> Option<ChatMessage> {
        self.lock().transcript.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().transcript.is_empty()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.lock();
        LedgerSnapshot {
            messages: state.transcript.clone(),
            destination: state.destination,
            balances: state.balances.clone(),
        }
    }
}
