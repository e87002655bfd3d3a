use lnchat_shared::{DeliveryState, NodeId};

use crate::ledger::ChatMessage;

/// Change notifications published by the conversation ledger.
///
/// Events are sent while the ledger lock is held, so subscribers see them
/// in the same order the mutations were committed.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    MessageAdded {
        index: usize,
        message: ChatMessage,
    },
    StateChanged {
        index: usize,
        state: DeliveryState,
        fee_msat: i64,
    },
    DestinationChanged {
        destination: NodeId,
    },
    BalanceChanged {
        peer: NodeId,
        balance_msat: i64,
    },
}
