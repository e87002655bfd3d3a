//! # lnchat-client
//!
//! Chat over keysend payments. Outbound messages ride on payments whose
//! delivery state is tracked from the node's status stream; inbound
//! messages arrive on settled invoices and are authenticated before they
//! reach the transcript.

pub mod auth;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod ledger;
pub mod listener;
pub mod session;
pub mod transcript_log;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use directory::AliasDirectory;
pub use dispatcher::{DispatchHandle, DispatchSettings, PaymentDispatcher};
pub use error::{DirectoryError, LedgerError, ListenerError, SessionError};
pub use events::LedgerEvent;
pub use ledger::{ChatMessage, ConversationLedger, LedgerSnapshot};
pub use listener::InvoiceListener;
pub use session::{ChatConfig, ChatSession, InputOutcome};
pub use transcript_log::TranscriptLog;
pub use transport::{ChatTransport, ProtocolKind, ReceivedChat, SignedKeysend, UnsignedKeysend};
