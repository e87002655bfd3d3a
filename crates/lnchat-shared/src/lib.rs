//! # lnchat-shared
//!
//! Protocol types shared by every lnchat crate: node identities, the
//! custom-record layout of a chat payment, and the canonical bytes a chat
//! signature commits to.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod preimage;
pub mod records;
pub mod types;

pub use envelope::canonical_payload;
pub use error::IdentityError;
pub use preimage::{PaymentHash, Preimage};
pub use records::{ChatRecords, CustomRecords};
pub use types::{DeliveryState, NodeId};
