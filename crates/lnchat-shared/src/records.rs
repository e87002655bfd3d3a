//! Chat payload carried in a payment's custom records.
//!
//! A chat message rides on a keysend payment as a handful of fixed TLV
//! records. Decoding is permissive: anything that does not look like a
//! complete chat payload is reported as `None` so ordinary payments pass
//! through untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::constants::{
    TIMESTAMP_SIZE, TLV_KEYSEND_PREIMAGE, TLV_MESSAGE, TLV_SENDER, TLV_SIGNATURE, TLV_TIMESTAMP,
};
use crate::preimage::Preimage;
use crate::types::NodeId;

/// TLV type → value, as attached to a payment or reported on a settled HTLC.
pub type CustomRecords = BTreeMap<u64, Vec<u8>>;

/// The chat fields extracted from a record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecords {
    /// Raw message bytes, exactly as signed.
    pub message: Vec<u8>,
    pub sender: NodeId,
    /// Raw timestamp bytes, exactly as signed.
    pub timestamp: [u8; TIMESTAMP_SIZE],
    pub signature: Option<Vec<u8>>,
}

impl ChatRecords {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }

    pub fn timestamp_nanos(&self) -> i64 {
        i64::from_be_bytes(self.timestamp)
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp_nanos())
    }
}

pub fn encode_timestamp(nanos: i64) -> [u8; TIMESTAMP_SIZE] {
    nanos.to_be_bytes()
}

/// Build the record set for an outbound chat payment.
///
/// The signature record is omitted when `signature` is `None` (legacy
/// unsigned protocol).
pub fn encode(
    message: &[u8],
    sender: &NodeId,
    timestamp_nanos: i64,
    signature: Option<&[u8]>,
    preimage: &Preimage,
) -> CustomRecords {
    let mut records = CustomRecords::new();
    records.insert(TLV_MESSAGE, message.to_vec());
    records.insert(TLV_SENDER, sender.0.to_vec());
    records.insert(TLV_TIMESTAMP, encode_timestamp(timestamp_nanos).to_vec());
    if let Some(sig) = signature {
        records.insert(TLV_SIGNATURE, sig.to_vec());
    }
    records.insert(TLV_KEYSEND_PREIMAGE, preimage.0.to_vec());
    records
}

/// Extract a signed chat payload. `None` means "not a chat payload".
pub fn decode(records: &CustomRecords) -> Option<ChatRecords> {
    let decoded = decode_unsigned(records)?;
    decoded.signature.as_ref()?;
    Some(decoded)
}

/// Extract a chat payload without requiring a signature record.
pub fn decode_unsigned(records: &CustomRecords) -> Option<ChatRecords> {
    let message = records.get(&TLV_MESSAGE)?;
    let timestamp: [u8; TIMESTAMP_SIZE] = records.get(&TLV_TIMESTAMP)?.as_slice().try_into().ok()?;
    let sender = NodeId::from_slice(records.get(&TLV_SENDER)?).ok()?;

    Some(ChatRecords {
        message: message.clone(),
        sender,
        timestamp,
        signature: records.get(&TLV_SIGNATURE).cloned(),
    })
}
