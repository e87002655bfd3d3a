use crate::constants::{NODE_ID_SIZE, TIMESTAMP_SIZE};
use crate::types::NodeId;

/// Bytes a chat signature commits to:
/// `sender(33) || recipient(33) || timestamp(8) || message`.
///
/// Every field but the last has a fixed width, so no delimiters are needed.
pub fn canonical_payload(
    sender: &NodeId,
    recipient: &NodeId,
    timestamp: &[u8],
    message: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * NODE_ID_SIZE + TIMESTAMP_SIZE + message.len());
    out.extend_from_slice(&sender.0);
    out.extend_from_slice(&recipient.0);
    out.extend_from_slice(timestamp);
    out.extend_from_slice(message);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order() {
        let sender = NodeId([1u8; 33]);
        let recipient = NodeId([2u8; 33]);
        let payload = canonical_payload(&sender, &recipient, &[3u8; 8], b"hi");

        assert_eq!(payload.len(), 33 + 33 + 8 + 2);
        assert!(payload[..33].iter().all(|b| *b == 1));
        assert!(payload[33..66].iter().all(|b| *b == 2));
        assert!(payload[66..74].iter().all(|b| *b == 3));
        assert_eq!(&payload[74..], b"hi");
    }

    #[test]
    fn test_direction_matters() {
        let a = NodeId([1u8; 33]);
        let b = NodeId([2u8; 33]);
        assert_ne!(
            canonical_payload(&a, &b, &[0; 8], b"x"),
            canonical_payload(&b, &a, &[0; 8], b"x")
        );
    }
}
