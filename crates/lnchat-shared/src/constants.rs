
/// Compressed secp256k1 public key size in bytes
pub const NODE_ID_SIZE: usize = 33;

/// Keysend preimage / payment hash size in bytes
pub const PREIMAGE_SIZE: usize = 32;

/// Encoded timestamp size in bytes (big-endian unix nanoseconds)
pub const TIMESTAMP_SIZE: usize = 8;

/// Number of hex characters appended to an ambiguous alias
pub const ALIAS_SUFFIX_HEX_LEN: usize = 6;

/// Custom record carrying the UTF-8 message text
pub const TLV_MESSAGE: u64 = 34_349_334;

/// Custom record carrying the sender's signature over the envelope
pub const TLV_SIGNATURE: u64 = 34_349_337;

/// Custom record carrying the sender's 33-byte node key
pub const TLV_SENDER: u64 = 34_349_339;

/// Custom record carrying the send time
pub const TLV_TIMESTAMP: u64 = 34_349_343;

/// Well-known keysend record carrying the payment preimage
pub const TLV_KEYSEND_PREIMAGE: u64 = 5_482_373_484;

/// Default amount attached to each chat message, in msat
pub const DEFAULT_MESSAGE_AMOUNT_MSAT: i64 = 1000;

/// Outbound amount is capped at this multiple of the configured minimum
pub const MAX_AMOUNT_MULTIPLIER: i64 = 10;

/// Fee limit for a chat payment, as a multiple of the configured minimum
pub const FEE_LIMIT_MULTIPLIER: i64 = 10;

/// Final hop CLTV delta for chat payments
pub const FINAL_CLTV_DELTA: i32 = 40;

/// Server-side payment timeout in seconds
pub const PAYMENT_TIMEOUT_SECS: i32 = 30;

/// Key family of the node identity key in the signer's keychain
pub const KEY_FAMILY_NODE_KEY: i32 = 6;
