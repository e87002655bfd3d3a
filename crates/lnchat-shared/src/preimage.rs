use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::constants::PREIMAGE_SIZE;

/// Keysend payment preimage chosen by the payer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Preimage(pub [u8; PREIMAGE_SIZE]);

/// SHA-256 of a [`Preimage`], the hash the payment is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentHash(pub [u8; PREIMAGE_SIZE]);

impl Preimage {
    pub fn generate() -> Self {
        let mut bytes = [0u8; PREIMAGE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn hash(&self) -> PaymentHash {
        let digest = Sha256::digest(self.0);
        let mut out = [0u8; PREIMAGE_SIZE];
        out.copy_from_slice(&digest);
        PaymentHash(out)
    }

    pub fn as_bytes(&self) -> &[u8; PREIMAGE_SIZE] {
        &self.0
    }
}

// Never print the secret itself.
impl std::fmt::Debug for Preimage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Preimage(hash={})", self.hash())
    }
}

impl PaymentHash {
    pub fn as_bytes(&self) -> &[u8; PREIMAGE_SIZE] {
        &self.0
    }
}

impl std::fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
