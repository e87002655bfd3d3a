use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentityError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid key length: expected 33 bytes, got {0}")]
    InvalidLength(usize),
}
