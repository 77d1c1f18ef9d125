/// SAS-based authentication
#[cfg(feature = "sas")]
pub mod sas;

use std::fmt;
use thiserror::Error;

/// Represents a failure to produce a SAS token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The shared access key is not valid base64
    #[error("shared access key is not valid base64")]
    InvalidKey,

    /// The token lifetime cannot be represented
    #[error("token time-to-live is out of range")]
    InvalidTtl,

    /// An external signer failed
    #[error("signing failed: {0}")]
    Signer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Signs SAS token payloads
///
/// Implemented by the local shared access key, and by remote signers such as
/// an edge runtime that keeps the key to itself.
pub trait TokenSigner: fmt::Debug + Send + Sync {
    /// Returns the base64-encoded HMAC-SHA256 signature of the data
    fn sign(&self, data: &[u8]) -> Result<String, TokenError>;
}
