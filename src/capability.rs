//! Capability tokens: unguessable secrets that authorize one operation on one record.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{Result, StoreError};

/// 256 bits of entropy per token.
pub const TOKEN_BYTES: usize = 32;

#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityToken(String);

impl CapabilityToken {
    /// The raw secret. Only meant for handing back to the uploader.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapabilityToken([REDACTED])")
    }
}

impl PartialEq for CapabilityToken {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl Eq for CapabilityToken {}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub download: CapabilityToken,
    pub delete: CapabilityToken,
}

#[derive(Clone)]
pub struct CapabilityIssuer {
    rng: SystemRandom,
}

impl CapabilityIssuer {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    pub fn issue(&self) -> Result<TokenPair> {
        Ok(TokenPair {
            download: self.mint()?,
            delete: self.mint()?,
        })
    }

    /// Check a caller-supplied token against the stored one.
    pub fn verify(provided: &str, expected: &CapabilityToken) -> bool {
        if expected.0.is_empty() {
            return false;
        }
        constant_time_eq(provided, &expected.0)
    }

    fn mint(&self) -> Result<CapabilityToken> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| StoreError::StorageFailure("system randomness unavailable".into()))?;
        Ok(CapabilityToken(URL_SAFE_NO_PAD.encode(bytes)))
    }
}

impl Default for CapabilityIssuer {
    fn default() -> Self {
        Self::new()
    }
}

fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Keep the work the same whether or not the lengths match.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}
