// SPDX-License-Identifier: MIT

//! Credential handling for the server directory
//!
//! Stored credentials may be ciphertext from the configuration tier. The
//! cipher itself lives outside this crate; we only hold the seam. Decryption
//! failure falls back to the stored value unchanged so servers configured
//! before encryption was rolled out keep working. Credential values are
//! never logged, in neither branch.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("credential decryption failed: {0}")]
pub struct CipherError(pub String);

/// Decrypts stored credential values
pub trait CredentialCipher: Send + Sync {
    fn decrypt(&self, stored: &str) -> Result<String, CipherError>;
}

/// Identity cipher for deployments storing credentials in the clear
#[derive(Debug, Clone, Default)]
pub struct PlainCipher;

impl CredentialCipher for PlainCipher {
    fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        Ok(stored.to_string())
    }
}

/// Decrypt a stored credential, falling back to the stored value on failure
pub fn reveal(cipher: &dyn CredentialCipher, stored: &str) -> String {
    match cipher.decrypt(stored) {
        Ok(plain) => plain,
        Err(_) => {
            tracing::warn!("credential decryption failed, using stored value");
            stored.to_string()
        }
    }
}
