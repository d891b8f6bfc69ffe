//! Secret check for the cache invalidation endpoint.
//!
//! `/clearcache?key=<secret>` is only honoured when `key` equals the
//! configured secret. The comparison is constant-time so response timing
//! does not leak how much of a guess was right.
//!
//! ```rust
//! use nimage::server::auth::ClearKey;
//!
//! let key = ClearKey::new("abc");
//! assert!(key.verify("abc").is_ok());
//! assert!(key.verify("wrong").is_err());
//! ```

use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ClearCacheError;

/// Configured cache-clear secret.
#[derive(Clone)]
pub struct ClearKey {
    secret: Vec<u8>,
}

impl ClearKey {
    /// Create a checker for the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Check a provided key against the secret.
    ///
    /// An empty configured secret never matches.
    pub fn verify(&self, provided: &str) -> Result<(), ClearCacheError> {
        if self.secret.is_empty() {
            warn!("Cache clear rejected: no clear key configured");
            return Err(ClearCacheError::Forbidden);
        }

        if provided.as_bytes().ct_eq(&self.secret).into() {
            Ok(())
        } else {
            warn!("Invalid cache clear key provided");
            Err(ClearCacheError::Forbidden)
        }
    }
}

impl std::fmt::Debug for ClearKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClearKey").field("secret", &"<redacted>").finish()
    }
}
