//! Session token issuance.

use crate::clock::EpochMs;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Opaque proof of the single active session.
///
/// Encoded as base64 of `"<email>:<issued-at epoch ms>"`, so identical
/// inputs always yield identical tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn issue(email: &str, issued_at_ms: EpochMs) -> Self {
        Self(STANDARD.encode(format!("{email}:{issued_at_ms}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Email the token was issued for, or `None` for a malformed token.
    pub fn email(&self) -> Option<String> {
        let decoded = String::from_utf8(STANDARD.decode(&self.0).ok()?).ok()?;
        let (email, issued_at) = decoded.rsplit_once(':')?;
        issued_at.parse::<EpochMs>().ok()?;
        Some(email.to_string())
    }
}

// Keep tokens out of debug output and logs.
impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}
