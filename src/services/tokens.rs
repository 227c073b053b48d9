use std::collections::HashMap;
use std::sync::Mutex;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// Process-scoped registry of live bearer tokens, mapping token to expiry.
/// In-memory only: a restart invalidates every issued token. Handed to
/// handlers through AppState rather than living in a global.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token valid for `hours` from now.
    pub fn issue(&self, hours: i64) -> (String, DateTime<Utc>) {
        let mut raw = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let expires_at = Utc::now() + Duration::hours(hours);
        self.lock().insert(token.clone(), expires_at);
        (token, expires_at)
    }

    /// True when the token exists and has not expired. Expired tokens are
    /// evicted on lookup.
    pub fn validate(&self, token: &str) -> bool {
        let mut tokens = self.lock();
        match tokens.get(token) {
            Some(expires_at) if Utc::now() <= *expires_at => true,
            Some(_) => {
                tokens.remove(token);
                false
            }
            None => false,
        }
    }

    /// Remove a token. Returns false when it was not present.
    pub fn revoke(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}
