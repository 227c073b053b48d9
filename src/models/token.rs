use serde::Deserialize;
use serde_json::Value;

/// Body for POST /api/secure/token.
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    /// Number or numeric string; out-of-range values fall back to the default.
    pub expires_in_hours: Option<Value>,
}

/// Body for POST /api/secure/token/revoke.
#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: Option<String>,
}

impl TokenRequest {
    /// Resolve the requested TTL, clamping invalid or out-of-range values
    /// back to the default.
    pub fn ttl_hours(&self, default: i64, max: i64) -> i64 {
        let requested = match &self.expires_in_hours {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        match requested {
            Some(h) if h > 0 && h <= max => h,
            _ => default,
        }
    }
}
