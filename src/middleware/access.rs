use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::OnceLock;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

type Rejection = (StatusCode, Json<Value>);

/// Addresses considered local to this machine: the canonical loopback
/// literals plus whatever the machine hostname resolves to. Computed once.
fn local_addresses() -> &'static HashSet<IpAddr> {
    static ADDRS: OnceLock<HashSet<IpAddr>> = OnceLock::new();
    ADDRS.get_or_init(|| {
        let mut addrs = HashSet::new();
        addrs.insert(IpAddr::V4(Ipv4Addr::LOCALHOST));
        addrs.insert(IpAddr::V6(Ipv6Addr::LOCALHOST));
        if let Some(hostname) = machine_hostname() {
            if let Ok(resolved) = (hostname.as_str(), 0u16).to_socket_addrs() {
                for addr in resolved {
                    addrs.insert(addr.ip());
                }
            }
        }
        addrs
    })
}

fn machine_hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn is_local(addr: &SocketAddr) -> bool {
    let ip = addr.ip().to_canonical();
    ip.is_loopback() || local_addresses().contains(&ip)
}

/// Extractor accepting only requests from the serving machine itself.
pub struct LocalCaller(pub SocketAddr);

impl<S> FromRequestParts<S> for LocalCaller
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ConnectInfo(addr) = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .copied()
            .ok_or_else(|| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Peer address unavailable" })),
                )
            })?;

        if !is_local(&addr) {
            tracing::warn!(client = %addr.ip(), "unauthorized access attempt on local-only endpoint");
            return Err((
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Access denied",
                    "message": "This API endpoint can only be accessed from the local machine"
                })),
            ));
        }

        Ok(LocalCaller(addr))
    }
}

/// Extractor requiring a live bearer token from the process token registry.
/// Combine with LocalCaller (listed first) for the fully gated endpoints.
pub struct BearerToken(pub String);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("API token is missing or invalid"))?;

        if !state.tokens.validate(token) {
            return Err(unauthorized("API token is invalid or has expired"));
        }

        Ok(BearerToken(token.to_string()))
    }
}

fn unauthorized(message: &str) -> Rejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized", "message": message })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_addresses_are_local() {
        assert!(is_local(&"127.0.0.1:5000".parse().unwrap()));
        assert!(is_local(&"127.0.0.53:80".parse().unwrap()));
        assert!(is_local(&"[::1]:5000".parse().unwrap()));
        // IPv4-mapped loopback as seen on dual-stack listeners.
        assert!(is_local(&"[::ffff:127.0.0.1]:5000".parse().unwrap()));
    }

    #[test]
    fn remote_addresses_are_not_local() {
        assert!(!is_local(&"8.8.8.8:443".parse().unwrap()));
        assert!(!is_local(&"[2001:db8::1]:443".parse().unwrap()));
    }
}
