use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Owner identity used when a request carries no usable address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identify the caller: `X-Real-Ip`, then the first `X-Forwarded-For`
/// entry, then the socket peer. A `host:port` form is reduced to the host.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(real_ip) = header("x-real-ip") {
        return strip_port(real_ip);
    }
    if let Some(first) = header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return strip_port(first);
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

fn strip_port(addr: &str) -> String {
    addr.parse::<SocketAddr>()
        .map(|a| a.ip().to_string())
        .unwrap_or_else(|_| addr.to_string())
}
