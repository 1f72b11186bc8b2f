//! Client IP extraction from HTTP headers with trust validation
//!
//! - Cloudflare mode trusts `CF-Connecting-IP` only
//! - Standard mode prefers RFC 7239 `Forwarded`, then `X-Forwarded-For`
//! - Falls back to the socket remote address when headers are absent or untrusted

use axum::http::HeaderMap;
use std::net::IpAddr;
use tracing::debug;

use crate::analytics::bot::header_str;
use crate::config::TrustedProxyMode;

/// Extract the client IP address according to `mode`
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: IpAddr,
    mode: TrustedProxyMode,
) -> IpAddr {
    match mode {
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            debug!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => extract_from_forwarded(headers)
            .or_else(|| extract_from_x_forwarded_for(headers))
            .unwrap_or(socket_addr),
        TrustedProxyMode::None => socket_addr,
    }
}

fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "cf-connecting-ip").and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// First `for=` address of the `Forwarded` header
fn extract_from_forwarded(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = header_str(headers, "forwarded")?;

    forwarded
        .split(',')
        .flat_map(|element| element.split(';'))
        .filter_map(|param| {
            let param = param.trim();
            let (key, value) = param.split_once('=')?;
            key.eq_ignore_ascii_case("for").then_some(value)
        })
        .find_map(parse_forwarded_node)
}

/// Accepts `1.2.3.4`, `1.2.3.4:80`, `"[2001:db8::1]:443"`
fn parse_forwarded_node(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"');
    if let Some(rest) = value.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    value.rsplit_once(':')?.0.parse().ok()
}

/// Rightmost valid address of `X-Forwarded-For` (the one appended by our proxy)
fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-forwarded-for")?
        .split(',')
        .filter_map(|s| s.trim().parse::<IpAddr>().ok())
        .last()
}
