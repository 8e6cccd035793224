//! Client IP resolution behind Cloudflare and Fly.io proxies.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Proxy headers in trust order.
const PROXY_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Parse one header value; `X-Forwarded-For` chains use their first entry.
fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// The real client IP, checking the proxy headers in trust order.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    PROXY_HEADERS
        .iter()
        .find_map(|name| header_ip(headers, name))
}

/// The visitor IP recorded by analytics: `X-Forwarded-For` first, then the
/// other proxy headers.
#[must_use]
pub fn visitor_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_ip(headers, "x-forwarded-for").or_else(|| client_ip(headers))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let h = headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ("cf-connecting-ip", "198.51.100.7"),
        ]);
        assert_eq!(client_ip(&h), Some("198.51.100.7".parse().unwrap()));
        assert_eq!(visitor_ip(&h), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_fly_fallback() {
        let h = headers(&[("fly-client-ip", "2001:db8::1")]);
        assert_eq!(client_ip(&h), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(visitor_ip(&h), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_garbage_ignored() {
        let h = headers(&[("x-real-ip", "not-an-ip")]);
        assert_eq!(client_ip(&h), None);
    }
}
