//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation ID (header or fresh UUID)
//! - `ClientIp`: the caller's address, used as the booking rate limit identity

use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the ID the correlation middleware stored in the request
/// extensions, then the `X-Correlation-ID` header, then a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `CF-Connecting-IP`
/// 2. `X-Forwarded-For` (first IP in the list)
/// 3. `X-Real-IP`
/// 4. Connection IP (when the server was started with connect info)
/// 5. `127.0.0.1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = extract_client_ip(&parts.headers, parts.extensions.get());

        Ok(Self(ip))
    }
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Extract client IP from headers or connection info.
fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> IpAddr {
    header_ip(headers, "CF-Connecting-IP")
        .or_else(|| header_ip(headers, "X-Forwarded-For"))
        .or_else(|| header_ip(headers, "X-Real-IP"))
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_header_priority() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", HeaderValue::from_static("10.0.0.3"));
        assert_eq!(
            extract_client_ip(&headers, None),
            "10.0.0.3".parse::<IpAddr>().unwrap()
        );

        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(
            extract_client_ip(&headers, None),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );

        headers.insert("CF-Connecting-IP", HeaderValue::from_static("198.51.100.9"));
        assert_eq!(
            extract_client_ip(&headers, None),
            "198.51.100.9".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_client_ip_falls_back_to_connection_then_localhost() {
        let headers = HeaderMap::new();
        let peer = ConnectInfo("192.0.2.44:51234".parse::<SocketAddr>().unwrap());
        assert_eq!(
            extract_client_ip(&headers, Some(&peer)),
            "192.0.2.44".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            extract_client_ip(&headers, None),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn test_unparseable_header_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("not-an-ip"));
        headers.insert("X-Real-IP", HeaderValue::from_static("10.1.1.1"));
        assert_eq!(
            extract_client_ip(&headers, None),
            "10.1.1.1".parse::<IpAddr>().unwrap()
        );
    }
}
