//! HTTP Basic authentication for the admin routes.
//!
//! Credentials come from [`AdminConfig`](crate::config::AdminConfig) and are
//! compared in constant time. Any failure answers 401 with a `Basic`
//! challenge; the response never says which half was wrong.

use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::Engine;
use constant_time_eq::constant_time_eq;

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminUser {
    /// Username that authenticated
    pub username: String,
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
fn basic_credentials(parts: &Parts) -> Option<(String, String)> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = &state.config.admin;

        let Some((username, password)) = basic_credentials(parts) else {
            return Err(AppError::unauthorized());
        };

        // Evaluate both halves so timing does not reveal which one matched.
        let user_ok = constant_time_eq(username.as_bytes(), expected.username.as_bytes());
        let pass_ok = constant_time_eq(password.as_bytes(), expected.password.as_bytes());

        if user_ok & pass_ok {
            Ok(Self { username })
        } else {
            let ClientIp(ip) = ClientIp::from_request_parts(parts, state)
                .await
                .unwrap_or_else(|never| match never {});
            metrics::counter!("admin_auth_failures_total").increment(1);
            tracing::warn!(client_ip = %ip, "Admin authentication failed");
            Err(AppError::unauthorized())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn encode(credentials: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    #[test]
    fn test_basic_credentials_decoded() {
        let parts = parts(Some(&encode("admin:s3cr:et")));
        assert_eq!(
            basic_credentials(&parts),
            Some(("admin".to_string(), "s3cr:et".to_string()))
        );
    }

    #[test]
    fn test_malformed_credentials_rejected() {
        assert_eq!(basic_credentials(&parts(None)), None);
        assert_eq!(basic_credentials(&parts(Some("Bearer abc"))), None);
        assert_eq!(basic_credentials(&parts(Some("Basic !!!"))), None);
        assert_eq!(basic_credentials(&parts(Some(&encode("no-colon")))), None);
    }
}
