//! Correlation ID middleware.
//!
//! Each request gets a correlation ID: the caller's `X-Correlation-ID` when
//! it is a valid UUID, otherwise a fresh v4. The ID is stored in the request
//! extensions (see [`CorrelationId`](crate::extractors::CorrelationId)),
//! attached to an `http_request` tracing span and echoed on the response.

use axum::{extract::Request, response::Response};
use http::HeaderValue;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|CorrelationId(id): CorrelationId| async move { id.to_string() }),
            )
            .layer(correlation_id_layer())
    }

    fn request(correlation: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/echo");
        if let Some(value) = correlation {
            builder = builder.header(CORRELATION_ID_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_generated_id_reaches_handler_and_response() {
        let response = app().oneshot(request(None)).await.unwrap();

        let header = response.headers()[CORRELATION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), header);
    }

    #[tokio::test]
    async fn test_caller_id_is_preserved() {
        let id = Uuid::new_v4().to_string();
        let response = app().oneshot(request(Some(&id))).await.unwrap();
        assert_eq!(response.headers()[CORRELATION_ID_HEADER], id.as_str());
    }

    #[tokio::test]
    async fn test_invalid_id_is_replaced() {
        let response = app().oneshot(request(Some("not-a-uuid"))).await.unwrap();
        let header = response.headers()[CORRELATION_ID_HEADER].to_str().unwrap();
        assert_ne!(header, "not-a-uuid");
        assert!(Uuid::parse_str(header).is_ok());
    }
}
