//! Tower middleware for JSON-RPC HTTP responses
//!
//! Every response leaving the RPC router is JSON and must not be
//! content-sniffed by browsers, including the 405 answer to a non-`POST` and
//! rejections produced by axum itself.

use axum::http::{HeaderMap, HeaderValue, Request, Response, header};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Content type of every RPC response
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Set the JSON content type and `X-Content-Type-Options: nosniff`
pub fn apply_json_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
}

/// Tower layer adding the JSON response headers
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHeadersLayer;

impl JsonHeadersLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for JsonHeadersLayer {
    type Service = JsonHeaders<S>;

    fn layer(&self, service: S) -> Self::Service {
        JsonHeaders { inner: service }
    }
}

/// Service produced by [`JsonHeadersLayer`]
#[derive(Debug, Clone)]
pub struct JsonHeaders<S> {
    inner: S,
}

impl<S> JsonHeaders<S> {
    pub fn new(service: S) -> Self {
        Self { inner: service }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for JsonHeaders<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let future = self.inner.call(req);
        Box::pin(async move {
            let mut response = future.await?;
            apply_json_headers(response.headers_mut());
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::convert::Infallible;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    #[tokio::test]
    async fn test_headers_added() {
        let service = ServiceBuilder::new()
            .layer(JsonHeadersLayer::new())
            .service(service_fn(|_req: Request<Body>| async {
                Ok::<_, Infallible>(Response::new(Body::empty()))
            }));

        let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[tokio::test]
    async fn test_headers_replace_existing_content_type() {
        let service = JsonHeaders::new(service_fn(|_req: Request<Body>| async {
            let mut response = Response::new(Body::empty());
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            Ok::<_, Infallible>(response)
        }));

        let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
        let values: Vec<_> = response.headers().get_all(header::CONTENT_TYPE).iter().collect();
        assert_eq!(values, vec![JSON_CONTENT_TYPE]);
    }
}
