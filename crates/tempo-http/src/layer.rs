//! Tower layer wrapping a service with admission control.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tempo_gate::Throttle;
use tower::{Layer, Service};
use tracing::debug;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The fixed response for a rejected request.
pub fn overloaded_response() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
}

/// Applies a [`Throttle`] to every request of the wrapped service.
#[derive(Debug, Clone)]
pub struct ThrottleLayer {
    throttle: Throttle,
}

impl ThrottleLayer {
    pub fn new(throttle: Throttle) -> Self {
        Self { throttle }
    }
}

impl<S> Layer<S> for ThrottleLayer {
    type Service = ThrottleService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ThrottleService {
            inner,
            throttle: self.throttle.clone(),
        }
    }
}

/// Service produced by [`ThrottleLayer`].
///
/// Admitted requests are forwarded and their response returned unchanged.
/// Rejected requests never reach the inner service.
///
/// The recorded duration and the held slot end when the inner service
/// yields its response head. Streaming the body afterwards is neither
/// measured nor counted against capacity.
#[derive(Debug, Clone)]
pub struct ThrottleService<S> {
    inner: S,
    throttle: Throttle,
}

impl<S, B> Service<Request<B>> for ThrottleService<S>
where
    S: Service<Request<B>, Response = Response> + 'static,
    S::Future: Send + 'static,
    B: 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let admission = match self.throttle.try_admit() {
            Ok(admission) => admission,
            Err(_) => {
                debug!(uri = %req.uri(), "rejecting request: overloaded");
                return Box::pin(async { Ok::<_, S::Error>(overloaded_response()) });
            }
        };

        let future = self.inner.call(req);
        Box::pin(async move {
            let result = future.await;
            admission.complete();
            result
        })
    }
}
