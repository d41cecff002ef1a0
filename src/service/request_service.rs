use crate::engine::{text_response, Engine};
use crate::Error;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tracing::warn;

/// Serves the requests of one connection. Obtained from [`EngineService`](./struct.EngineService.html).
///
/// The request body is collected in full, up to
/// [`EngineConfig::max_body_bytes`](./struct.EngineConfig.html#structfield.max_body_bytes), before the request is
/// dispatched. Larger bodies are answered with `413 Payload Too Large` without running any middleware.
#[derive(Debug, Clone)]
pub struct RequestService {
    pub(crate) engine: Arc<Engine>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl<B> Service<Request<B>> for RequestService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Error;
    #[allow(clippy::type_complexity)]
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let engine = self.engine.clone();
        let remote_addr = self.remote_addr;

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let limit = engine.config().max_body_bytes;

            let body = match Limited::new(body, limit).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                    warn!(method = %parts.method, path = %parts.uri.path(), limit, "request body too large");
                    return Ok(text_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"));
                }
                Err(err) => return Err(Error::Body(err)),
            };

            Ok(engine.dispatch(Request::from_parts(parts, body), remote_addr).await)
        })
    }
}
