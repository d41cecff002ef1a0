use super::Middleware;
use crate::context::Context;
use futures::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Creates a middleware which turns a panic anywhere downstream into a `500 Internal Server Error`.
///
/// Anything the panicking code had already rendered is discarded, so the client receives exactly one response.
/// Register it as the first global middleware so it wraps everything else;
/// [`Engine::with_defaults`](./struct.Engine.html#method.with_defaults) does that.
pub fn recovery() -> Middleware {
    Middleware::new(|ctx| {
        Box::pin(async move {
            if let Err(payload) = AssertUnwindSafe(ctx.next()).catch_unwind().await {
                respond_to_panic(ctx, payload);
            }
        })
    })
}

pub(crate) fn respond_to_panic(ctx: &mut Context, payload: Box<dyn Any + Send>) {
    error!(
        method = %ctx.method(),
        path = %ctx.path(),
        panic = panic_message(payload.as_ref()),
        "request handler panicked"
    );

    ctx.abort();
    ctx.reset_response();
    ctx.text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}
