use super::Middleware;
use std::time::Instant;
use tracing::info;

/// Creates a middleware which logs every handled request with its status and the time spent downstream.
pub fn logging() -> Middleware {
    Middleware::new(|ctx| {
        Box::pin(async move {
            let started = Instant::now();
            ctx.next().await;

            info!(
                method = %ctx.method(),
                path = %ctx.path(),
                status = ctx.status().as_u16(),
                remote_addr = ?ctx.remote_addr(),
                elapsed = ?started.elapsed(),
                "request handled"
            );
        })
    })
}
