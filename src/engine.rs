use crate::config::EngineConfig;
use crate::context::ContextPool;
use crate::group::{Resolution, RouteGroup, RouteGroupBuilder};
use crate::middleware::{self, recovery::respond_to_panic, Middleware};
use crate::service::EngineService;
use crate::types::DataMap;
use bytes::Bytes;
use futures::future::{self, FutureExt};
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, info, warn};

/// The dispatch engine: an ordered list of route groups, the global middleware and a pool of request contexts.
///
/// An engine is built once with an [`EngineBuilder`] and is immutable afterwards, so it can be shared across
/// any number of concurrent requests.
///
/// # Examples
///
/// ```no_run
/// use grove::{Engine, RouteGroup};
/// use http::StatusCode;
///
/// #[tokio::main]
/// async fn main() -> grove::Result<()> {
///     let engine = Engine::with_defaults()
///         .group(RouteGroup::builder("/api").get("/users/:id", |ctx| {
///             Box::pin(async move {
///                 let body = format!("user {}", ctx.param("id").unwrap_or_default());
///                 ctx.text(StatusCode::OK, body);
///             })
///         }))
///         .build()?;
///
///     engine.run("127.0.0.1:3000").await
/// }
/// ```
pub struct Engine {
    groups: Vec<RouteGroup>,
    pool: ContextPool,
    data: Arc<DataMap>,
    config: EngineConfig,
}

impl Engine {
    /// Returns a new [`EngineBuilder`] with no middleware.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Returns a builder with [`recovery`](./fn.recovery.html) and [`logging`](./fn.logging.html) installed as
    /// global middleware, in that order.
    pub fn with_defaults() -> EngineBuilder {
        EngineBuilder::new()
            .middleware(middleware::recovery())
            .middleware(middleware::logging())
    }

    /// The groups in registration order.
    pub fn groups(&self) -> &[RouteGroup] {
        &self.groups
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Picks the first group, in registration order, whose prefix matches `path` on a segment boundary, and
    /// returns it with the rest of the path.
    ///
    /// Selection is final: if the selected group has no route for the rest of the path the request is not offered
    /// to later groups.
    pub fn select_group<'p>(&self, path: &'p str) -> Option<(&RouteGroup, &'p str)> {
        self.groups
            .iter()
            .find_map(|group| group.strip_prefix(path).map(|rest| (group, rest)))
    }

    /// Runs one request through the engine and returns the response.
    ///
    /// Unknown paths get `404 Not Found` and known paths with an unregistered method get
    /// `405 Method Not Allowed` with an `Allow` header. Neither passes through any middleware. A panic which
    /// escapes the chain is turned into a `500 Internal Server Error` even without the
    /// [`recovery`](./fn.recovery.html) middleware.
    pub async fn dispatch(&self, req: Request<Bytes>, remote_addr: Option<SocketAddr>) -> Response<Full<Bytes>> {
        let path = req.uri().path().to_owned();
        let method = req.method().clone();

        let resolution = match self.select_group(&path) {
            Some((group, rest)) => group.resolve(rest, &method),
            None => Resolution::NotFound,
        };

        let matched = match resolution {
            Resolution::Matched(matched) => matched,
            Resolution::MethodNotAllowed(allowed) => {
                debug!(%method, %path, ?allowed, "method not allowed");
                return method_not_allowed(&path, &method, &allowed);
            }
            Resolution::NotFound => {
                debug!(%method, %path, "no route found");
                return text_response(StatusCode::NOT_FOUND, format!("{} not found", path));
            }
        };

        let (params, chain) = matched.into_parts();
        let mut ctx = self.pool.acquire();
        ctx.prepare(req, remote_addr, params, chain, self.data.clone());

        if let Err(payload) = AssertUnwindSafe(ctx.next()).catch_unwind().await {
            respond_to_panic(&mut ctx, payload);
        }

        ctx.take_response()
    }

    /// Binds `addr` and serves connections until the process is stopped.
    pub async fn run<A: ToSocketAddrs>(self, addr: A) -> crate::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves connections accepted from `listener` until the process is stopped.
    pub async fn serve(self, listener: TcpListener) -> crate::Result<()> {
        self.serve_with_shutdown(listener, future::pending()).await
    }

    /// Serves connections accepted from `listener` until `signal` completes.
    ///
    /// Connections already accepted keep running after the signal; only the accept loop stops.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> crate::Result<()>
    where
        F: Future<Output = ()>,
    {
        let service = Arc::new(EngineService::new(self));
        info!(addr = ?listener.local_addr().ok(), "engine listening");

        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            warn!(error = %err, "failed to accept connection");
                            continue;
                        }
                    };

                    let service = service.clone();
                    tokio::spawn(async move {
                        let request_service = service.request_service(Some(remote_addr));
                        let io = TokioIo::new(stream);
                        let builder = Builder::new(TokioExecutor::new());

                        if let Err(err) = builder.serve_connection(io, request_service).await {
                            debug!(%remote_addr, error = %err, "connection closed with error");
                        }
                    });
                }
            }
        }
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("groups", &self.groups)
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish()
    }
}

pub(crate) fn text_response<B: Into<Bytes>>(status: StatusCode, body: B) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(body.into()));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    res
}

fn method_not_allowed(path: &str, method: &Method, allowed: &[Method]) -> Response<Full<Bytes>> {
    let mut res = text_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("{} {} not allowed", path, method),
    );

    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        res.headers_mut().insert(ALLOW, value);
    }
    res
}

struct BuilderInner {
    groups: Vec<RouteGroup>,
    middlewares: Vec<Middleware>,
    data: DataMap,
    config: EngineConfig,
}

/// Builder for an [`Engine`].
///
/// Like [`RouteGroupBuilder`](./struct.RouteGroupBuilder.html), the first error is kept and reported by
/// [`build`](#method.build).
pub struct EngineBuilder {
    inner: crate::Result<BuilderInner>,
}

impl EngineBuilder {
    fn new() -> EngineBuilder {
        EngineBuilder {
            inner: Ok(BuilderInner {
                groups: Vec::new(),
                middlewares: Vec::new(),
                data: DataMap::new(),
                config: EngineConfig::default(),
            }),
        }
    }

    /// Appends a global middleware. Global middleware wrap every route of every group, outside the group
    /// middleware, in the order they were added.
    pub fn middleware(self, m: Middleware) -> Self {
        self.and_then(move |mut inner| {
            inner.middlewares.push(m);
            Ok(inner)
        })
    }

    /// Adds a route group. Groups are matched in the order they are added.
    pub fn group(self, group: RouteGroupBuilder) -> Self {
        self.and_then(move |mut inner| {
            inner.groups.push(group.into_group()?);
            Ok(inner)
        })
    }

    /// Shares a value with every handler through [`Context::data`](./struct.Context.html#method.data).
    /// A second value of the same type replaces the first.
    pub fn data<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.and_then(move |mut inner| {
            inner.data.insert(value);
            Ok(inner)
        })
    }

    pub fn config(self, config: EngineConfig) -> Self {
        self.and_then(move |mut inner| {
            inner.config = config;
            Ok(inner)
        })
    }

    /// Composes every middleware chain and creates the context pool.
    pub fn build(self) -> crate::Result<Engine> {
        let BuilderInner {
            mut groups,
            middlewares,
            data,
            config,
        } = self.inner?;

        for group in groups.iter_mut() {
            group.freeze(&middlewares);
        }

        debug!(
            groups = groups.len(),
            global_middlewares = middlewares.len(),
            pool_capacity = config.pool_capacity,
            "engine built"
        );

        Ok(Engine {
            groups,
            pool: ContextPool::new(config.pool_capacity),
            data: Arc::new(data),
            config,
        })
    }

    fn and_then<F>(self, func: F) -> Self
    where
        F: FnOnce(BuilderInner) -> crate::Result<BuilderInner>,
    {
        EngineBuilder {
            inner: self.inner.and_then(func),
        }
    }
}

impl Debug for EngineBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Ok(inner) => write!(
                f,
                "EngineBuilder {{ groups: {:?}, middlewares: {} }}",
                inner.groups,
                inner.middlewares.len()
            ),
            Err(err) => write!(f, "EngineBuilder {{ error: {} }}", err),
        }
    }
}
