use crate::middleware::Chain;
use crate::render::{Html, Json, Render, Text};
use crate::types::{DataMap, RouteParams};
use bytes::{Bytes, BytesMut};
use futures::future::{self, BoxFuture, FutureExt};
use http::header::{HeaderMap, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode, Uri};
use http_body_util::Full;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;

pub use self::pool::{ContextPool, PooledContext};

mod pool;

/// The per-request state threaded through the middleware chain and into the route handler.
///
/// A `Context` carries the request (with its body already collected), the route parameters, a string-keyed
/// store for passing values between middleware, the position in the middleware chain, and the response being
/// built. Contexts are pooled by the [`Engine`](./struct.Engine.html): one value serves many requests over its
/// life, one request at a time, and is wiped when it is handed to the next request.
///
/// # Examples
///
/// ```
/// use grove::RouteGroup;
/// use http::StatusCode;
///
/// let group = RouteGroup::builder("/api")
///     .get("/users/:id", |ctx| {
///         Box::pin(async move {
///             let id = ctx.param("id").unwrap_or_default().to_owned();
///             ctx.text(StatusCode::OK, format!("user {}", id));
///         })
///     })
///     .build()
///     .unwrap();
/// # drop(group);
/// ```
pub struct Context {
    request: Request<Bytes>,
    remote_addr: Option<SocketAddr>,
    params: RouteParams,
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
    data: Option<Arc<DataMap>>,
    chain: Option<Chain>,
    cursor: usize,
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    renders: usize,
}

impl Context {
    pub(crate) fn new() -> Context {
        Context {
            request: Request::default(),
            remote_addr: None,
            params: RouteParams::new(),
            values: HashMap::new(),
            data: None,
            chain: None,
            cursor: 0,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            renders: 0,
        }
    }

    /// Wipes everything a previous request left behind. Allocated capacity is kept.
    pub(crate) fn reset(&mut self) {
        self.vacate();
        self.remote_addr = None;
        self.cursor = 0;
        self.reset_response();
    }

    /// Drops the state which keeps memory or resources of a finished request alive: the request and its body,
    /// the user store, the application data and the chain.
    pub(crate) fn vacate(&mut self) {
        self.request = Request::default();
        self.params.clear();
        self.values.clear();
        self.data = None;
        self.chain = None;
        self.body.clear();
    }

    pub(crate) fn prepare(
        &mut self,
        request: Request<Bytes>,
        remote_addr: Option<SocketAddr>,
        params: RouteParams,
        chain: Chain,
        data: Arc<DataMap>,
    ) {
        self.request = request;
        self.remote_addr = remote_addr;
        self.params = params;
        self.chain = Some(chain);
        self.data = Some(data);
    }

    /// Runs the next step of the middleware chain: the next middleware, or the route handler.
    ///
    /// Once the chain is exhausted, or after [`abort`](#method.abort), this is a no-op.
    ///
    /// Each middleware should call `next` at most once. The cursor lives in the context, so a second call
    /// doesn't repeat the downstream steps: it runs whatever lies past the cursor at that moment, which may
    /// include a handler that an inner middleware deliberately skipped.
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        let step = self
            .chain
            .as_ref()
            .and_then(|chain| chain.get(self.cursor))
            .cloned();

        match step {
            Some(step) => {
                self.cursor += 1;
                (*step)(self)
            }
            None => future::ready(()).boxed(),
        }
    }

    /// Skips every step of the chain which hasn't started yet.
    pub fn abort(&mut self) {
        self.cursor = self.chain.as_ref().map_or(0, Chain::len);
    }

    /// Returns `true` if no further chain step will run.
    pub fn is_aborted(&self) -> bool {
        self.chain.as_ref().map_or(true, |chain| self.cursor >= chain.len())
    }

    /// The number of chain steps started so far for this request.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// The full request path, including the group prefix.
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// The collected request body.
    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the value of a route parameter, e.g. `id` for the pattern `/users/:id`.
    pub fn param<N: AsRef<str>>(&self, name: N) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Stores a value under `key` for the middleware and handler running later in this request.
    pub fn set<K: Into<String>, V: Any + Send + Sync>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key` if it has type `V`.
    pub fn get<V: Any + Send + Sync>(&self, key: &str) -> Option<&V> {
        self.values.get(key).and_then(|val| val.downcast_ref::<V>())
    }

    /// Removes the value stored under `key`, returning whether there was one.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Returns the application data of type `T` registered with
    /// [`EngineBuilder::data`](./struct.EngineBuilder.html#method.data).
    pub fn data<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|data| data.get::<T>())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The headers of the response being built.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Writes `payload` to the response with the given status code.
    ///
    /// Rendering is meant to happen once per request. A second call is not merged with the first: the status and
    /// the `Content-Type` header are overwritten and the new body is appended after the old one.
    /// Use [`reset_response`](#method.reset_response) first to replace a response instead.
    pub fn render<R: Render>(&mut self, status: StatusCode, payload: R) -> crate::Result<()> {
        payload.render(&mut self.body)?;
        self.status = status;
        self.headers.insert(CONTENT_TYPE, payload.content_type());
        self.renders += 1;
        Ok(())
    }

    /// Renders a `text/plain` response.
    pub fn text<S: AsRef<str>>(&mut self, status: StatusCode, body: S) {
        // Text rendering can't fail.
        let _ = self.render(status, Text(body));
    }

    /// Renders an HTML response from an already rendered document.
    pub fn html<S: AsRef<str>>(&mut self, status: StatusCode, body: S) {
        let _ = self.render(status, Html(body));
    }

    /// Renders `value` as a JSON response.
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) -> crate::Result<()> {
        self.render(status, Json(value))
    }

    /// How many times the response has been rendered.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Discards the response built so far.
    pub fn reset_response(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.renders = 0;
    }

    pub(crate) fn take_response(&mut self) -> Response<Full<Bytes>> {
        let mut res = Response::new(Full::new(self.body.split().freeze()));
        *res.status_mut() = self.status;
        *res.headers_mut() = mem::take(&mut self.headers);
        res
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("params", &self.params)
            .field("cursor", &self.cursor)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Middleware;
    use http_body_util::BodyExt;

    fn prepared(chain: Chain) -> Context {
        let mut ctx = Context::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/users/42?full=1")
            .body(Bytes::from_static(b"payload"))
            .unwrap();
        let mut params = RouteParams::new();
        params.set("id", "42");
        let mut data = DataMap::new();
        data.insert(7_u8);

        ctx.prepare(req, None, params, chain, Arc::new(data));
        ctx
    }

    fn noop_chain() -> Chain {
        Chain::compose(&[], &Middleware::new(|_| future::ready(()).boxed()).handler)
    }

    #[test]
    fn exposes_request_state() {
        let ctx = prepared(noop_chain());

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/api/users/42");
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(&ctx.body()[..], b"payload");
        assert_eq!(ctx.data::<u8>(), Some(&7));
    }

    #[test]
    fn stores_typed_values() {
        let mut ctx = Context::new();
        ctx.set("user", String::from("alice"));

        assert_eq!(ctx.get::<String>("user").map(String::as_str), Some("alice"));
        assert!(ctx.get::<u32>("user").is_none());
        assert!(ctx.remove("user"));
        assert!(!ctx.remove("user"));
    }

    #[tokio::test]
    async fn double_render_appends_body_and_overwrites_status() {
        let mut ctx = Context::new();
        ctx.text(StatusCode::OK, "first;");
        ctx.json(StatusCode::CREATED, &vec![1, 2]).unwrap();

        assert_eq!(ctx.render_count(), 2);

        let res = ctx.take_response();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json; charset=utf-8");

        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"first;[1,2]");
    }

    #[test]
    fn reset_wipes_everything() {
        let mut ctx = prepared(noop_chain());
        ctx.set("user", 1_u32);
        ctx.text(StatusCode::CREATED, "done");
        ctx.abort();

        ctx.reset();

        assert!(ctx.params().is_empty());
        assert!(ctx.get::<u32>("user").is_none());
        assert!(ctx.data::<u8>().is_none());
        assert_eq!(ctx.cursor(), 0);
        assert_eq!(ctx.status(), StatusCode::OK);
        assert_eq!(ctx.render_count(), 0);
        assert!(ctx.response_headers().is_empty());
        assert_eq!(ctx.path(), "/");
    }
}
