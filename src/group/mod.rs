use crate::context::Context;
use crate::helpers;
use crate::middleware::{BoxedHandler, Chain, Middleware};
use crate::route::Route;
use crate::tree::{PathTree, RouteId};
use crate::types::RouteParams;
use crate::Error;
use futures::future::BoxFuture;
use http::Method;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

/// A set of routes sharing a path prefix and a list of group middleware.
///
/// Each group owns a [`PathTree`](./struct.PathTree.html) over the paths below its prefix and a table from route
/// and method to handler. Groups are built with [`RouteGroup::builder`] and handed to an
/// [`EngineBuilder`](./struct.EngineBuilder.html); once the engine is built they are never mutated again.
pub struct RouteGroup {
    prefix: String,
    tree: PathTree,
    routes: Vec<Route>,
    middlewares: Vec<Middleware>,
}

/// The outcome of [`RouteGroup::resolve`].
pub enum Resolution<'g> {
    /// A route and a handler for the method were found.
    Matched(Matched<'g>),
    /// A route matches the path but has no handler for the method. Holds the methods it does accept.
    MethodNotAllowed(Vec<Method>),
    /// No route matches the path.
    NotFound,
}

/// A resolved route together with the parameters bound from the path.
pub struct Matched<'g> {
    route: &'g Route,
    params: RouteParams,
    chain: Chain,
}

impl<'g> Matched<'g> {
    pub fn route(&self) -> &'g Route {
        self.route
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// The number of steps (middleware plus the handler) that will run for this request.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub(crate) fn into_parts(self) -> (RouteParams, Chain) {
        (self.params, self.chain)
    }
}

impl RouteGroup {
    /// Starts building a group mounted at `prefix`. `""` and `"/"` mount the group at the root.
    pub fn builder<P: Into<String>>(prefix: P) -> RouteGroupBuilder {
        RouteGroupBuilder::new(prefix.into())
    }

    /// The normalized prefix: `""` for the root, otherwise `/seg[/seg...]` without a trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the part of `path` below this group's prefix, or `None` if the prefix doesn't match.
    ///
    /// The prefix is compared with the percent-decoded segments of `path`, so `/a%70i/users` is below `/api`,
    /// and empty segments are skipped. The returned remainder is the raw, still encoded, rest of `path`.
    pub fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        helpers::strip_group_prefix(path, &self.prefix)
    }

    /// Resolves a path (relative to the group prefix) and a method to a handler.
    ///
    /// A path matching a route without a handler for `method` yields [`Resolution::MethodNotAllowed`], never
    /// [`Resolution::NotFound`]. A handler registered for any method is only used when there is no handler for
    /// the exact method.
    pub fn resolve(&self, path: &str, method: &Method) -> Resolution<'_> {
        let found = match self.tree.get(path) {
            Some(found) => found,
            None => return Resolution::NotFound,
        };
        let route = &self.routes[found.route.index()];

        match route.endpoint(method) {
            Some(endpoint) => Resolution::Matched(Matched {
                route,
                params: found.params,
                chain: endpoint.chain.clone(),
            }),
            None => Resolution::MethodNotAllowed(route.methods()),
        }
    }

    /// Composes the final chains once the group middleware and the engine's global middleware are known.
    pub(crate) fn freeze(&mut self, globals: &[Middleware]) {
        let group_middlewares: &[Middleware] = &self.middlewares;
        for route in self.routes.iter_mut() {
            route.compose(&[globals, group_middlewares]);
        }
    }

    fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        middlewares: Vec<Middleware>,
        handler: BoxedHandler,
    ) -> crate::Result<()> {
        let candidate = RouteId(self.routes.len());
        let id = self.tree.insert(pattern, candidate)?;
        if id == candidate {
            self.routes.push(Route::new(id, pattern.to_owned()));
        }

        self.routes[id.index()].add_endpoint(method.clone(), middlewares, handler)?;

        debug!(
            prefix = %self.prefix,
            method = method.as_ref().map_or("ANY", Method::as_str),
            pattern,
            route = %id,
            "route registered"
        );
        Ok(())
    }
}

impl Debug for RouteGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ prefix: {:?}, routes: {:?}, middlewares: {} }}",
            self.prefix,
            self.routes,
            self.middlewares.len()
        )
    }
}

/// Builder for a [`RouteGroup`].
///
/// Registration errors don't surface until [`build`](#method.build) (or until the group is handed to
/// [`EngineBuilder::build`](./struct.EngineBuilder.html#method.build)); after the first error every further call is
/// ignored.
///
/// # Examples
///
/// ```
/// use grove::{Middleware, RouteGroup};
/// use http::{Method, StatusCode};
/// use std::ops::ControlFlow;
///
/// let group = RouteGroup::builder("/api")
///     .middleware(Middleware::pre(|ctx| {
///         ctx.set("request-start", std::time::Instant::now());
///         ControlFlow::Continue(())
///     }))
///     .get("/users/:id", |ctx| {
///         Box::pin(async move {
///             let body = format!("user {}", ctx.param("id").unwrap_or_default());
///             ctx.text(StatusCode::OK, body);
///         })
///     })
///     .handle(Method::DELETE, "/users/:id", |ctx| {
///         Box::pin(async move { ctx.set_status(StatusCode::NO_CONTENT) })
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(group.routes().len(), 1);
/// ```
pub struct RouteGroupBuilder {
    inner: crate::Result<RouteGroup>,
}

impl RouteGroupBuilder {
    fn new(prefix: String) -> RouteGroupBuilder {
        let inner = if helpers::pattern_segments(&prefix).any(|seg| seg.starts_with(':') || seg.starts_with('*')) {
            Err(Error::InvalidPrefix(prefix))
        } else {
            Ok(RouteGroup {
                prefix: helpers::normalize_prefix(&prefix),
                tree: PathTree::new(),
                routes: Vec::new(),
                middlewares: Vec::new(),
            })
        };

        RouteGroupBuilder { inner }
    }

    /// Appends a group middleware. It wraps every route of the group, including routes registered before it.
    pub fn middleware(self, m: Middleware) -> Self {
        self.and_then(move |mut group| {
            group.middlewares.push(m);
            Ok(group)
        })
    }

    /// Registers `handler` for `method` on `pattern`.
    pub fn handle<P, H>(self, method: Method, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle_with(method, pattern, Vec::new(), handler)
    }

    /// Registers `handler` for `method` on `pattern`, wrapped by route-level `middlewares`.
    pub fn handle_with<P, H>(self, method: Method, pattern: P, middlewares: Vec<Middleware>, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.add(Some(method), pattern, middlewares, Arc::new(handler))
    }

    /// Registers `handler` for every method on `pattern` which has no dedicated handler.
    pub fn any<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.any_with(pattern, Vec::new(), handler)
    }

    /// Like [`any`](#method.any), wrapped by route-level `middlewares`.
    pub fn any_with<P, H>(self, pattern: P, middlewares: Vec<Middleware>, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.add(None, pattern, middlewares, Arc::new(handler))
    }

    /// Registers a `GET` handler.
    pub fn get<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::GET, pattern, handler)
    }

    /// Registers a `POST` handler.
    pub fn post<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::POST, pattern, handler)
    }

    /// Registers a `PUT` handler.
    pub fn put<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::PUT, pattern, handler)
    }

    /// Registers a `PATCH` handler.
    pub fn patch<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, pattern, handler)
    }

    /// Registers a `DELETE` handler.
    pub fn delete<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, pattern, handler)
    }

    /// Registers a `HEAD` handler.
    pub fn head<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::HEAD, pattern, handler)
    }

    /// Registers an `OPTIONS` handler.
    pub fn options<P, H>(self, pattern: P, handler: H) -> Self
    where
        P: AsRef<str>,
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.handle(Method::OPTIONS, pattern, handler)
    }

    /// Finishes a standalone group. Only group and route middleware apply; groups registered on an engine get
    /// the engine's global middleware as well.
    pub fn build(self) -> crate::Result<RouteGroup> {
        let mut group = self.inner?;
        group.freeze(&[]);
        Ok(group)
    }

    pub(crate) fn into_group(self) -> crate::Result<RouteGroup> {
        self.inner
    }

    fn add<P: AsRef<str>>(
        self,
        method: Option<Method>,
        pattern: P,
        middlewares: Vec<Middleware>,
        handler: BoxedHandler,
    ) -> Self {
        self.and_then(move |mut group| {
            group.register(method, pattern.as_ref(), middlewares, handler)?;
            Ok(group)
        })
    }

    fn and_then<F>(self, func: F) -> Self
    where
        F: FnOnce(RouteGroup) -> crate::Result<RouteGroup>,
    {
        RouteGroupBuilder {
            inner: self.inner.and_then(func),
        }
    }
}

impl Debug for RouteGroupBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Ok(group) => write!(f, "RouteGroupBuilder {:?}", group),
            Err(err) => write!(f, "RouteGroupBuilder {{ error: {} }}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{self, FutureExt};
    use http::StatusCode;

    fn noop(ctx: &mut Context) -> BoxFuture<'_, ()> {
        ctx.set_status(StatusCode::OK);
        future::ready(()).boxed()
    }

    fn matched<'g>(resolution: Resolution<'g>) -> Matched<'g> {
        match resolution {
            Resolution::Matched(m) => m,
            Resolution::MethodNotAllowed(allowed) => panic!("method not allowed, allowed: {:?}", allowed),
            Resolution::NotFound => panic!("not found"),
        }
    }

    #[test]
    fn resolves_params_and_method_outcomes() {
        let group = RouteGroup::builder("/api")
            .get("/users/:id", noop)
            .post("/users", noop)
            .build()
            .unwrap();

        let found = matched(group.resolve("/users/42", &Method::GET));
        assert_eq!(found.route().pattern(), "/users/:id");
        assert_eq!(found.params().get("id"), Some("42"));

        match group.resolve("/users/42", &Method::DELETE) {
            Resolution::MethodNotAllowed(allowed) => assert_eq!(allowed, vec![Method::GET]),
            _ => panic!("expected method not allowed"),
        }
        assert!(matches!(group.resolve("/unknown/42", &Method::GET), Resolution::NotFound));
    }

    #[test]
    fn any_method_fills_gaps_only() {
        let group = RouteGroup::builder("/")
            .get("/items", noop)
            .any_with("/items", vec![Middleware::new(|ctx| ctx.next())], noop)
            .build()
            .unwrap();

        assert_eq!(matched(group.resolve("/items", &Method::GET)).chain_len(), 1);
        assert_eq!(matched(group.resolve("/items", &Method::PUT)).chain_len(), 2);
    }

    #[test]
    fn second_method_reuses_route() {
        let group = RouteGroup::builder("")
            .get("/users/:id", noop)
            .delete("/users/:id/", noop)
            .build()
            .unwrap();

        assert_eq!(group.routes().len(), 1);
        assert_eq!(group.routes()[0].methods(), vec![Method::GET, Method::DELETE]);
    }

    #[test]
    fn duplicate_registration_fails_build() {
        let err = RouteGroup::builder("/api")
            .get("/users", noop)
            .get("/users", noop)
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateRoute { .. }));
    }

    #[test]
    fn first_error_wins() {
        let err = RouteGroup::builder("/api")
            .get("/files/*/raw", noop)
            .get("/users/:", noop)
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::WildcardNotLast(_)));
    }

    #[test]
    fn group_middleware_wraps_earlier_routes() {
        let group = RouteGroup::builder("/api")
            .get("/ping", noop)
            .middleware(Middleware::new(|ctx| ctx.next()))
            .build()
            .unwrap();

        assert_eq!(matched(group.resolve("/ping", &Method::GET)).chain_len(), 2);
    }

    #[test]
    fn rejects_dynamic_prefix() {
        assert!(matches!(
            RouteGroup::builder("/users/:id").build(),
            Err(Error::InvalidPrefix(_))
        ));
    }

    #[test]
    fn prefix_is_normalized_and_stripped() {
        let group = RouteGroup::builder("api/v1/").build().unwrap();

        assert_eq!(group.prefix(), "/api/v1");
        assert_eq!(group.strip_prefix("/api/v1/users"), Some("/users"));
        assert_eq!(group.strip_prefix("/api/v2/users"), None);
    }
}
