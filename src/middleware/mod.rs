use crate::context::Context;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt::{self, Debug, Formatter};
use std::iter;
use std::ops::ControlFlow;
use std::sync::Arc;

pub use self::logger::logging;
pub use self::recovery::recovery;

mod logger;
pub(crate) mod recovery;

/// The shape shared by route handlers and middleware: borrow the request context, return a boxed future.
pub(crate) type BoxedHandler = Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static>;

/// A middleware wraps everything registered after it, down to the route handler.
///
/// Middleware run in this order: the engine's global middleware, then the group's middleware, then the
/// middleware attached to the route, each list in registration order. The route handler runs last.
///
/// A middleware built with [`Middleware::new`] decides itself whether the rest of the chain runs by awaiting
/// [`Context::next`](./struct.Context.html#method.next). Code placed after that await runs once everything
/// downstream has finished, which is how timing, response rewriting and panic recovery are done.
/// A middleware that never calls `next` short-circuits the request.
///
/// # Examples
///
/// ```
/// use grove::{Middleware, RouteGroup};
/// use http::StatusCode;
///
/// let auth = Middleware::new(|ctx| {
///     Box::pin(async move {
///         if ctx.headers().contains_key("authorization") {
///             ctx.next().await;
///         } else {
///             ctx.text(StatusCode::UNAUTHORIZED, "missing credentials");
///         }
///     })
/// });
///
/// let group = RouteGroup::builder("/admin").middleware(auth);
/// # drop(group);
/// ```
#[derive(Clone)]
pub struct Middleware {
    pub(crate) handler: BoxedHandler,
}

impl Middleware {
    /// Creates a middleware with full control over the continuation.
    pub fn new<H>(handler: H) -> Middleware
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        Middleware {
            handler: Arc::new(handler),
        }
    }

    /// Creates a middleware which runs `handler` before the rest of the chain.
    ///
    /// Returning [`ControlFlow::Break`] stops the request here; whatever the handler rendered is the response.
    ///
    /// # Examples
    ///
    /// ```
    /// use grove::Middleware;
    /// use http::StatusCode;
    /// use std::ops::ControlFlow;
    ///
    /// let maintenance = Middleware::pre(|ctx| {
    ///     ctx.text(StatusCode::SERVICE_UNAVAILABLE, "down for maintenance");
    ///     ControlFlow::Break(())
    /// });
    /// # drop(maintenance);
    /// ```
    pub fn pre<H>(handler: H) -> Middleware
    where
        H: Fn(&mut Context) -> ControlFlow<()> + Send + Sync + 'static,
    {
        Middleware::new(move |ctx| match handler(ctx) {
            ControlFlow::Continue(()) => ctx.next(),
            ControlFlow::Break(()) => future::ready(()).boxed(),
        })
    }

    /// Creates a middleware which runs `handler` after the rest of the chain has produced a response.
    ///
    /// # Examples
    ///
    /// ```
    /// use grove::Middleware;
    /// use http::header::HeaderValue;
    ///
    /// let powered_by = Middleware::post(|ctx| {
    ///     ctx.response_headers_mut()
    ///         .insert("x-powered-by", HeaderValue::from_static("grove"));
    /// });
    /// # drop(powered_by);
    /// ```
    pub fn post<H>(handler: H) -> Middleware
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Middleware::new(move |ctx| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                ctx.next().await;
                (*handler)(ctx);
            })
        })
    }
}

impl Debug for Middleware {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware {{ handler: {:p} }}", Arc::as_ptr(&self.handler))
    }
}

/// The composed call sequence of one route and method: middleware from outermost to innermost, then the handler.
///
/// It is built once when the engine is frozen and shared by every request hitting the route.
#[derive(Clone)]
pub(crate) struct Chain(Arc<[BoxedHandler]>);

impl Chain {
    pub(crate) fn compose(layers: &[&[Middleware]], handler: &BoxedHandler) -> Chain {
        let steps: Vec<BoxedHandler> = layers
            .iter()
            .flat_map(|layer| layer.iter().map(|m| Arc::clone(&m.handler)))
            .chain(iter::once(Arc::clone(handler)))
            .collect();

        Chain(Arc::from(steps))
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&BoxedHandler> {
        self.0.get(idx)
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl Debug for Chain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Chain {{ len: {} }}", self.0.len())
    }
}
