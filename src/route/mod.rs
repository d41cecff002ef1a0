use crate::middleware::{BoxedHandler, Chain, Middleware};
use crate::tree::RouteId;
use crate::Error;
use http::Method;
use std::fmt::{self, Debug, Formatter};

/// Represents a single route pattern of a [`RouteGroup`](./struct.RouteGroup.html) with its handlers.
///
/// A route owns one handler per HTTP method, plus optionally one handler for any method. It shouldn't be created
/// directly, use the [`RouteGroupBuilder`](./struct.RouteGroupBuilder.html) methods to register routes.
pub struct Route {
    id: RouteId,
    pattern: String,
    endpoints: Vec<Endpoint>,
}

/// A handler registered for one method (or any method) on a route, with its route-level middleware.
pub(crate) struct Endpoint {
    // `None` accepts any method.
    method: Option<Method>,
    middlewares: Vec<Middleware>,
    handler: BoxedHandler,
    pub(crate) chain: Chain,
}

impl Route {
    pub(crate) fn new(id: RouteId, pattern: String) -> Route {
        Route {
            id,
            pattern,
            endpoints: Vec::new(),
        }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    /// The pattern as it was first registered, e.g. `/users/:id`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if a handler for any method is registered on this route.
    pub fn accepts_any_method(&self) -> bool {
        self.endpoints.iter().any(|endpoint| endpoint.method.is_none())
    }

    /// The methods with a dedicated handler, in registration order.
    pub fn methods(&self) -> Vec<Method> {
        self.endpoints
            .iter()
            .filter_map(|endpoint| endpoint.method.clone())
            .collect()
    }

    pub(crate) fn add_endpoint(
        &mut self,
        method: Option<Method>,
        middlewares: Vec<Middleware>,
        handler: BoxedHandler,
    ) -> crate::Result<()> {
        if self.endpoints.iter().any(|endpoint| endpoint.method == method) {
            return Err(Error::DuplicateRoute {
                method: method.as_ref().map_or("ANY", Method::as_str).to_owned(),
                pattern: self.pattern.clone(),
            });
        }

        let chain = Chain::compose(&[&middlewares], &handler);
        self.endpoints.push(Endpoint {
            method,
            middlewares,
            handler,
            chain,
        });
        Ok(())
    }

    /// Picks the handler for `method`: an exact match first, then the any-method handler.
    pub(crate) fn endpoint(&self, method: &Method) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.method.as_ref() == Some(method))
            .or_else(|| self.endpoints.iter().find(|endpoint| endpoint.method.is_none()))
    }

    /// Rebuilds every endpoint chain with the given outer layers in front of the route-level middleware.
    pub(crate) fn compose(&mut self, outer: &[&[Middleware]]) {
        for endpoint in self.endpoints.iter_mut() {
            let mut layers = outer.to_vec();
            layers.push(&endpoint.middlewares);
            endpoint.chain = Chain::compose(&layers, &endpoint.handler);
        }
    }
}

impl Debug for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self
            .endpoints
            .iter()
            .map(|endpoint| endpoint.method.as_ref().map_or("ANY", Method::as_str))
            .collect();

        write!(
            f,
            "{{ id: {}, pattern: {:?}, methods: {:?} }}",
            self.id, self.pattern, methods
        )
    }
}
