//! `grove` is an embeddable HTTP dispatch engine for the Rust HTTP library [hyper](https://hyper.rs/).
//!
//! Core features:
//!
//! - Route groups mounted at literal prefixes, each with its own middleware
//! - Path-tree matching with literal, `:param` and `*wildcard` segments
//! - Explicit middleware chains driven by [`Context::next`] and [`Context::abort`]
//! - Pooled request contexts, returned to the pool even when a handler panics or a request is cancelled
//! - Panic recovery, request logging with [`tracing`](https://docs.rs/tracing), JSON/text/HTML rendering and
//!   [`garde`](https://docs.rs/garde) validation helpers
//!
//! ## Basic Example
//!
//! ```no_run
//! use grove::{Engine, Middleware, RouteGroup};
//! use http::StatusCode;
//! use std::ops::ControlFlow;
//!
//! struct State(u64);
//!
//! #[tokio::main]
//! async fn main() -> grove::Result<()> {
//!     let api = RouteGroup::builder("/api")
//!         .middleware(Middleware::pre(|ctx| {
//!             if ctx.headers().contains_key("x-api-key") {
//!                 ControlFlow::Continue(())
//!             } else {
//!                 ctx.text(StatusCode::UNAUTHORIZED, "missing api key");
//!                 ControlFlow::Break(())
//!             }
//!         }))
//!         .get("/users/:id", |ctx| {
//!             Box::pin(async move {
//!                 let id = ctx.param("id").unwrap_or_default().to_owned();
//!                 let visits = ctx.data::<State>().map_or(0, |state| state.0);
//!                 ctx.text(StatusCode::OK, format!("user {} ({} visits)", id, visits));
//!             })
//!         });
//!
//!     let engine = Engine::with_defaults()
//!         .data(State(100))
//!         .group(api)
//!         .build()?;
//!
//!     engine.run("127.0.0.1:3001").await
//! }
//! ```
//!
//! ## Routing
//!
//! Routes live in [`RouteGroup`]s. A request is handed to the first group, in registration order, whose prefix
//! matches whole leading segments of its path; the rest of the path is then matched against the group's
//! [`PathTree`]. If the group has no route for it the response is `404 Not Found`, later groups are not tried.
//!
//! Pattern segments are matched with a fixed precedence, whatever the registration order:
//!
//! 1. literal segments, e.g. `/users/new`
//! 2. parameter segments, e.g. `/users/:id`
//! 3. a trailing wildcard, e.g. `/files/*path`, which may also match nothing
//!
//! If a higher-precedence branch fails further down the path, the lookup falls back to the next branch.
//!
//! A path that matches a route without a handler for the request method is answered with
//! `405 Method Not Allowed` and an `Allow` header. A handler registered with
//! [`any`](./struct.RouteGroupBuilder.html#method.any) serves every method without a dedicated handler.
//!
//! ```
//! use grove::{Resolution, RouteGroup};
//! use http::{Method, StatusCode};
//!
//! let group = RouteGroup::builder("/static")
//!     .get("/*path", |ctx| {
//!         Box::pin(async move {
//!             let path = ctx.param("path").unwrap_or_default().to_owned();
//!             ctx.text(StatusCode::OK, path);
//!         })
//!     })
//!     .build()
//!     .unwrap();
//!
//! match group.resolve("/css/site.css", &Method::GET) {
//!     Resolution::Matched(m) => assert_eq!(m.params().get("path"), Some("css/site.css")),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Middleware
//!
//! Middleware run in this order: the engine's global middleware, then the group middleware, then the route
//! middleware, then the handler. A middleware runs the rest of the chain by awaiting [`Context::next`]; code
//! after that point runs once everything downstream is done. Returning without calling `next`, or calling
//! [`Context::abort`], skips the rest.
//!
//! ```
//! use grove::{Middleware, RouteGroup};
//! use std::time::Instant;
//!
//! let timing = Middleware::new(|ctx| {
//!     Box::pin(async move {
//!         let started = Instant::now();
//!         ctx.next().await;
//!         println!("{} took {:?}", ctx.path(), started.elapsed());
//!     })
//! });
//!
//! let group = RouteGroup::builder("/").middleware(timing).build().unwrap();
//! # drop(group);
//! ```
//!
//! [`Middleware::pre`] and [`Middleware::post`] cover the common cases of running code only before or only after
//! the downstream chain.
//!
//! ### The built-in Middleware
//!
//! - [`recovery`] turns a panic into a `500 Internal Server Error`.
//! - [`logging`] logs every handled request at `INFO` level.
//!
//! [`Engine::with_defaults`] installs both.
//!
//! ## Errors
//!
//! Registration mistakes, like a duplicate route or a wildcard which isn't the last segment, are reported by
//! [`EngineBuilder::build`] as an [`Error`]. Handlers don't return errors: they write the response they want
//! into the [`Context`].

pub use self::config::EngineConfig;
pub use self::context::{Context, ContextPool, PooledContext};
pub use self::engine::{Engine, EngineBuilder};
pub use self::error::Error;
pub use self::group::{Matched, Resolution, RouteGroup, RouteGroupBuilder};
pub use self::middleware::{logging, recovery, Middleware};
pub use self::render::{Html, Json, Render, Text};
pub use self::route::Route;
pub use self::service::{EngineService, RequestService};
pub use self::tree::{PathMatch, PathTree, RouteId};
pub use self::types::{DataMap, RouteParams};

pub mod binding;
mod config;
mod context;
mod engine;
mod error;
mod group;
mod helpers;
mod middleware;
mod render;
mod route;
mod service;
mod tree;
mod types;

/// A Result type often returned from methods that can have `grove` errors.
pub type Result<T> = std::result::Result<T, Error>;
