use crate::engine::Engine;
use crate::service::request_service::RequestService;
use hyper::service::Service;
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

/// A [`Service`](https://docs.rs/hyper/1/hyper/service/trait.Service.html) handing out one
/// [`RequestService`] per accepted connection.
///
/// [`Engine::serve`](./struct.Engine.html#method.serve) uses it internally; build one yourself to drive the
/// engine from your own accept loop.
///
/// # Examples
///
/// ```no_run
/// use grove::{Engine, EngineService, RouteGroup};
/// use http::StatusCode;
/// use hyper::service::Service;
/// use hyper_util::rt::{TokioExecutor, TokioIo};
/// use hyper_util::server::conn::auto::Builder;
/// use std::sync::Arc;
/// use tokio::net::TcpListener;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let engine = Engine::with_defaults()
///         .group(RouteGroup::builder("/").get("/", |ctx| {
///             Box::pin(async move { ctx.text(StatusCode::OK, "Home page") })
///         }))
///         .build()?;
///     let service = Arc::new(EngineService::new(engine));
///
///     let listener = TcpListener::bind("127.0.0.1:3001").await?;
///     loop {
///         let (stream, _) = listener.accept().await?;
///         let service = service.clone();
///
///         tokio::spawn(async move {
///             let request_service = service.call(&stream).await.unwrap();
///             let io = TokioIo::new(stream);
///             let builder = Builder::new(TokioExecutor::new());
///             if let Err(err) = builder.serve_connection(io, request_service).await {
///                 eprintln!("Error serving connection: {:?}", err);
///             }
///         });
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EngineService {
    engine: Arc<Engine>,
}

impl EngineService {
    pub fn new(engine: Engine) -> EngineService {
        EngineService {
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Creates the service for one connection from `remote_addr`.
    pub fn request_service(&self, remote_addr: Option<SocketAddr>) -> RequestService {
        RequestService {
            engine: self.engine.clone(),
            remote_addr,
        }
    }
}

impl Service<&TcpStream> for EngineService {
    type Response = RequestService;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, conn: &TcpStream) -> Self::Future {
        ready(Ok(self.request_service(conn.peer_addr().ok())))
    }
}
