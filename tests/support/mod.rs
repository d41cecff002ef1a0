use grove::Engine;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot::{self, Sender};
use tokio::task::JoinHandle;

pub struct Serve {
    addr: SocketAddr,
    tx: Sender<()>,
    handle: JoinHandle<grove::Result<()>>,
}

impl Serve {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn new_request(&self, method: &str, route: &str) -> http::request::Builder {
        http::request::Request::builder()
            .method(method.to_ascii_uppercase().as_str())
            .uri(format!("http://{}{}", self.addr(), route))
    }

    /// Stops the accept loop and waits for it to finish.
    pub async fn shutdown(self) -> grove::Result<()> {
        self.tx.send(()).unwrap();
        self.handle.await.unwrap()
    }
}

pub async fn serve(engine: Engine) -> Serve {
    // Bind a TCP listener to an available port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(engine.serve_with_shutdown(listener, async move {
        let _ = rx.await;
    }));

    Serve { addr, tx, handle }
}

pub fn client() -> Client<HttpConnector, Full<Bytes>> {
    Client::builder(TokioExecutor::new()).build_http()
}

pub async fn into_text<B>(body: B) -> String
where
    B: hyper::body::Body<Data = Bytes> + Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    String::from_utf8_lossy(&body.collect().await.unwrap().to_bytes()).to_string()
}
