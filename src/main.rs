use clap::Parser;
use garde::Validate;
use grove::binding;
use grove::{Engine, EngineConfig, Middleware, RouteGroup, RouteGroupBuilder};
use http::header::HeaderValue;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grove-demo")]
#[command(about = "A small service showing route groups, middleware and validation", long_about = None)]
struct Cli {
    /// Path to a TOML file with the engine settings.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

// Shared with the handlers through `Context::data`.
struct Visits(AtomicU64);

#[derive(Serialize)]
struct User {
    id: String,
    visits: u64,
}

#[derive(Deserialize, Validate)]
struct NewUser {
    #[garde(length(min = 1, max = 64))]
    name: String,
    #[garde(email)]
    email: String,
}

fn api() -> RouteGroupBuilder {
    RouteGroup::builder("/api")
        .middleware(Middleware::post(|ctx| {
            ctx.response_headers_mut()
                .insert("x-served-by", HeaderValue::from_static("grove-demo"));
        }))
        .get("/users/:id", |ctx| {
            Box::pin(async move {
                let visits = ctx
                    .data::<Visits>()
                    .map_or(0, |visits| visits.0.fetch_add(1, Ordering::Relaxed) + 1);
                let user = User {
                    id: ctx.param("id").unwrap_or_default().to_owned(),
                    visits,
                };

                if let Err(err) = ctx.json(StatusCode::OK, &user) {
                    tracing::error!(error = %err, "failed to render user");
                    ctx.text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
                }
            })
        })
        .post("/users", |ctx| {
            Box::pin(async move {
                let users: Vec<NewUser> = match serde_json::from_slice(ctx.body()) {
                    Ok(users) => users,
                    Err(err) => {
                        ctx.text(StatusCode::BAD_REQUEST, err.to_string());
                        return;
                    }
                };

                match binding::validate_slice(&users) {
                    Ok(()) => ctx.text(StatusCode::CREATED, format!("created {} users", users.len())),
                    Err(err) => ctx.text(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
                }
            })
        })
}

fn site() -> RouteGroupBuilder {
    RouteGroup::builder("/")
        .get("/", |ctx| Box::pin(async move { ctx.html(StatusCode::OK, "<h1>grove demo</h1>") }))
        .get("/static/*path", |ctx| {
            Box::pin(async move {
                let body = format!("would serve {}", ctx.param("path").unwrap_or_default());
                ctx.text(StatusCode::OK, body);
            })
        })
        .get("/panic", |_| Box::pin(async move { panic!("demo panic") }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove=debug,grove_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    tracing::info!(
        addr = %config.addr,
        pool_capacity = config.pool_capacity,
        max_body_bytes = config.max_body_bytes,
        "configuration loaded"
    );

    let addr = config.addr;
    let engine = Engine::with_defaults()
        .config(config)
        .data(Visits(AtomicU64::new(0)))
        .group(api())
        .group(site())
        .build()?;

    engine.run(addr).await?;
    Ok(())
}
