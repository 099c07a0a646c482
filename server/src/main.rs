use anyhow::Result;
use axum::Router;
use clap::Parser;
use docsearch_core::{EngineConfig, SearchEngine};
use server::build_app;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Abandon a search after this many milliseconds
    #[arg(long, default_value_t = 30_000)]
    search_timeout_ms: u64,
    /// Maximum ranked results per search
    #[arg(long, default_value_t = 10_000)]
    max_results: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let config = EngineConfig::new(&args.index).with_max_results(args.max_results);
    let engine = Arc::new(SearchEngine::open(config)?);
    let app: Router = build_app(engine.clone(), Duration::from_millis(args.search_timeout_ms));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    engine.close()?;
    Ok(())
}
