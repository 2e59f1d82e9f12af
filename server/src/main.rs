use anyhow::Result;
use clap::Parser;
use revscope_server::{build_app, spawn_indexer, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Snapshot input (.json, .jsonl, or a directory of them)
    #[arg(long, default_value = "./snapshots")]
    snapshots: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Snapshots indexed per background tick
    #[arg(long, default_value_t = 8)]
    batch_size: usize,
    /// Milliseconds between indexing ticks
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Diffs kept in memory
    #[arg(long, default_value_t = 256)]
    cache_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        batch_size: args.batch_size,
        tick: Duration::from_millis(args.tick_ms.max(1)),
        cache_size: args.cache_size,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let (app, state) = build_app(&args.snapshots, &config)?;
    spawn_indexer(state, config.batch_size, config.tick);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
