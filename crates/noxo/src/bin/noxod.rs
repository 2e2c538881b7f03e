//! The Noxo server binary.
//!
//! Configuration comes from the environment:
//! - `NOXO_ADDR` — bind address (default `0.0.0.0:8080`)
//! - `RUST_LOG`  — tracing filter (default `info`)

use noxo::{AnonymousIdentity, NoxoServerBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("NOXO_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let server = NoxoServerBuilder::new()
        .bind(&addr)
        .build(AnonymousIdentity)
        .await?;

    tracing::info!(%addr, "noxo listening");
    server.run().await?;
    Ok(())
}
