//! digitduel server.
//!
//! Listens on `DIGITDUEL_ADDR` if set (a full `host:port`), otherwise on
//! `0.0.0.0:$PORT`, with `PORT` defaulting to 3000. Log verbosity follows
//! `RUST_LOG` and defaults to `info`.

use digitduel::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3000;

fn bind_addr() -> String {
    if let Ok(addr) = std::env::var("DIGITDUEL_ADDR") {
        return addr;
    }
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    format!("0.0.0.0:{port}")
}

#[tokio::main]
async fn main() -> Result<(), DuelError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = bind_addr();
    tracing::info!(%addr, "starting digitduel server");

    let server = DuelServerBuilder::new().bind(&addr).build().await?;
    server.run().await
}
