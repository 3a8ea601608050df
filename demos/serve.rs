//! Serves a directory over HTTP.
//!
//! ```text
//! cargo run --example serve -- [ROOT] [ADDR]
//! ```
//!
//! `ROOT` defaults to the current directory and `ADDR` to `127.0.0.1:5000`.
//! A `serve.json` in `ROOT` is loaded when present. Set `RUST_LOG=rserve=debug`
//! to see every resolution decision.

use std::path::PathBuf;

use rserve::{Config, Handler, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rserve=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let root = args.next().map_or_else(|| PathBuf::from("."), PathBuf::from);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:5000".to_owned());

    let config_path = root.join("serve.json");
    let config = if config_path.is_file() {
        tracing::info!(path = %config_path.display(), "loading configuration");
        Config::from_path(&config_path)?
    } else {
        Config::default()
    };

    let server = Server::bind(&addr).await?;
    tracing::info!(address = %server.local_addr(), root = %root.display(), "ready");
    server.serve(Handler::new(config, root)?).await?;
    Ok(())
}
