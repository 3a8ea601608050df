//! # rserve
//!
//! An async static file server: clean URLs, rewrites, redirects, custom
//! headers and directory listings, configured with a `serve.json`-style
//! document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rserve::{Config, Handler, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_json_str(r#"{
//!         "cleanUrls": true,
//!         "rewrites": [{ "source": "/app/**", "destination": "/index.html" }]
//!     }"#)?;
//!     let server = Server::bind("127.0.0.1:5000").await?;
//!     println!("Serving ./public on http://127.0.0.1:5000");
//!     server.serve(Handler::new(config, "./public")?).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fs;
pub mod handler;
pub mod http;
pub mod pattern;
pub mod rules;
pub mod server;

pub use config::{Config, ConfigError};
pub use handler::{Handler, HandlerError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
