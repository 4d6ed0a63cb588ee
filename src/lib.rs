//! mo - local Markdown viewer
//!
//! `mo README.md` opens a browser tab that shows the file and reloads it on
//! every save. All invocations on a port share one server: a second `mo`
//! hands its files to the running instance instead of starting another.
//!
//! # Architecture
//!
//! - [`server`] - Registry, live-reload event bus, file watching, HTTP API,
//!   and the join-or-start coordinator
//! - [`config`] - Layered configuration (defaults, TOML, environment)
//! - [`paths`] - Lexical path helpers, including the traversal guard
//! - [`browser`] - Opening URLs in the default browser
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use mo::server::{JoinCoordinator, JoinOutcome, MoServer, ServerConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let files = vec![mo::paths::absolutize("README.md")?];
//!
//!     let coordinator = JoinCoordinator::new(config.address(), Duration::from_millis(500));
//!     if let JoinOutcome::Serve = coordinator.join(&files, "default").await {
//!         let server = MoServer::new(config)?;
//!         server.registry().add_file(&files[0], "default").await?;
//!         server.start_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod paths;
pub mod server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::server::{
        BrowserPolicy, FileEntry, Group, JoinCoordinator, JoinOutcome, MoServer, Registry,
        ServerConfig,
    };
}
