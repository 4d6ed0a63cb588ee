//! Local viewer server
//!
//! One process serves every `mo` invocation on a port. It tracks files in
//! named groups, watches them, and pushes change notifications to browser
//! tabs over a live-reload stream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               MoServer                  │
//! │                                         │
//! │  ┌───────────────┐   ┌───────────────┐  │
//! │  │ WatchAdapter  │──>│   Registry    │  │
//! │  │ - notify      │   │ - groups/ids  │  │
//! │  │ - rewatch     │   │ - event sinks │  │
//! │  └───────────────┘   └───────┬───────┘  │
//! │                              │          │
//! │  ┌───────────────────────────┴───────┐  │
//! │  │              HTTP API             │  │
//! │  │  POST /_/api/files                │  │
//! │  │  GET  /_/api/groups               │  │
//! │  │  GET  /_/api/files/{id}/content   │  │
//! │  │  GET  /_/api/files/{id}/raw/...   │  │
//! │  │  POST /_/api/files/open           │  │
//! │  │  GET  /_/events                   │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//!            ^
//!            │ probe / add files
//!   JoinCoordinator (next invocation)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use mo::server::{MoServer, ServerConfig};
//!
//! let server = MoServer::new(ServerConfig::default())?;
//! server.registry().add_file(&path, "default").await?;
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod assets;
pub mod client;
pub mod config;
pub mod events;
pub mod join;
pub mod registry;
pub mod server;
pub mod watcher;

// Re-export main types
pub use client::{ClientConfig, ClientError, SessionClient};
pub use config::{ConfigError, ServerConfig, DEFAULT_PORT};
pub use events::{Event, EventSink};
pub use join::{BrowserPolicy, JoinCoordinator, JoinOutcome};
pub use registry::{FileEntry, FileId, Group, Registry, RegistryError, DEFAULT_GROUP};
pub use server::{AppState, MoServer, ServerError};
pub use watcher::{WatchAdapter, WatchError};
