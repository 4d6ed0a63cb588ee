//! Integration tests module
//!
//! End-to-end tests against a real `MoServer` bound to an ephemeral port:
//! - Registry and API behaviour seen over HTTP
//! - Live-reload stream delivery and shutdown drain
//! - Join coordinator against a running server
//! - Error handling

pub mod error_scenarios;
pub mod join_test;
pub mod server_test;
