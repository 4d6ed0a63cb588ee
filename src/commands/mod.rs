pub mod open;

// Re-export command functions for convenience
pub use open::{open, OpenParams};
