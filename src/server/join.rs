//! Join-or-start coordination between `mo` invocations
//!
//! Before a process starts serving it probes the configured address. If a
//! viewer already answers there, the files are handed to it over HTTP and
//! the process exits; otherwise this process becomes the server.

use std::path::PathBuf;
use std::time::Duration;

use super::client::{ClientConfig, ClientError, SessionClient};
use super::registry::{FileEntry, Group, DEFAULT_GROUP};

// ============================================================================
// Browser Policy
// ============================================================================

/// Whether to open a browser tab, from `--open` / `--no-open`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserPolicy {
    /// Open when it is useful: always when serving, for new groups when joining
    #[default]
    Auto,
    Always,
    Never,
}

impl BrowserPolicy {
    /// Resolve the CLI flags; they are mutually exclusive
    pub fn from_flags(open: bool, no_open: bool) -> Self {
        match (open, no_open) {
            (true, _) => Self::Always,
            (_, true) => Self::Never,
            _ => Self::Auto,
        }
    }

    pub fn open_when_serving(self) -> bool {
        self != Self::Never
    }

    pub fn open_after_join(self, new_group: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Auto => new_group,
            Self::Never => false,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Terminal state of the coordinator
#[derive(Debug)]
pub enum JoinOutcome {
    /// Nothing answered; this process should serve
    Serve,

    /// An existing server took the files
    Joined {
        /// The group did not exist on the server before
        new_group: bool,
        added: Vec<FileEntry>,
        failed: Vec<(PathBuf, ClientError)>,
    },
}

// ============================================================================
// Coordinator
// ============================================================================

/// Probes for a running server and registers files with it
pub struct JoinCoordinator {
    address: String,
    probe_timeout: Duration,
}

impl JoinCoordinator {
    /// Coordinator for the server at `address` (`host:port`)
    pub fn new(address: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            probe_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Browser URL for `group` on the target server
    pub fn group_url(&self, group: &str) -> String {
        format!("http://{}/{}", self.address, group)
    }

    fn client(&self) -> Result<SessionClient, ClientError> {
        SessionClient::new(ClientConfig::new(&self.address).with_timeout(self.probe_timeout))
    }

    /// Ask the target for its groups. Any failure means no server is there.
    pub async fn probe(&self) -> Option<Vec<Group>> {
        let client = self.client().ok()?;

        match client.groups().await {
            Ok(groups) => Some(groups),
            Err(e) => {
                tracing::debug!(address = %self.address, error = %e, "no running server");
                None
            }
        }
    }

    /// Hand `files` (absolute paths) to a running server, or report that
    /// this process should serve. Per-file failures are logged and skipped.
    pub async fn join(&self, files: &[PathBuf], group: &str) -> JoinOutcome {
        let group = if group.is_empty() { DEFAULT_GROUP } else { group };

        let Some(groups) = self.probe().await else {
            return JoinOutcome::Serve;
        };
        let new_group = !groups.iter().any(|g| g.name == group);

        let client = match self.client() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "cannot reach running server");
                return JoinOutcome::Serve;
            }
        };

        let mut added = Vec::with_capacity(files.len());
        let mut failed = Vec::new();

        for path in files {
            match client.add_file(path, group).await {
                Ok(entry) => {
                    tracing::debug!(id = entry.id, group, path = %path.display(), "added to running server");
                    added.push(entry);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to add file");
                    failed.push((path.clone(), e));
                }
            }
        }

        JoinOutcome::Joined {
            new_group,
            added,
            failed,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
