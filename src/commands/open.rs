use std::path::PathBuf;

use mo::browser;
use mo::config::Config;
use mo::error::{Error, Result};
use mo::paths;
use mo::server::{BrowserPolicy, JoinCoordinator, JoinOutcome, MoServer, DEFAULT_GROUP};

// ============================================================================
// Open Command
// ============================================================================

/// Arguments of a `mo` invocation
#[derive(Debug, Clone)]
pub struct OpenParams {
    pub files: Vec<PathBuf>,
    pub group: String,
    pub browser: BrowserPolicy,
}

/// Hand the files to a running server, or become the server
pub async fn open(config: Config, params: OpenParams) -> Result<()> {
    let files = resolve_files(&params.files)?;
    let group = if params.group.is_empty() {
        DEFAULT_GROUP.to_string()
    } else {
        params.group
    };

    if !files.is_empty() {
        let coordinator = JoinCoordinator::new(config.server.address(), config.probe_timeout());

        if let JoinOutcome::Joined {
            new_group,
            added,
            failed,
        } = coordinator.join(&files, &group).await
        {
            let url = coordinator.group_url(&group);
            println!(
                "Added {} file(s) to group '{}' on running server {}",
                added.len(),
                group,
                url
            );
            for (path, e) in &failed {
                println!("  Skipped {}: {e}", path.display());
            }

            if params.browser.open_after_join(new_group) {
                browser::open_or_warn(&url);
            }
            return Ok(());
        }
    }

    serve(config, files, &group, params.browser).await
}

async fn serve(config: Config, files: Vec<PathBuf>, group: &str, policy: BrowserPolicy) -> Result<()> {
    let address = config.server.address();
    let server = MoServer::new(config.server)?;

    let registry = server.registry();
    for path in &files {
        registry.add_file(path, group).await?;
    }

    let listener = server.bind().await?;

    let url = serving_url(&address, group);
    println!("Serving {url}");
    println!("  Files: {}", files.len());
    println!("  Press Ctrl+C to stop");

    if policy.open_when_serving() {
        browser::open_or_warn(&url);
    }

    server.serve(listener, shutdown_signal()).await?;
    Ok(())
}

/// Resolve command-line paths to absolute form, failing on the first one
/// that does not exist
pub fn resolve_files(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    files
        .iter()
        .map(|file| {
            let path = paths::absolutize(file)?;
            if !path.exists() {
                return Err(Error::FileNotFound(path));
            }
            Ok(path)
        })
        .collect()
}

/// Browser URL when this process serves
pub fn serving_url(address: &str, group: &str) -> String {
    if group == DEFAULT_GROUP {
        format!("http://{address}")
    } else {
        format!("http://{address}/{group}")
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
