//! Launch the user's default browser

use std::io;

use webbrowser::{Browser, BrowserOptions};

fn launch(url: &str, dry_run: bool) -> io::Result<()> {
    let mut options = BrowserOptions::new();
    options.with_suppress_output(true).with_dry_run(dry_run);
    webbrowser::open_browser_with_options(Browser::Default, url, &options)
}

/// Open `url` without waiting for the browser
pub fn open_url(url: &str) -> io::Result<()> {
    launch(url, false)
}

/// Open `url`, logging instead of failing
pub fn open_or_warn(url: &str) {
    match open_url(url) {
        Ok(()) => tracing::debug!(url, "opened browser"),
        Err(e) => tracing::warn!(url, error = %e, "failed to open browser"),
    }
}
