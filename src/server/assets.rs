//! Bundled single-page app
//!
//! The browser UI is embedded in the binary and served verbatim. Paths that
//! match no asset get the entry document so the app can route client-side
//! (`/notes` shows the "notes" group).

use axum::http::{header, Uri};
use axum::response::{IntoResponse, Response};

/// One embedded file
#[derive(Debug)]
pub struct Asset {
    pub path: &'static str,
    pub content_type: &'static str,
    pub body: &'static [u8],
}

/// Entry document of the app
pub const INDEX: Asset = Asset {
    path: "index.html",
    content_type: "text/html; charset=utf-8",
    body: include_bytes!("../../assets/index.html"),
};

const ASSETS: &[Asset] = &[
    INDEX,
    Asset {
        path: "app.js",
        content_type: "text/javascript; charset=utf-8",
        body: include_bytes!("../../assets/app.js"),
    },
    Asset {
        path: "app.css",
        content_type: "text/css; charset=utf-8",
        body: include_bytes!("../../assets/app.css"),
    },
];

/// Find an embedded asset by its path relative to the app root
pub fn lookup(path: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|asset| asset.path == path)
}

/// Resolve a request path to the asset to serve, falling back to the index
pub fn resolve(path: &str) -> &'static Asset {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return &ASSETS[0];
    }
    lookup(path).unwrap_or(&ASSETS[0])
}

/// Fallback handler for every GET route the API does not claim
pub async fn serve_spa(uri: Uri) -> Response {
    let asset = resolve(uri.path());
    ([(header::CONTENT_TYPE, asset.content_type)], asset.body).into_response()
}
