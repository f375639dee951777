//! Content loading
//!
//! Fetches the raw bytes of modules and scripts. Relative files are resolved
//! against the descriptor's directory; URLs are fetched with a single GET.

use ferry_core::domain::descriptor::ContentSource;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while fetching content
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("content of '{name}' is not valid UTF-8")]
    InvalidUtf8 { name: String },
}

/// Loads content for a deployment
#[derive(Debug, Clone)]
pub struct ContentLoader {
    root: PathBuf,
    http: Client,
}

impl ContentLoader {
    /// Creates a loader resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_client(root, Client::new())
    }

    pub fn with_client(root: impl Into<PathBuf>, http: Client) -> Self {
        Self {
            root: root.into(),
            http,
        }
    }

    /// Creates a loader for a descriptor, rooted at its directory
    pub fn for_descriptor(descriptor_path: &Path) -> Self {
        let root = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(root)
    }

    /// Fetches the bytes behind a source
    pub async fn load(&self, source: &ContentSource) -> Result<Vec<u8>, LoadError> {
        match source {
            ContentSource::File(path) => self.load_file(path),
            ContentSource::Url(url) => self.load_url(url).await,
        }
    }

    /// Fetches a source and decodes it as UTF-8 text
    ///
    /// # Arguments
    /// * `name` - Entry name, used in the error when decoding fails
    pub async fn load_text(&self, name: &str, source: &ContentSource) -> Result<String, LoadError> {
        let bytes = self.load(source).await?;
        String::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8 {
            name: name.to_string(),
        })
    }

    fn load_file(&self, path: &Path) -> Result<Vec<u8>, LoadError> {
        let path = self.root.join(path);
        debug!("Reading {}", path.display());
        std::fs::read(&path).map_err(|source| LoadError::Io { path, source })
    }

    async fn load_url(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        debug!("Fetching {}", url);
        let request_error = |source| LoadError::Request {
            url: url.to_string(),
            source,
        };

        let mut response = self.http.get(url).send().await.map_err(request_error)?;
        if response.status() != StatusCode::OK {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_relative_file_resolved_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sqlite3.wasm"), b"\0asm").unwrap();
        let loader = ContentLoader::for_descriptor(&dir.path().join("deploy.json"));

        let bytes = loader
            .load(&ContentSource::File("sqlite3.wasm".into()))
            .await
            .unwrap();

        assert_eq!(bytes, b"\0asm");
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ContentLoader::new(dir.path());

        let err = loader
            .load(&ContentSource::File("missing.wasm".into()))
            .await
            .unwrap_err();

        match err {
            LoadError::Io { path, .. } => assert_eq!(path, dir.path().join("missing.wasm")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_url_body_collected() {
        let base = serve(Router::new().route("/init.air", get(|| async { "(null)" }))).await;
        let loader = ContentLoader::new(".");

        let text = loader
            .load_text("init", &ContentSource::Url(format!("{}/init.air", base)))
            .await
            .unwrap();

        assert_eq!(text, "(null)");
    }

    #[tokio::test]
    async fn test_non_200_status_is_an_error() {
        let base = serve(Router::new().route(
            "/gone",
            get(|| async { (AxumStatus::NOT_FOUND, "nope") }),
        ))
        .await;
        let url = format!("{}/gone", base);

        let err = ContentLoader::new(".")
            .load(&ContentSource::Url(url.clone()))
            .await
            .unwrap_err();

        match err {
            LoadError::Status { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_script_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.air"), [0xff, 0xfe]).unwrap();

        let err = ContentLoader::new(dir.path())
            .load_text("bad", &ContentSource::File("bad.air".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::InvalidUtf8 { name } if name == "bad"));
    }
}
