use crate::error::{Result, VastError};
use log::debug;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::thread_rng;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

/// Retrieves VAST document text by URL. The resolver only ever talks to this
/// trait, so tests can serve documents from memory.
pub trait Fetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<String>> + 'a>>;
}

/// Fetcher backed by reqwest, with a short per-request timeout so a slow ad
/// server cannot stall content playback.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| VastError::HttpError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpFetcher { client })
    }

    async fn fetch_url(&self, url: &str) -> Result<String> {
        // Random request id for correlating log lines
        let req_id: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();

        let url = url::Url::parse(url)?;
        debug!("[{}] fetching {}", req_id, url);
        let start_time = std::time::Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            debug!("[{}] request failed after {:?}", req_id, start_time.elapsed());
            VastError::HttpError(format!("Failed to fetch URL: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(VastError::HttpError(format!(
                "Failed to fetch URL: HTTP status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VastError::HttpError(format!("Failed to read response body: {}", e)))?;

        debug!("[{}] completed in {:?}", req_id, start_time.elapsed());
        Ok(body)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<String>> + 'a>> {
        Box::pin(self.fetch_url(url))
    }
}

/// Fetcher for `file://` URLs and plain paths, used by the CLI and by tests
/// working off sample documents.
pub struct FileFetcher;

impl FileFetcher {
    fn read(url_or_path: &str) -> Result<String> {
        let path = url_or_path.strip_prefix("file://").unwrap_or(url_or_path);

        #[cfg(target_os = "windows")]
        let path = path.trim_start_matches('/');

        debug!("reading from file: {}", path);
        fs::read_to_string(Path::new(path)).map_err(VastError::IoError)
    }
}

impl Fetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<String>> + 'a>> {
        let result = Self::read(url);
        Box::pin(async move { result })
    }
}

/// Routes `file://` and existing plain paths to [`FileFetcher`], everything
/// else to [`HttpFetcher`].
pub struct AutoFetcher {
    http: HttpFetcher,
}

impl AutoFetcher {
    pub fn new() -> Result<Self> {
        Ok(AutoFetcher {
            http: HttpFetcher::new()?,
        })
    }
}

impl Fetcher for AutoFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = Result<String>> + 'a>> {
        if url.starts_with("file://") || Path::new(url).exists() {
            FileFetcher.fetch(url)
        } else {
            self.http.fetch(url)
        }
    }
}
