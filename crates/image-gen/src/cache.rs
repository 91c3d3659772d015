//! Content-addressed cache of rendered images.
//!
//! Each image is stored as `<dir>/<sha256 of raw prompt>.png` and never
//! evicted. Downloads stream into `<key>.part` and are renamed into place only
//! once fully written, so a path returned by [`ImageCache`] always points at a
//! complete file. Concurrent requests for the same key share one download.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use brain_core::hash_prompt;
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, StreamExt};
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::ImageError;

/// Default time allowed for a single render download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A cached image on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    /// SHA-256 hex of the raw prompt.
    pub content_hash: String,
    /// Path of the fully written file.
    pub local_path: PathBuf,
    /// URL the image was (or would have been) downloaded from.
    pub source_url: String,
    /// True when this call did not start a download itself.
    pub from_cache: bool,
}

impl CachedImage {
    /// File name of the cached image, e.g. `<hash>.png`.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.content_hash)
    }
}

type PendingDownload = Shared<BoxFuture<'static, Result<PathBuf, ImageError>>>;

/// Download-once, serve-forever image store.
pub struct ImageCache {
    dir: PathBuf,
    client: Client,
    timeout: Duration,
    pending: Mutex<HashMap<String, (u64, PendingDownload)>>,
    next_ticket: AtomicU64,
}

impl ImageCache {
    /// Create a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::with_client(Client::new(), dir, timeout)
    }

    /// Create a cache that downloads with an existing HTTP client.
    pub fn with_client(client: Client, dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            client,
            timeout,
            pending: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for a cache key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.png", key))
    }

    /// Whether an image for `cache_key_source` is already on disk.
    pub async fn contains(&self, cache_key_source: &str) -> bool {
        let path = self.path_for(&hash_prompt(cache_key_source));
        fs::try_exists(&path).await.unwrap_or(false)
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, (u64, PendingDownload)>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached image for `cache_key_source`, downloading it from
    /// `remote_url` on a miss.
    pub async fn fetch_or_create(
        &self,
        remote_url: &str,
        cache_key_source: &str,
    ) -> Result<CachedImage, ImageError> {
        let key = hash_prompt(cache_key_source);
        let path = self.path_for(&key);
        let hit = |path: PathBuf| CachedImage {
            content_hash: key.clone(),
            local_path: path,
            source_url: remote_url.to_string(),
            from_cache: true,
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Image cache hit for {}", key);
            return Ok(hit(path));
        }

        let (ticket, download, leader) = {
            let mut pending = self.registry();
            match pending.get(&key) {
                Some((ticket, download)) => {
                    debug!("Joining in-flight download for {}", key);
                    (*ticket, download.clone(), false)
                }
                None => {
                    // A download may have finished between the check above and taking the lock.
                    if path.exists() {
                        drop(pending);
                        return Ok(hit(path));
                    }
                    let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                    let download = download_to(
                        self.client.clone(),
                        remote_url.to_string(),
                        self.dir.clone(),
                        key.clone(),
                        self.timeout,
                    )
                    .boxed()
                    .shared();
                    pending.insert(key.clone(), (ticket, download.clone()));
                    (ticket, download, true)
                }
            }
        };

        let result = download.await;

        {
            let mut pending = self.registry();
            if pending.get(&key).map(|(t, _)| *t) == Some(ticket) {
                pending.remove(&key);
            }
        }

        let local_path = result?;
        Ok(CachedImage {
            content_hash: key,
            local_path,
            source_url: remote_url.to_string(),
            from_cache: !leader,
        })
    }
}

async fn download_to(
    client: Client,
    url: String,
    dir: PathBuf,
    key: String,
    timeout: Duration,
) -> Result<PathBuf, ImageError> {
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| ImageError::CacheWrite(format!("{}: {}", dir.display(), e)))?;

    let final_path = dir.join(format!("{}.png", key));
    let temp_path = dir.join(format!("{}.part", key));

    info!("Downloading image {} from render provider", key);
    let response = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ImageError::Download(format!("timed out after {} s", timeout.as_secs()))
            } else {
                ImageError::Download(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImageError::Download(format!(
            "render provider returned HTTP {}",
            status.as_u16()
        )));
    }

    let written = match write_body(response, &temp_path).await {
        Ok(written) => written,
        Err(err) => {
            discard(&temp_path).await;
            return Err(err);
        }
    };

    if let Err(e) = fs::rename(&temp_path, &final_path).await {
        discard(&temp_path).await;
        return Err(ImageError::CacheWrite(format!(
            "{}: {}",
            final_path.display(),
            e
        )));
    }

    info!("Cached image {} ({} bytes)", key, written);
    Ok(final_path)
}

/// Stream the response body into `path`, returning the byte count.
async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, ImageError> {
    let cache_err =
        |e: std::io::Error| ImageError::CacheWrite(format!("{}: {}", path.display(), e));

    let mut file = fs::File::create(path).await.map_err(cache_err)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| {
            if e.is_timeout() {
                ImageError::Download("timed out while reading image body".to_string())
            } else {
                ImageError::Download(format!("body read failed: {}", e))
            }
        })?;
        file.write_all(&bytes).await.map_err(cache_err)?;
        written += bytes.len() as u64;
    }

    if written == 0 {
        return Err(ImageError::Download("render provider returned an empty body".to_string()));
    }

    file.flush().await.map_err(cache_err)?;
    file.sync_all().await.map_err(cache_err)?;
    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove partial download {}: {}", path.display(), e);
        }
    }
}
