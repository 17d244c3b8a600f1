use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use reqwest;
use sha2::{Sha256, Digest};
use dirs;
use log;

use crate::catalog::{asset_file_name, is_remote};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model asset not found: {0}")]
    NotFound(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {path}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

/// Resolves model assets to local files.
///
/// Local paths are resolved against a base directory. Remote `http(s)` assets
/// are downloaded once into the cache directory and reused afterwards.
#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    base_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default cache directory, resolving
    /// local assets against the current working directory
    pub fn new_default() -> io::Result<Self> {
        let base_dir = env::current_dir()?;
        Self::new(Self::get_default_models_dir(), base_dir)
    }

    /// Returns the default models cache directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("LENSCLASS_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("lensclass").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("lensclass").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("lensclass").join("models")
    }

    pub fn new<P: AsRef<Path>, B: AsRef<Path>>(models_dir: P, base_dir: B) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            base_dir: base_dir.as_ref().to_path_buf(),
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Cache location of a remote asset: `<models_dir>/<url digest>/<file name>`
    pub fn get_cached_path(&self, url: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
        let file_name = match asset_file_name(url) {
            "" => "model.onnx",
            name => name,
        };
        self.models_dir.join(&digest[..16]).join(file_name)
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.get_cached_path(url).exists()
    }

    /// Resolves an asset path or URL to a readable local file, downloading it
    /// if needed. With `expected_hash`, the file must match that SHA-256 digest.
    pub async fn resolve(&self, asset: &str, expected_hash: Option<&str>) -> Result<PathBuf, ModelError> {
        if is_remote(asset) {
            return self.ensure_downloaded(asset, expected_hash).await;
        }

        let path = Path::new(asset);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        log::debug!("Resolving local asset {:?}", path);
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_string_lossy().to_string()));
        }
        if let Some(hash) = expected_hash {
            self.require_hash(&path, hash)?;
        }
        Ok(path)
    }

    /// Downloads a remote asset into the cache unless a valid copy is already there
    pub async fn ensure_downloaded(&self, url: &str, expected_hash: Option<&str>) -> Result<PathBuf, ModelError> {
        let path = self.get_cached_path(url);
        let _lock = self.download_lock.lock().await;

        if path.exists() {
            match expected_hash {
                Some(hash) if !self.verify_file(&path, hash)? => {
                    log::warn!("Cached asset {:?} failed verification, downloading again", path);
                    fs::remove_file(&path)?;
                }
                _ => {
                    log::info!("Using cached asset {:?} for {}", path, url);
                    return Ok(path);
                }
            }
        }

        log::info!("Asset not cached, downloading {} to {:?}", url, path);
        if let Err(e) = self.download_file(url, &path).await {
            log::error!("Failed to download {}: {}", url, e);
            // Cleanup on failure
            let _ = fs::remove_file(partial_path(&path));
            return Err(e);
        }

        if let Some(hash) = expected_hash {
            if let Err(e) = self.require_hash(&path, hash) {
                log::error!("Downloaded asset {:?} failed verification", path);
                let _ = fs::remove_file(&path);
                return Err(e);
            }
        }
        Ok(path)
    }

    async fn download_file(&self, url: &str, path: &Path) -> Result<(), ModelError> {
        let response = reqwest::get(url).await?;
        log::info!("Download response status: {}", response.status());
        if !response.status().is_success() {
            return Err(ModelError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // A cancelled download never looks cached
        let partial = partial_path(path);
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, path)?;
        log::info!("Asset written to {:?}", path);
        Ok(())
    }

    /// Checks a file against an expected SHA-256 hex digest
    pub fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        let hash = format!("{:x}", Sha256::digest(&bytes));
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Like [`verify_file`](Self::verify_file) but returns an error on mismatch
    pub fn require_hash(&self, path: &Path, expected_hash: &str) -> Result<(), ModelError> {
        if self.verify_file(path, expected_hash)? {
            return Ok(());
        }
        let bytes = fs::read(path)?;
        Err(ModelError::HashMismatch {
            path: path.to_string_lossy().to_string(),
            expected: expected_hash.to_string(),
            actual: format!("{:x}", Sha256::digest(&bytes)),
        })
    }

    /// Removes a cached remote asset so the next resolve downloads it again
    pub fn remove_cached(&self, url: &str) -> Result<(), ModelError> {
        let path = self.get_cached_path(url);
        if path.exists() {
            log::info!("Removing cached asset {:?}", path);
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Sibling file a download is written to before it is moved into place
fn partial_path(path: &Path) -> PathBuf {
    path.with_extension("part")
}
