use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::{fs as async_fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::models::errors::AppError;
use crate::services::validation::SizeGuard;

const MAX_EXTENSION_LEN: usize = 16;

/// Owns the staging directory where uploads wait for the remote transfer.
#[derive(Debug, Clone)]
pub struct FileStorageService {
    temp_dir: PathBuf,
    max_file_age: Duration,
}

/// An upload written to the staging directory.
///
/// Removed exactly once: either through [`StagedFile::remove`] or, if the owner
/// is dropped first (cancelled request, panic), by a single background attempt.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    size: u64,
    armed: bool,
}

impl FileStorageService {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let temp_dir = temp_dir.into();

        if !temp_dir.exists() {
            fs::create_dir_all(&temp_dir)
                .map_err(|e| AppError::storage_failed(format!("Failed to create temp directory: {}", e)))?;
        }

        Ok(Self {
            temp_dir,
            max_file_age: Duration::from_secs(3600), // 1 hour default
        })
    }

    /// `<field>-<timestamp_ms>-<random>.<ext>`; the extension is dropped when the
    /// original name has none or it is not plain alphanumeric.
    pub fn staged_file_name(field_name: &str, original_name: &str) -> String {
        let field: String = field_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        let field = if field.is_empty() { "upload".to_string() } else { field };

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.len() <= MAX_EXTENSION_LEN && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        format!(
            "{}-{}-{}{}",
            field,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        )
    }

    /// True when `name` has the shape produced by [`Self::staged_file_name`].
    pub fn is_staged_file_name(name: &str) -> bool {
        let (stem, extension) = match name.split_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (name, None),
        };

        if let Some(ext) = extension {
            if ext.is_empty()
                || ext.len() > MAX_EXTENSION_LEN
                || !ext.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return false;
            }
        }

        let mut parts = stem.rsplitn(3, '-');
        let (Some(random), Some(timestamp), Some(field)) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };

        random.len() == 32
            && random.chars().all(|c| c.is_ascii_hexdigit())
            && !timestamp.is_empty()
            && timestamp.chars().all(|c| c.is_ascii_digit())
            && !field.is_empty()
            && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    /// Streams `chunks` into a new staged file, enforcing `max_size` as bytes arrive.
    ///
    /// On any failure the partial file is removed before the error is returned.
    pub async fn stage<S>(
        &self,
        field_name: &str,
        original_name: &str,
        chunks: S,
        max_size: usize,
    ) -> Result<StagedFile, AppError>
    where
        S: Stream<Item = Result<Bytes, AppError>>,
    {
        let path = self.temp_dir.join(Self::staged_file_name(field_name, original_name));
        let mut file = async_fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to create staged file: {}", e)))?;

        let mut staged = StagedFile::new(path);
        tracing::debug!("Staging upload to {}", staged.path().display());

        let mut guard = SizeGuard::new(max_size);
        let mut chunks = std::pin::pin!(chunks);

        let written: Result<(), AppError> = async {
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                guard.accept(chunk.len())?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| AppError::storage_failed(format!("Failed to write staged file: {}", e)))?;
            }
            file.flush()
                .await
                .map_err(|e| AppError::storage_failed(format!("Failed to flush staged file: {}", e)))
        }
        .await;
        drop(file);

        match written {
            Ok(()) => {
                staged.size = guard.received() as u64;
                Ok(staged)
            }
            Err(e) => {
                staged.remove().await;
                Err(e)
            }
        }
    }

    /// Removes staged files older than the configured maximum age.
    ///
    /// Entries whose names were not produced by [`Self::staged_file_name`] are left alone.
    pub async fn cleanup_temp_files(&self) -> Result<usize, AppError> {
        let mut cleaned_count = 0;
        let cutoff_time = SystemTime::now() - self.max_file_age;

        let mut entries = async_fs::read_dir(&self.temp_dir)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to read temp directory: {}", e)))?;

        while let Some(entry) = entries.next_entry().await
            .map_err(|e| AppError::storage_failed(format!("Failed to read directory entry: {}", e)))? {

            let path = entry.path();
            let is_staged = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(Self::is_staged_file_name);
            if !is_staged {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Skipping {} during sweep: {}", path.display(), e);
                    continue;
                }
            };

            if let Ok(modified) = metadata.modified() {
                if modified < cutoff_time {
                    if let Err(e) = async_fs::remove_file(&path).await {
                        tracing::warn!("Failed to delete stale staged file {}: {}", path.display(), e);
                    } else {
                        cleaned_count += 1;
                        tracing::debug!("Cleaned up stale staged file: {}", path.display());
                    }
                }
            }
        }

        if cleaned_count > 0 {
            tracing::info!("Cleaned up {} stale staged files", cleaned_count);
        }

        Ok(cleaned_count)
    }

    pub fn set_max_file_age(&mut self, max_age: Duration) {
        self.max_file_age = max_age;
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, size: 0, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Deletes the file. Failures are logged and reported as `false`, never raised.
    pub async fn remove(mut self) -> bool {
        self.armed = false;
        remove_staged(&self.path).await
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let path = std::mem::take(&mut self.path);
        tracing::warn!("Staged file {} dropped before cleanup, removing in background", path.display());

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_staged(&path).await;
                });
            }
            Err(_) => {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::error!("Failed to delete staged file {}: {}", path.display(), e);
                }
            }
        }
    }
}

async fn remove_staged(path: &Path) -> bool {
    match async_fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!("Removed staged file: {}", path.display());
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("Staged file {} was already gone", path.display());
            false
        }
        Err(e) => {
            tracing::error!("Failed to delete staged file {}: {}", path.display(), e);
            false
        }
    }
}
