use chrono::Utc;
use service_core::error::AppError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A file written by [`ArtifactStorage::write_new`].
#[derive(Debug)]
pub struct StoredFile {
    pub path: PathBuf,
    pub filename: String,
}

/// Scoped local storage for rendered artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    base_path: PathBuf,
}

impl ArtifactStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `data` to a freshly named file. Never overwrites: names are
    /// timestamp plus random suffix and the file is opened create-new. A
    /// failed write or sync removes the partial file.
    pub async fn write_new(&self, data: &[u8]) -> io::Result<StoredFile> {
        let filename = unique_name();
        let path = self.base_path.join(&filename);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        let written = write_synced(&mut file, data).await;
        drop(file);
        remove_on_error(&path, written).await?;

        Ok(StoredFile { path, filename })
    }

    /// Size on disk, or `NotFound` when the file is gone.
    pub async fn size_of(&self, path: &Path) -> io::Result<u64> {
        let metadata = fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(metadata.len())
    }

    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

async fn write_synced(file: &mut fs::File, data: &[u8]) -> io::Result<()> {
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Pass `result` through, deleting `path` first when it is an error.
async fn remove_on_error<T>(path: &Path, result: io::Result<T>) -> io::Result<T> {
    if result.is_err() {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = ?path, error = %e, "Could not remove partial artifact");
            }
        }
    }
    result
}

fn unique_name() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "invoice_{}_{}.pdf",
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        &suffix[..8]
    )
}
