use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Handle to a rendered document on scoped storage.
///
/// Not `Clone`: one handle per rendered file, owned by the run that created
/// it. Destruction goes through `ArtifactLifecycle`.
#[derive(Debug, Serialize)]
pub struct RenderedArtifact {
    id: Uuid,
    path: PathBuf,
    filename: String,
    content_type: &'static str,
    size: u64,
    created_at: DateTime<Utc>,
}

impl RenderedArtifact {
    pub(crate) fn new(path: PathBuf, filename: String, size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            filename,
            content_type: PDF_CONTENT_TYPE,
            size,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Size recorded when the artifact was persisted.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
