use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// URL prefix the uploads directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads/";

/// Product images on local disk.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes an uploaded image under a fresh `<uuid><ext>` name and returns its URL.
    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!("{}{}", Uuid::new_v4(), extension_of(original_filename));
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        info!(file = %name, size = bytes.len(), "image stored");
        Ok(format!("{UPLOADS_URL_PREFIX}{name}"))
    }

    /// Deletes the file behind an uploaded image URL.
    ///
    /// URLs outside the uploads directory (the placeholder among them) are left
    /// alone. Failures are logged and otherwise ignored.
    pub async fn remove(&self, url: &str) {
        let Some(name) = url
            .strip_prefix(UPLOADS_URL_PREFIX)
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && name != &"..")
        else {
            return;
        };

        let path = self.dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(path = %path.display(), "image removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove image"),
        }
    }
}
