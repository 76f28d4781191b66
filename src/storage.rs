use std::path::{Path, PathBuf};

use derive_new::new;
use snafu::{Location, ResultExt, Snafu};
use uuid::Uuid;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("cannot create the upload directory `{}` at {location}: {source}", path.display()))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot write the uploaded file `{}` at {location}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// A file written by [Storage::store].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Where browsers can fetch the file, without any query string.
    pub url: String,
}

/// Keeps uploaded media on the local disk, under a directory that is served at `public_url`.
#[derive(Debug, Clone, new)]
pub struct Storage {
    root: PathBuf,
    public_url: String,
}

impl Storage {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn prepare(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context(CreateDirectorySnafu { path: &self.root })
    }

    /// Writes `bytes` under a fresh random name that keeps the extension of `file_name`.
    pub async fn store(&self, file_name: Option<&str>, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        let name = match file_name.and_then(extension) {
            Some(extension) => format!("{}.{extension}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };

        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .context(WriteFileSnafu { path: &path })?;

        let url = public_url(&self.public_url, &name);
        tracing::info!(path = %path.display(), %url, size = bytes.len(), "stored uploaded file");

        Ok(StoredFile { path, url })
    }

    /// Removes a stored file whose database record could not be created.
    pub async fn discard(&self, file: &StoredFile) {
        if let Err(err) = tokio::fs::remove_file(&file.path).await {
            tracing::warn!(path = %file.path.display(), error = %err, "failed to remove orphaned upload");
        }
    }
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| !extension.is_empty())
        .filter(|extension| extension.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
}

fn public_url(base: &str, name: &str) -> String {
    let base = base.split('?').next().unwrap_or_default();
    format!("{}/{name}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_extensions() {
        assert_eq!(extension("holiday.MP4").as_deref(), Some("mp4"));
        assert_eq!(extension("clip.tar.webm").as_deref(), Some("webm"));
    }

    #[test]
    fn drops_odd_extensions() {
        assert_eq!(extension("no_extension"), None);
        assert_eq!(extension("weird.m p4"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn public_urls_have_no_query_string() {
        assert_eq!(public_url("/uploads", "a.mp4"), "/uploads/a.mp4");
        assert_eq!(public_url("/uploads/", "a.mp4"), "/uploads/a.mp4");
        assert_eq!(
            public_url("https://cdn.example.com/media?sig=abc", "a.mp4"),
            "https://cdn.example.com/media/a.mp4"
        );
    }

    #[tokio::test]
    async fn stores_files_under_a_fresh_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("media"), "/uploads".into());
        storage.prepare().await.unwrap();

        let first = storage.store(Some("clip.mp4"), b"first").await.unwrap();
        let second = storage.store(Some("clip.mp4"), b"second").await.unwrap();

        assert_ne!(first.path, second.path);
        assert!(first.url.starts_with("/uploads/") && first.url.ends_with(".mp4"));
        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"first");

        storage.discard(&first).await;
        assert!(!first.path.exists());
    }
}
