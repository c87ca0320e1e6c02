use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Error)]
#[error("cannot read {}: {source}", path.display())]
pub struct LocalError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl LocalError {
    fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read side of the local filesystem: one directory level per call.
#[allow(async_fn_in_trait)]
pub trait LocalTree {
    async fn list_children(&self, path: &Path) -> Result<Vec<LocalEntry>, LocalError>;
}

impl<T: LocalTree + ?Sized> LocalTree for &T {
    async fn list_children(&self, path: &Path) -> Result<Vec<LocalEntry>, LocalError> {
        (**self).list_children(path).await
    }
}

/// [`LocalTree`] over the real filesystem. Symlinks to files are read through
/// their target; symlinks to directories and dangling links are skipped, so a
/// link back to an ancestor cannot loop the traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTree;

impl LocalTree for FsTree {
    async fn list_children(&self, path: &Path) -> Result<Vec<LocalEntry>, LocalError> {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|err| LocalError::new(path, err))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| LocalError::new(path, err))?
        {
            let entry_path = entry.path();
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %entry_path.display(), "skipping entry with non UTF-8 name");
                continue;
            };
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| LocalError::new(&entry_path, err))?;
            let meta = if file_type.is_symlink() {
                match tokio::fs::metadata(&entry_path).await {
                    Ok(meta) if meta.is_file() => meta,
                    Ok(_) => {
                        tracing::warn!(
                            path = %entry_path.display(),
                            "skipping symlink to a directory"
                        );
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %entry_path.display(),
                            "skipping dangling symlink: {err}"
                        );
                        continue;
                    }
                }
            } else {
                entry
                    .metadata()
                    .await
                    .map_err(|err| LocalError::new(&entry_path, err))?
            };
            let modified = meta
                .modified()
                .map_err(|err| LocalError::new(&entry_path, err))?;
            entries.push(LocalEntry {
                name,
                path: entry_path,
                is_dir: file_type.is_dir(),
                modified_at: OffsetDateTime::from(modified),
            });
        }
        Ok(entries)
    }
}
