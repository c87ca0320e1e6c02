use std::fmt;
use std::path::{Path, PathBuf};

use drive_core::Credential;
use thiserror::Error;

use super::local::{LocalError, LocalTree};
use super::plan::{Exclusions, SyncOp, plan_level};
use super::remote::{RemoteError, RemoteKind, RemoteTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    ResolveFolder,
    ListChildren,
    CreateFile,
    UpdateFile,
    DeleteEntry,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemoteOp::ResolveFolder => "resolve folder",
            RemoteOp::ListChildren => "list folder",
            RemoteOp::CreateFile => "upload file",
            RemoteOp::UpdateFile => "update file",
            RemoteOp::DeleteEntry => "delete entry",
        })
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Local(#[from] LocalError),
    #[error("{op} {target} failed: {source}")]
    Remote {
        op: RemoteOp,
        target: String,
        #[source]
        source: RemoteError,
    },
    #[error(
        "{} is a {} locally but a {remote:?} entry remotely",
        path.display(),
        if *local_is_dir { "directory" } else { "file" }
    )]
    KindMismatch {
        path: PathBuf,
        local_is_dir: bool,
        remote: RemoteKind,
    },
    #[error("cannot derive a folder name from {}", path.display())]
    UnnamedRoot { path: PathBuf },
    #[error("folder name of {} is not valid UTF-8", path.display())]
    NonUtf8Name { path: PathBuf },
}

impl SyncError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Remote { source, .. } if source.is_transient())
    }

    fn remote(op: RemoteOp, target: impl Into<String>) -> impl FnOnce(RemoteError) -> Self {
        let target = target.into();
        move |source| SyncError::Remote { op, target, source }
    }
}

/// One unit of work: a local directory and the remote folder its namesake
/// lives under (`None` for the store root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub local_path: PathBuf,
    pub remote_parent: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub folders: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl SyncReport {
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

pub struct SyncEngine<L, R> {
    local: L,
    remote: R,
    exclusions: Exclusions,
}

impl<L: LocalTree, R: RemoteTree> SyncEngine<L, R> {
    pub fn new(local: L, remote: R, exclusions: Exclusions) -> Self {
        Self {
            local,
            remote,
            exclusions,
        }
    }

    /// Mirrors `local_path` into a folder of the same name under
    /// `remote_parent`, depth first. The first failure aborts the run;
    /// operations already applied stay applied.
    pub async fn sync(
        &self,
        credential: &Credential,
        local_path: &Path,
        remote_parent: Option<&str>,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let mut pending = vec![SyncTarget {
            local_path: local_path.to_path_buf(),
            remote_parent: remote_parent.map(str::to_string),
        }];
        while let Some(target) = pending.pop() {
            let children = self.sync_target(credential, &target, &mut report).await?;
            // Reversed so the stack pops children in local listing order.
            pending.extend(children.into_iter().rev());
        }
        Ok(report)
    }

    async fn sync_target(
        &self,
        credential: &Credential,
        target: &SyncTarget,
        report: &mut SyncReport,
    ) -> Result<Vec<SyncTarget>, SyncError> {
        let name = folder_name(&target.local_path)?;
        tracing::info!(path = %target.local_path.display(), "syncing folder");

        let folder_id = self
            .remote
            .find_or_create_folder(credential, name, target.remote_parent.as_deref())
            .await
            .map_err(SyncError::remote(RemoteOp::ResolveFolder, name))?;
        report.folders += 1;

        let local = self.local.list_children(&target.local_path).await?;
        let remote = self
            .remote
            .list_children(credential, &folder_id)
            .await
            .map_err(SyncError::remote(RemoteOp::ListChildren, name))?;

        let plan = plan_level(&local, &remote, &self.exclusions)?;
        report.unchanged += plan.unchanged;
        for op in &plan.ops {
            self.apply(credential, &folder_id, op, report).await?;
        }

        Ok(plan
            .subfolders
            .into_iter()
            .map(|local_path| SyncTarget {
                local_path,
                remote_parent: Some(folder_id.clone()),
            })
            .collect())
    }

    async fn apply(
        &self,
        credential: &Credential,
        folder_id: &str,
        op: &SyncOp,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        match op {
            SyncOp::Create { name, source } => {
                tracing::info!(name = %name, "uploading file");
                self.remote
                    .create_file(credential, name, folder_id, source)
                    .await
                    .map_err(SyncError::remote(RemoteOp::CreateFile, name))?;
                report.created += 1;
            }
            SyncOp::Update { id, name, source } => {
                tracing::info!(name = %name, "updating file");
                self.remote
                    .update_file_content(credential, id, source)
                    .await
                    .map_err(SyncError::remote(RemoteOp::UpdateFile, name))?;
                report.updated += 1;
            }
            SyncOp::Delete { id, name } => {
                tracing::info!(name = %name, id = %id, "deleting remote entry");
                self.remote
                    .delete_entry(credential, id)
                    .await
                    .map_err(SyncError::remote(RemoteOp::DeleteEntry, format!("{name} ({id})")))?;
                report.deleted += 1;
            }
        }
        Ok(())
    }
}

fn folder_name(path: &Path) -> Result<&str, SyncError> {
    let name = path.file_name().ok_or_else(|| SyncError::UnnamedRoot {
        path: path.to_path_buf(),
    })?;
    name.to_str().ok_or_else(|| SyncError::NonUtf8Name {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
