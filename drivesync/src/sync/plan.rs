use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use super::engine::SyncError;
use super::local::LocalEntry;
use super::remote::RemoteEntry;

/// Directory names skipped entirely during traversal.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    names: HashSet<String>,
}

impl Exclusions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    Create { name: String, source: PathBuf },
    Update { id: String, name: String, source: PathBuf },
    Delete { id: String, name: String },
}

/// Decisions for one folder level, taken from a single snapshot of each side.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LevelPlan {
    /// File operations in local listing order, then deletions in remote order.
    pub ops: Vec<SyncOp>,
    /// Local subdirectories to descend into, in local listing order.
    pub subfolders: Vec<PathBuf>,
    pub unchanged: usize,
}

/// Diffs one level. Names are the join key and are compared byte for byte.
///
/// A name that is a file on one side and a folder on the other fails the
/// whole level before anything is applied. Excluded directories are treated
/// as present (their remote counterpart survives) but are never descended.
pub fn plan_level(
    local: &[LocalEntry],
    remote: &[RemoteEntry],
    exclusions: &Exclusions,
) -> Result<LevelPlan, SyncError> {
    let local_names: HashSet<&str> = local.iter().map(|entry| entry.name.as_str()).collect();
    let mut remote_by_name: HashMap<&str, &RemoteEntry> = HashMap::new();
    for entry in remote {
        remote_by_name.entry(entry.name.as_str()).or_insert(entry);
    }

    let mut plan = LevelPlan::default();

    for entry in local {
        if entry.is_dir {
            if exclusions.contains(&entry.name) {
                tracing::debug!(path = %entry.path.display(), "skipping excluded folder");
                continue;
            }
            if let Some(existing) = remote_by_name.get(entry.name.as_str())
                && !existing.kind.is_folder()
            {
                return Err(SyncError::KindMismatch {
                    path: entry.path.clone(),
                    local_is_dir: true,
                    remote: existing.kind,
                });
            }
            plan.subfolders.push(entry.path.clone());
            continue;
        }

        match remote_by_name.get(entry.name.as_str()) {
            Some(existing) if existing.kind.is_folder() => {
                return Err(SyncError::KindMismatch {
                    path: entry.path.clone(),
                    local_is_dir: false,
                    remote: existing.kind,
                });
            }
            Some(existing) if entry.modified_at > existing.modified_at => {
                plan.ops.push(SyncOp::Update {
                    id: existing.id.clone(),
                    name: entry.name.clone(),
                    source: entry.path.clone(),
                });
            }
            Some(_) => plan.unchanged += 1,
            None => plan.ops.push(SyncOp::Create {
                name: entry.name.clone(),
                source: entry.path.clone(),
            }),
        }
    }

    for entry in remote {
        if !local_names.contains(entry.name.as_str()) {
            plan.ops.push(SyncOp::Delete {
                id: entry.id.clone(),
                name: entry.name.clone(),
            });
        }
    }

    Ok(plan)
}
