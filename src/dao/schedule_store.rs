use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;

use crate::{
    config::ScheduleConfig,
    dao::storage::{StorageError, StorageResult},
};

/// Abstraction over the durable key-value slot holding the automation schedule.
pub trait ScheduleStore: Send + Sync {
    /// Read the stored schedule, `None` when nothing was saved yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<ScheduleConfig>>>;
    /// Replace the stored schedule.
    fn save(&self, schedule: ScheduleConfig) -> BoxFuture<'static, StorageResult<()>>;
}

/// Schedule persisted as a small JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileScheduleStore {
    path: Arc<Path>,
}

impl JsonFileScheduleStore {
    /// Store backed by the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::from(path.into()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleStore for JsonFileScheduleStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<ScheduleConfig>>> {
        let path = self.path.clone();
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => {
                    return Err(StorageError::unavailable(
                        format!("reading {}", path.display()),
                        err,
                    ));
                }
            };
            serde_json::from_str(&contents)
                .map(Some)
                .map_err(|err| StorageError::corrupted(format!("parsing {}", path.display()), err))
        })
    }

    fn save(&self, schedule: ScheduleConfig) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        Box::pin(async move {
            let payload = serde_json::to_vec_pretty(&schedule).map_err(|err| {
                StorageError::corrupted("serialising schedule".to_string(), err)
            })?;

            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|err| {
                    StorageError::unavailable(format!("creating {}", parent.display()), err)
                })?;
            }

            // Write next to the target then rename so readers never see a partial file.
            let staging = path.with_extension("json.tmp");
            tokio::fs::write(&staging, payload).await.map_err(|err| {
                StorageError::unavailable(format!("writing {}", staging.display()), err)
            })?;
            tokio::fs::rename(&staging, &path).await.map_err(|err| {
                StorageError::unavailable(format!("replacing {}", path.display()), err)
            })
        })
    }
}

/// Schedule kept in memory only; used by tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleStore {
    slot: Arc<Mutex<Option<ScheduleConfig>>>,
}

impl InMemoryScheduleStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<ScheduleConfig>>> {
        let slot = self.slot.clone();
        Box::pin(async move {
            let guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Ok(*guard)
        })
    }

    fn save(&self, schedule: ScheduleConfig) -> BoxFuture<'static, StorageResult<()>> {
        let slot = self.slot.clone();
        Box::pin(async move {
            let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Some(schedule);
            Ok(())
        })
    }
}
