use std::time::Duration;

use serde::Serialize;

use crate::error::ArchiverError;
use crate::gitea::GiteaClient;
use crate::lock::RunLock;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveResult {
    pub user: String,
    pub items: Vec<ArchiveItemResult>,
}

impl ArchiveResult {
    pub fn downloaded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.action == "download")
            .count()
    }

    pub fn up_to_date(&self) -> usize {
        self.items.len() - self.downloaded()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveItemResult {
    pub repo: String,
    pub branch: String,
    pub commit: String,
    pub action: String,
    pub archive_path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// The archival executor: enumerates the user's repositories and branches in
/// listing order, skips branches whose cached commit matches the remote tip
/// while the archive file is still on disk, downloads the rest, and persists
/// the cache after every successful download. The run lock brackets the whole
/// run.
#[derive(Clone)]
pub struct App<C: GiteaClient> {
    store: Store,
    client: C,
}

impl<C: GiteaClient> App<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }

    pub fn archive(&self, sink: &dyn ProgressSink) -> Result<ArchiveResult, ArchiverError> {
        self.store.ensure_dest()?;

        let lock = RunLock::new(self.store.lock_path());
        if !lock.acquire()? {
            return Err(ArchiverError::LockContention(self.store.lock_path()));
        }

        // Release exactly once on every exit path. A failure inside the run
        // wins over a failure to remove the marker.
        let result = self.archive_locked(sink);
        let released = lock.release();
        let outcome = result?;
        released?;
        Ok(outcome)
    }

    fn archive_locked(&self, sink: &dyn ProgressSink) -> Result<ArchiveResult, ArchiverError> {
        let mut cache = self.store.load_cache()?;

        let user = self.client.current_user()?;
        sink.event(ProgressEvent {
            message: format!("phase=Enumerate; repositories for {user}"),
            elapsed: None,
        });

        let mut items = Vec::new();
        for repo in self.client.list_repositories(&user)? {
            for branch in self.client.list_branches(&user, &repo)? {
                sink.event(ProgressEvent {
                    message: format!("checking {user}/{repo}/{}", branch.name),
                    elapsed: None,
                });

                let archive_path = self.store.archive_path(&repo, &branch.name);
                let cached = cache.get(&user, &repo, &branch.name);
                // The cached commit alone does not prove the file survived;
                // both conditions are needed to skip safely.
                if cached == Some(&branch.commit) && self.store.archive_exists(&repo, &branch.name)
                {
                    sink.event(ProgressEvent {
                        message: "-> archive up to date".to_string(),
                        elapsed: None,
                    });
                    items.push(ArchiveItemResult {
                        repo: repo.to_string(),
                        branch: branch.name.to_string(),
                        commit: branch.commit.to_string(),
                        action: "up-to-date".to_string(),
                        archive_path: archive_path.to_string(),
                    });
                    continue;
                }

                sink.event(ProgressEvent {
                    message: "-> found new commits, downloading".to_string(),
                    elapsed: None,
                });
                let start = std::time::Instant::now();
                self.client.download_archive(
                    &user,
                    &repo,
                    &branch.name,
                    archive_path.as_std_path(),
                )?;
                // Write-then-commit: the cache entry is recorded only after
                // the archive file is fully persisted, and the cache is
                // written out before moving to the next branch.
                cache.set(&user, &repo, &branch.name, branch.commit.clone());
                self.store.persist_cache(&cache)?;
                sink.event(ProgressEvent {
                    message: format!("-> downloaded to {archive_path}"),
                    elapsed: Some(start.elapsed()),
                });
                items.push(ArchiveItemResult {
                    repo: repo.to_string(),
                    branch: branch.name.to_string(),
                    commit: branch.commit.to_string(),
                    action: "download".to_string(),
                    archive_path: archive_path.to_string(),
                });
            }
        }

        Ok(ArchiveResult {
            user: user.to_string(),
            items,
        })
    }
}
