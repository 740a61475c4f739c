use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{BranchName, CommitId, RepoName, Username};
use crate::error::ArchiverError;

/// Destination-directory layout: archive files, the persisted cache, and the
/// run-lock marker. File names are fields rather than globals so tests can
/// exercise multiple destinations without interference.
#[derive(Debug, Clone)]
pub struct Store {
    dest: Utf8PathBuf,
    lock_file: String,
    cache_file: String,
}

impl Store {
    pub fn new(dest: Utf8PathBuf) -> Self {
        Self {
            dest,
            lock_file: "cache.lock".to_string(),
            cache_file: "cache.json".to_string(),
        }
    }

    pub fn new_with_file_names(dest: Utf8PathBuf, lock_file: String, cache_file: String) -> Self {
        Self {
            dest,
            lock_file,
            cache_file,
        }
    }

    pub fn dest(&self) -> &Utf8Path {
        &self.dest
    }

    pub fn lock_path(&self) -> Utf8PathBuf {
        self.dest.join(&self.lock_file)
    }

    pub fn cache_path(&self) -> Utf8PathBuf {
        self.dest.join(&self.cache_file)
    }

    pub fn archive_path(&self, repo: &RepoName, branch: &BranchName) -> Utf8PathBuf {
        self.dest
            .join(repo.as_str())
            .join(format!("{}.zip", branch.as_str()))
    }

    pub fn archive_exists(&self, repo: &RepoName, branch: &BranchName) -> bool {
        self.archive_path(repo, branch).as_std_path().exists()
    }

    pub fn ensure_dest(&self) -> Result<(), ArchiverError> {
        fs::create_dir_all(self.dest.as_std_path())
            .map_err(|err| ArchiverError::Filesystem(format!("create {}: {err}", self.dest)))
    }

    /// Loads the persisted cache. A missing file is a first run and yields an
    /// empty cache; a file that exists but does not parse is surfaced as
    /// `StateCorrupt` rather than silently treated as empty.
    pub fn load_cache(&self) -> Result<ArchiveCache, ArchiverError> {
        let path = self.cache_path();
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(ArchiveCache::default());
            }
            Err(err) => {
                return Err(ArchiverError::Filesystem(format!("read {path}: {err}")));
            }
        };
        serde_json::from_str(&content).map_err(|err| ArchiverError::StateCorrupt {
            path,
            message: err.to_string(),
        })
    }

    /// Rewrites the full cache, pretty-printed for human inspection. Called
    /// after every successful branch download, never batched at run end.
    pub fn persist_cache(&self, cache: &ArchiveCache) -> Result<(), ArchiverError> {
        let content = serde_json::to_vec_pretty(cache)
            .map_err(|err| ArchiverError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&self.cache_path(), &content)
    }
}

/// Durable record of archival progress: user -> repository -> branch ->
/// last successfully archived commit. An entry exists only once the archive
/// file for that branch is fully on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveCache(BTreeMap<Username, BTreeMap<RepoName, BTreeMap<BranchName, CommitId>>>);

impl ArchiveCache {
    pub fn get(&self, user: &Username, repo: &RepoName, branch: &BranchName) -> Option<&CommitId> {
        self.0.get(user)?.get(repo)?.get(branch)
    }

    pub fn set(&mut self, user: &Username, repo: &RepoName, branch: &BranchName, commit: CommitId) {
        self.0
            .entry(user.clone())
            .or_default()
            .entry(repo.clone())
            .or_default()
            .insert(branch.clone(), commit);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ArchiverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ArchiverError::Filesystem(err.to_string()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(tmp_path.as_std_path(), content)
        .map_err(|err| ArchiverError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), path.as_std_path())
        .map_err(|err| ArchiverError::Filesystem(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new(Utf8PathBuf::from("/backups"));
        let repo: RepoName = "proj".parse().unwrap();
        let branch: BranchName = "feature/login".parse().unwrap();

        assert_eq!(store.lock_path(), "/backups/cache.lock");
        assert_eq!(store.cache_path(), "/backups/cache.json");
        assert_eq!(
            store.archive_path(&repo, &branch),
            "/backups/proj/feature/login.zip"
        );
    }

    #[test]
    fn cache_get_set() {
        let user: Username = "alice".parse().unwrap();
        let repo: RepoName = "proj".parse().unwrap();
        let branch: BranchName = "main".parse().unwrap();

        let mut cache = ArchiveCache::default();
        assert!(cache.get(&user, &repo, &branch).is_none());

        cache.set(&user, &repo, &branch, "abc123".parse().unwrap());
        assert_eq!(
            cache.get(&user, &repo, &branch).map(CommitId::as_str),
            Some("abc123")
        );
    }
}
