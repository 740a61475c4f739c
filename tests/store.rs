use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use gitea_archiver::domain::{BranchName, CommitId, RepoName, Username};
use gitea_archiver::error::ArchiverError;
use gitea_archiver::store::{ArchiveCache, Store};

fn store_in(temp: &tempfile::TempDir) -> Store {
    let dest = Utf8PathBuf::from_path_buf(temp.path().join("backups")).unwrap();
    Store::new(dest)
}

#[test]
fn missing_cache_file_loads_empty() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);

    let cache = store.load_cache().unwrap();
    assert!(cache.is_empty());
}

#[test]
fn persist_and_reload_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    store.ensure_dest().unwrap();

    let user: Username = "alice".parse().unwrap();
    let repo: RepoName = "proj".parse().unwrap();
    let main: BranchName = "main".parse().unwrap();
    let dev: BranchName = "dev".parse().unwrap();

    let mut cache = ArchiveCache::default();
    cache.set(&user, &repo, &main, "abc123".parse().unwrap());
    cache.set(&user, &repo, &dev, "def456".parse().unwrap());
    store.persist_cache(&cache).unwrap();

    let reloaded = store.load_cache().unwrap();
    assert_eq!(reloaded, cache);
    assert_eq!(
        reloaded.get(&user, &repo, &main).map(CommitId::as_str),
        Some("abc123")
    );
}

#[test]
fn persisted_cache_is_pretty_printed_nested_json() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    store.ensure_dest().unwrap();

    let user: Username = "alice".parse().unwrap();
    let repo: RepoName = "proj".parse().unwrap();
    let main: BranchName = "main".parse().unwrap();

    let mut cache = ArchiveCache::default();
    cache.set(&user, &repo, &main, "abc123".parse().unwrap());
    store.persist_cache(&cache).unwrap();

    let content = std::fs::read_to_string(store.cache_path().as_std_path()).unwrap();
    assert!(content.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"alice": {"proj": {"main": "abc123"}}})
    );
}

#[test]
fn corrupt_cache_file_fails_loudly() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    store.ensure_dest().unwrap();
    std::fs::write(store.cache_path().as_std_path(), b"{not json").unwrap();

    let err = store.load_cache().unwrap_err();
    assert_matches!(err, ArchiverError::StateCorrupt { .. });
}

#[test]
fn custom_file_names_change_layout() {
    let store = Store::new_with_file_names(
        Utf8PathBuf::from("/backups"),
        "run.lock".to_string(),
        "state.json".to_string(),
    );
    assert_eq!(store.lock_path(), "/backups/run.lock");
    assert_eq!(store.cache_path(), "/backups/state.json");
}
