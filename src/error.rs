use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ArchiverError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("invalid repository name: {0:?}")]
    InvalidRepoName(String),

    #[error("invalid branch name: {0:?}")]
    InvalidBranchName(String),

    #[error("invalid commit id: {0:?}")]
    InvalidCommitId(String),

    #[error("gitea request failed: {0}")]
    GiteaHttp(String),

    #[error("gitea returned status {status}: {message}")]
    GiteaStatus { status: u16, message: String },

    #[error("malformed gitea response: {0}")]
    GiteaDecode(String),

    #[error(
        "another archive run holds the lock at {0}; if the previous run crashed, re-run with --break-locks"
    )]
    LockContention(Utf8PathBuf),

    #[error("cache file {path} exists but could not be parsed: {message}")]
    StateCorrupt { path: Utf8PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
