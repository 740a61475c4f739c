use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiverError;

/// Login name of the authenticated Gitea user, as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Username {
    type Err = ArchiverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !is_valid_name(trimmed) {
            return Err(ArchiverError::InvalidUsername(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Repository name. Becomes a directory under the destination, so path
/// separators and dot components are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoName(String);

impl RepoName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RepoName {
    type Err = ArchiverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !is_valid_name(trimmed) {
            return Err(ArchiverError::InvalidRepoName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Branch name. Slashes are allowed (`feature/x` is a legal git branch) and
/// become subdirectories of the archive path, but no component may escape the
/// repository directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchName(String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BranchName {
    type Err = ArchiverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let components_ok = !trimmed.is_empty()
            && !trimmed.contains('\\')
            && trimmed.split('/').all(is_valid_name);
        if !components_ok {
            return Err(ArchiverError::InvalidBranchName(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Tip commit hash of a branch at listing time. Opaque change-detection
/// token; never interpreted beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitId(String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommitId {
    type Err = ArchiverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(ArchiverError::InvalidCommitId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A branch as reported by the remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    pub name: BranchName,
    pub commit: CommitId,
}

fn is_valid_name(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains('/')
        && !value.contains('\\')
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_username_valid() {
        let user: Username = " alice ".parse().unwrap();
        assert_eq!(user.as_str(), "alice");
    }

    #[test]
    fn parse_username_invalid() {
        let err = "a/b".parse::<Username>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidUsername(_));
        let err = "".parse::<Username>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidUsername(_));
    }

    #[test]
    fn parse_repo_name_rejects_traversal() {
        let err = "..".parse::<RepoName>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidRepoName(_));
        let err = "a/b".parse::<RepoName>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidRepoName(_));
    }

    #[test]
    fn parse_branch_name_allows_nested() {
        let branch: BranchName = "feature/login".parse().unwrap();
        assert_eq!(branch.as_str(), "feature/login");
    }

    #[test]
    fn parse_branch_name_rejects_escape() {
        let err = "../main".parse::<BranchName>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidBranchName(_));
        let err = "a//b".parse::<BranchName>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidBranchName(_));
    }

    #[test]
    fn parse_commit_id() {
        let commit: CommitId = "abc123".parse().unwrap();
        assert_eq!(commit.as_str(), "abc123");
        let err = " ".parse::<CommitId>().unwrap_err();
        assert_matches!(err, ArchiverError::InvalidCommitId(_));
    }
}
