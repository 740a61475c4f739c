use std::fs;
use std::io;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::{BranchName, RemoteBranch, RepoName, Username};
use crate::error::ArchiverError;

/// Read access to the four Gitea endpoints the archiver consumes. A single
/// failure aborts the whole run, so no operation retries.
pub trait GiteaClient: Send + Sync {
    fn current_user(&self) -> Result<Username, ArchiverError>;
    fn list_repositories(&self, user: &Username) -> Result<Vec<RepoName>, ArchiverError>;
    fn list_branches(
        &self,
        user: &Username,
        repo: &RepoName,
    ) -> Result<Vec<RemoteBranch>, ArchiverError>;
    /// Streams the branch archive to `destination`, creating parent
    /// directories and replacing any existing file.
    fn download_archive(
        &self,
        user: &Username,
        repo: &RepoName,
        branch: &BranchName,
        destination: &Path,
    ) -> Result<(), ArchiverError>;
}

#[derive(Clone)]
pub struct GiteaHttpClient {
    client: Client,
    api_root: String,
}

impl GiteaHttpClient {
    /// Builds a session against `base_url` with the token presented on every
    /// request. No timeout beyond the transport default: a hung remote call
    /// blocks the run.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ArchiverError> {
        let api_root = api_root(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gitea-archiver/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ArchiverError::GiteaHttp(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|err| ArchiverError::GiteaHttp(err.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ArchiverError::GiteaHttp(err.to_string()))?;

        Ok(Self { client, api_root })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ArchiverError> {
        tracing::debug!(url, "gitea request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ArchiverError::GiteaHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "gitea request failed".to_string());
            return Err(ArchiverError::GiteaStatus { status, message });
        }
        response
            .json::<T>()
            .map_err(|err| ArchiverError::GiteaDecode(err.to_string()))
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), ArchiverError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "gitea request failed".to_string());
            return Err(ArchiverError::GiteaStatus { status, message });
        }

        let parent = destination
            .parent()
            .ok_or_else(|| ArchiverError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent).map_err(|err| ArchiverError::Filesystem(err.to_string()))?;

        let mut temp = tempfile::Builder::new()
            .prefix("gitea-archive")
            .tempfile_in(parent)
            .map_err(|err| ArchiverError::Filesystem(err.to_string()))?;
        // An interrupted stream must surface as an error, never as a
        // silently truncated archive.
        io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| ArchiverError::GiteaHttp(format!("archive download: {err}")))?;
        if destination.exists() {
            fs::remove_file(destination)
                .map_err(|err| ArchiverError::Filesystem(err.to_string()))?;
        }
        temp.persist(destination)
            .map_err(|err| ArchiverError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl GiteaClient for GiteaHttpClient {
    fn current_user(&self) -> Result<Username, ArchiverError> {
        let user: UserResponse = self.get_json(&format!("{}/user", self.api_root))?;
        user.login.parse()
    }

    fn list_repositories(&self, _user: &Username) -> Result<Vec<RepoName>, ArchiverError> {
        let repos: Vec<RepoResponse> = self.get_json(&format!("{}/user/repos", self.api_root))?;
        repos.into_iter().map(|repo| repo.name.parse()).collect()
    }

    fn list_branches(
        &self,
        user: &Username,
        repo: &RepoName,
    ) -> Result<Vec<RemoteBranch>, ArchiverError> {
        let url = format!("{}/repos/{user}/{repo}/branches", self.api_root);
        let branches: Vec<BranchResponse> = self.get_json(&url)?;
        branches
            .into_iter()
            .map(|branch| {
                Ok(RemoteBranch {
                    name: branch.name.parse()?,
                    commit: branch.commit.id.parse()?,
                })
            })
            .collect()
    }

    fn download_archive(
        &self,
        user: &Username,
        repo: &RepoName,
        branch: &BranchName,
        destination: &Path,
    ) -> Result<(), ArchiverError> {
        let url = format!("{}/repos/{user}/{repo}/archive/{branch}.zip", self.api_root);
        tracing::debug!(url, "gitea archive download");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| ArchiverError::GiteaHttp(err.to_string()))?;
        self.write_response_to_file(response, destination)
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    name: String,
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    id: String,
}

/// Resolves the API root by appending the fixed `/api/v1` segment.
pub fn api_root(base_url: &str) -> Result<String, ArchiverError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ArchiverError::InvalidBaseUrl(base_url.to_string()));
    }
    Ok(format!("{trimmed}/api/v1"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn api_root_appends_fixed_segment() {
        assert_eq!(
            api_root("https://git.example.com").unwrap(),
            "https://git.example.com/api/v1"
        );
        assert_eq!(
            api_root("https://git.example.com/").unwrap(),
            "https://git.example.com/api/v1"
        );
    }

    #[test]
    fn api_root_rejects_non_http() {
        let err = api_root("git.example.com").unwrap_err();
        assert_matches!(err, ArchiverError::InvalidBaseUrl(_));
    }

    #[test]
    fn decode_branch_listing() {
        let body = r#"[
            {"name": "main", "commit": {"id": "abc123", "message": "init"}},
            {"name": "dev", "commit": {"id": "def456"}}
        ]"#;
        let branches: Vec<BranchResponse> = serde_json::from_str(body).unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name, "main");
        assert_eq!(branches[1].commit.id, "def456");
    }

    #[test]
    fn decode_user_and_repos() {
        let user: UserResponse = serde_json::from_str(r#"{"login": "alice", "id": 1}"#).unwrap();
        assert_eq!(user.login, "alice");

        let repos: Vec<RepoResponse> =
            serde_json::from_str(r#"[{"name": "proj"}, {"name": "tools"}]"#).unwrap();
        assert_eq!(repos[1].name, "tools");
    }
}
