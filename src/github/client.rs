// src/github/client.rs
// =============================================================================
// A thin client over the GitHub REST API (repos, contents and commits).
//
// Every request:
// - Sends the v3 JSON Accept header and a User-Agent (GitHub requires one)
// - Adds "Authorization: Bearer <token>" when a token is configured.
//   Without a token the calls still work, just with a much lower rate limit.
// - Turns any non-2xx answer into SyncError::RemoteApi, keeping GitHub's own
//   "message" field when the body has one
//
// There are no retries here. A personal tool is better off showing a rate
// limit error than hiding it behind a backoff loop.
//
// Rust concepts:
// - Generic functions: get_json<T> works for any Deserialize type
// - #[serde(untagged)]: Lets one enum accept "object OR array" JSON
// =============================================================================

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::url::RemoteLocation;
use crate::config::GithubSettings;
use crate::error::{Result, SyncError};

// Kind of an entry in a contents listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// symlinks and submodules are never imported
    #[serde(other)]
    Other,
}

// One item of GET /repos/{owner}/{repo}/contents/{path}
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    /// Full path from the repository root
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    /// Only present when the path points at a single file
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentEntry {
    // Decodes an inlined body (only present when a single file was listed)
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_content(self)
    }
}

// The contents endpoint returns an object for a file and an array for a
// directory. This enum soaks up both so list_contents can always hand back
// a Vec.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Many(Vec<ContentEntry>),
    One(Box<ContentEntry>),
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(settings: &GithubSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("skill-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone().filter(|t| !t.is_empty()),
        })
    }

    // Name of the branch GitHub serves when no ref is given
    pub async fn get_default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        let info: RepoInfo = self
            .get_json(&["repos", owner, repo], &[])
            .await?;
        Ok(info.default_branch.unwrap_or_else(|| "main".to_string()))
    }

    // The ref to use for a location: the one in the URL, or the default branch
    pub async fn resolve_ref(&self, location: &RemoteLocation) -> Result<String> {
        match &location.git_ref {
            Some(git_ref) => Ok(git_ref.clone()),
            None => self.get_default_branch(&location.owner, &location.repo).await,
        }
    }

    // Lists a path. Always returns a sequence, even when the path is a file.
    pub async fn list_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<ContentEntry>> {
        let response: ContentsResponse = self
            .get_json(&contents_segments(owner, repo, path), &ref_query(git_ref))
            .await?;

        Ok(match response {
            ContentsResponse::Many(entries) => entries,
            ContentsResponse::One(entry) => vec![*entry],
        })
    }

    // Downloads one file and decodes it
    //
    // The contents API inlines file bodies as base64. Anything other than
    // base64 or plain text (e.g. "none" for very large files) is rejected.
    pub async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>> {
        let entries = self.list_contents(owner, repo, path, git_ref).await?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Decode(format!("{} returned no content", path)))?;

        entry.decode()
    }

    // SHA of the newest commit touching `path` on `git_ref`, if any
    pub async fn get_latest_commit_sha(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>> {
        let mut query = vec![("path", path), ("per_page", "1")];
        if !git_ref.is_empty() {
            query.push(("sha", git_ref));
        }

        let commits: Vec<CommitEntry> = self
            .get_json(&["repos", owner, repo, "commits"], &query)
            .await?;

        Ok(commits.into_iter().next().map(|commit| commit.sha))
    }

    // Each segment is percent-encoded on its own, so a '#' or '?' in a file
    // name stays part of the path
    fn endpoint_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let invalid = || SyncError::InvalidUrlFormat(self.api_base.clone());

        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint_url(segments, query)?;
        debug!(%url, "GitHub request");

        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("GitHub API error: {}", status.as_u16()));

            return Err(SyncError::RemoteApi {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

// ["repos", owner, repo, "contents", ...path]; the empty root path keeps
// its trailing slash
fn contents_segments<'a>(owner: &'a str, repo: &'a str, path: &'a str) -> Vec<&'a str> {
    let mut segments = vec!["repos", owner, repo, "contents"];
    segments.extend(path.split('/'));
    segments
}

fn ref_query(git_ref: &str) -> Vec<(&str, &str)> {
    if git_ref.is_empty() {
        Vec::new()
    } else {
        vec![("ref", git_ref)]
    }
}

fn decode_content(entry: &ContentEntry) -> Result<Vec<u8>> {
    let raw = entry.content.as_deref().unwrap_or("");

    match entry.encoding.as_deref() {
        Some("base64") => {
            // GitHub wraps the base64 body at 60 columns
            let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map_err(|e| SyncError::Decode(format!("{}: {}", entry.path, e)))
        }
        None | Some("") | Some("utf-8") => Ok(raw.as_bytes().to_vec()),
        Some(other) => Err(SyncError::Decode(format!(
            "{}: unsupported encoding '{}'",
            entry.path, other
        ))),
    }
}
