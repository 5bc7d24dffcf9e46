// src/github/url.rs
// =============================================================================
// This module turns GitHub web URLs into the pieces the API needs.
//
// Three shapes are accepted, tried in this order against the raw string:
//   1. Repository root:  https://github.com/owner/repo
//   2. Tree (folder):    https://github.com/owner/repo/tree/<ref>/<path...>
//   3. Blob (file):      https://github.com/owner/repo/blob/<ref>/<path...>
//
// The first shape that matches wins. Nothing is normalized beyond what the
// capture groups give us: no percent-decoding, no trailing slash stripping.
//
// Rust concepts:
// - Lazy statics: Each regex is compiled once, on first use
// - Option<String>: A repository URL carries no ref at all, and that is
//   different from an empty ref
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

static ROOT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?github\.com/([^/]+)/([^/]+)/?$").unwrap()
});

static TREE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?github\.com/([^/]+)/([^/]+)/tree/([^/]+)(?:/(.*))?$")
        .unwrap()
});

static BLOB_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?github\.com/([^/]+)/([^/]+)/blob/([^/]+)(?:/(.*))?$")
        .unwrap()
});

// What kind of page the URL pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Repository,
    Folder,
    File,
}

// A parsed GitHub location
//
// `git_ref` is None for bare repository links. That means "whatever the
// default branch is when we fetch", so it is resolved per request and never
// written back as a literal branch name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub owner: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Relative to the repository root, forward slashes, "" for the root
    pub subpath: String,
    pub kind: LinkKind,
}

impl RemoteLocation {
    // "owner/repo" or "owner/repo/subpath", used in log lines and errors
    pub fn display_path(&self) -> String {
        if self.subpath.is_empty() {
            format!("{}/{}", self.owner, self.repo)
        } else {
            format!("{}/{}/{}", self.owner, self.repo, self.subpath)
        }
    }
}

// Parses a GitHub web URL
//
// Example:
//   "https://github.com/acme/widget/tree/dev/docs/skill"
//   -> owner "acme", repo "widget", ref Some("dev"), subpath "docs/skill"
pub fn parse_github_url(url: &str) -> Result<RemoteLocation> {
    if let Some(caps) = ROOT_PATTERN.captures(url) {
        return Ok(RemoteLocation {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
            git_ref: None,
            subpath: String::new(),
            kind: LinkKind::Repository,
        });
    }

    let shaped = [
        (&*TREE_PATTERN, LinkKind::Folder),
        (&*BLOB_PATTERN, LinkKind::File),
    ];

    for (pattern, kind) in shaped {
        if let Some(caps) = pattern.captures(url) {
            return Ok(RemoteLocation {
                owner: caps[1].to_string(),
                repo: caps[2].to_string(),
                git_ref: Some(caps[3].to_string()),
                subpath: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
                kind,
            });
        }
    }

    Err(SyncError::InvalidUrlFormat(url.to_string()))
}

// Builds the github.com page URL for one file of a bound skill
//
// `file_path` is relative to the skill root, so the location's subpath is
// put back in front of it. A location without a ref links to "main".
pub fn file_web_url(github_url: &str, file_path: &str) -> Result<String> {
    let location = parse_github_url(github_url)?;
    // A blob link's subpath already is the file
    let full_path = if location.kind == LinkKind::File {
        location.subpath.clone()
    } else if location.subpath.is_empty() {
        file_path.to_string()
    } else {
        format!("{}/{}", location.subpath, file_path)
    };
    let branch = location.git_ref.as_deref().unwrap_or("main");

    Ok(format!(
        "https://github.com/{}/{}/blob/{}/{}",
        location.owner, location.repo, branch, full_path
    ))
}
