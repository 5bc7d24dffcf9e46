// src/github/mod.rs
// =============================================================================
// This module handles everything that talks to (or about) GitHub.
//
// Submodules:
// - url: Parsing github.com links into owner/repo/ref/subpath
// - client: Authenticated calls to the REST API
// - filter: Which repository files belong in a skill
// - tree: Recursive walks that download files or build a browsable tree
// - fingerprint: Latest commit SHA, used to detect upstream changes
// - links: Spotting GitHub URLs inside skill documents
// =============================================================================

mod client;
mod filter;
mod fingerprint;
mod links;
mod tree;
mod url;

pub use client::GitHubClient;
pub use fingerprint::{has_changed, latest_commit};
pub use links::detect_github_links;
pub use tree::{build_tree, download_files, NodeKind, RemoteFile, RemoteTreeNode};
pub use self::url::{file_web_url, parse_github_url, LinkKind, RemoteLocation};
