// src/github/tree.rs
// =============================================================================
// Walks a repository subtree through the contents API.
//
// Two flavours share the same walk:
// - download_files: a flat list of every importable file with its content
// - build_tree: nested names/types only, for browsing without a local copy
//
// How it works:
// 1. List the directory at `path`
// 2. For each entry compute its path relative to the import root (`base`)
// 3. Skip the entry if the exclusion filter matches its relative path or its
//    name. A skipped directory is never listed, so its subtree is pruned.
// 4. Files are fetched, directories are walked recursively with the same base
//
// Order: output follows GitHub's listing order, depth first. Requests run a
// few at a time (one semaphore for the whole walk), but `buffered` hands
// results back in listing order, so the output is deterministic for a fixed
// tree.
//
// Rust concepts:
// - BoxFuture: async fns cannot call themselves directly, the recursive
//   future has to be boxed so its size is known
// - TryStreamExt::try_collect: Stops at the first error
// =============================================================================

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Semaphore;

use super::client::{ContentEntry, EntryKind, GitHubClient};
use super::filter::should_exclude;
use crate::error::Result;

// How many GitHub requests one download keeps in flight, across all levels
const FETCH_CONCURRENCY: usize = 8;

// A downloaded file, ready to be written to blob storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Bare file name
    pub name: String,
    /// Path relative to the import root (not the repository root)
    pub path: String,
    pub content: Vec<u8>,
    pub size: u64,
}

impl RemoteFile {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir,
}

// One node of a browsable tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RemoteTreeNode>>,
}

impl RemoteTreeNode {
    // Every file path in the tree, depth first
    pub fn file_paths(nodes: &[RemoteTreeNode]) -> Vec<String> {
        let mut paths = Vec::new();
        for node in nodes {
            match node.kind {
                NodeKind::File => paths.push(node.path.clone()),
                NodeKind::Dir => {
                    paths.extend(Self::file_paths(node.children.as_deref().unwrap_or(&[])))
                }
            }
        }
        paths
    }

    // Folds a flat list of relative paths ("a/b.md") back into a tree
    //
    // Used for skills stored locally, so browsing looks the same whether the
    // files come from GitHub or from blob storage. Siblings are sorted by name.
    pub fn from_paths(paths: &[String]) -> Vec<RemoteTreeNode> {
        #[derive(Default)]
        struct Dir {
            dirs: BTreeMap<String, Dir>,
            files: Vec<String>,
        }

        let mut root = Dir::default();
        for path in paths {
            let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
            let Some(file) = parts.pop() else { continue };
            let mut dir = &mut root;
            for part in parts {
                dir = dir.dirs.entry(part.to_string()).or_default();
            }
            dir.files.push(file.to_string());
        }

        fn fold(dir: Dir, prefix: &str) -> Vec<RemoteTreeNode> {
            let join = |name: &str| {
                if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", prefix, name)
                }
            };

            let mut nodes: Vec<RemoteTreeNode> = dir
                .dirs
                .into_iter()
                .map(|(name, sub)| {
                    let path = join(&name);
                    let children = fold(sub, &path);
                    RemoteTreeNode {
                        name,
                        path,
                        kind: NodeKind::Dir,
                        size: None,
                        children: Some(children),
                    }
                })
                .collect();

            let mut files = dir.files;
            files.sort();
            nodes.extend(files.into_iter().map(|name| RemoteTreeNode {
                path: join(&name),
                name,
                kind: NodeKind::File,
                size: None,
                children: None,
            }));
            nodes
        }

        fold(root, "")
    }
}

// Path of `entry_path` relative to the import root
//
// "docs/skill/refs/a.md" under base "docs/skill" -> "refs/a.md".
// A blob link lists the file itself, in which case the bare name is used.
fn relative_path(base: &str, entry: &ContentEntry) -> String {
    if base.is_empty() {
        return entry.path.clone();
    }
    if entry.path == base {
        return entry.name.clone();
    }
    match entry.path.strip_prefix(base).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => entry.path.clone(),
    }
}

// Downloads every importable file under `subpath`
pub async fn download_files(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    subpath: &str,
    git_ref: &str,
) -> Result<Vec<RemoteFile>> {
    let walk = FileWalk {
        client,
        owner,
        repo,
        base: subpath,
        git_ref,
        permits: Semaphore::new(FETCH_CONCURRENCY),
    };
    walk.walk(subpath.to_string()).await
}

// State shared by every level of one download
//
// The semaphore caps the GitHub requests in flight for the whole walk. A
// permit covers a single request and is released before a subdirectory is
// walked, so nested levels never wait on their parents.
struct FileWalk<'a> {
    client: &'a GitHubClient,
    owner: &'a str,
    repo: &'a str,
    base: &'a str,
    git_ref: &'a str,
    permits: Semaphore,
}

impl<'a> FileWalk<'a> {
    fn walk(&self, path: String) -> BoxFuture<'_, Result<Vec<RemoteFile>>> {
        async move {
            let entries = {
                let _permit = self.permits.acquire().await.ok();
                self.client
                    .list_contents(self.owner, self.repo, &path, self.git_ref)
                    .await?
            };

            let wanted = entries.into_iter().filter_map(|entry| {
                let relative = relative_path(self.base, &entry);
                (!should_exclude(&relative, &entry.name)).then_some((entry, relative))
            });

            let batches: Vec<Vec<RemoteFile>> = stream::iter(wanted)
                .map(move |(entry, relative)| self.fetch_entry(entry, relative))
                .buffered(FETCH_CONCURRENCY)
                .try_collect()
                .await?;

            Ok(batches.into_iter().flatten().collect())
        }
        .boxed()
    }

    // One listing entry: a file becomes a single RemoteFile, a directory is walked
    async fn fetch_entry(&self, entry: ContentEntry, relative: String) -> Result<Vec<RemoteFile>> {
        match entry.kind {
            EntryKind::File => {
                // A listing of a single file already carries the body
                let content = match &entry.content {
                    Some(_) => entry.decode()?,
                    None => {
                        let _permit = self.permits.acquire().await.ok();
                        self.client
                            .get_file_content(self.owner, self.repo, &entry.path, self.git_ref)
                            .await?
                    }
                };
                Ok(vec![RemoteFile {
                    name: entry.name,
                    path: relative,
                    content,
                    size: entry.size,
                }])
            }
            EntryKind::Dir => self.walk(entry.path).await,
            EntryKind::Other => Ok(Vec::new()),
        }
    }
}

// Builds the browsable tree under `subpath` without downloading file bodies
pub async fn build_tree(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    subpath: &str,
    git_ref: &str,
) -> Result<Vec<RemoteTreeNode>> {
    walk_tree(client, owner, repo, subpath.to_string(), subpath, git_ref).await
}

fn walk_tree<'a>(
    client: &'a GitHubClient,
    owner: &'a str,
    repo: &'a str,
    path: String,
    base: &'a str,
    git_ref: &'a str,
) -> BoxFuture<'a, Result<Vec<RemoteTreeNode>>> {
    async move {
        let entries = client.list_contents(owner, repo, &path, git_ref).await?;
        let mut nodes = Vec::new();

        for entry in entries {
            let relative = relative_path(base, &entry);
            if should_exclude(&relative, &entry.name) {
                continue;
            }

            match entry.kind {
                EntryKind::File => nodes.push(RemoteTreeNode {
                    name: entry.name,
                    path: relative,
                    kind: NodeKind::File,
                    size: Some(entry.size),
                    children: None,
                }),
                EntryKind::Dir => {
                    let children =
                        walk_tree(client, owner, repo, entry.path, base, git_ref).await?;
                    nodes.push(RemoteTreeNode {
                        name: entry.name,
                        path: relative,
                        kind: NodeKind::Dir,
                        size: None,
                        children: Some(children),
                    });
                }
                EntryKind::Other => {}
            }
        }

        Ok(nodes)
    }
    .boxed()
}
