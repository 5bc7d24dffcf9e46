// src/import/orchestrator.rs
// =============================================================================
// The Importer: everything that moves a skill between GitHub and local storage.
//
// Operations:
// - import_from_url / import_from_url_streamed: create a skill from a URL
// - bind_existing / unbind: attach or detach a GitHub source
// - check_update: compare the stored fingerprint with the latest commit
// - sync_skill: re-download and overwrite, advancing the fingerprint
// - bulk_check_all: check every bound skill, flag the changed ones
// - regenerate_tags: ask the tag assistant again for a stored skill
// - detect_links_in, browse, browse_url, read_file: read-only helpers
//
// Storage modes:
//   local      files are downloaded and written to blob storage
//   reference  only the tree is read; files are fetched again on demand
//
// A local import writes blobs before the skill record exists. If anything
// fails after the first write, the blobs under the fresh id are deleted again
// so no orphaned files are left behind.
// =============================================================================

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};
use uuid::Uuid;

use super::progress::{file_progress, ImportEvent, ProgressReporter};
use crate::error::{Result, SyncError};
use crate::github::{
    build_tree, detect_github_links, download_files, has_changed, latest_commit,
    parse_github_url, GitHubClient, LinkKind, RemoteFile, RemoteLocation, RemoteTreeNode,
};
use crate::skill::{
    canonical_document, content_preview, extract_description, extract_name, BlobStorage,
    GithubBinding, Skill, SkillKind, SkillPatch, SkillRepository, StorageMode, PREVIEW_CHARS,
};
use crate::tags::{TagAssistant, TagRequest};

// How many bound skills bulk_check_all asks about at the same time
const BULK_CONCURRENCY: usize = 4;

// Result of a single update check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    pub has_update: bool,
    pub current_fingerprint: Option<String>,
    pub latest_fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckSummary {
    pub checked_count: usize,
    pub updated_count: usize,
}

// What the canonical document told us about a skill
#[derive(Debug, Default)]
struct DocumentInfo {
    main_file: Option<String>,
    name: Option<String>,
    description: String,
    preview: String,
}

impl DocumentInfo {
    fn new(main_file: Option<String>, text: Option<&str>) -> Self {
        Self {
            main_file,
            name: text.and_then(extract_name),
            description: text.map(extract_description).unwrap_or_default(),
            preview: text
                .map(|t| content_preview(t, PREVIEW_CHARS))
                .unwrap_or_default(),
        }
    }

    fn from_files(files: &[RemoteFile]) -> Self {
        let main = canonical_document(files.iter().map(|f| f.path.as_str())).map(str::to_string);
        let text = main
            .as_deref()
            .and_then(|main| files.iter().find(|f| f.path == main))
            .map(RemoteFile::text);

        Self::new(main, text.as_deref())
    }
}

// Everything known about a skill right before its record is created
struct Draft<'a> {
    id: String,
    url: &'a str,
    location: &'a RemoteLocation,
    git_ref: &'a str,
    kind: SkillKind,
    mode: StorageMode,
    doc: DocumentInfo,
}

pub struct Importer {
    github: GitHubClient,
    skills: Arc<dyn SkillRepository>,
    blobs: Arc<dyn BlobStorage>,
    tags: Arc<dyn TagAssistant>,
}

impl Importer {
    pub fn new(
        github: GitHubClient,
        skills: Arc<dyn SkillRepository>,
        blobs: Arc<dyn BlobStorage>,
        tags: Arc<dyn TagAssistant>,
    ) -> Self {
        Self {
            github,
            skills,
            blobs,
            tags,
        }
    }

    // -------------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------------

    pub async fn import_from_url(&self, url: &str, mode: StorageMode) -> Result<Skill> {
        self.run_import(url, mode, &ProgressReporter::silent()).await
    }

    // Starts an import in the background and returns its event stream
    //
    // The receiver yields Progress events followed by exactly one Complete or
    // Error, then closes. Dropping the receiver does not cancel the import.
    pub fn import_from_url_streamed(
        self: &Arc<Self>,
        url: &str,
        mode: StorageMode,
    ) -> UnboundedReceiver<ImportEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let importer = Arc::clone(self);
        let url = url.to_string();

        tokio::spawn(async move {
            let progress = ProgressReporter::channel(sender);
            match importer.run_import(&url, mode, &progress).await {
                Ok(skill) => {
                    progress.report(100, "Import complete");
                    progress.complete(skill);
                }
                Err(e) => {
                    warn!(%url, error = %e, "streamed import failed");
                    progress.fail(e.to_string());
                }
            }
        });

        receiver
    }

    async fn run_import(
        &self,
        url: &str,
        mode: StorageMode,
        progress: &ProgressReporter,
    ) -> Result<Skill> {
        let location = parse_github_url(url)?;
        progress.report(5, format!("Parsed {}", location.display_path()));

        let git_ref = self.github.resolve_ref(&location).await?;
        progress.report(10, format!("Using ref {}", git_ref));
        info!(url, git_ref = %git_ref, ?mode, "importing skill");

        match mode {
            StorageMode::Local => self.import_local(url, &location, &git_ref, progress).await,
            StorageMode::Reference => {
                self.import_reference(url, &location, &git_ref, progress)
                    .await
            }
        }
    }

    async fn import_local(
        &self,
        url: &str,
        location: &RemoteLocation,
        git_ref: &str,
        progress: &ProgressReporter,
    ) -> Result<Skill> {
        progress.report(20, "Downloading files");
        let files = download_files(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            git_ref,
        )
        .await?;

        if files.is_empty() {
            return Err(SyncError::EmptyRepository {
                location: location.display_path(),
            });
        }

        let doc = DocumentInfo::from_files(&files);
        progress.report(50, format!("Fetched {} file(s)", files.len()));

        let draft = Draft {
            id: Uuid::new_v4().to_string(),
            url,
            location,
            git_ref,
            kind: kind_for(files.len()),
            mode: StorageMode::Local,
            doc,
        };
        let id = draft.id.clone();

        let result = self.store_files_and_record(draft, &files, progress).await;
        if result.is_err() {
            if let Err(e) = self.blobs.delete_all(&id).await {
                warn!(skill = %id, error = %e, "could not remove files of failed import");
            }
        }
        result
    }

    async fn store_files_and_record(
        &self,
        draft: Draft<'_>,
        files: &[RemoteFile],
        progress: &ProgressReporter,
    ) -> Result<Skill> {
        for (index, file) in files.iter().enumerate() {
            self.blobs.put(&draft.id, &file.path, &file.content).await?;
            progress.report(
                file_progress(index, files.len()),
                format!("Saved {} ({}/{})", file.path, index + 1, files.len()),
            );
        }

        self.create_record(draft, progress).await
    }

    async fn import_reference(
        &self,
        url: &str,
        location: &RemoteLocation,
        git_ref: &str,
        progress: &ProgressReporter,
    ) -> Result<Skill> {
        progress.report(20, "Reading repository tree");
        let paths = self.remote_file_paths(location, git_ref).await?;

        let main = canonical_document(paths.iter().map(String::as_str)).map(str::to_string);
        let text = match &main {
            Some(main) => Some(self.fetch_remote_text(location, git_ref, main).await?),
            None => None,
        };
        progress.report(50, format!("Found {} file(s)", paths.len()));

        let draft = Draft {
            id: Uuid::new_v4().to_string(),
            url,
            location,
            git_ref,
            kind: kind_for(paths.len()),
            mode: StorageMode::Reference,
            doc: DocumentInfo::new(main, text.as_deref()),
        };
        self.create_record(draft, progress).await
    }

    // Fingerprint, tags, then the record itself
    async fn create_record(&self, draft: Draft<'_>, progress: &ProgressReporter) -> Result<Skill> {
        let location = draft.location;
        let commit = latest_commit(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            draft.git_ref,
        )
        .await?;

        let name = draft
            .doc
            .name
            .clone()
            .unwrap_or_else(|| location.repo.clone());

        progress.report(85, "Generating tags");
        let tags = self.suggest_tags(&name, &draft.doc).await;

        let now = Utc::now();
        let skill = Skill {
            id: draft.id,
            name,
            description: draft.doc.description,
            tags,
            kind: draft.kind,
            main_file: draft.doc.main_file,
            starred: false,
            deleted: false,
            deleted_at: None,
            created_at: now,
            github: GithubBinding {
                github_url: Some(draft.url.to_string()),
                github_last_commit: commit,
                github_last_check: Some(now),
                has_update: false,
                is_customized: false,
                storage_mode: draft.mode,
            },
        };

        progress.report(95, "Saving skill");
        let skill = self.skills.create(skill).await?;
        info!(skill = %skill.id, name = %skill.name, "skill imported");
        Ok(skill)
    }

    async fn suggest_tags(&self, name: &str, doc: &DocumentInfo) -> Vec<String> {
        let vocabulary = self.skills.distinct_tags().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not read tag vocabulary");
            Vec::new()
        });

        self.tags
            .suggest_tags(&TagRequest {
                name: name.to_string(),
                description: doc.description.clone(),
                content_preview: doc.preview.clone(),
                vocabulary,
            })
            .await
    }

    // Replaces a skill's tags with fresh suggestions for its main document
    //
    // An assistant that has nothing to say leaves the skill untagged, the
    // same as at import time.
    pub async fn regenerate_tags(&self, skill_id: &str) -> Result<Skill> {
        let skill = self.require(skill_id).await?;

        let text = match &skill.main_file {
            Some(main) => {
                let bytes = self.read_skill_file(&skill, main).await?;
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            None => None,
        };
        let mut doc = DocumentInfo::new(skill.main_file.clone(), text.as_deref());
        if doc.description.is_empty() {
            doc.description = skill.description.clone();
        }

        let tags = self.suggest_tags(&skill.name, &doc).await;
        let updated = self
            .skills
            .update(
                &skill.id,
                SkillPatch {
                    tags: Some(tags),
                    ..SkillPatch::default()
                },
            )
            .await?;
        info!(skill = %updated.id, tags = ?updated.tags, "tags regenerated");
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    // Attaches a GitHub source to an existing skill without touching its files
    pub async fn bind_existing(&self, skill_id: &str, url: &str) -> Result<GithubBinding> {
        let skill = self.require(skill_id).await?;
        let location = parse_github_url(url)?;
        let git_ref = self.github.resolve_ref(&location).await?;
        let commit = latest_commit(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            &git_ref,
        )
        .await?;

        let updated = self
            .skills
            .update(
                &skill.id,
                SkillPatch::bound(Some(url.to_string()), commit, Utc::now()),
            )
            .await?;
        info!(skill = %skill.id, url, "skill bound");
        Ok(updated.github)
    }

    pub async fn unbind(&self, skill_id: &str) -> Result<()> {
        let skill = self.require(skill_id).await?;
        if skill.github.storage_mode == StorageMode::Reference {
            return Err(SyncError::ReferenceUnbind(skill.id));
        }

        self.skills.update(&skill.id, SkillPatch::unbind()).await?;
        info!(skill = %skill.id, "skill unbound");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Change detection
    // -------------------------------------------------------------------------

    pub async fn check_update(&self, skill_id: &str) -> Result<UpdateCheck> {
        let skill = self.require(skill_id).await?;
        let (location, git_ref) = self.bound_location(&skill).await?;
        let latest = latest_commit(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            &git_ref,
        )
        .await?;

        let current = skill.github.github_last_commit.clone();
        let has_update = has_changed(current.as_deref(), latest.as_deref());
        self.skills
            .update(&skill.id, SkillPatch::checked(has_update, Utc::now()))
            .await?;

        info!(skill = %skill.id, has_update, "update check");
        Ok(UpdateCheck {
            has_update,
            current_fingerprint: current,
            latest_fingerprint: latest,
        })
    }

    // Checks every bound skill and flags the ones that moved
    //
    // Per-skill failures are logged and counted as "no update".
    pub async fn bulk_check_all(&self) -> Result<BulkCheckSummary> {
        let bound = self.skills.list_github_bound().await?;
        let checked_count = bound.len();

        let updated: Vec<String> = stream::iter(bound)
            .map(|skill| async move {
                let outcome = self.fingerprint_moved(&skill).await;
                (skill.id, outcome)
            })
            .buffer_unordered(BULK_CONCURRENCY)
            .filter_map(|(id, outcome)| async move {
                match outcome {
                    Ok(true) => Some(id),
                    Ok(false) => None,
                    Err(e) => {
                        warn!(skill = %id, error = %e, "update check failed");
                        None
                    }
                }
            })
            .collect()
            .await;

        self.skills.mark_has_update(&updated).await?;

        let summary = BulkCheckSummary {
            checked_count,
            updated_count: updated.len(),
        };
        info!(
            checked = summary.checked_count,
            updated = summary.updated_count,
            "bulk update check finished"
        );
        Ok(summary)
    }

    async fn fingerprint_moved(&self, skill: &Skill) -> Result<bool> {
        let (location, git_ref) = self.bound_location(skill).await?;
        let latest = latest_commit(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            &git_ref,
        )
        .await?;

        Ok(has_changed(
            skill.github.github_last_commit.as_deref(),
            latest.as_deref(),
        ))
    }

    // -------------------------------------------------------------------------
    // Sync
    // -------------------------------------------------------------------------

    // Full re-download over an existing skill
    //
    // Files are overwritten in place; files removed upstream stay. Tags are
    // left alone. Name and description only change when the canonical
    // document still provides them.
    pub async fn sync_skill(&self, skill_id: &str) -> Result<Skill> {
        let skill = self.require(skill_id).await?;
        let (location, git_ref) = self.bound_location(&skill).await?;

        let doc = match skill.github.storage_mode {
            StorageMode::Local => {
                let files = download_files(
                    &self.github,
                    &location.owner,
                    &location.repo,
                    &location.subpath,
                    &git_ref,
                )
                .await?;
                if files.is_empty() {
                    return Err(SyncError::EmptyRepository {
                        location: location.display_path(),
                    });
                }

                for file in &files {
                    self.blobs.put(&skill.id, &file.path, &file.content).await?;
                }
                DocumentInfo::from_files(&files)
            }
            StorageMode::Reference => {
                let paths = self.remote_file_paths(&location, &git_ref).await?;
                let main =
                    canonical_document(paths.iter().map(String::as_str)).map(str::to_string);
                let text = match &main {
                    Some(main) => Some(self.fetch_remote_text(&location, &git_ref, main).await?),
                    None => None,
                };
                DocumentInfo::new(main, text.as_deref())
            }
        };

        let commit = latest_commit(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            &git_ref,
        )
        .await?;

        let mut patch = SkillPatch::bound(None, commit, Utc::now());
        if let Some(name) = doc.name.filter(|name| *name != skill.name) {
            patch.name = Some(name);
        }
        if !doc.description.is_empty() && doc.description != skill.description {
            patch.description = Some(doc.description);
        }
        if doc.main_file.is_some() {
            patch.main_file = Some(doc.main_file);
        }

        let synced = self.skills.update(&skill.id, patch).await?;
        info!(
            skill = %synced.id,
            commit = ?synced.github.github_last_commit,
            "skill synced"
        );
        Ok(synced)
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    // GitHub links mentioned in the skill's canonical document
    pub async fn detect_links_in(&self, skill_id: &str) -> Result<Vec<String>> {
        let skill = self.require(skill_id).await?;
        let Some(main_file) = skill.main_file.clone() else {
            return Ok(Vec::new());
        };

        let bytes = self.read_skill_file(&skill, &main_file).await?;
        Ok(detect_github_links(&String::from_utf8_lossy(&bytes)))
    }

    // File tree of a stored skill, wherever its files live
    pub async fn browse(&self, skill_id: &str) -> Result<Vec<RemoteTreeNode>> {
        let skill = self.require(skill_id).await?;

        match skill.github.storage_mode {
            StorageMode::Reference => {
                let (location, git_ref) = self.bound_location(&skill).await?;
                build_tree(
                    &self.github,
                    &location.owner,
                    &location.repo,
                    &location.subpath,
                    &git_ref,
                )
                .await
            }
            StorageMode::Local => {
                let paths = self.blobs.list(&skill.id).await?;
                Ok(RemoteTreeNode::from_paths(&paths))
            }
        }
    }

    // File tree behind any GitHub URL, nothing stored
    pub async fn browse_url(&self, url: &str) -> Result<Vec<RemoteTreeNode>> {
        let location = parse_github_url(url)?;
        let git_ref = self.github.resolve_ref(&location).await?;
        build_tree(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            &git_ref,
        )
        .await
    }

    pub async fn read_file(&self, skill_id: &str, path: &str) -> Result<Vec<u8>> {
        let skill = self.require(skill_id).await?;
        self.read_skill_file(&skill, path).await
    }

    async fn read_skill_file(&self, skill: &Skill, path: &str) -> Result<Vec<u8>> {
        match skill.github.storage_mode {
            StorageMode::Local => self
                .blobs
                .get(&skill.id, path)
                .await?
                .ok_or_else(|| SyncError::FileNotFound(path.to_string())),
            StorageMode::Reference => {
                let (location, git_ref) = self.bound_location(skill).await?;
                self.github
                    .get_file_content(
                        &location.owner,
                        &location.repo,
                        &remote_path(&location, path),
                        &git_ref,
                    )
                    .await
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn require(&self, skill_id: &str) -> Result<Skill> {
        self.skills
            .get(skill_id)
            .await?
            .ok_or_else(|| SyncError::SkillNotFound(skill_id.to_string()))
    }

    // Parsed binding URL plus the ref to read it at
    async fn bound_location(&self, skill: &Skill) -> Result<(RemoteLocation, String)> {
        let url = skill
            .github
            .github_url
            .as_deref()
            .ok_or_else(|| SyncError::NotBound(skill.id.clone()))?;

        let location = parse_github_url(url)?;
        let git_ref = self.github.resolve_ref(&location).await?;
        Ok((location, git_ref))
    }

    async fn remote_file_paths(
        &self,
        location: &RemoteLocation,
        git_ref: &str,
    ) -> Result<Vec<String>> {
        let tree = build_tree(
            &self.github,
            &location.owner,
            &location.repo,
            &location.subpath,
            git_ref,
        )
        .await?;

        let paths = RemoteTreeNode::file_paths(&tree);
        if paths.is_empty() {
            return Err(SyncError::EmptyRepository {
                location: location.display_path(),
            });
        }
        Ok(paths)
    }

    async fn fetch_remote_text(
        &self,
        location: &RemoteLocation,
        git_ref: &str,
        relative: &str,
    ) -> Result<String> {
        let bytes = self
            .github
            .get_file_content(
                &location.owner,
                &location.repo,
                &remote_path(location, relative),
                git_ref,
            )
            .await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn kind_for(file_count: usize) -> SkillKind {
    if file_count == 1 {
        SkillKind::Md
    } else {
        SkillKind::Folder
    }
}

// Repository path of a file given relative to the skill root
fn remote_path(location: &RemoteLocation, relative: &str) -> String {
    match location.kind {
        LinkKind::File => location.subpath.clone(),
        _ if location.subpath.is_empty() => relative.to_string(),
        _ => format!("{}/{}", location.subpath, relative),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubSettings;
    use crate::skill::{FsBlobStore, JsonSkillStore};
    use async_trait::async_trait;
    use base64::Engine;
    use mockito::{Matcher, Server, ServerGuard};
    use tempfile::TempDir;

    const URL: &str = "https://github.com/acme/widget/tree/main/skill";
    const SKILL_DOC: &str = "---\nname: Foo\ndescription: Does foo\n---\nbar";

    struct StaticTags(Vec<String>);

    #[async_trait]
    impl TagAssistant for StaticTags {
        async fn suggest_tags(&self, _request: &TagRequest) -> Vec<String> {
            self.0.clone()
        }
    }

    struct Fixture {
        _dir: TempDir,
        _server: ServerGuard,
        importer: Arc<Importer>,
        skills: Arc<JsonSkillStore>,
        blobs: Arc<FsBlobStore>,
    }

    async fn fixture(server: ServerGuard) -> Fixture {
        let dir = TempDir::new().unwrap();
        let skills = Arc::new(JsonSkillStore::open(dir.path()).await.unwrap());
        let blobs = Arc::new(FsBlobStore::new(dir.path()));
        let github = GitHubClient::new(&GithubSettings {
            api_base: server.url(),
            token: None,
            timeout_secs: 5,
        })
        .unwrap();

        let importer = Arc::new(Importer::new(
            github,
            skills.clone(),
            blobs.clone(),
            Arc::new(StaticTags(vec!["Docs".to_string()])),
        ));

        Fixture {
            _dir: dir,
            _server: server,
            importer,
            skills,
            blobs,
        }
    }

    fn entry_json(name: &str, path: &str, kind: &str) -> String {
        format!(
            r#"{{"name":"{}","path":"{}","type":"{}","size":1}}"#,
            name, path, kind
        )
    }

    fn file_json(name: &str, path: &str, body: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(body);
        format!(
            r#"{{"name":"{}","path":"{}","type":"file","size":{},"content":"{}","encoding":"base64"}}"#,
            name,
            path,
            body.len(),
            encoded
        )
    }

    async fn mock_listing(server: &mut ServerGuard, path: &str, body: String) {
        server
            .mock("GET", format!("/repos/acme/widget/contents/{}", path).as_str())
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
    }

    async fn mock_commit(server: &mut ServerGuard, sha: &str) {
        server
            .mock("GET", "/repos/acme/widget/commits")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("path".into(), "skill".into()),
                Matcher::UrlEncoded("per_page".into(), "1".into()),
                Matcher::UrlEncoded("sha".into(), "main".into()),
            ]))
            .with_status(200)
            .with_body(format!(r#"[{{"sha":"{}"}}]"#, sha))
            .create_async()
            .await;
    }

    // skill/SKILL.md only
    async fn single_file_repo(server: &mut ServerGuard) {
        single_file_repo_with(server, SKILL_DOC).await;
    }

    async fn single_file_repo_with(server: &mut ServerGuard, body: &str) {
        mock_listing(
            server,
            "skill",
            format!("[{}]", entry_json("SKILL.md", "skill/SKILL.md", "file")),
        )
        .await;
        mock_listing(
            server,
            "skill/SKILL.md",
            file_json("SKILL.md", "skill/SKILL.md", body),
        )
        .await;
    }

    // skill/SKILL.md, skill/refs/a.md, skill/refs/b.md
    async fn three_file_repo(server: &mut ServerGuard) {
        mock_listing(
            server,
            "skill",
            format!(
                "[{},{}]",
                entry_json("SKILL.md", "skill/SKILL.md", "file"),
                entry_json("refs", "skill/refs", "dir"),
            ),
        )
        .await;
        mock_listing(
            server,
            "skill/refs",
            format!(
                "[{},{}]",
                entry_json("a.md", "skill/refs/a.md", "file"),
                entry_json("b.md", "skill/refs/b.md", "file"),
            ),
        )
        .await;
        mock_listing(
            server,
            "skill/SKILL.md",
            file_json("SKILL.md", "skill/SKILL.md", SKILL_DOC),
        )
        .await;
        mock_listing(
            server,
            "skill/refs/a.md",
            file_json("a.md", "skill/refs/a.md", "See https://github.com/acme/other"),
        )
        .await;
        mock_listing(
            server,
            "skill/refs/b.md",
            file_json("b.md", "skill/refs/b.md", "b"),
        )
        .await;
    }

    fn bound_skill(id: &str, url: Option<&str>, commit: Option<&str>) -> Skill {
        Skill {
            id: id.to_string(),
            name: "Old name".to_string(),
            description: String::new(),
            tags: Vec::new(),
            kind: SkillKind::Md,
            main_file: Some("SKILL.md".to_string()),
            starred: false,
            deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
            github: GithubBinding {
                github_url: url.map(str::to_string),
                github_last_commit: commit.map(str::to_string),
                ..GithubBinding::default()
            },
        }
    }

    #[tokio::test]
    async fn test_import_round_trip() {
        let mut server = Server::new_async().await;
        single_file_repo(&mut server).await;
        mock_commit(&mut server, "abc").await;
        let fx = fixture(server).await;

        let skill = fx
            .importer
            .import_from_url(URL, StorageMode::Local)
            .await
            .unwrap();

        assert_eq!(skill.name, "Foo");
        assert_eq!(skill.description, "Does foo");
        assert_eq!(skill.kind, SkillKind::Md);
        assert_eq!(skill.main_file.as_deref(), Some("SKILL.md"));
        assert_eq!(skill.tags, vec!["Docs"]);
        assert_eq!(skill.github.github_url.as_deref(), Some(URL));
        assert_eq!(skill.github.github_last_commit.as_deref(), Some("abc"));
        assert!(!skill.github.has_update);

        let stored = fx.blobs.get(&skill.id, "SKILL.md").await.unwrap().unwrap();
        assert_eq!(stored, SKILL_DOC.as_bytes());
        assert!(fx.skills.get(&skill.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_readme_and_license_only_is_empty() {
        let mut server = Server::new_async().await;
        mock_listing(
            &mut server,
            "skill",
            format!(
                "[{},{}]",
                entry_json("README.md", "skill/README.md", "file"),
                entry_json("LICENSE", "skill/LICENSE", "file"),
            ),
        )
        .await;
        let fx = fixture(server).await;

        let err = fx
            .importer
            .import_from_url(URL, StorageMode::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::EmptyRepository { .. }));
        assert!(fx
            .skills
            .list(&Default::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_streamed_import_event_sequence() {
        let mut server = Server::new_async().await;
        three_file_repo(&mut server).await;
        mock_commit(&mut server, "abc").await;
        let fx = fixture(server).await;

        let mut events = fx.importer.import_from_url_streamed(URL, StorageMode::Local);
        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push(event);
        }

        let percentages: Vec<u8> = received
            .iter()
            .filter_map(|e| match e {
                ImportEvent::Progress { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(percentages.first(), Some(&5));
        assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
        let per_file = percentages.iter().filter(|p| (60..=80).contains(*p)).count();
        assert!(per_file >= 3);

        let terminal: Vec<&ImportEvent> = received.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        match received.last().unwrap() {
            ImportEvent::Complete { result } => {
                assert_eq!(result.kind, SkillKind::Folder);
                assert_eq!(
                    fx.blobs.list(&result.id).await.unwrap(),
                    vec!["SKILL.md", "refs/a.md", "refs/b.md"]
                );
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_streamed_import_reports_error_once() {
        let server = Server::new_async().await;
        let fx = fixture(server).await;

        let mut events = fx
            .importer
            .import_from_url_streamed("https://gitlab.com/acme/widget", StorageMode::Local);
        let first = events.recv().await.unwrap();
        assert!(matches!(first, ImportEvent::Error { .. }));
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_import_removes_written_files() {
        let mut server = Server::new_async().await;
        single_file_repo(&mut server).await;
        server
            .mock("GET", "/repos/acme/widget/commits")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message":"Server Error"}"#)
            .create_async()
            .await;
        let fx = fixture(server).await;

        let err = fx
            .importer
            .import_from_url(URL, StorageMode::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteApi { status: 500, .. }));

        let skills_dir = fx._dir.path().join("skills");
        let leftovers = std::fs::read_dir(&skills_dir)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_check_update_when_unchanged() {
        let mut server = Server::new_async().await;
        mock_commit(&mut server, "abc").await;
        let fx = fixture(server).await;
        fx.skills
            .create(bound_skill("s1", Some(URL), Some("abc")))
            .await
            .unwrap();

        let before = Utc::now();
        let check = fx.importer.check_update("s1").await.unwrap();
        assert!(!check.has_update);
        assert_eq!(check.latest_fingerprint.as_deref(), Some("abc"));

        let stored = fx.skills.get("s1").await.unwrap().unwrap();
        assert!(!stored.github.has_update);
        assert!(stored.github.github_last_check.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_check_requires_binding() {
        let server = Server::new_async().await;
        let fx = fixture(server).await;
        fx.skills.create(bound_skill("s1", None, None)).await.unwrap();

        let err = fx.importer.check_update("s1").await.unwrap_err();
        assert!(matches!(err, SyncError::NotBound(_)));
        let err = fx.importer.sync_skill("s1").await.unwrap_err();
        assert!(matches!(err, SyncError::NotBound(_)));
    }

    #[tokio::test]
    async fn test_sync_advances_to_checked_fingerprint() {
        let mut server = Server::new_async().await;
        single_file_repo(&mut server).await;
        mock_commit(&mut server, "def").await;
        let fx = fixture(server).await;
        fx.skills
            .create(bound_skill("s1", Some(URL), Some("old")))
            .await
            .unwrap();

        let check = fx.importer.check_update("s1").await.unwrap();
        assert!(check.has_update);
        assert!(fx.skills.get("s1").await.unwrap().unwrap().github.has_update);

        let synced = fx.importer.sync_skill("s1").await.unwrap();
        assert_eq!(
            synced.github.github_last_commit,
            check.latest_fingerprint
        );
        assert!(!synced.github.has_update);
        assert_eq!(synced.name, "Foo");
        assert_eq!(synced.description, "Does foo");
        assert!(synced.tags.is_empty());
        assert!(fx.blobs.get("s1", "SKILL.md").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sync_of_emptied_remote_fails() {
        let mut server = Server::new_async().await;
        mock_listing(
            &mut server,
            "skill",
            format!("[{}]", entry_json("README.md", "skill/README.md", "file")),
        )
        .await;
        let fx = fixture(server).await;
        fx.skills
            .create(bound_skill("s1", Some(URL), Some("old")))
            .await
            .unwrap();

        let err = fx.importer.sync_skill("s1").await.unwrap_err();
        assert!(matches!(err, SyncError::EmptyRepository { .. }));

        let stored = fx.skills.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.github.github_last_commit.as_deref(), Some("old"));
        assert_eq!(stored.name, "Old name");
    }

    #[tokio::test]
    async fn test_sync_keeps_metadata_the_document_lacks() {
        let mut server = Server::new_async().await;
        single_file_repo_with(&mut server, "no front matter, no heading").await;
        mock_commit(&mut server, "def").await;
        let fx = fixture(server).await;

        let mut skill = bound_skill("s1", Some(URL), Some("old"));
        skill.description = "Kept description".to_string();
        fx.skills.create(skill).await.unwrap();

        let synced = fx.importer.sync_skill("s1").await.unwrap();
        assert_eq!(synced.name, "Old name");
        assert_eq!(synced.description, "Kept description");
        assert_eq!(synced.github.github_last_commit.as_deref(), Some("def"));
    }

    #[tokio::test]
    async fn test_sync_leaves_files_removed_upstream() {
        let mut server = Server::new_async().await;
        single_file_repo(&mut server).await;
        mock_commit(&mut server, "def").await;
        let fx = fixture(server).await;
        fx.skills
            .create(bound_skill("s1", Some(URL), Some("old")))
            .await
            .unwrap();
        fx.blobs.put("s1", "SKILL.md", b"stale").await.unwrap();
        fx.blobs.put("s1", "gone.md", b"removed upstream").await.unwrap();

        fx.importer.sync_skill("s1").await.unwrap();

        assert_eq!(
            fx.blobs.get("s1", "SKILL.md").await.unwrap().unwrap(),
            SKILL_DOC.as_bytes()
        );
        assert_eq!(
            fx.blobs.get("s1", "gone.md").await.unwrap().unwrap(),
            b"removed upstream"
        );
    }

    #[tokio::test]
    async fn test_reference_sync_only_refreshes_record() {
        let mut server = Server::new_async().await;
        three_file_repo(&mut server).await;
        mock_commit(&mut server, "def").await;
        let fx = fixture(server).await;

        let mut skill = bound_skill("s1", Some(URL), Some("old"));
        skill.github.storage_mode = StorageMode::Reference;
        skill.github.has_update = true;
        skill.tags = vec!["Keep".to_string()];
        fx.skills.create(skill).await.unwrap();

        let synced = fx.importer.sync_skill("s1").await.unwrap();
        assert_eq!(synced.github.github_last_commit.as_deref(), Some("def"));
        assert!(!synced.github.has_update);
        assert_eq!(synced.github.storage_mode, StorageMode::Reference);
        assert_eq!(synced.name, "Foo");
        assert_eq!(synced.description, "Does foo");
        assert_eq!(synced.main_file.as_deref(), Some("SKILL.md"));
        assert_eq!(synced.tags, vec!["Keep"]);
        assert!(fx.blobs.list("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_tags_replaces_existing() {
        let server = Server::new_async().await;
        let fx = fixture(server).await;

        let mut skill = bound_skill("s1", None, None);
        skill.tags = vec!["Stale".to_string()];
        fx.skills.create(skill).await.unwrap();
        fx.blobs.put("s1", "SKILL.md", SKILL_DOC.as_bytes()).await.unwrap();

        let updated = fx.importer.regenerate_tags("s1").await.unwrap();
        assert_eq!(updated.tags, vec!["Docs"]);
        assert_eq!(fx.skills.get("s1").await.unwrap().unwrap().tags, vec!["Docs"]);

        let err = fx.importer.regenerate_tags("missing").await.unwrap_err();
        assert!(matches!(err, SyncError::SkillNotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_check_isolates_failures() {
        let mut server = Server::new_async().await;
        mock_commit(&mut server, "new").await;
        server
            .mock("GET", "/repos/acme/gone/commits")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;
        let fx = fixture(server).await;

        fx.skills
            .create(bound_skill("moved", Some(URL), Some("old")))
            .await
            .unwrap();
        fx.skills
            .create(bound_skill(
                "gone",
                Some("https://github.com/acme/gone/tree/main/x"),
                Some("old"),
            ))
            .await
            .unwrap();
        fx.skills
            .create(bound_skill("local", None, None))
            .await
            .unwrap();

        let summary = fx.importer.bulk_check_all().await.unwrap();
        assert_eq!(
            summary,
            BulkCheckSummary {
                checked_count: 2,
                updated_count: 1
            }
        );
        assert!(fx.skills.get("moved").await.unwrap().unwrap().github.has_update);
        assert!(!fx.skills.get("gone").await.unwrap().unwrap().github.has_update);
    }

    #[tokio::test]
    async fn test_detect_links_in_canonical_document() {
        let server = Server::new_async().await;
        let fx = fixture(server).await;
        fx.skills.create(bound_skill("s1", None, None)).await.unwrap();
        fx.blobs
            .put(
                "s1",
                "SKILL.md",
                b"https://github.com/a/b and https://github.com/c/d then https://github.com/a/b",
            )
            .await
            .unwrap();

        let links = fx.importer.detect_links_in("s1").await.unwrap();
        assert_eq!(
            links,
            vec!["https://github.com/a/b", "https://github.com/c/d"]
        );
    }

    #[tokio::test]
    async fn test_bind_then_unbind() {
        let mut server = Server::new_async().await;
        mock_commit(&mut server, "abc").await;
        let fx = fixture(server).await;
        fx.skills.create(bound_skill("s1", None, None)).await.unwrap();

        let binding = fx.importer.bind_existing("s1", URL).await.unwrap();
        assert_eq!(binding.github_url.as_deref(), Some(URL));
        assert_eq!(binding.github_last_commit.as_deref(), Some("abc"));
        assert!(!binding.has_update);

        fx.importer.unbind("s1").await.unwrap();
        let stored = fx.skills.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.github, GithubBinding::default());
    }

    #[tokio::test]
    async fn test_reference_import_browse_and_read() {
        let mut server = Server::new_async().await;
        three_file_repo(&mut server).await;
        mock_commit(&mut server, "abc").await;
        let fx = fixture(server).await;

        let skill = fx
            .importer
            .import_from_url(URL, StorageMode::Reference)
            .await
            .unwrap();
        assert_eq!(skill.github.storage_mode, StorageMode::Reference);
        assert_eq!(skill.name, "Foo");
        assert!(fx.blobs.list(&skill.id).await.unwrap().is_empty());

        let tree = fx.importer.browse(&skill.id).await.unwrap();
        assert_eq!(
            RemoteTreeNode::file_paths(&tree),
            vec!["SKILL.md", "refs/a.md", "refs/b.md"]
        );

        let body = fx.importer.read_file(&skill.id, "refs/b.md").await.unwrap();
        assert_eq!(body, b"b");

        let err = fx.importer.unbind(&skill.id).await.unwrap_err();
        assert!(matches!(err, SyncError::ReferenceUnbind(_)));
    }

    #[tokio::test]
    async fn test_local_browse_folds_stored_paths() {
        let server = Server::new_async().await;
        let fx = fixture(server).await;
        fx.skills.create(bound_skill("s1", None, None)).await.unwrap();
        fx.blobs.put("s1", "SKILL.md", b"x").await.unwrap();
        fx.blobs.put("s1", "refs/a.md", b"y").await.unwrap();

        let tree = fx.importer.browse("s1").await.unwrap();
        assert_eq!(
            RemoteTreeNode::file_paths(&tree),
            vec!["refs/a.md", "SKILL.md"]
        );

        let err = fx.importer.read_file("s1", "missing.md").await.unwrap_err();
        assert!(matches!(err, SyncError::FileNotFound(_)));
    }

    #[test]
    fn test_remote_path() {
        let folder = parse_github_url(URL).unwrap();
        assert_eq!(remote_path(&folder, "refs/a.md"), "skill/refs/a.md");

        let root = parse_github_url("https://github.com/acme/widget").unwrap();
        assert_eq!(remote_path(&root, "SKILL.md"), "SKILL.md");

        let blob = parse_github_url("https://github.com/acme/widget/blob/main/x/SKILL.md").unwrap();
        assert_eq!(remote_path(&blob, "SKILL.md"), "x/SKILL.md");
    }
}
