// src/skill/model.rs
// =============================================================================
// The Skill record and the partial updates applied to it.
//
// A skill is one stored document (kind "md") or a bundle of files (kind
// "folder"). The GitHub binding fields are flattened into the same JSON
// object, so db.json rows look like:
//
//   { "id": "...", "name": "...", "githubUrl": "https://github.com/...",
//     "githubLastCommit": "c0ffee", "hasUpdate": false, ... }
//
// Rust concepts:
// - #[serde(flatten)]: Inlines a nested struct's fields into the parent
// - Option<Option<T>>: "leave alone" (None) vs "set to null" (Some(None))
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Md,
    Folder,
}

// Where a skill's files live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Files are downloaded once and kept in blob storage
    #[default]
    Local,
    /// Nothing is copied; files are read from GitHub on demand
    Reference,
}

// The part of a skill that links it to a GitHub source
//
// has_update only ever becomes true through a fingerprint comparison and is
// cleared the moment a bind or sync completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubBinding {
    pub github_url: Option<String>,
    pub github_last_commit: Option<String>,
    pub github_last_check: Option<DateTime<Utc>>,
    pub has_update: bool,
    /// Set by the user after editing a mirrored skill by hand
    pub is_customized: bool,
    pub storage_mode: StorageMode,
}

impl GithubBinding {
    pub fn is_bound(&self) -> bool {
        self.github_url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: SkillKind,
    /// Canonical document, relative to the skill root
    pub main_file: Option<String>,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub github: GithubBinding,
}

// A partial update. Fields left as None are not touched.
#[derive(Debug, Clone, Default)]
pub struct SkillPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub main_file: Option<Option<String>>,
    pub starred: Option<bool>,
    pub deleted: Option<bool>,
    pub deleted_at: Option<Option<DateTime<Utc>>>,
    pub github_url: Option<Option<String>>,
    pub github_last_commit: Option<Option<String>>,
    pub github_last_check: Option<Option<DateTime<Utc>>>,
    pub has_update: Option<bool>,
    pub is_customized: Option<bool>,
}

impl SkillPatch {
    // Result of a fingerprint comparison
    pub fn checked(has_update: bool, at: DateTime<Utc>) -> Self {
        Self {
            has_update: Some(has_update),
            github_last_check: Some(Some(at)),
            ..Self::default()
        }
    }

    // A fresh bind or a completed sync: new fingerprint, no pending update
    pub fn bound(url: Option<String>, commit: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            github_url: url.map(Some),
            github_last_commit: Some(commit),
            github_last_check: Some(Some(at)),
            has_update: Some(false),
            ..Self::default()
        }
    }

    // Clears every binding field
    pub fn unbind() -> Self {
        Self {
            github_url: Some(None),
            github_last_commit: Some(None),
            github_last_check: Some(None),
            has_update: Some(false),
            is_customized: Some(false),
            ..Self::default()
        }
    }

    pub fn apply(self, skill: &mut Skill) {
        if let Some(name) = self.name {
            skill.name = name;
        }
        if let Some(description) = self.description {
            skill.description = description;
        }
        if let Some(tags) = self.tags {
            skill.tags = tags;
        }
        if let Some(main_file) = self.main_file {
            skill.main_file = main_file;
        }
        if let Some(starred) = self.starred {
            skill.starred = starred;
        }
        if let Some(deleted) = self.deleted {
            skill.deleted = deleted;
        }
        if let Some(deleted_at) = self.deleted_at {
            skill.deleted_at = deleted_at;
        }
        if let Some(url) = self.github_url {
            skill.github.github_url = url;
        }
        if let Some(commit) = self.github_last_commit {
            skill.github.github_last_commit = commit;
        }
        if let Some(check) = self.github_last_check {
            skill.github.github_last_check = check;
        }
        if let Some(has_update) = self.has_update {
            skill.github.has_update = has_update;
        }
        if let Some(is_customized) = self.is_customized {
            skill.github.is_customized = is_customized;
        }
    }
}
