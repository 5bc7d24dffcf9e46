// src/skill/store.rs
// =============================================================================
// Persistence for skill records.
//
// SkillRepository is what the importer talks to. JsonSkillStore implements it
// with a single db.json file under the data directory:
//
//   { "skills": [ { "id": "...", "name": "...", ... }, ... ] }
//
// The whole list is loaded when the store opens and rewritten after every
// mutation (write to a temp file, then rename, so a crash never leaves half
// a file behind). Mutations are applied to a copy and only swapped in once
// the write succeeded. One async mutex serializes access inside the process.
//
// The tag vocabulary is not stored separately: distinct_tags() derives it
// from the skills themselves, so it can never disagree with them.
// =============================================================================

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::model::{Skill, SkillPatch};
use crate::error::{Result, SyncError};

// Filters for list(); empty filter = every non-deleted skill
#[derive(Debug, Clone, Default)]
pub struct SkillFilter {
    /// Case-insensitive match on name, description or any tag
    pub search: Option<String>,
    /// Exact tag match
    pub tag: Option<String>,
    pub starred_only: bool,
    pub include_deleted: bool,
}

impl SkillFilter {
    fn matches(&self, skill: &Skill) -> bool {
        if skill.deleted && !self.include_deleted {
            return false;
        }
        if self.starred_only && !skill.starred {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !skill.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = skill.name.to_lowercase().contains(&needle)
                || skill.description.to_lowercase().contains(&needle)
                || skill.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait SkillRepository: Send + Sync {
    async fn create(&self, skill: Skill) -> Result<Skill>;

    async fn get(&self, id: &str) -> Result<Option<Skill>>;

    /// Applies a partial update; fails with SkillNotFound for unknown ids
    async fn update(&self, id: &str, patch: SkillPatch) -> Result<Skill>;

    /// Moves a skill to the trash
    async fn soft_delete(&self, id: &str) -> Result<Skill>;

    /// Takes a skill back out of the trash
    async fn restore(&self, id: &str) -> Result<Skill>;

    /// Newest first
    async fn list(&self, filter: &SkillFilter) -> Result<Vec<Skill>>;

    /// Non-deleted skills that have a GitHub URL
    async fn list_github_bound(&self) -> Result<Vec<Skill>>;

    /// Sets has_update on all of `ids` in one write
    async fn mark_has_update(&self, ids: &[String]) -> Result<()>;

    /// Every tag used by a non-deleted skill, sorted and de-duplicated
    async fn distinct_tags(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Database {
    skills: Vec<Skill>,
}

pub struct JsonSkillStore {
    path: PathBuf,
    db: Mutex<Database>,
}

impl JsonSkillStore {
    // Opens (or starts) the database at <data_dir>/db.json
    pub async fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).await?;
        let path = data_dir.join("db.json");

        let db = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Database::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), skills = db.skills.len(), "opened skill database");
        Ok(Self {
            path,
            db: Mutex::new(db),
        })
    }

    async fn persist(&self, db: &Database) -> Result<()> {
        let json = serde_json::to_vec_pretty(db)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    // Writes `next` to disk, then makes it the cached database
    async fn commit(&self, db: &mut Database, next: Database) -> Result<()> {
        self.persist(&next).await?;
        *db = next;
        Ok(())
    }
}

#[async_trait]
impl SkillRepository for JsonSkillStore {
    async fn create(&self, skill: Skill) -> Result<Skill> {
        let mut db = self.db.lock().await;
        let mut next = db.clone();
        next.skills.push(skill.clone());
        self.commit(&mut db, next).await?;
        Ok(skill)
    }

    async fn get(&self, id: &str) -> Result<Option<Skill>> {
        let db = self.db.lock().await;
        Ok(db.skills.iter().find(|s| s.id == id).cloned())
    }

    async fn update(&self, id: &str, patch: SkillPatch) -> Result<Skill> {
        let mut db = self.db.lock().await;
        let mut next = db.clone();
        let skill = next
            .skills
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SyncError::SkillNotFound(id.to_string()))?;

        patch.apply(skill);
        let updated = skill.clone();
        self.commit(&mut db, next).await?;
        Ok(updated)
    }

    async fn soft_delete(&self, id: &str) -> Result<Skill> {
        self.update(
            id,
            SkillPatch {
                deleted: Some(true),
                deleted_at: Some(Some(Utc::now())),
                ..SkillPatch::default()
            },
        )
        .await
    }

    async fn restore(&self, id: &str) -> Result<Skill> {
        self.update(
            id,
            SkillPatch {
                deleted: Some(false),
                deleted_at: Some(None),
                ..SkillPatch::default()
            },
        )
        .await
    }

    async fn list(&self, filter: &SkillFilter) -> Result<Vec<Skill>> {
        let db = self.db.lock().await;
        let mut skills: Vec<Skill> = db
            .skills
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        skills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(skills)
    }

    async fn list_github_bound(&self) -> Result<Vec<Skill>> {
        let db = self.db.lock().await;
        Ok(db
            .skills
            .iter()
            .filter(|s| !s.deleted && s.github.is_bound())
            .cloned()
            .collect())
    }

    async fn mark_has_update(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut db = self.db.lock().await;
        let mut next = db.clone();
        for skill in next.skills.iter_mut().filter(|s| ids.contains(&s.id)) {
            skill.github.has_update = true;
        }
        self.commit(&mut db, next).await
    }

    async fn distinct_tags(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let tags: BTreeSet<String> = db
            .skills
            .iter()
            .filter(|s| !s.deleted)
            .flat_map(|s| s.tags.iter().cloned())
            .collect();
        Ok(tags.into_iter().collect())
    }
}
