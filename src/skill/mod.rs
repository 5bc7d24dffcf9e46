// src/skill/mod.rs
// =============================================================================
// Skill records and where they are kept.
//
// Submodules:
// - model: The Skill record, its GitHub binding and partial updates
// - metadata: Name/description extraction and canonical document choice
// - store: The skill database (SkillRepository + db.json implementation)
// - blob: File bodies (BlobStorage + filesystem implementation)
// =============================================================================

mod blob;
mod metadata;
mod model;
mod store;

pub use blob::{BlobStorage, FsBlobStore};
pub use metadata::{
    canonical_document, content_preview, extract_description, extract_name, PREVIEW_CHARS,
};
pub use model::{GithubBinding, Skill, SkillKind, SkillPatch, StorageMode};
pub use store::{JsonSkillStore, SkillFilter, SkillRepository};
