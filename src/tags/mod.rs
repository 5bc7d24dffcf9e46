// src/tags/mod.rs
// =============================================================================
// Automatic tagging of skills through an external text-completion service.
//
// Submodules:
// - provider: Per-backend request building and answer parsing
// - assistant: The TagAssistant trait and its implementations
// =============================================================================

mod assistant;
mod provider;

pub use assistant::{tag_assistant_from, TagAssistant, TagRequest};
