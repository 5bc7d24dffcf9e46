// src/import/mod.rs
// =============================================================================
// Importing, binding, checking and syncing skills from GitHub.
//
// Submodules:
// - orchestrator: The Importer and its operations
// - progress: Events emitted while a streamed import runs
// =============================================================================

mod orchestrator;
mod progress;

pub use orchestrator::Importer;
pub use progress::ImportEvent;
