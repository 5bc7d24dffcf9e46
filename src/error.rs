// src/error.rs
// =============================================================================
// The error type shared by every library module of skill-sync.
//
// The binary itself still uses anyhow::Result at the top level (see main.rs),
// but the modules below it return SyncError so callers can tell the
// user-correctable failures (bad URL, nothing to import, skill not bound)
// apart from upstream and I/O failures.
//
// Rust concepts:
// - thiserror: Derives std::error::Error and Display from attributes
// - #[from]: Lets the ? operator convert foreign errors automatically
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The string is not a repository, tree or blob link on github.com
    #[error("Invalid GitHub URL format: {0}")]
    InvalidUrlFormat(String),

    /// GitHub answered with a non-2xx status
    #[error("GitHub API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// Every file was filtered out (or the folder really is empty)
    #[error("No importable files found at {location} (README, LICENSE, images, tests and similar files are skipped)")]
    EmptyRepository { location: String },

    /// check/sync called on a skill without a GitHub binding
    #[error("Skill {0} is not bound to a GitHub URL")]
    NotBound(String),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Skill {0} is stored in reference mode and cannot be unbound")]
    ReferenceUnbind(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Could not decode file content: {0}")]
    Decode(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_api_message_is_verbatim() {
        let err = SyncError::RemoteApi {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "GitHub API error (404): Not Found");
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(SyncError::Io(_))));
    }
}
