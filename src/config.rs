// src/config.rs
// =============================================================================
// Runtime settings, built once from the parsed command line.
//
// Every value can come from a flag or an environment variable (clap's `env`
// feature does the lookup, see cli.rs). Nothing here is global: main.rs
// builds a Settings and hands the pieces to whoever needs them.
// =============================================================================

use std::path::PathBuf;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub api_base: String,
    /// Optional bearer token; absent means unauthenticated requests
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GITHUB_API.to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl LlmSettings {
    // Tag suggestions need both an endpoint and a key
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.base_url) && present(&self.api_key)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Holds db.json and the skills/ blob directory
    pub data_dir: PathBuf,
    pub github: GithubSettings,
    pub llm: LlmSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_needs_url_and_key() {
        let mut llm = LlmSettings::default();
        assert!(!llm.is_configured());

        llm.base_url = Some("https://api.anthropic.com".to_string());
        assert!(!llm.is_configured());

        llm.api_key = Some("  ".to_string());
        assert!(!llm.is_configured());

        llm.api_key = Some("sk-test".to_string());
        assert!(llm.is_configured());
    }
}
