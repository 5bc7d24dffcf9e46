// src/github/filter.rs
// =============================================================================
// Decides which repository files are worth importing as part of a skill.
//
// Repositories that host skills usually also carry project housekeeping:
// READMEs, licenses, CI config, lockfiles, tests, screenshots. None of that
// belongs in the skill itself, so the tree walk skips any entry whose
// relative path OR bare name matches one of the patterns below. A skipped
// directory takes its whole subtree with it.
//
// The check is a pure function of its two string arguments.
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

const EXCLUDED_PATTERNS: &[&str] = &[
    r"(?i)^README(\..*)?$",
    r"(?i)^README.*\.md$",
    r"(?i)^LICENSE$",
    r"(?i)^LICENSE\..*",
    r"(?i)^CHANGELOG\.md$",
    r"(?i)^CONTRIBUTING\.md$",
    r"^\.gitignore$",
    r"^\.gitattributes$",
    r"^\.github(/|$)",
    r"^node_modules(/|$)",
    r"^package-lock\.json$",
    r"^pnpm-lock\.yaml$",
    r"^yarn\.lock$",
    r"^\.env.*",
    r"\.test\.[^/]+$",
    r"\.spec\.[^/]+$",
    r"^__tests__(/|$)",
    r"(?i)\.(png|jpg|jpeg|gif|svg|ico|webp)$",
    r"^\.DS_Store$",
    r"^Thumbs\.db$",
];

static EXCLUDED: Lazy<Vec<Regex>> = Lazy::new(|| {
    EXCLUDED_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
});

// Returns true when the entry should be left out of an import
//
// Parameters:
//   relative_path: path relative to the import root (e.g. "docs/README.md")
//   base_name: the entry's own name (e.g. "README.md")
pub fn should_exclude(relative_path: &str, base_name: &str) -> bool {
    EXCLUDED
        .iter()
        .any(|pattern| pattern.is_match(relative_path) || pattern.is_match(base_name))
}
