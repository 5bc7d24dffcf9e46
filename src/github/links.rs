// src/github/links.rs
// =============================================================================
// Finds GitHub URLs embedded in arbitrary text.
//
// Used to suggest a binding for a skill that was uploaded by hand but
// mentions where it came from. Detection only: nothing is fetched, so a
// detected URL may well point at a repository that does not exist.
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// "https://github.com/" followed by anything up to whitespace or a closing
// bracket, so Markdown links like [x](https://github.com/a/b) end cleanly
static GITHUB_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://github\.com/[^\s)>\]]+").unwrap());

// Returns the unique GitHub links in `text`, in order of first appearance
pub fn detect_github_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    GITHUB_LINK
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|link| seen.insert(*link))
        .map(str::to_string)
        .collect()
}
