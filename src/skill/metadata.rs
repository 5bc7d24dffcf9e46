// src/skill/metadata.rs
// =============================================================================
// Pulls a name and description out of a skill's Markdown document.
//
// Skill documents usually start with a small YAML front-matter block:
//
//   ---
//   name: applying-code-standards
//   description: "Enforces SOLID and DRY"
//   ---
//   # Code Standards
//   ...
//
// Only the two keys we need are read, one line each, so there is no YAML
// parser involved. When the front matter has no name, the first "# Title"
// line of the body is used instead (located with pulldown-cmark, so a "#"
// inside a code block does not count).
//
// Also here: which file of a bundle is the canonical document, and the
// bounded preview handed to the tag assistant.
// =============================================================================

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use regex::Regex;

// "---" line, newline, block, newline, "---" at the very start of the text
static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)").unwrap());

static NAME_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^name:[ \t]*(.+)$").unwrap());

static DESCRIPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^description:[ \t]*(.+)$").unwrap());

// How much of the canonical document the tag assistant gets to see
pub const PREVIEW_CHARS: usize = 2000;

// Splits off the front-matter block, if the text starts with one
//
// Returns (front matter, body).
fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    match FRONT_MATTER.captures(text) {
        Some(caps) => {
            let whole = caps.get(0).map_or(0, |m| m.end());
            (caps.get(1).map(|m| m.as_str()), &text[whole..])
        }
        None => (None, text),
    }
}

// Trims and removes ONE matching pair of surrounding quotes
fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn front_matter_value(front: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(front)
        .map(|caps| unquote(&caps[1]).to_string())
        .filter(|value| !value.is_empty())
}

// Text of the first "# Title" heading
//
// The parser only tells us where headings are. The title itself comes from
// the source line, so setext headings (Title / ===) are skipped and inline
// markup is kept as written.
fn first_h1(markdown: &str) -> Option<String> {
    Parser::new(markdown)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::Heading(HeadingLevel::H1, _, _)) => markdown.get(range),
            _ => None,
        })
        .find_map(atx_title)
}

// "# Title #" -> "Title"; None for setext headings and empty titles
fn atx_title(source: &str) -> Option<String> {
    let line = source.lines().next()?.trim_start();
    let rest = line.strip_prefix('#')?;
    if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return None;
    }

    let mut title = rest.trim();
    // An optional closing run of '#' only counts after a space
    let unclosed = title.trim_end_matches('#');
    if unclosed.is_empty() || unclosed.ends_with([' ', '\t']) {
        title = unclosed.trim_end();
    }

    (!title.is_empty()).then(|| title.to_string())
}

// The skill's display name: front-matter `name:`, else the first "# Heading"
pub fn extract_name(markdown: &str) -> Option<String> {
    let (front, body) = split_front_matter(markdown);

    front
        .and_then(|front| front_matter_value(front, &NAME_LINE))
        .or_else(|| first_h1(body))
}

// Front-matter `description:`, or "" when there is none
pub fn extract_description(markdown: &str) -> String {
    let (front, _) = split_front_matter(markdown);

    front
        .and_then(|front| front_matter_value(front, &DESCRIPTION_LINE))
        .unwrap_or_default()
}

// Picks the canonical document among relative file paths
//
// Priority: a file named exactly SKILL.md or Skill.md, else the first
// Markdown file, else nothing.
pub fn canonical_document<'a, I>(paths: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let paths: Vec<&str> = paths.into_iter().collect();
    let is_skill_doc =
        |path: &str| matches!(path.rsplit('/').next(), Some("SKILL.md" | "Skill.md"));

    paths
        .iter()
        .copied()
        .find(|path| is_skill_doc(path))
        .or_else(|| paths.iter().copied().find(|path| path.ends_with(".md")))
}

// The first `max_chars` characters of `text` (never splits a character)
pub fn content_preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter_name_and_description() {
        let doc = "---\nname: Foo\ndescription: Does foo things\n---\nbar";
        assert_eq!(extract_name(doc).as_deref(), Some("Foo"));
        assert_eq!(extract_description(doc), "Does foo things");
    }

    #[test]
    fn test_quotes_stripped_once() {
        let doc = "---\nname: \"Foo\"\ndescription: '\"quoted\"'\n---\n";
        assert_eq!(extract_name(doc).as_deref(), Some("Foo"));
        assert_eq!(extract_description(doc), "\"quoted\"");
    }

    #[test]
    fn test_mismatched_quotes_kept() {
        let doc = "---\nname: \"Foo'\n---\n";
        assert_eq!(extract_name(doc).as_deref(), Some("\"Foo'"));
    }

    #[test]
    fn test_falls_back_to_first_h1() {
        let doc = "Intro\n\n## Not this\n\n# Code Standards\n\n# Later";
        assert_eq!(extract_name(doc).as_deref(), Some("Code Standards"));
        assert_eq!(extract_description(doc), "");
    }

    #[test]
    fn test_front_matter_without_name_uses_heading() {
        let doc = "---\ndescription: d\n---\n# From Heading\n";
        assert_eq!(extract_name(doc).as_deref(), Some("From Heading"));
        assert_eq!(extract_description(doc), "d");
    }

    #[test]
    fn test_heading_in_code_block_ignored() {
        let doc = "```sh\n# not a heading\n```\n";
        assert_eq!(extract_name(doc), None);
    }

    #[test]
    fn test_setext_heading_is_not_a_name() {
        assert_eq!(extract_name("Title\n=====\n\nbody"), None);
        assert_eq!(
            extract_name("Title\n=====\n\n# Real Name\n").as_deref(),
            Some("Real Name")
        );
    }

    #[test]
    fn test_heading_text_kept_as_written() {
        assert_eq!(extract_name("# Use `cargo` **fast**").as_deref(), Some("Use `cargo` **fast**"));
        assert_eq!(extract_name("# Closed #####").as_deref(), Some("Closed"));
        assert_eq!(extract_name("# Learn C#").as_deref(), Some("Learn C#"));
        assert_eq!(extract_name("  # Indented").as_deref(), Some("Indented"));
        assert_eq!(extract_name("#\n\n# Second").as_deref(), Some("Second"));
    }

    #[test]
    fn test_front_matter_must_be_at_start() {
        let doc = "text\n---\nname: Foo\n---\n";
        assert_eq!(extract_name(doc), None);
        assert_eq!(extract_description(doc), "");
    }

    #[test]
    fn test_crlf_front_matter() {
        let doc = "---\r\nname: Foo\r\n---\r\nbody";
        assert_eq!(extract_name(doc).as_deref(), Some("Foo"));
    }

    #[test]
    fn test_canonical_document_priority() {
        assert_eq!(
            canonical_document(["notes.md", "skill/SKILL.md", "a.py"]),
            Some("skill/SKILL.md")
        );
        assert_eq!(canonical_document(["a.py", "Skill.md"]), Some("Skill.md"));
        assert_eq!(canonical_document(["a.py", "guide.md", "other.md"]), Some("guide.md"));
        assert_eq!(canonical_document(["a.py", "b.txt"]), None);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(content_preview("héllo", 2), "hé");
        assert_eq!(content_preview("abc", 10), "abc");
    }
}
