// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Global options (data directory, GitHub token, tag assistant endpoint...)
// come first and apply to every subcommand. Each one can also be set through
// an environment variable, which is handy in cron jobs and CI where you don't
// want a token on the command line.
//
// Rust concepts:
// - Derive macros: #[derive(Parser)] generates the whole argument parser
// - #[arg(env = "...")]: clap falls back to the environment variable
// - #[command(flatten)]: Reuses a struct's arguments inside another struct
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{GithubSettings, LlmSettings, Settings, DEFAULT_GITHUB_API};

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "skill-sync",
    version,
    about = "Import, browse and keep in sync skill documents hosted on GitHub",
    long_about = "skill-sync mirrors \"skill\" packages (Markdown documents and folders used by \
                  AI coding agents) from GitHub into a local library, tags them, and tells you \
                  when the upstream repository has moved on."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Directory holding db.json and the stored skill files
    #[arg(long, global = true, env = "SKILL_SYNC_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// GitHub token (optional, raises the API rate limit)
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API base URL (change it for GitHub Enterprise)
    #[arg(long, global = true, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API)]
    pub github_api: String,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, global = true, env = "SKILL_SYNC_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Base URL of the tag assistant (Anthropic, OpenAI-compatible or Google)
    #[arg(long, global = true, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// API key of the tag assistant; without it skills are imported untagged
    #[arg(long, global = true, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Model used by the tag assistant (defaults per provider)
    #[arg(long, global = true, env = "LLM_MODEL")]
    pub llm_model: Option<String>,
}

impl GlobalOptions {
    // Turns the parsed flags into the Settings the rest of the crate uses
    pub fn settings(&self) -> Settings {
        Settings {
            data_dir: self.data_dir.clone(),
            github: GithubSettings {
                api_base: self.github_api.clone(),
                token: self.github_token.clone(),
                timeout_secs: self.timeout_secs,
            },
            llm: LlmSettings {
                base_url: self.llm_base_url.clone(),
                api_key: self.llm_api_key.clone(),
                model: self.llm_model.clone(),
                timeout_secs: self.timeout_secs,
            },
        }
    }
}

// This enum defines our subcommands
//
// Each variant represents a different subcommand the user can run
// The fields inside each variant become the arguments for that subcommand
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a skill from a GitHub repository, folder or file URL
    ///
    /// Example: skill-sync import https://github.com/acme/skills/tree/main/animations
    Import {
        /// GitHub URL (repository root, /tree/<ref>/<path> or /blob/<ref>/<path>)
        url: String,

        /// Don't download the files, read them from GitHub when needed
        #[arg(long)]
        reference: bool,

        /// Print progress as JSON lines ({"type":"progress",...})
        #[arg(long)]
        json: bool,

        /// Only print the result
        #[arg(long, short)]
        quiet: bool,
    },

    /// Bind an existing skill to a GitHub URL
    Bind {
        /// Skill id
        id: String,

        /// GitHub URL to track
        url: String,
    },

    /// Remove the GitHub binding of a skill (files are kept)
    Unbind {
        /// Skill id
        id: String,
    },

    /// Check whether the upstream of a skill has new commits
    ///
    /// Exits with code 1 when an update is available.
    Check {
        /// Skill id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Re-download a bound skill and record the new commit
    Sync {
        /// Skill id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Check every bound skill (meant for cron)
    ///
    /// Exits with code 1 when at least one skill has an update.
    CheckAll {
        #[arg(long)]
        json: bool,
    },

    /// List the GitHub links mentioned in a skill's main document
    Links {
        /// Skill id
        id: String,
    },

    /// Show the importable files behind a GitHub URL without importing
    Tree {
        /// GitHub URL
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Show the files of a stored skill
    Files {
        /// Skill id
        id: String,

        /// Print the content of this file instead of the tree
        #[arg(long)]
        cat: Option<String>,
    },

    /// List stored skills, newest first
    List {
        /// Only starred skills
        #[arg(long)]
        starred: bool,

        /// Match name, description or tags (case-insensitive)
        #[arg(long)]
        search: Option<String>,

        /// Only skills carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Include skills in the trash
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show one skill with its GitHub binding
    Show {
        /// Skill id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Move a skill to the trash
    Delete {
        /// Skill id
        id: String,
    },

    /// Take a skill back out of the trash
    Restore {
        /// Skill id
        id: String,
    },

    /// Mark a skill as a favourite
    Star {
        /// Skill id
        id: String,
    },

    /// Remove the favourite mark
    Unstar {
        /// Skill id
        id: String,
    },

    /// Record that a bound skill was edited locally
    ///
    /// Purely informational: sync still overwrites the files.
    Customize {
        /// Skill id
        id: String,

        /// Clear the mark instead of setting it
        #[arg(long)]
        off: bool,
    },

    /// Edit or regenerate the tags of a skill
    Tags {
        #[command(subcommand)]
        action: TagCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Replace the tags (no tags clears them)
    ///
    /// Example: skill-sync tags set <id> React CSS,Animation
    Set {
        /// Skill id
        id: String,

        /// New tags, space or comma separated
        #[arg(value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Ask the tag assistant for a fresh set of tags
    Regenerate {
        /// Skill id
        id: String,
    },
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does `global = true` do?
//    - A global argument may appear before OR after the subcommand:
//      `skill-sync --data-dir x list` and `skill-sync list --data-dir x`
//      both work.
//
// 2. Why Option<String> for the token?
//    - None means "not given". An empty string would be a token that GitHub
//      rejects, which is not the same thing.
//
// 3. What is hide_env_values?
//    - It keeps `--help` from printing the current value of GITHUB_TOKEN or
//      LLM_API_KEY to the terminal.
//
// 4. Why kebab-case subcommands?
//    - clap turns the variant CheckAll into `check-all` automatically.
// -----------------------------------------------------------------------------
