// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, written to stderr)
// 2. Parse command-line arguments using clap
// 3. Open the local skill library and build the Importer
// 4. Dispatch to the appropriate subcommand handler
// 5. Exit with proper code (0 = success, 1 = update available, 2 = error)
//
// Results go to stdout with println!, logs go to stderr, so
// `skill-sync check-all --json | jq` never sees a log line.
//
// Rust concepts used:
// - async/await: Every GitHub call is a network request
// - Arc<dyn Trait>: The Importer only knows the storage traits, main picks
//   the implementations
// - anyhow::Result: Any error can bubble up to run() with ?
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - runtime settings
mod error; // src/error.rs - the SyncError type
mod github; // src/github/ - URL parsing, API client, tree walking
mod import; // src/import/ - import, bind, check and sync
mod skill; // src/skill/ - skill records and file storage
mod tags; // src/tags/ - automatic tag suggestions

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, TagCommands};
use config::Settings;
use error::SyncError;
use github::{file_web_url, NodeKind, RemoteTreeNode};
use import::{ImportEvent, Importer};
use skill::{
    FsBlobStore, JsonSkillStore, Skill, SkillFilter, SkillPatch, SkillRepository, StorageMode,
};
use tags::{tag_assistant_from, TagAssistant};

#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, print it and exit with code 2
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins when set, otherwise info for our own crate only
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skill_sync=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Everything a handler may need
struct App {
    importer: Arc<Importer>,
    skills: Arc<JsonSkillStore>,
}

async fn open_app(settings: &Settings) -> Result<App> {
    let skills = Arc::new(JsonSkillStore::open(&settings.data_dir).await?);
    let blobs = Arc::new(FsBlobStore::new(&settings.data_dir));
    let github = github::GitHubClient::new(&settings.github)?;
    let tags: Arc<dyn TagAssistant> = Arc::from(tag_assistant_from(&settings.llm));

    let importer = Arc::new(Importer::new(github, skills.clone(), blobs, tags));
    Ok(App { importer, skills })
}

// This is the main application logic
// Returns:
//   Ok(0) = success
//   Ok(1) = update available (check / check-all)
//   Ok(2) = the import reported an error event
//   Err = anything else went wrong
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let settings = cli.global.settings();
    let app = open_app(&settings).await?;

    match cli.command {
        Commands::Import {
            url,
            reference,
            json,
            quiet,
        } => handle_import(&app, &url, reference, json, quiet).await,
        Commands::Bind { id, url } => handle_bind(&app, &id, &url).await,
        Commands::Unbind { id } => {
            app.importer.unbind(&id).await?;
            println!("✂️  Skill {} is no longer bound to GitHub", id);
            Ok(0)
        }
        Commands::Check { id, json } => handle_check(&app, &id, json).await,
        Commands::Sync { id, json } => handle_sync(&app, &id, json).await,
        Commands::CheckAll { json } => handle_check_all(&app, json).await,
        Commands::Links { id } => handle_links(&app, &id).await,
        Commands::Tree { url, json } => {
            let tree = app.importer.browse_url(&url).await?;
            print_nodes(&tree, json)
        }
        Commands::Files { id, cat } => handle_files(&app, &id, cat.as_deref()).await,
        Commands::List {
            starred,
            search,
            tag,
            all,
            json,
        } => {
            let filter = SkillFilter {
                search,
                tag,
                starred_only: starred,
                include_deleted: all,
            };
            handle_list(&app, &filter, json).await
        }
        Commands::Show { id, json } => handle_show(&app, &id, json).await,
        Commands::Delete { id } => {
            let skill = app.skills.soft_delete(&id).await?;
            println!("🗑️  Moved \"{}\" to the trash", skill.name);
            Ok(0)
        }
        Commands::Restore { id } => {
            let skill = app.skills.restore(&id).await?;
            println!("♻️  Restored \"{}\"", skill.name);
            Ok(0)
        }
        Commands::Star { id } => handle_star(&app, &id, true).await,
        Commands::Unstar { id } => handle_star(&app, &id, false).await,
        Commands::Customize { id, off } => {
            let patch = SkillPatch {
                is_customized: Some(!off),
                ..SkillPatch::default()
            };
            let skill = app.skills.update(&id, patch).await?;
            if off {
                println!("Cleared the customized mark on \"{}\"", skill.name);
            } else {
                println!("✏️  Marked \"{}\" as customized", skill.name);
            }
            Ok(0)
        }
        Commands::Tags { action } => handle_tags(&app, action).await,
    }
}

// Handles the 'import' subcommand
//
// The import runs in the background; we just print its events as they come.
async fn handle_import(
    app: &App,
    url: &str,
    reference: bool,
    json: bool,
    quiet: bool,
) -> Result<i32> {
    let mode = if reference {
        StorageMode::Reference
    } else {
        StorageMode::Local
    };

    if !json && !quiet {
        println!("📥 Importing {}", url);
    }

    let mut events = app.importer.import_from_url_streamed(url, mode);
    let mut exit_code = 2;

    while let Some(event) = events.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match &event {
            ImportEvent::Progress { progress, text } => {
                if !json && !quiet {
                    println!("   [{:>3}%] {}", progress, text);
                }
            }
            ImportEvent::Complete { result } => {
                if !json {
                    println!("✅ Imported \"{}\" ({})", result.name, result.id);
                    if !result.tags.is_empty() {
                        println!("   🏷️  {}", result.tags.join(", "));
                    }
                }
                exit_code = 0;
            }
            ImportEvent::Error { message } => {
                if !json {
                    eprintln!("❌ Import failed: {}", message);
                }
                exit_code = 2;
            }
        }

        if event.is_terminal() {
            break;
        }
    }

    Ok(exit_code)
}

async fn handle_bind(app: &App, id: &str, url: &str) -> Result<i32> {
    let binding = app.importer.bind_existing(id, url).await?;

    println!("🔗 Skill {} is now bound to {}", id, url);
    if let Some(commit) = &binding.github_last_commit {
        println!("   Tracking commit {}", short_sha(commit));
    }
    Ok(0)
}

async fn handle_check(app: &App, id: &str, json: bool) -> Result<i32> {
    let check = app.importer.check_update(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else if check.has_update {
        println!(
            "⬆️  Update available: {} -> {}",
            check.current_fingerprint.as_deref().map_or("none", short_sha),
            check.latest_fingerprint.as_deref().map_or("none", short_sha),
        );
    } else {
        println!("✅ Already up to date");
    }

    Ok(if check.has_update { 1 } else { 0 })
}

async fn handle_sync(app: &App, id: &str, json: bool) -> Result<i32> {
    let skill = app.importer.sync_skill(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&skill)?);
    } else {
        println!("🔄 Synced \"{}\"", skill.name);
        if let Some(commit) = &skill.github.github_last_commit {
            println!("   Now at commit {}", short_sha(commit));
        }
    }
    Ok(0)
}

async fn handle_check_all(app: &App, json: bool) -> Result<i32> {
    let summary = app.importer.bulk_check_all().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("📊 Summary:");
        println!("   🔍 Checked: {}", summary.checked_count);
        println!("   ⬆️  With updates: {}", summary.updated_count);
    }

    Ok(if summary.updated_count > 0 { 1 } else { 0 })
}

async fn handle_links(app: &App, id: &str) -> Result<i32> {
    let links = app.importer.detect_links_in(id).await?;

    if links.is_empty() {
        println!("No GitHub links found");
    }
    for link in links {
        println!("{}", link);
    }
    Ok(0)
}

async fn handle_files(app: &App, id: &str, cat: Option<&str>) -> Result<i32> {
    match cat {
        Some(path) => {
            let bytes = app.importer.read_file(id, path).await?;
            print!("{}", String::from_utf8_lossy(&bytes));
            Ok(0)
        }
        None => {
            let tree = app.importer.browse(id).await?;
            print_nodes(&tree, false)
        }
    }
}

async fn handle_list(app: &App, filter: &SkillFilter, json: bool) -> Result<i32> {
    let skills = app.skills.list(filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&skills)?);
        return Ok(0);
    }
    if skills.is_empty() {
        println!("No skills found");
        return Ok(0);
    }

    println!("{:<38} {:<32} {:<8} {}", "ID", "NAME", "FLAGS", "TAGS");
    println!("{}", "=".repeat(100));
    for skill in &skills {
        println!(
            "{:<38} {:<32} {:<8} {}",
            skill.id,
            truncate(&skill.name, 30),
            flags(skill),
            skill.tags.join(", ")
        );
    }
    println!();
    println!("📋 Total: {}", skills.len());
    Ok(0)
}

async fn handle_show(app: &App, id: &str, json: bool) -> Result<i32> {
    let skill = app
        .skills
        .get(id)
        .await?
        .ok_or_else(|| SyncError::SkillNotFound(id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&skill)?);
        return Ok(0);
    }

    println!("{}", skill.name);
    println!("{}", "=".repeat(skill.name.chars().count().max(3)));
    if !skill.description.is_empty() {
        println!("{}", skill.description);
    }
    println!();
    println!("id:        {}", skill.id);
    println!("created:   {}", skill.created_at.format("%Y-%m-%d %H:%M"));
    println!("tags:      {}", skill.tags.join(", "));
    if let Some(main) = &skill.main_file {
        println!("main file: {}", main);
    }

    if let Some(url) = &skill.github.github_url {
        let binding = &skill.github;
        println!("github:    {}", url);
        println!(
            "commit:    {}",
            binding.github_last_commit.as_deref().map_or("unknown", short_sha)
        );
        if let Some(checked) = binding.github_last_check {
            println!("checked:   {}", checked.format("%Y-%m-%d %H:%M"));
        }
        println!("storage:   {:?}", binding.storage_mode);
        if binding.has_update {
            println!("⬆️  An update is available (run `skill-sync sync {}`)", skill.id);
        }
        if let Some(main) = &skill.main_file {
            println!("web:       {}", file_web_url(url, main)?);
        }
    }
    Ok(0)
}

async fn handle_star(app: &App, id: &str, starred: bool) -> Result<i32> {
    let patch = SkillPatch {
        starred: Some(starred),
        ..SkillPatch::default()
    };
    let skill = app.skills.update(id, patch).await?;

    if starred {
        println!("⭐ Starred \"{}\"", skill.name);
    } else {
        println!("Unstarred \"{}\"", skill.name);
    }
    Ok(0)
}

async fn handle_tags(app: &App, action: TagCommands) -> Result<i32> {
    let skill = match action {
        TagCommands::Set { id, tags } => {
            let patch = SkillPatch {
                tags: Some(clean_tags(tags)),
                ..SkillPatch::default()
            };
            app.skills.update(&id, patch).await?
        }
        TagCommands::Regenerate { id } => app.importer.regenerate_tags(&id).await?,
    };

    if skill.tags.is_empty() {
        println!("🏷️  \"{}\" has no tags", skill.name);
    } else {
        println!("🏷️  \"{}\": {}", skill.name, skill.tags.join(", "));
    }
    Ok(0)
}

// Trimmed, no empties, first spelling of a duplicate wins
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

// Prints a file tree either indented or as JSON
fn print_nodes(nodes: &[RemoteTreeNode], json: bool) -> Result<i32> {
    if json {
        println!("{}", serde_json::to_string_pretty(nodes)?);
    } else if nodes.is_empty() {
        println!("(no importable files)");
    } else {
        print_tree(nodes, 0);
    }
    Ok(0)
}

fn print_tree(nodes: &[RemoteTreeNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node.kind {
            NodeKind::Dir => {
                println!("{}📁 {}/", indent, node.name);
                print_tree(node.children.as_deref().unwrap_or(&[]), depth + 1);
            }
            NodeKind::File => match node.size {
                Some(size) => println!("{}📄 {} ({} bytes)", indent, node.name, size),
                None => println!("{}📄 {}", indent, node.name),
            },
        }
    }
}

// One-letter markers for the list table
fn flags(skill: &Skill) -> String {
    let mut flags = String::new();
    if skill.starred {
        flags.push('*');
    }
    if skill.github.is_bound() {
        flags.push('G');
    }
    if skill.github.has_update {
        flags.push('U');
    }
    if skill.github.storage_mode == StorageMode::Reference {
        flags.push('R');
    }
    if skill.deleted {
        flags.push('D');
    }
    flags
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

// Truncate for display without splitting a character
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does main() call std::process::exit?
//    - Scripts and cron jobs look at the exit code. `check` and `check-all`
//      use 1 to say "there is something to sync", 2 means failure.
//
// 2. What is Arc::from(Box<dyn Trait>)?
//    - tag_assistant_from returns a Box because it picks one of two types at
//      runtime. Arc::from converts it so it can be shared with the import
//      task that runs in the background.
//
// 3. Why print to stdout but log to stderr?
//    - So that `--json` output can be piped into other tools untouched.
// -----------------------------------------------------------------------------
