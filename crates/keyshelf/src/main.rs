//! keyshelf - Local API key shelf
//!
//! Commands:
//! - add <SERVICE> <NAME> [SECRET]: Store a key (prompts if no secret)
//! - list [QUERY]: Search and list keys, most recently used first
//! - show <REF>: Show a key's details (--reveal prints the secret)
//! - copy <REF>: Copy a secret, scrubbing the clipboard after a delay
//! - edit <REF>: Change a key's fields
//! - delete <REF>: Delete a key
//! - categories: List categories in use
//! - services: List preset services

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use keyshelf::catalog::{self, PRESET_SERVICES};
use keyshelf::query::{self, CategoryFilter, KeyQuery};
use keyshelf::{ClipboardGuard, KeyRecord, KeyStore, KeyUpdate, NewKey};
use keyshelf_core::{Config, Paths};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keyshelf")]
#[command(about = "Local API key shelf - store, search and copy API keys")]
#[command(version)]
#[command(after_help = r#"KEY REFERENCES:
    Commands taking <REF> accept a key id or an unambiguous id prefix
    of at least 4 characters, as shown by `keyshelf list`.

STORAGE:
    - Keys live in ~/.keyshelf/api-keys.json (override with --store or
      "store_path" in ~/.config/keyshelf/config.json)
    - An existing ~/.raycast-api-keys/api-keys.json is used until
      ~/.keyshelf/api-keys.json exists
    - The file is readable only by you but keys are stored in PLAINTEXT
    - Copied keys are cleared from the clipboard after 30 seconds unless
      you copied something else in the meantime"#)]
struct Cli {
    /// Use a different key store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new API key (prompts securely if the secret is omitted)
    Add {
        /// Service the key belongs to (e.g. OpenAI, GitHub)
        service: String,
        /// Name distinguishing keys of the same service (e.g. production)
        name: String,
        /// The key itself (omit for a hidden prompt)
        secret: Option<String>,
        /// Comma separated categories (preset services get a default)
        #[arg(short, long)]
        categories: Option<String>,
        /// Free text notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List keys, optionally filtered by search text and category
    List {
        /// Case-insensitive search over name, service, categories and notes
        query: Option<String>,
        /// Only keys in this category ("All" for every key)
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON for scripting (secrets are never included)
        #[arg(long)]
        json: bool,
    },

    /// Show a key's details
    Show {
        /// Key id or id prefix
        key: String,
        /// Print the secret in full (marks the key as used)
        #[arg(long)]
        reveal: bool,
    },

    /// Copy a key to the clipboard and clear it after a delay
    Copy {
        /// Key id or id prefix
        key: String,
        /// Seconds before the clipboard is cleared
        #[arg(long, value_name = "SECS")]
        clear_after: Option<u64>,
    },

    /// Change a key's service, name, secret, categories or notes
    Edit {
        /// Key id or id prefix
        key: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// New secret (use --prompt-secret for a hidden prompt)
        #[arg(long, conflicts_with = "prompt_secret")]
        secret: Option<String>,
        /// Prompt for the new secret without echoing it
        #[arg(long)]
        prompt_secret: bool,
        /// Comma separated categories, replacing the current ones
        #[arg(short, long)]
        categories: Option<String>,
        /// New notes (empty string clears them)
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a key permanently
    Delete {
        /// Key id or id prefix
        key: String,
    },

    /// List the categories in use
    Categories,

    /// List preset services and their default categories
    Services,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = Paths::new();
    let mut config = Config::load_default(&paths)?;
    if let Some(store) = cli.store {
        config.store_path = Some(store);
    }
    let store = KeyStore::open(&config, &paths);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_command(cli.command, &store, &config).await })
}

async fn run_command(command: Option<Commands>, store: &KeyStore, config: &Config) -> Result<()> {
    match command {
        Some(Commands::Add {
            service,
            name,
            secret,
            categories,
            notes,
        }) => cmd_add(store, service, name, secret, categories, notes).await,
        Some(Commands::List {
            query,
            category,
            json,
        }) => {
            let category = category.or_else(|| config.default_category.clone());
            cmd_list(store, query, category, json).await
        }
        Some(Commands::Show { key, reveal }) => cmd_show(store, &key, reveal).await,
        Some(Commands::Copy { key, clear_after }) => {
            let delay = clear_after
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.clipboard_clear_delay());
            cmd_copy(store, &key, delay).await
        }
        Some(Commands::Edit {
            key,
            service,
            name,
            secret,
            prompt_secret,
            categories,
            notes,
        }) => {
            let secret = if prompt_secret {
                Some(prompt_for_secret("Enter new secret: ")?)
            } else {
                secret
            };
            let update = KeyUpdate {
                service,
                name,
                secret,
                categories: categories.as_deref().map(catalog::parse_categories),
                notes,
            };
            cmd_edit(store, &key, update).await
        }
        Some(Commands::Delete { key }) => cmd_delete(store, &key).await,
        Some(Commands::Categories) => cmd_categories(store).await,
        Some(Commands::Services) => cmd_services(),
        None => {
            // Default to listing keys
            cmd_list(store, None, config.default_category.clone(), false).await
        }
    }
}

/// Find a key by id or id prefix
async fn find_key(store: &KeyStore, reference: &str) -> Result<KeyRecord> {
    let keys = store.list().await?;
    match query::resolve(&keys, reference) {
        Some(record) => Ok(record.clone()),
        None => bail!("No API key matches '{}' (use an id or a unique id prefix)", reference),
    }
}

fn prompt_for_secret(prompt: &str) -> Result<String> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read secret")?;
    if secret.is_empty() {
        bail!("Empty secret not allowed");
    }
    Ok(secret)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Store a new key
async fn cmd_add(
    store: &KeyStore,
    service: String,
    name: String,
    secret: Option<String>,
    categories: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let secret = match secret {
        Some(s) => s,
        None => prompt_for_secret("Enter API key: ")?,
    };

    let categories = catalog::default_categories(
        &service,
        categories
            .as_deref()
            .map(catalog::parse_categories)
            .unwrap_or_default(),
    );

    let mut new = NewKey::new(service, name, secret).with_categories(categories);
    if let Some(notes) = notes {
        new = new.with_notes(notes);
    }

    let record = store.add(new).await?;

    println!("success: Added {} ({})", record.label(), short_id(&record.id));

    Ok(())
}

/// List keys
async fn cmd_list(
    store: &KeyStore,
    text: Option<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let keys = store.list().await?;

    let mut key_query = KeyQuery::new();
    if let Some(text) = text {
        key_query = key_query.with_text(text);
    }
    if let Some(category) = &category {
        key_query = key_query.with_category(category.parse().unwrap_or_default());
    }
    let results = key_query.apply(&keys);

    if json {
        let entries: Vec<serde_json::Value> = results
            .iter()
            .map(|k| {
                serde_json::json!({
                    "id": k.id,
                    "service": k.service,
                    "name": k.name,
                    "categories": k.categories,
                    "notes": k.notes,
                    "lastUsed": k.last_used_at,
                    "createdAt": k.created_at,
                    "updatedAt": k.updated_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if keys.is_empty() {
        println!("No API keys stored. Add one with: keyshelf add <service> <name>");
        return Ok(());
    }

    if results.is_empty() {
        match &key_query.category {
            CategoryFilter::Only(category) => {
                println!("No API keys found in category \"{}\"", category)
            }
            CategoryFilter::All => println!("No API keys match your search"),
        }
        return Ok(());
    }

    match &key_query.category {
        CategoryFilter::All => println!("All API Keys"),
        CategoryFilter::Only(category) => println!("Category: {}", category),
    }
    println!();

    for key in &results {
        let used = key
            .last_used_at
            .as_ref()
            .map(format_time)
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {}  {:<32} {}  used {}",
            short_id(&key.id),
            key.label(),
            key.masked_secret(),
            used
        );
        if !key.categories.is_empty() {
            println!("            [{}]", key.categories.join(", "));
        }
    }

    Ok(())
}

/// Show one key
async fn cmd_show(store: &KeyStore, reference: &str, reveal: bool) -> Result<()> {
    let key = find_key(store, reference).await?;

    println!("{}", key.label());
    println!();
    println!("  id:         {}", key.id);
    println!("  service:    {}", key.service);
    println!("  name:       {}", key.name);
    if reveal {
        println!("  key:        {}", key.secret);
    } else {
        println!("  key:        {}", key.masked_secret());
    }
    let categories = if key.categories.is_empty() {
        "none".to_string()
    } else {
        key.categories.join(", ")
    };
    println!("  categories: {}", categories);
    println!("  notes:      {}", key.notes.as_deref().unwrap_or("No notes"));
    println!("  created:    {}", format_time(&key.created_at));
    println!("  updated:    {}", format_time(&key.updated_at));
    match &key.last_used_at {
        Some(t) => println!("  last used:  {}", format_time(t)),
        None => println!("  last used:  never"),
    }

    if reveal {
        store.touch_last_used(&key.id).await;
    }

    Ok(())
}

/// Copy a key and wait for the clipboard to be scrubbed
async fn cmd_copy(store: &KeyStore, reference: &str, delay: Duration) -> Result<()> {
    let key = find_key(store, reference).await?;

    let guard = ClipboardGuard::system()?;
    guard.copy_with_expiry(&key.secret, delay)?;
    store.touch_last_used(&key.id).await;

    println!(
        "success: Copied {} - clipboard clears in {}s (Ctrl-C to keep it)",
        key.label(),
        delay.as_secs()
    );

    // Stay alive for the expiry window; some platforms drop the clipboard
    // contents when the owning process exits.
    tokio::select! {
        _ = guard.wait() => println!("info: Clipboard expiry window closed"),
        _ = tokio::signal::ctrl_c() => {
            guard.cancel();
            println!("info: Clipboard clear cancelled");
        }
    }

    Ok(())
}

/// Edit a key
async fn cmd_edit(store: &KeyStore, reference: &str, update: KeyUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Pass --service, --name, --secret, --categories or --notes");
    }

    let key = find_key(store, reference).await?;
    store.update(&key.id, update).await?;

    let updated = store.get(&key.id).await?;
    println!("success: Updated {}", updated.label());

    Ok(())
}

/// Delete a key
async fn cmd_delete(store: &KeyStore, reference: &str) -> Result<()> {
    let key = find_key(store, reference).await?;
    store.remove(&key.id).await?;
    println!("success: Deleted {}", key.label());
    Ok(())
}

/// List categories in use
async fn cmd_categories(store: &KeyStore) -> Result<()> {
    let categories = store.categories().await?;

    if categories.is_empty() {
        println!("No categories yet. Tag keys with: keyshelf add <service> <name> -c <categories>");
        return Ok(());
    }

    for category in categories {
        let count = store.by_category(&category).await?.len();
        println!("  {} ({})", category, count);
    }

    Ok(())
}

/// List preset services
fn cmd_services() -> Result<()> {
    for service in PRESET_SERVICES {
        println!("  {:<16} {}", service.name, service.category);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["keyshelf", "add", "OpenAI", "prod", "sk-123"]).unwrap();
        if let Some(Commands::Add {
            service,
            name,
            secret,
            categories,
            notes,
        }) = cli.command
        {
            assert_eq!(service, "OpenAI");
            assert_eq!(name, "prod");
            assert_eq!(secret, Some("sk-123".to_string()));
            assert!(categories.is_none());
            assert!(notes.is_none());
        } else {
            panic!("Expected Add command");
        }

        let cli = Cli::try_parse_from(["keyshelf", "list", "git", "-c", "work"]).unwrap();
        if let Some(Commands::List {
            query,
            category,
            json,
        }) = cli.command
        {
            assert_eq!(query, Some("git".to_string()));
            assert_eq!(category, Some("work".to_string()));
            assert!(!json);
        } else {
            panic!("Expected List command");
        }

        let cli = Cli::try_parse_from(["keyshelf"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_global_store() {
        let cli =
            Cli::try_parse_from(["keyshelf", "copy", "abcd1234", "--store", "/tmp/keys.json"])
                .unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/keys.json")));
        if let Some(Commands::Copy { key, clear_after }) = cli.command {
            assert_eq!(key, "abcd1234");
            assert!(clear_after.is_none());
        } else {
            panic!("Expected Copy command");
        }
    }

    #[test]
    fn test_cli_edit_secret_conflict() {
        let result = Cli::try_parse_from([
            "keyshelf",
            "edit",
            "abcd",
            "--secret",
            "x",
            "--prompt-secret",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("4f1c2a9e-8b7d-4c3e"), "4f1c2a9e");
        assert_eq!(short_id("abc"), "abc");
    }

    #[tokio::test]
    async fn test_find_key_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("api-keys.json"));
        let added = store
            .add(NewKey::new("OpenAI", "prod", "sk-123"))
            .await
            .unwrap();

        let found = find_key(&store, &added.id[..8]).await.unwrap();
        assert_eq!(found.id, added.id);
        assert!(find_key(&store, "zzzzzzzz").await.is_err());
    }
}
