//! DisFilter CLI
//!
//! Developer tool for trying rulesets against entries and page fixtures
//! without loading the extension.

use std::fs;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use df_core::dom::memory::{MemoryDocument, NodeSpec};
use df_core::protocol::{MemoryStore, RecordingChannel, ENABLED_KEY, SETTINGS_KEY};
use df_core::scheduler::ManualTimer;
use df_core::{CompiledRuleset, EntryDescriptor, Filter, FilterConfig, PersistedState, Ruleset};

#[derive(Parser)]
#[command(name = "df-cli")]
#[command(about = "DisFilter ruleset and fixture tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a ruleset against a list of entries
    Check {
        /// Settings file: a ruleset, or a storage dump holding one
        #[arg(short, long)]
        settings: String,

        /// JSON array of entries ({ name, tags, id })
        #[arg(short, long)]
        entries: String,

        /// Evaluate with filtering switched off
        #[arg(long)]
        disabled: bool,
    },

    /// Run one pass over a page fixture and print the hidden count
    Count {
        /// JSON element tree ({ tag, class, id, attributes, text, children })
        #[arg(short, long)]
        fixture: String,

        /// Settings file: a ruleset, or a storage dump holding one
        #[arg(short, long)]
        settings: Option<String>,

        /// JSON overrides for selectors and class names
        #[arg(short, long)]
        config: Option<String>,

        /// Run the pass with filtering switched off
        #[arg(long)]
        disabled: bool,
    },
}

fn main() {
    let filter = EnvFilter::try_from_env("DISFILTER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            settings,
            entries,
            disabled,
        } => cmd_check(&settings, &entries, disabled),
        Commands::Count {
            fixture,
            settings,
            config,
            disabled,
        } => cmd_count(&fixture, settings.as_deref(), config.as_deref(), disabled),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_json(path: &str) -> Result<Value, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in '{}': {}", path, e))
}

/// Accept either a bare ruleset or an object keyed like `storage.local`.
fn parse_settings(value: &Value) -> Result<PersistedState, String> {
    let is_dump = value
        .as_object()
        .is_some_and(|object| object.contains_key(SETTINGS_KEY) || object.contains_key(ENABLED_KEY));
    if is_dump {
        return Ok(PersistedState::from_value(value));
    }
    let ruleset = Ruleset::deserialize(value).map_err(|e| format!("Invalid ruleset: {}", e))?;
    Ok(PersistedState {
        settings: Some(ruleset),
        enabled: None,
    })
}

fn load_settings(path: Option<&str>, disabled: bool) -> Result<PersistedState, String> {
    let mut persisted = match path {
        Some(path) => parse_settings(&read_json(path)?)?,
        None => PersistedState::default(),
    };
    if disabled {
        persisted.enabled = Some(false);
    }
    Ok(persisted)
}

fn cmd_check(settings: &str, entries: &str, disabled: bool) -> Result<(), String> {
    let persisted = load_settings(Some(settings), disabled)?;
    let enabled = persisted.enabled.unwrap_or(true);
    let ruleset = persisted.settings.unwrap_or_default();
    let entries: Vec<EntryDescriptor> =
        serde_json::from_value(read_json(entries)?).map_err(|e| format!("Invalid entries: {}", e))?;

    let compiled = CompiledRuleset::compile(&ruleset);
    if compiled.invalid_patterns() > 0 {
        println!("Skipping {} invalid name pattern(s)", compiled.invalid_patterns());
    }

    let mut blocked = 0usize;
    for entry in &entries {
        let id = entry.id.as_deref().unwrap_or("-");
        match compiled.explain(entry).filter(|_| enabled) {
            Some(reason) => {
                blocked += 1;
                println!("  block  {:>8}  {:<40} {}", id, entry.name, reason);
            }
            None => println!("  allow  {:>8}  {}", id, entry.name),
        }
    }

    println!();
    println!(
        "{} of {} entries blocked (filtering {})",
        blocked,
        entries.len(),
        if enabled { "on" } else { "off" }
    );
    Ok(())
}

fn cmd_count(fixture: &str, settings: Option<&str>, config: Option<&str>, disabled: bool) -> Result<(), String> {
    let config = match config {
        Some(path) => FilterConfig::deserialize(&read_json(path)?).map_err(|e| format!("Invalid config: {}", e))?,
        None => FilterConfig::default(),
    };
    let spec: NodeSpec =
        serde_json::from_value(read_json(fixture)?).map_err(|e| format!("Invalid fixture: {}", e))?;
    let persisted = load_settings(settings, disabled)?;

    let document = MemoryDocument::from_spec(&spec);
    let channel = RecordingChannel::new();
    let mut filter = Filter::new(
        document,
        ManualTimer::new(),
        channel.clone(),
        MemoryStore::new(),
        config,
    );
    let report = filter.load(Ok(persisted));
    info!(evaluated = report.evaluated, hidden = report.hidden_count, "pass complete");

    println!("Fixture: {}", fixture);
    println!("  Entries:   {} ({} containers without a card)", report.evaluated, report.skipped);
    println!("  Toggles:   {}", report.injected);
    if report.invalid_patterns > 0 {
        println!("  Invalid:   {} name pattern(s) skipped", report.invalid_patterns);
    }
    println!("  Hidden:    {}", report.hidden_count);

    if channel.last_count() != Some(report.hidden_count) {
        return Err("reported count does not match the pass".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_ruleset_settings() {
        let persisted = parse_settings(&json!({ "regexPatterns": ["^Spam"], "tags": [], "serverIds": ["1"] })).unwrap();
        let ruleset = persisted.settings.unwrap();
        assert_eq!(ruleset.name_patterns, vec!["^Spam"]);
        assert_eq!(ruleset.ids, vec!["1"]);
        assert_eq!(persisted.enabled, None);
    }

    #[test]
    fn test_storage_dump_settings() {
        let persisted = parse_settings(&json!({
            "disfilterSettings": { "tags": ["nsfw"] },
            "isBlockingEnabled": false,
            "themePreference": "dark"
        }))
        .unwrap();
        assert_eq!(persisted.settings.unwrap().tags, vec!["nsfw"]);
        assert_eq!(persisted.enabled, Some(false));
    }

    #[test]
    fn test_rejects_non_ruleset_settings() {
        assert!(parse_settings(&json!("^Spam")).is_err());
    }
}
