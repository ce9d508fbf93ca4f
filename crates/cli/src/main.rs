use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use engine::{ListConfig, RefreshGate, SmartListEngine};
use library::{ItemKind, LibraryAdapter, LibraryIndex, User};
use pipeline::OrderSpec;
use rules::RuleDefinition;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// SmartLists - rule-based media list engine
#[derive(Parser)]
#[command(name = "smartlists")]
#[command(about = "Filter, order and limit a media library with smart list rules", long_about = None)]
struct Cli {
    /// Path to a library snapshot (JSON)
    #[arg(short, long, default_value = "data/library.json")]
    library: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a rule file and print the resulting list
    Filter {
        /// Rule file: rule definition plus list settings
        #[arg(long)]
        rule: PathBuf,

        /// Owner of the list (user id or name)
        #[arg(long)]
        user: String,

        /// Override the order, e.g. "Name Ascending" or "Random"
        #[arg(long)]
        order: Option<OrderSpec>,

        /// Override the maximum number of items
        #[arg(long)]
        limit: Option<usize>,

        /// Override the maximum total runtime in minutes
        #[arg(long)]
        max_minutes: Option<f64>,

        /// Restrict to these item kinds (repeatable)
        #[arg(long = "media-type")]
        media_types: Vec<ItemKind>,

        /// Print only item ids
        #[arg(long)]
        ids: bool,
    },

    /// Show how a rule file compiles without running it
    Analyze {
        #[arg(long)]
        rule: PathBuf,

        /// Owner of the list (user id or name)
        #[arg(long)]
        user: String,
    },

    /// Refresh the same list repeatedly and report latencies
    Benchmark {
        #[arg(long)]
        rule: PathBuf,

        #[arg(long)]
        user: String,

        /// Number of refreshes to run
        #[arg(long, default_value = "50")]
        requests: usize,
    },
}

/// A rule definition and its list settings in one JSON document
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(flatten)]
    definition: RuleDefinition,
    #[serde(flatten)]
    list: ListConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let start = Instant::now();
    let index = Arc::new(
        LibraryIndex::load_from_file(&cli.library)
            .with_context(|| format!("Failed to load library {}", cli.library.display()))?,
    );
    let (users, items, _) = index.counts();
    eprintln!(
        "{} Loaded {} items and {} users in {:?}",
        "✓".green(),
        items,
        users,
        start.elapsed()
    );

    match cli.command {
        Commands::Filter {
            rule,
            user,
            order,
            limit,
            max_minutes,
            media_types,
            ids,
        } => {
            let mut file = load_rule_file(&rule)?;
            if let Some(order) = order {
                file.list.order = order;
            }
            if let Some(limit) = limit {
                file.list.max_items = Some(limit);
            }
            if let Some(minutes) = max_minutes {
                file.list.max_play_time_minutes = Some(minutes);
            }
            if !media_types.is_empty() {
                file.list.media_types = media_types;
            }
            handle_filter(index, file, &user, ids).await?
        }
        Commands::Analyze { rule, user } => handle_analyze(index, load_rule_file(&rule)?, &user)?,
        Commands::Benchmark {
            rule,
            user,
            requests,
        } => handle_benchmark(index, load_rule_file(&rule)?, &user, requests).await?,
    }

    Ok(())
}

fn load_rule_file(path: &Path) -> Result<RuleFile> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule file {}", path.display()))?;
    let file: RuleFile = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse rule file {}", path.display()))?;
    debug!("Loaded rule '{}' with {} groups", file.definition.name, file.definition.groups.len());
    Ok(file)
}

/// Accept either a user id or a display name
fn resolve_user(index: &LibraryIndex, user: &str) -> Result<User> {
    if let Ok(id) = Uuid::parse_str(user) {
        return index
            .get_user(id)
            .ok_or_else(|| anyhow!("User {} not found", id));
    }
    index
        .find_user_by_name(user)
        .cloned()
        .ok_or_else(|| anyhow!("User '{}' not found", user))
}

/// Handle the 'filter' command
async fn handle_filter(index: Arc<LibraryIndex>, file: RuleFile, user: &str, ids: bool) -> Result<()> {
    let owner = resolve_user(&index, user)?;
    let engine = SmartListEngine::new(index.clone());
    let gate = RefreshGate::new(engine.config().refresh_wait());

    let start = Instant::now();
    let outcome = {
        let engine = engine.clone();
        let RuleFile { definition, list } = file;
        let owner_id = owner.id;
        gate.run(move || engine.refresh(&definition, owner_id, &list)).await?
    };
    let elapsed = start.elapsed();

    if ids {
        for id in &outcome.item_ids {
            println!("{}", id);
        }
        return Ok(());
    }

    for dropped in &outcome.dropped_conditions {
        println!("{} dropped {}", "!".yellow(), dropped);
    }

    println!(
        "{}",
        format!("Smart list for {} ({} of {} matches):", owner.name, outcome.item_ids.len(), outcome.matched)
            .bold()
            .blue()
    );
    let mut total_minutes = 0.0;
    for (rank, id) in outcome.item_ids.iter().enumerate() {
        let Some(item) = index.get_item_ref(*id) else {
            continue;
        };
        total_minutes += item.runtime_minutes();
        println!(
            "{}. {} ({}) [{}]",
            (rank + 1).to_string().green(),
            item.name,
            item.production_year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
            item.kind
        );
    }
    println!(
        "{} {:.0} minutes total, scanned {} items in {:?}",
        "•".cyan(),
        total_minutes,
        outcome.stats.scanned,
        elapsed
    );
    Ok(())
}

/// Handle the 'analyze' command
fn handle_analyze(index: Arc<LibraryIndex>, file: RuleFile, user: &str) -> Result<()> {
    let owner = resolve_user(&index, user)?;
    let engine = SmartListEngine::new(index.clone());
    let compiled = engine.compile(&file.definition, owner.id);
    let req = compiled.requirements();

    println!("{}", format!("Rule '{}'", file.definition.name).bold().blue());
    println!("{}Hash: {}", "• ".green(), compiled.hash);
    println!("{}Pass-through: {}", "• ".green(), compiled.is_pass_through());
    println!("{}Expands series: {}", "• ".green(), compiled.expands_series());
    println!("{}Order: {}", "• ".green(), file.list.order);

    for (n, group) in compiled.groups().iter().enumerate() {
        let state = if group.viable { "viable".normal() } else { "never matches".red() };
        println!("Group {} ({}):", n + 1, state);
        for condition in &group.conditions {
            println!("  - {} [{:?}]", condition.label, condition.cost);
        }
    }
    for target in compiled.similar_to() {
        println!("  ~ SimilarTo {} '{}'", target.operator, target.value);
    }
    for dropped in compiled.dropped() {
        println!(
            "{} group {} condition {}: {}",
            "! dropped".yellow(),
            dropped.group + 1,
            dropped.index + 1,
            dropped.error
        );
    }

    println!("Needs:");
    let flags = [
        ("people", req.people),
        ("audio languages", req.audio_languages),
        ("collections", req.collections),
        ("next unwatched", req.next_unwatched),
        ("series name", req.series_name),
        ("parent series tags", req.parent_series_tags),
        ("similarity", req.similarity),
    ];
    for (name, needed) in flags {
        if needed {
            println!("  - {}", name);
        }
    }
    for key in &req.extra_users {
        let known = Uuid::parse_str(key)
            .ok()
            .and_then(|id| index.get_user(id))
            .map(|u| u.name);
        match known {
            Some(name) => println!("  - play state of {} ({})", key, name),
            None => println!("  - play state of {} {}", key, "(unknown user)".red()),
        }
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    index: Arc<LibraryIndex>,
    file: RuleFile,
    user: &str,
    requests: usize,
) -> Result<()> {
    let owner = resolve_user(&index, user)?.id;
    let engine = SmartListEngine::new(index);
    let definition = Arc::new(file.definition);
    let list = Arc::new(file.list);

    let mut handles = vec![];
    for _ in 0..requests {
        let engine = engine.clone();
        let definition = definition.clone();
        let list = list.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            engine.refresh(&definition, owner, &list)?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    if timings.is_empty() {
        return Err(anyhow!("No refreshes were run"));
    }

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() - 1) * 95 / 100];
    let p99 = timings[(timings.len() - 1) * 99 / 100];
    let stats = engine.cache_stats();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Refreshes: {}", timings.len());
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!(
        "Rule cache: {} compilations, {} hits, {} misses",
        stats.compilations, stats.hits, stats.misses
    );
    Ok(())
}
