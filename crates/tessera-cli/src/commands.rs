use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use tessera_pipeline::{is_inline, HydrateConfig, Hydrator, Persister};
use tessera_registry::{HandleTable, PendingAssetRegistry};
use tessera_store::ContentStore;
use tessera_tree::{collect_strings, Node};
use tessera_types::{EphemeralRef, Progress};

use crate::cli::*;
use crate::config::CliConfig;

pub async fn run_command(cli: Cli, config: CliConfig) -> anyhow::Result<()> {
    let store = config.content_store()?;
    tracing::debug!(backend = ?config.store.backend, location = %config.store_location(), "using content store");
    match cli.command {
        Command::Persist(args) => cmd_persist(args, &config, store).await,
        Command::Hydrate(args) => cmd_hydrate(args, store).await.map(|_| ()),
        Command::Inspect(args) => cmd_inspect(args, &*store, cli.format).await,
        Command::Config => cmd_config(&config),
    }
}

fn progress_line(label: &'static str) -> impl Fn(Progress) + Send + Sync {
    move |p: Progress| eprintln!("  {} {}/{}", label.dimmed(), p.completed, p.total)
}

async fn cmd_persist(
    args: PersistArgs,
    config: &CliConfig,
    store: Arc<dyn ContentStore>,
) -> anyhow::Result<()> {
    let tree = read_tree(&args.input).await?;
    let handles = HandleTable::shared();
    let registry = PendingAssetRegistry::new(handles);

    let persisted = Persister::new(store, config.persist_config(args.campaign))
        .persist(&tree, &registry, &progress_line("uploaded"))
        .await?;

    write_tree(args.output.as_deref(), &persisted.tree).await?;
    eprintln!(
        "{} Persisted {} asset(s) ({} inline)",
        "✓".green().bold(),
        persisted.report.uploaded().to_string().bold(),
        persisted.report.inlined
    );
    for (reference, asset) in &persisted.report.assets {
        eprintln!("  {} → {}", reference.to_string().dimmed(), asset.url.blue());
    }
    Ok(())
}

/// Hydrated payload written to disk.
#[derive(Debug)]
struct ManifestEntry {
    reference: EphemeralRef,
    file: PathBuf,
}

async fn cmd_hydrate(
    args: HydrateArgs,
    store: Arc<dyn ContentStore>,
) -> anyhow::Result<Vec<ManifestEntry>> {
    let tree = read_tree(&args.input).await?;
    let hydrated = Hydrator::new(store, HandleTable::shared(), HydrateConfig::default())
        .hydrate(&tree, &progress_line("downloaded"))
        .await;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut used = HashSet::new();
    let mut manifest = Vec::new();
    for reference in hydrated.assets.references() {
        let Some(payload) = hydrated.assets.get(reference.as_str()) else {
            continue;
        };
        let file = args.out_dir.join(unique_file_name(payload.name(), &mut used));
        tokio::fs::write(&file, payload.data())
            .await
            .with_context(|| format!("writing {}", file.display()))?;
        manifest.push(ManifestEntry { reference, file });
    }

    write_tree(args.output.as_deref(), &hydrated.tree).await?;
    eprintln!(
        "{} Hydrated {} asset(s) into {}",
        "✓".green().bold(),
        manifest.len().to_string().bold(),
        args.out_dir.display()
    );
    for entry in &manifest {
        eprintln!("  {} → {}", entry.reference.to_string().yellow(), entry.file.display());
    }
    for failure in &hydrated.failures {
        eprintln!("  {} {}", "✗".red().bold(), failure.to_string().red());
    }
    Ok(manifest)
}

/// Distinct asset strings of a tree, by kind.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct Inventory {
    inline: usize,
    ephemeral: usize,
    durable: usize,
}

fn inventory(tree: &Node, store: &dyn ContentStore) -> Inventory {
    Inventory {
        inline: collect_strings(tree, is_inline).len(),
        ephemeral: collect_strings(tree, EphemeralRef::is_reference).len(),
        durable: collect_strings(tree, |s| store.owns_url(s)).len(),
    }
}

async fn cmd_inspect(args: InspectArgs, store: &dyn ContentStore, format: OutputFormat) -> anyhow::Result<()> {
    let tree = read_tree(&args.input).await?;
    let inventory = inventory(&tree, store);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inventory)?),
        OutputFormat::Text => {
            println!("{}", args.input.display().to_string().bold());
            println!("  Inline payloads:      {}", inventory.inline.to_string().cyan());
            println!("  Ephemeral references: {}", inventory.ephemeral.to_string().yellow());
            println!("  Stored assets:        {}", inventory.durable.to_string().green());
        }
    }
    Ok(())
}

fn cmd_config(config: &CliConfig) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn read_tree(path: &Path) -> anyhow::Result<Node> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Node::from_json_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn write_tree(path: Option<&Path>, tree: &Node) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(&tree.to_json()?)?;
    match path {
        Some(path) => tokio::fs::write(path, rendered + "\n")
            .await
            .with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

/// A flat file name for a payload, distinct from every name in `used`.
fn unique_file_name(name: Option<&str>, used: &mut HashSet<String>) -> String {
    let base: String = name
        .unwrap_or("asset")
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let base = if matches!(base.as_str(), "" | "." | "..") {
        "asset".to_string()
    } else {
        base
    };

    let mut candidate = base.clone();
    let mut n = 1;
    while !used.insert(candidate.clone()) {
        candidate = format!("{n}_{base}");
        n += 1;
    }
    candidate
}
