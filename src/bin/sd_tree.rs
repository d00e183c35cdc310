//! Structured Data CLI
//!
//! Inspect and edit structured-data payloads against a data definition.
//!
//! ```bash
//! sd-tree -d definition.json inspect page.json
//! sd-tree -d definition.json resize page.json "items;entry" 3 -o out.json
//! sd-tree -d old.json migrate page.json --to new.json
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cascade_structured_data::{
    DataDefinition, NodeValue, SchemaIndex, SdConfig, StructuredData, StructuredTree, TextPattern,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sd-tree")]
#[command(about = "Inspect and edit structured-data trees")]
struct Cli {
    /// Data definition (JSON)
    #[arg(short, long)]
    definition: PathBuf,

    /// Config file, layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every node with its kind and value
    Inspect { data: PathBuf },

    /// List declared fields the payload has no node for
    Phantoms { data: PathBuf },

    /// Grow or shrink a multiple field
    Resize {
        data: PathBuf,
        /// Field path or instance identifier
        target: String,
        count: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Exchange the contents of two sibling instances
    Swap {
        data: PathBuf,
        a: String,
        b: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List text nodes matching a pattern
    Search {
        data: PathBuf,
        pattern: String,
        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Replace matches in free-text nodes
    Replace {
        data: PathBuf,
        pattern: String,
        replacement: String,
        #[arg(long)]
        regex: bool,
        /// Restrict to these identifiers or field paths
        #[arg(long = "only")]
        only: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Carry the payload's data onto another data definition
    Migrate {
        data: PathBuf,
        /// Target data definition (JSON)
        #[arg(long)]
        to: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fill a current payload from a stale one built on an older definition
    Reconcile {
        data: PathBuf,
        /// Stale payload
        #[arg(long)]
        phantom: PathBuf,
        /// Data definition of the stale payload; defaults to --definition
        #[arg(long)]
        phantom_definition: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the SHA256 of the canonical payload
    Checksum { data: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_schema(path: &Path) -> Result<SchemaIndex> {
    let definition = DataDefinition::from_file(path)
        .with_context(|| format!("loading data definition {}", path.display()))?;
    Ok(definition.into_index())
}

fn load_tree(path: &Path, schema: SchemaIndex, config: &SdConfig) -> Result<StructuredTree> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let data = StructuredData::from_json(&json)
        .with_context(|| format!("parsing {}", path.display()))?;

    let tree = if config.reconcile.drop_unknown_fields {
        let (tree, dropped) = StructuredTree::from_wire_lenient(&data, schema)?;
        if !dropped.is_empty() {
            info!(count = dropped.len(), "dropped nodes unknown to the data definition");
        }
        tree
    } else {
        StructuredTree::from_wire(&data, schema)?
    };
    Ok(tree.with_rules(config.text_rules()))
}

fn emit(tree: &StructuredTree, config: &SdConfig, output: Option<&Path>) -> Result<()> {
    let json = tree.to_json(config.output.format.is_pretty())?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("✅ Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn pattern(pattern: &str, regex: bool) -> Result<TextPattern> {
    Ok(if regex {
        TextPattern::regex(pattern)?
    } else {
        TextPattern::literal(pattern)
    })
}

fn describe(value: &NodeValue) -> String {
    match value {
        NodeValue::Group { children } => format!("{} children", children.len()),
        NodeValue::Text(text) => format!("[{}] {:?}", text.kind.as_str(), text.value),
        NodeValue::Asset(asset) => match &asset.target {
            Some(target) => format!(
                "[{}] {} {}",
                asset.kind.wire_name(),
                target.id.as_deref().unwrap_or("-"),
                target.path.as_deref().unwrap_or("-")
            ),
            None => format!("[{}] (empty)", asset.kind.wire_name()),
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SdConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let schema = load_schema(&cli.definition)?;

    match cli.command {
        Commands::Inspect { data } => {
            let tree = load_tree(&data, schema, &config)?;
            for node in tree.nodes() {
                println!(
                    "{:<40} {:<6} {}",
                    node.identifier(),
                    node.value().type_name(),
                    describe(node.value())
                );
            }
        }

        Commands::Phantoms { data } => {
            let tree = load_tree(&data, schema, &config)?;
            let phantoms = tree.phantom_fields();
            if phantoms.is_empty() {
                println!("✅ No phantom fields");
            } else {
                println!("⚠️  {} phantom field(s):", phantoms.len());
                for path in phantoms {
                    println!("   └─ {}", path);
                }
            }
        }

        Commands::Resize {
            data,
            target,
            count,
            output,
        } => {
            let mut tree = load_tree(&data, schema, &config)?;
            tree.resize_multiple(&target, count)?;
            emit(&tree, &config, output.as_deref())?;
        }

        Commands::Swap { data, a, b, output } => {
            let mut tree = load_tree(&data, schema, &config)?;
            tree.swap_siblings(&a, &b)?;
            emit(&tree, &config, output.as_deref())?;
        }

        Commands::Search {
            data,
            pattern: p,
            regex,
        } => {
            let tree = load_tree(&data, schema, &config)?;
            for id in tree.search_text(&pattern(&p, regex)?) {
                println!("{}", id);
            }
        }

        Commands::Replace {
            data,
            pattern: p,
            replacement,
            regex,
            only,
            output,
        } => {
            let mut tree = load_tree(&data, schema, &config)?;
            let include: Option<HashSet<String>> =
                (!only.is_empty()).then(|| only.into_iter().collect());
            let changed = tree.replace_text(&pattern(&p, regex)?, &replacement, include.as_ref())?;
            info!(changed = changed.len(), "replaced text");
            emit(&tree, &config, output.as_deref())?;
        }

        Commands::Migrate { data, to, output } => {
            let tree = load_tree(&data, schema, &config)?;
            let migrated = tree.map_data(load_schema(&to)?)?;
            emit(&migrated, &config, output.as_deref())?;
        }

        Commands::Reconcile {
            data,
            phantom,
            phantom_definition,
            output,
        } => {
            let phantom_schema = match phantom_definition {
                Some(path) => load_schema(&path)?,
                None => schema.clone(),
            };
            let tree = load_tree(&data, schema, &config)?;
            let stale = load_tree(&phantom, phantom_schema, &config)?;
            let reconciled = tree.reconcile_phantoms(&stale)?;
            if reconciled.checksum()? == tree.checksum()? {
                info!("phantom tree carried no new data");
            }
            emit(&reconciled, &config, output.as_deref())?;
        }

        Commands::Checksum { data } => {
            let tree = load_tree(&data, schema, &config)?;
            println!("{}", tree.checksum()?);
        }
    }

    Ok(())
}
