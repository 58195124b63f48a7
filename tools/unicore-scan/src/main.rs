// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UniCore type scanner CLI
//!
//! Loads a type manifest and a mapping file, then answers index, subtype,
//! resolution and mapping queries.
//!
//! # Usage
//!
//! ```bash
//! # Every indexed type under com.acme.
//! unicore-scan --manifest types.json list --prefix com.acme.
//!
//! # Subtypes of a base type, with obfuscated names translated
//! unicore-scan --manifest types.json --mappings client.srg subtypes --of com.acme.Base
//!
//! # Mapping lookups
//! unicore-scan --mappings client.srg map abc
//! unicore-scan --mappings client.srg map com.acme.Client --reverse --simple
//!
//! # Mapping files available under the resource roots
//! unicore-scan --config unicore.toml mapping-files --dir mappings
//!
//! # Configuration file
//! unicore-scan gen-config --output unicore.toml
//! unicore-scan validate --config unicore.toml
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use unicore::resources::{file_extension, file_stem};
use unicore::{
    MappingTable, ResourceLocator, Snapshot, TypeCatalog, TypeContext, TypeHandle, TypeRecord,
    UnicoreConfig,
};

/// UniCore type scanner
#[derive(Parser, Debug)]
#[command(name = "unicore-scan")]
#[command(about = "Inspect type indexes, name mappings and subtype queries")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Type manifest (JSON)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Mapping file (overrides mapping_path from the configuration)
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List indexed types
    List {
        /// Only types under these package prefixes (can repeat)
        #[arg(short, long)]
        prefix: Vec<String>,
    },

    /// Find subtypes of one or more types
    Subtypes {
        /// Supertype names (can repeat)
        #[arg(long, required = true)]
        of: Vec<String>,

        /// Only types under these package prefixes (can repeat)
        #[arg(short, long)]
        prefix: Vec<String>,
    },

    /// Resolve type names through the type cache
    Resolve {
        /// Names to resolve, tried in order
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Translate a name through the mapping table
    Map {
        /// Mapped name (or canonical name with --reverse)
        name: String,

        /// Canonical -> mapped instead of mapped -> canonical
        #[arg(short, long)]
        reverse: bool,

        /// Only print the simple name (with --reverse)
        #[arg(short, long, requires = "reverse")]
        simple: bool,
    },

    /// List mapping files in a resource directory
    MappingFiles {
        /// Directory, resolved against the resource roots
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Mapping file extension
        #[arg(short, long, default_value = "srg")]
        extension: String,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "unicore.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize)]
struct MappingFile {
    name: String,
    path: PathBuf,
    entries: usize,
}

#[derive(Debug, Serialize)]
struct Resolution {
    requested: Vec<String>,
    resolved: Option<String>,
    superclass: Option<String>,
    primitive: bool,
}

impl Resolution {
    fn new(requested: &[String], handle: Option<&TypeHandle>) -> Self {
        Self {
            requested: requested.to_vec(),
            resolved: handle.map(|h| h.name().to_string()),
            superclass: handle.and_then(|h| h.superclass().map(str::to_string)),
            primitive: handle.is_some_and(TypeHandle::is_primitive),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Commands::GenConfig { output } => return cmd_gen_config(output),
        Commands::Validate { config } => return cmd_validate(config),
        _ => {}
    }

    let config = build_config(&args)?;
    let catalog = load_catalog(&args)?;
    let ctx = TypeContext::from_catalog(config, catalog);

    match &args.command {
        Commands::List { prefix } => {
            let prefixes: Vec<&str> = prefix.iter().map(String::as_str).collect();
            print_records(&ctx.get_filtered(&prefixes), args.format)
        }
        Commands::Subtypes { of, prefix } => {
            let names: Vec<&str> = of.iter().map(String::as_str).collect();
            let prefixes: Vec<&str> = prefix.iter().map(String::as_str).collect();
            print_records(&ctx.find_subtypes_of_names(&names, &prefixes), args.format)
        }
        Commands::Resolve { names } => {
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let handle = ctx.find(&refs);
            print_resolution(&Resolution::new(names, handle.as_ref()), args.format)
        }
        Commands::Map {
            name,
            reverse,
            simple,
        } => {
            let translated = if *reverse {
                ctx.to_mapped(name, *simple)
            } else {
                ctx.to_canonical(name)
            };
            match args.format {
                OutputFormat::Pretty => println!("{}", translated),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "input": name,
                        "output": translated,
                    }))?
                ),
            }
            Ok(())
        }
        Commands::MappingFiles { dir, extension } => {
            print_mapping_files(&mapping_files(ctx.locator(), dir, extension), args.format)
        }
        Commands::GenConfig { .. } | Commands::Validate { .. } => Ok(()),
    }
}

fn build_config(args: &Args) -> Result<UnicoreConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => UnicoreConfig::from_file(path)?,
        None => UnicoreConfig::default(),
    };

    match &args.mappings {
        Some(path) => config.mapping_path = Some(path.clone()),
        // No config file and no --mappings: do not go looking in the cwd.
        None if args.config.is_none() => config.mapping_path = None,
        None => {}
    }

    Ok(config)
}

fn load_catalog(args: &Args) -> Result<Arc<TypeCatalog>, Box<dyn std::error::Error>> {
    let needs_manifest = matches!(
        args.command,
        Commands::List { .. } | Commands::Subtypes { .. } | Commands::Resolve { .. }
    );

    match &args.manifest {
        Some(path) => {
            let catalog = TypeCatalog::from_manifest_file(path)?;
            tracing::info!("loaded {} types from {}", catalog.len(), path.display());
            Ok(Arc::new(catalog))
        }
        None if needs_manifest => Err("this command needs --manifest <FILE>".into()),
        None => Ok(Arc::new(TypeCatalog::new())),
    }
}

/// Records sorted by canonical name.
fn sorted(records: &Snapshot) -> BTreeMap<&str, &TypeRecord> {
    records
        .iter()
        .map(|(name, record)| (name.as_str(), record.as_ref()))
        .collect()
}

fn render_record(record: &TypeRecord) -> String {
    let mut line = record.canonical_name.clone();
    if record.mapped_name != record.canonical_name {
        line.push_str(&format!(" ({})", record.mapped_name));
    }
    if record.interface {
        line.push_str(" [interface]");
    }
    if let Some(parent) = &record.superclass {
        line.push_str(&format!(" extends {}", parent));
    }
    line
}

fn print_records(
    records: &Snapshot,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let sorted = sorted(records);
    match format {
        OutputFormat::Pretty => {
            for record in sorted.values() {
                println!("{}", render_record(record));
            }
            println!();
            println!("{} type(s)", sorted.len());
        }
        OutputFormat::Json => {
            let list: Vec<&TypeRecord> = sorted.into_values().collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
    }
    Ok(())
}

/// Mapping files directly inside `dir`, each loaded to count its entries.
fn mapping_files(locator: &ResourceLocator, dir: &Path, extension: &str) -> Vec<MappingFile> {
    locator
        .files_in_dir(dir)
        .into_iter()
        .filter(|path| file_extension(&path.to_string_lossy()) == extension)
        .map(|path| {
            let table = MappingTable::new(Some(path.clone()), locator.clone());
            table.ensure_loaded();
            MappingFile {
                name: file_stem(&path.to_string_lossy()).to_string(),
                entries: table.len(),
                path,
            }
        })
        .collect()
}

fn print_mapping_files(
    files: &[MappingFile],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Pretty => {
            for file in files {
                println!("{:<24} {:>6} entries  {}", file.name, file.entries, file.path.display());
            }
            println!();
            println!("{} mapping file(s)", files.len());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(files)?),
    }
    Ok(())
}

fn print_resolution(
    resolution: &Resolution,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Pretty => match &resolution.resolved {
            Some(name) if resolution.primitive => println!("{} (primitive)", name),
            Some(name) => match &resolution.superclass {
                Some(parent) => println!("{} extends {}", name, parent),
                None => println!("{}", name),
            },
            None => println!("not found: {}", resolution.requested.join(", ")),
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(resolution)?),
    }
    Ok(())
}

fn cmd_gen_config(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = UnicoreConfig::default().resource_root("assets");
    let toml_str = config.to_toml_string()?;

    // Add comments
    let content = format!(
        r#"# UniCore Configuration
# Generated by unicore-scan gen-config

{}
"#,
        toml_str
    );

    std::fs::write(output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match UnicoreConfig::from_file(config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!(
                "Scanning:  {}",
                if config.scanning_enabled { "enabled" } else { "disabled" }
            );
            println!(
                "Mappings:  {}",
                config
                    .mapping_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".into())
            );
            println!("Roots:     {}", config.resource_roots.len());
            println!("Scheduler: {}", config.scheduler_name);
            println!(
                "Excluded:  {} package pattern(s), {} marker(s)",
                config.exclusions.packages.len(),
                config.exclusions.markers.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}
