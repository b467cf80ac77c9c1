//! pagepatch CLI - inspect and rewrite field values in static HTML documents
//!
//! Command-line counterpart of the admin API: the same registry-driven
//! extract/update engine, driven by subcommands instead of HTTP requests.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use pagepatch::{
    extract, DocumentType, DocumentStore, FieldRecord, FieldRegistry, Scope, SiteConfig,
    TargetStatus, Updater,
};

#[derive(Parser)]
#[command(name = "pagepatch")]
#[command(version, about = "Selector-driven field patcher for static HTML documents", long_about = None)]
struct Cli {
    /// Path to YAML site configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root directory (overrides the config's root)
    #[arg(short, long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current value of every field registered for a document
    Show {
        /// Document type (main, direct-debits, cards, transfers)
        doc_type: String,
    },

    /// Set field values on a document (global fields fan out to their targets)
    Set {
        /// Document type (main, direct-debits, cards, transfers)
        doc_type: String,

        /// Field assignments, e.g. accountTotalBalance=1000.50
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Rewrite the account-holder name across every HTML file under the site
    /// root, honoring the configured deny list
    SetName {
        /// New display name
        name: String,
    },

    /// List document types and their registered fields
    Types,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match SiteConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("✗ {}", e);
                process::exit(1);
            }
        },
        None => SiteConfig::default(),
    };
    if let Some(root) = cli.root {
        config.root = root;
    }

    let registry = FieldRegistry::standard();
    let store = DocumentStore::new(config);

    match cli.command {
        Commands::Show { doc_type } => {
            let doc_type = parse_doc_type(&doc_type);
            let document = match store.load(doc_type) {
                Ok(document) => document,
                Err(e) => {
                    eprintln!("✗ {}", e);
                    process::exit(1);
                }
            };
            let record = extract(&document, doc_type, &registry);
            for (name, value) in &record {
                println!("{:<28} {}", name, value);
            }
        }

        Commands::Set { doc_type, fields } => {
            let doc_type = parse_doc_type(&doc_type);
            let incoming = parse_assignments(&fields);

            let updater = Updater::new(&registry, &store);
            match updater.update(doc_type, &incoming) {
                Ok(outcome) => {
                    for report in &outcome.reports {
                        match &report.status {
                            TargetStatus::Updated { changed } => println!(
                                "✓ {} on {}: {} node(s) updated",
                                report.field, report.document, changed
                            ),
                            TargetStatus::Skipped { reason } => println!(
                                "- {} on {}: skipped ({})",
                                report.field, report.document, reason
                            ),
                            TargetStatus::Failed { reason } => println!(
                                "✗ {} on {}: {}",
                                report.field, report.document, reason
                            ),
                        }
                    }
                    println!(
                        "✓ Applied {} field(s), skipped {}, touched {} document(s)",
                        outcome.applied_fields.len(),
                        outcome.skipped_fields.len(),
                        outcome.touched_documents.len()
                    );
                }
                Err(e) => {
                    eprintln!("✗ Update failed: {}", e);
                    process::exit(1);
                }
            }
        }

        Commands::SetName { name } => {
            let files = store.html_files();
            if files.is_empty() {
                eprintln!(
                    "✗ No HTML files under {}",
                    store.config().root.display()
                );
                process::exit(1);
            }

            let updater = Updater::new(&registry, &store);
            for report in updater.propagate_name(name.trim(), &files) {
                match &report.status {
                    TargetStatus::Updated { changed } => {
                        println!("✓ {}: {} node(s) renamed", report.file, changed)
                    }
                    TargetStatus::Skipped { reason } => {
                        println!("- {}: skipped ({})", report.file, reason)
                    }
                    TargetStatus::Failed { reason } => {
                        println!("✗ {}: {}", report.file, reason)
                    }
                }
            }
        }

        Commands::Types => {
            for doc_type in DocumentType::ALL {
                println!("{} ({})", doc_type, store.config().file_name(doc_type));
                for rule in registry.rules_for(doc_type) {
                    let scope = match &rule.scope {
                        Scope::Local => "local".to_string(),
                        Scope::Global(targets) => format!(
                            "global → {}",
                            targets
                                .iter()
                                .map(|t| t.document.to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    };
                    println!("  {:<26} {}", rule.name, scope);
                }
            }
        }
    }
}

fn parse_doc_type(raw: &str) -> DocumentType {
    match raw.parse() {
        Ok(doc_type) => doc_type,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    }
}

/// Parse `name=value` assignments into a field record.
fn parse_assignments(pairs: &[String]) -> FieldRecord {
    let mut record = FieldRecord::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                record.insert(name.to_string(), value.to_string());
            }
            _ => {
                eprintln!("✗ Invalid assignment '{}' (expected name=value)", pair);
                process::exit(1);
            }
        }
    }
    record
}
