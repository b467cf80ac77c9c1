//! # Pagepatch: Selector-Driven Field Patcher for Static HTML
//!
//! Pagepatch rewrites specific text fragments (monetary balances, card digit
//! suffixes, a display name) inside the static HTML files of a demo banking
//! site, via CSS-selector lookups and whole-document serialization.
//!
//! ## Features
//!
//! - **Field registry**: one data-driven rule table replaces per-page
//!   find/replace code — locator, format, scope, and default per field
//! - **Extraction**: total, best-effort reads; locate failures degrade to
//!   per-field defaults, never errors
//! - **Updates**: per-target formatting for global fields (`...` masked vs
//!   bare card digits), first-match vs all-matches write policies
//! - **Name scan**: rewrites the account-holder name across an explicit,
//!   deny-list-filtered file set with per-file reporting
//!
//! ## Example
//!
//! ```no_run
//! use pagepatch::{extract, DocumentType, DocumentStore, FieldRegistry, SiteConfig, Updater};
//!
//! let registry = FieldRegistry::standard();
//! let store = DocumentStore::new(SiteConfig::with_root("site"));
//!
//! let doc = store.load(DocumentType::Main)?;
//! let record = extract(&doc, DocumentType::Main, &registry);
//! println!("total balance: {}", record["accountTotalBalance"]);
//!
//! let updater = Updater::new(&registry, &store);
//! let mut fields = pagepatch::FieldRecord::new();
//! fields.insert("accountTotalBalance".into(), "1000.50".into());
//! let outcome = updater.update(DocumentType::Main, &fields)?;
//! println!("touched: {:?}", outcome.touched_documents);
//! # Ok::<(), pagepatch::StoreError>(())
//! ```

// Core modules
pub mod dom;
pub mod extract;
pub mod registry;
pub mod store;
pub mod update;

// Re-export key types
pub use extract::{extract, FieldRecord};
pub use registry::{
    DocumentType, FieldRegistry, FieldRule, GlobalTarget, Locator, MatchPolicy, Scope,
    TextFilter, TextFormat, NAME_FIELD, NAME_SELECTOR,
};
pub use store::{DocumentStore, SiteConfig, StoreError};
pub use update::{NameReport, TargetReport, TargetStatus, UpdateOutcome, Updater};
