//! Field updates: format incoming values, write them into located nodes, and
//! persist the touched documents.
//!
//! Global fields fan out to every registered (document, locator, format) pair
//! with log-and-continue semantics: a failure on one target never blocks the
//! others, and the outcome enumerates what happened per document. Only a
//! store failure on the requested document itself fails the whole request.

use std::collections::BTreeSet;
use std::path::Path;

use scraper::Html;
use serde::Serialize;

use crate::dom;
use crate::extract::FieldRecord;
use crate::registry::{
    DocumentType, FieldRegistry, FieldRule, GlobalTarget, MatchPolicy, Scope, NAME_SELECTOR,
};
use crate::store::{DocumentStore, StoreError};

/// Outcome of one fan-out write into one document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    Updated { changed: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

/// Per-document report for a global field write.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub field: String,
    pub document: DocumentType,
    #[serde(flatten)]
    pub status: TargetStatus,
}

/// Per-file report for the site-wide name scan.
#[derive(Debug, Clone, Serialize)]
pub struct NameReport {
    pub file: String,
    #[serde(flatten)]
    pub status: TargetStatus,
}

/// Result of [`Updater::update`].
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    /// Fields written into at least one document.
    pub applied_fields: Vec<String>,
    /// Documents persisted by this update, sorted.
    pub touched_documents: Vec<DocumentType>,
    /// Fields left unapplied: unknown names and locate failures.
    pub skipped_fields: Vec<String>,
    /// One entry per (global field, target document) pair attempted.
    pub reports: Vec<TargetReport>,
}

/// Applies partial field records to documents via the registry's rules.
pub struct Updater<'a> {
    registry: &'a FieldRegistry,
    store: &'a DocumentStore,
}

impl<'a> Updater<'a> {
    pub fn new(registry: &'a FieldRegistry, store: &'a DocumentStore) -> Self {
        Self { registry, store }
    }

    /// Apply a partial field record to a document type.
    ///
    /// Global-scoped fields fan out to all their registered targets first,
    /// each target loaded and persisted independently; the remaining
    /// local-scoped fields are then written into the requested document and
    /// persisted once. Unknown field names and fields whose nodes cannot be
    /// located are skipped, never errors.
    ///
    /// # Errors
    /// Only store failures on the requested document itself propagate;
    /// per-target failures of global fields are reported in the outcome.
    pub fn update(
        &self,
        doc_type: DocumentType,
        incoming: &FieldRecord,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut applied_fields = Vec::new();
        let mut skipped_fields = Vec::new();
        let mut touched = BTreeSet::new();
        let mut reports = Vec::new();

        // Partition the incoming record by scope. Global fields are removed
        // from the local working set so they are not applied twice.
        let mut global: Vec<(&FieldRule, &str, &[GlobalTarget])> = Vec::new();
        let mut local: Vec<(&FieldRule, &str)> = Vec::new();
        for (name, value) in incoming {
            match self.registry.rule(doc_type, name) {
                Some(rule) => match &rule.scope {
                    Scope::Global(targets) => global.push((rule, value.as_str(), targets.as_slice())),
                    Scope::Local => local.push((rule, value.as_str())),
                },
                None => {
                    tracing::debug!(field = %name, document = %doc_type, "unknown field skipped");
                    skipped_fields.push(name.clone());
                }
            }
        }

        // Fan out global fields. Each target is independent: log and continue.
        for (rule, value, targets) in global {
            let mut applied_anywhere = false;
            for target in targets {
                let status = match self.apply_to_target(target, value) {
                    Ok(Some(changed)) => {
                        touched.insert(target.document);
                        applied_anywhere = true;
                        TargetStatus::Updated { changed }
                    }
                    Ok(None) => TargetStatus::Skipped {
                        reason: "no matching nodes".to_string(),
                    },
                    Err(e) => {
                        tracing::warn!(
                            field = %rule.name,
                            document = %target.document,
                            error = %e,
                            "global field target failed"
                        );
                        TargetStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                reports.push(TargetReport {
                    field: rule.name.clone(),
                    document: target.document,
                    status,
                });
            }
            if applied_anywhere {
                applied_fields.push(rule.name.clone());
            } else {
                skipped_fields.push(rule.name.clone());
            }
        }

        // Local fields write into the requested document, loaded fresh so any
        // global writes persisted above are visible.
        if !local.is_empty() {
            let mut doc = self.store.load(doc_type)?;
            let mut wrote = false;
            for (rule, value) in local {
                let nodes = dom::locate_nodes(&doc, &rule.locator);
                if nodes.is_empty() {
                    skipped_fields.push(rule.name.clone());
                    continue;
                }
                let formatted = rule.format.apply(value);
                let selected = match rule.locator.matches() {
                    MatchPolicy::First => &nodes[..1],
                    MatchPolicy::All => &nodes[..],
                };
                for id in selected {
                    dom::set_element_text(&mut doc, *id, &formatted);
                }
                applied_fields.push(rule.name.clone());
                wrote = true;
            }
            if wrote {
                self.store.save(&doc, doc_type)?;
                touched.insert(doc_type);
            }
        }

        Ok(UpdateOutcome {
            applied_fields,
            touched_documents: touched.into_iter().collect(),
            skipped_fields,
            reports,
        })
    }

    /// Write one formatted value into one target document and persist it.
    ///
    /// Returns `Ok(None)` on locate failure (the document is left untouched).
    fn apply_to_target(
        &self,
        target: &GlobalTarget,
        raw: &str,
    ) -> Result<Option<usize>, StoreError> {
        let mut doc = self.store.load(target.document)?;
        let nodes = dom::locate_nodes(&doc, &target.locator);
        if nodes.is_empty() {
            return Ok(None);
        }
        let formatted = target.format.apply(raw);
        let selected = match target.locator.matches() {
            MatchPolicy::First => &nodes[..1],
            MatchPolicy::All => &nodes[..],
        };
        for id in selected {
            dom::set_element_text(&mut doc, *id, &formatted);
        }
        self.store.save(&doc, target.document)?;
        Ok(Some(selected.len()))
    }

    /// Rewrite the account-holder name across an explicit set of files.
    ///
    /// The file set is supplied by the caller (typically
    /// [`DocumentStore::html_files`], which already honors the deny list);
    /// the scan itself never globs. Every file is processed independently:
    ///
    /// - at least one `.user-name` node differs → all such nodes rewritten,
    ///   file persisted, reported `Updated` with the count of changed nodes;
    /// - no `.user-name` nodes, or all already equal → `Skipped`;
    /// - load or save failure → `Failed`, scan continues.
    pub fn propagate_name(&self, new_name: &str, files: &[impl AsRef<Path>]) -> Vec<NameReport> {
        files
            .iter()
            .map(|path| {
                let path = path.as_ref();
                NameReport {
                    file: path.display().to_string(),
                    status: self.rename_in_file(path, new_name),
                }
            })
            .collect()
    }

    fn rename_in_file(&self, path: &Path, new_name: &str) -> TargetStatus {
        let mut doc = match self.store.load_path(path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "name scan load failed");
                return TargetStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let nodes = dom::select_all(&doc, NAME_SELECTOR);
        if nodes.is_empty() {
            return TargetStatus::Skipped {
                reason: "no matching nodes".to_string(),
            };
        }

        let changed = nodes
            .iter()
            .filter(|id| {
                dom::element_text(&doc, **id)
                    .map(|text| text.trim() != new_name)
                    .unwrap_or(false)
            })
            .count();
        if changed == 0 {
            return TargetStatus::Skipped {
                reason: "already up to date".to_string(),
            };
        }

        for id in &nodes {
            dom::set_element_text(&mut doc, *id, new_name);
        }
        match self.store.save_path(&doc, path) {
            Ok(()) => TargetStatus::Updated { changed },
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "name scan save failed");
                TargetStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Convenience: parse, apply local rules only, serialize. Used by tests and
/// callers that manage their own files.
pub fn apply_to_document(
    html: &str,
    doc_type: DocumentType,
    incoming: &FieldRecord,
    registry: &FieldRegistry,
) -> (String, Vec<String>) {
    let mut doc = Html::parse_document(html);
    let mut applied = Vec::new();

    for (name, value) in incoming {
        let rule = match registry.rule(doc_type, name) {
            Some(rule) => rule,
            None => continue,
        };
        let nodes = dom::locate_nodes(&doc, &rule.locator);
        if nodes.is_empty() {
            continue;
        }
        let formatted = rule.format.apply(value);
        let selected = match rule.locator.matches() {
            MatchPolicy::First => &nodes[..1],
            MatchPolicy::All => &nodes[..],
        };
        for id in selected {
            dom::set_element_text(&mut doc, *id, &formatted);
        }
        applied.push(name.clone());
    }

    (doc.html(), applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[test]
    fn test_apply_to_document_first_match_only() {
        let registry = FieldRegistry::standard();
        let html = r#"<html><body>
            <div class="balance-summary">
              <span class="total-amount">100.00</span>
              <span class="total-amount">200.00</span>
            </div>
        </body></html>"#;

        let mut incoming = FieldRecord::new();
        incoming.insert("accountTotalBalance".to_string(), "1000.50".to_string());
        let (out, applied) =
            apply_to_document(html, DocumentType::Main, &incoming, &registry);

        assert_eq!(applied, vec!["accountTotalBalance"]);
        let doc = Html::parse_document(&out);
        let record = extract(&doc, DocumentType::Main, &registry);
        assert_eq!(record["accountTotalBalance"], "1000.50");
        // Second match untouched.
        assert!(out.contains("200.00"));
    }

    #[test]
    fn test_apply_to_document_all_matches() {
        let registry = FieldRegistry::standard();
        let html = r#"<html><body>
            <div class="accounts-list">
              <span class="account-amount">1.00</span>
              <span class="account-amount">2.00</span>
              <span class="account-amount">3.00</span>
            </div>
        </body></html>"#;

        let mut incoming = FieldRecord::new();
        incoming.insert("accountRowAmount".to_string(), "9.99".to_string());
        let (out, _) = apply_to_document(html, DocumentType::Main, &incoming, &registry);

        assert_eq!(out.matches("9.99").count(), 3);
        assert!(!out.contains("1.00"));
    }
}
