//! Field extraction: read every registered field of a document into a flat
//! record, falling back to defaults on any locate failure.

use indexmap::IndexMap;
use scraper::Html;

use crate::dom;
use crate::registry::{DocumentType, FieldRegistry};

/// Flat mapping from field name to string value, in registry order.
///
/// Values are always strings, monetary amounts included; the tool never
/// round-trips amounts through a numeric type.
pub type FieldRecord = IndexMap<String, String>;

/// Extract the current value of every field registered for `doc_type`.
///
/// Total by construction: every registered field appears in the result. A
/// field whose locator finds no qualifying node degrades to its default;
/// a malformed document degrades every field, but extraction never fails.
///
/// # Example
/// ```
/// use pagepatch::{extract, DocumentType, FieldRegistry};
/// use scraper::Html;
///
/// let registry = FieldRegistry::standard();
/// let doc = Html::parse_document("<html><body></body></html>");
/// let record = extract(&doc, DocumentType::Main, &registry);
/// assert_eq!(record["accountTotalBalance"], "0.00");
/// ```
pub fn extract(doc: &Html, doc_type: DocumentType, registry: &FieldRegistry) -> FieldRecord {
    let mut record = FieldRecord::new();

    for rule in registry.rules_for(doc_type) {
        let value = dom::locate_nodes(doc, &rule.locator)
            .first()
            .and_then(|id| dom::element_text(doc, *id))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| rule.default.clone());
        record.insert(rule.name.clone(), value);
    }

    record
}
