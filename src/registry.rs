//! Static field registry: which nodes each logical field lives in, per document type.
//!
//! The registry is pure data. Each (DocumentType, field name) pair maps to a
//! [`FieldRule`] describing how to locate the field's node(s), how to format an
//! incoming value before writing it, whether an update fans out to other
//! documents, and what to report when the node cannot be found.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Closed set of documents the tool knows how to patch.
///
/// Each variant corresponds to one backing HTML file under the site root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Main,
    DirectDebits,
    Cards,
    Transfers,
}

impl DocumentType {
    /// All known document types, in registry order.
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Main,
        DocumentType::DirectDebits,
        DocumentType::Cards,
        DocumentType::Transfers,
    ];

    /// File name used when the site config does not override it.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            DocumentType::Main => "index.html",
            DocumentType::DirectDebits => "direct-debits.html",
            DocumentType::Cards => "cards.html",
            DocumentType::Transfers => "transfers.html",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::Main => "main",
            DocumentType::DirectDebits => "direct-debits",
            DocumentType::Cards => "cards",
            DocumentType::Transfers => "transfers",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(DocumentType::Main),
            "direct-debits" => Ok(DocumentType::DirectDebits),
            "cards" => Ok(DocumentType::Cards),
            "transfers" => Ok(DocumentType::Transfers),
            other => Err(format!("Unknown document type: {}", other)),
        }
    }
}

/// Filter applied to a candidate node's trimmed text during location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFilter {
    /// Any non-empty trimmed text qualifies.
    Any,
    /// Text must have a parseable leading number and must not be the bare
    /// currency symbol. Mirrors the source's `parseFloat`-based check:
    /// locale thousand/decimal separators are not handled.
    Numeric,
}

/// How many qualifying nodes an update writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Write the first qualifying node only (monetary totals).
    First,
    /// Write every qualifying node (repeated row amounts).
    All,
}

/// Rule for finding a field's node(s) inside a parsed document.
#[derive(Debug, Clone)]
pub enum Locator {
    /// Plain structural CSS selector.
    Selector {
        css: String,
        filter: TextFilter,
        matches: MatchPolicy,
    },
    /// Two-step rule: find the first text node containing `phrase`, ascend to
    /// the nearest ancestor matching `container`, then apply `inner` within it.
    Anchored {
        phrase: String,
        container: String,
        inner: String,
        filter: TextFilter,
        matches: MatchPolicy,
    },
}

impl Locator {
    pub fn selector(css: &str, filter: TextFilter, matches: MatchPolicy) -> Self {
        Locator::Selector {
            css: css.to_string(),
            filter,
            matches,
        }
    }

    pub fn anchored(
        phrase: &str,
        container: &str,
        inner: &str,
        filter: TextFilter,
        matches: MatchPolicy,
    ) -> Self {
        Locator::Anchored {
            phrase: phrase.to_string(),
            container: container.to_string(),
            inner: inner.to_string(),
            filter,
            matches,
        }
    }

    pub fn matches(&self) -> MatchPolicy {
        match self {
            Locator::Selector { matches, .. } => *matches,
            Locator::Anchored { matches, .. } => *matches,
        }
    }
}

/// Transform applied to an incoming raw value before it is written.
///
/// Formats are per (field, target document) pair: the same logical field can
/// carry the dotted prefix on one page and bare digits on another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFormat {
    /// Write the raw value unchanged.
    Verbatim,
    /// Ensure the value starts with the literal `...` prefix, stripping any
    /// existing leading dots first.
    DottedPrefix,
    /// Strip any leading dots, leaving bare digits.
    BareDigits,
    /// Append a trailing suffix unless already present.
    Suffix(String),
}

impl TextFormat {
    /// Apply the transform. All variants are idempotent: applying the result
    /// again yields the same string.
    pub fn apply(&self, raw: &str) -> String {
        match self {
            TextFormat::Verbatim => raw.to_string(),
            TextFormat::DottedPrefix => {
                if raw.starts_with("...") {
                    raw.to_string()
                } else {
                    format!("...{}", raw.trim_start_matches('.'))
                }
            }
            TextFormat::BareDigits => raw.trim_start_matches('.').to_string(),
            TextFormat::Suffix(suffix) => {
                if raw.ends_with(suffix.as_str()) {
                    raw.to_string()
                } else {
                    format!("{}{}", raw, suffix)
                }
            }
        }
    }
}

/// One fan-out destination of a global field.
#[derive(Debug, Clone)]
pub struct GlobalTarget {
    pub document: DocumentType,
    pub locator: Locator,
    pub format: TextFormat,
}

/// Whether an update to a field stays in the requested document or fans out.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Written only into the requested document.
    Local,
    /// Written into every listed (document, locator, format) target. The
    /// target list always includes the owning document itself; the mapping is
    /// explicit per pair, never inferred.
    Global(Vec<GlobalTarget>),
}

/// Registry entry for a single field of a single document type.
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// Unique key within the document type.
    pub name: String,
    /// How to find the node(s) in this document.
    pub locator: Locator,
    /// Transform applied before writing into this document.
    pub format: TextFormat,
    pub scope: Scope,
    /// Fallback value when location fails during extraction.
    pub default: String,
}

impl FieldRule {
    fn local(name: &str, locator: Locator, format: TextFormat, default: &str) -> Self {
        FieldRule {
            name: name.to_string(),
            locator,
            format,
            scope: Scope::Local,
            default: default.to_string(),
        }
    }

    fn global(
        name: &str,
        own: GlobalTarget,
        targets: Vec<GlobalTarget>,
        default: &str,
    ) -> Self {
        FieldRule {
            name: name.to_string(),
            locator: own.locator,
            format: own.format,
            scope: Scope::Global(targets),
            default: default.to_string(),
        }
    }
}

/// CSS pattern matched by the account-holder name everywhere it appears.
/// The name scan uses this fixed pattern across the whole site tree.
pub const NAME_SELECTOR: &str = ".user-name";

/// Field name whose update is handled by the site-wide name scan.
pub const NAME_FIELD: &str = "accountHolderName";

/// Static table of field rules, keyed by document type.
pub struct FieldRegistry {
    rules: IndexMap<DocumentType, Vec<FieldRule>>,
}

impl FieldRegistry {
    /// Build the registry for the demo banking site.
    pub fn standard() -> Self {
        let mut rules: IndexMap<DocumentType, Vec<FieldRule>> = IndexMap::new();

        rules.insert(
            DocumentType::Main,
            vec![
                FieldRule::global(
                    "accountTotalBalance",
                    total_balance_target(DocumentType::Main),
                    total_balance_targets(),
                    "0.00",
                ),
                FieldRule::local(
                    "accountAvailableBalance",
                    Locator::selector(
                        ".balance-summary .available-amount",
                        TextFilter::Numeric,
                        MatchPolicy::First,
                    ),
                    TextFormat::Verbatim,
                    "0.00",
                ),
                FieldRule::local(
                    "accountRowAmount",
                    Locator::selector(
                        ".accounts-list .account-amount",
                        TextFilter::Numeric,
                        MatchPolicy::All,
                    ),
                    TextFormat::Verbatim,
                    "0.00",
                ),
                FieldRule::global(
                    "cardLastDigits",
                    card_digits_target(DocumentType::Main),
                    card_digits_targets(),
                    "...0000",
                ),
                FieldRule::local(
                    NAME_FIELD,
                    Locator::selector(NAME_SELECTOR, TextFilter::Any, MatchPolicy::First),
                    TextFormat::Verbatim,
                    "Account Holder",
                ),
            ],
        );

        rules.insert(
            DocumentType::DirectDebits,
            vec![
                FieldRule::local(
                    "monthlyTotal",
                    Locator::anchored(
                        "Monthly total",
                        ".debit-summary",
                        ".amount",
                        TextFilter::Numeric,
                        MatchPolicy::First,
                    ),
                    TextFormat::Suffix(" €".to_string()),
                    "0.00 €",
                ),
                FieldRule::local(
                    "debitAmount",
                    Locator::selector(
                        ".debit-row .debit-amount",
                        TextFilter::Numeric,
                        MatchPolicy::All,
                    ),
                    TextFormat::Verbatim,
                    "0.00",
                ),
                FieldRule::global(
                    "cardLastDigits",
                    card_digits_target(DocumentType::DirectDebits),
                    card_digits_targets(),
                    "...0000",
                ),
            ],
        );

        rules.insert(
            DocumentType::Cards,
            vec![
                FieldRule::global(
                    "cardLastDigits",
                    card_digits_target(DocumentType::Cards),
                    card_digits_targets(),
                    "0000",
                ),
                FieldRule::local(
                    "cardHolderName",
                    Locator::selector(
                        ".card-detail .card-holder",
                        TextFilter::Any,
                        MatchPolicy::First,
                    ),
                    TextFormat::Verbatim,
                    "Account Holder",
                ),
            ],
        );

        rules.insert(
            DocumentType::Transfers,
            vec![
                FieldRule::local(
                    "accountAmount",
                    Locator::selector(
                        ".account-picker .account-amount",
                        TextFilter::Numeric,
                        MatchPolicy::All,
                    ),
                    TextFormat::Verbatim,
                    "0.00",
                ),
                FieldRule::local(
                    "transferLimit",
                    Locator::selector(
                        ".limit-banner .amount",
                        TextFilter::Numeric,
                        MatchPolicy::First,
                    ),
                    TextFormat::Verbatim,
                    "0.00",
                ),
                FieldRule::global(
                    "cardLastDigits",
                    card_digits_target(DocumentType::Transfers),
                    card_digits_targets(),
                    "...0000",
                ),
            ],
        );

        FieldRegistry { rules }
    }

    /// Rules for a document type, in registry order.
    pub fn rules_for(&self, doc: DocumentType) -> &[FieldRule] {
        self.rules.get(&doc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a single rule by document type and field name.
    pub fn rule(&self, doc: DocumentType, name: &str) -> Option<&FieldRule> {
        self.rules_for(doc).iter().find(|r| r.name == name)
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Per-document locate/format pair for `accountTotalBalance`.
///
/// Updating the total from the main page also rewrites the repeated account
/// amounts on the transfers page. The mapping is explicit: transfers itself
/// owns those amounts under the local `accountAmount` rule, which does not
/// propagate back.
fn total_balance_target(doc: DocumentType) -> GlobalTarget {
    let locator = match doc {
        DocumentType::Transfers => Locator::selector(
            ".account-picker .account-amount",
            TextFilter::Numeric,
            MatchPolicy::All,
        ),
        _ => Locator::selector(
            ".balance-summary .total-amount",
            TextFilter::Numeric,
            MatchPolicy::First,
        ),
    };
    GlobalTarget {
        document: doc,
        locator,
        format: TextFormat::Verbatim,
    }
}

fn total_balance_targets() -> Vec<GlobalTarget> {
    vec![
        total_balance_target(DocumentType::Main),
        total_balance_target(DocumentType::Transfers),
    ]
}

/// Per-document locate/format pair for `cardLastDigits`.
///
/// Most pages show the digits behind a `...` mask; the cards page shows them
/// bare, so its pair strips the prefix instead of adding it.
fn card_digits_target(doc: DocumentType) -> GlobalTarget {
    match doc {
        DocumentType::Main => GlobalTarget {
            document: doc,
            locator: Locator::selector(
                ".card-widget .card-number",
                TextFilter::Any,
                MatchPolicy::First,
            ),
            format: TextFormat::DottedPrefix,
        },
        DocumentType::DirectDebits => GlobalTarget {
            document: doc,
            locator: Locator::anchored(
                "Linked card",
                ".debit-summary",
                ".card-digits",
                TextFilter::Any,
                MatchPolicy::First,
            ),
            format: TextFormat::DottedPrefix,
        },
        DocumentType::Cards => GlobalTarget {
            document: doc,
            locator: Locator::selector(
                ".card-detail .card-number-short",
                TextFilter::Any,
                MatchPolicy::First,
            ),
            format: TextFormat::BareDigits,
        },
        DocumentType::Transfers => GlobalTarget {
            document: doc,
            locator: Locator::selector(
                ".transfer-source .card-digits",
                TextFilter::Any,
                MatchPolicy::First,
            ),
            format: TextFormat::DottedPrefix,
        },
    }
}

fn card_digits_targets() -> Vec<GlobalTarget> {
    DocumentType::ALL.iter().map(|d| card_digits_target(*d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_unique_per_document() {
        let registry = FieldRegistry::standard();

        for doc in DocumentType::ALL {
            let mut seen = HashSet::new();
            for rule in registry.rules_for(doc) {
                assert!(
                    seen.insert(rule.name.clone()),
                    "duplicate field '{}' in {}",
                    rule.name,
                    doc
                );
            }
        }
    }

    #[test]
    fn test_global_fields_enumerate_all_targets() {
        let registry = FieldRegistry::standard();

        for doc in DocumentType::ALL {
            let rule = registry.rule(doc, "cardLastDigits").unwrap();
            match &rule.scope {
                Scope::Global(targets) => {
                    let docs: Vec<DocumentType> =
                        targets.iter().map(|t| t.document).collect();
                    assert_eq!(docs, DocumentType::ALL.to_vec());
                }
                Scope::Local => panic!("cardLastDigits must be global on {}", doc),
            }
        }
    }

    #[test]
    fn test_total_balance_targets_main_and_transfers() {
        let registry = FieldRegistry::standard();

        let rule = registry.rule(DocumentType::Main, "accountTotalBalance").unwrap();
        match &rule.scope {
            Scope::Global(targets) => {
                let docs: Vec<DocumentType> = targets.iter().map(|t| t.document).collect();
                assert_eq!(docs, vec![DocumentType::Main, DocumentType::Transfers]);
            }
            Scope::Local => panic!("accountTotalBalance must be global"),
        }
    }

    #[test]
    fn test_dotted_prefix_format() {
        let f = TextFormat::DottedPrefix;

        assert_eq!(f.apply("2150"), "...2150");
        assert_eq!(f.apply("...2150"), "...2150");
        assert_eq!(f.apply(".2150"), "...2150");
        assert_eq!(f.apply("....2150"), "...2150");
    }

    #[test]
    fn test_bare_digits_format() {
        let f = TextFormat::BareDigits;

        assert_eq!(f.apply("...2150"), "2150");
        assert_eq!(f.apply("2150"), "2150");
    }

    #[test]
    fn test_suffix_format_idempotent() {
        let f = TextFormat::Suffix(" €".to_string());

        assert_eq!(f.apply("120.00"), "120.00 €");
        assert_eq!(f.apply("120.00 €"), "120.00 €");
    }

    #[test]
    fn test_document_type_round_trip() {
        for doc in DocumentType::ALL {
            let parsed: DocumentType = doc.to_string().parse().unwrap();
            assert_eq!(parsed, doc);
        }
        assert!("settings".parse::<DocumentType>().is_err());
    }
}
