//! Selector evaluation and text mutation over parsed HTML documents.
//!
//! Thin helpers around `scraper`: locate a field rule's node(s) in document
//! order, test candidate text against the numeric filter, and overwrite an
//! element's text content in place. All lookups are best-effort; an invalid
//! selector or an unmatched phrase yields no nodes rather than an error.

use ego_tree::NodeId;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};

use crate::registry::{Locator, TextFilter};

/// Bare currency symbol the numeric filter rejects.
pub const CURRENCY_SYMBOL: &str = "€";

/// Parse the leading number of a string, `parseFloat`-style: optional sign,
/// digits, optional fraction; trailing garbage is ignored. Locale separators
/// are not handled ("1,000.50" parses as 1).
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let t = text.trim();
    let bytes = t.as_bytes();
    let mut i = 0;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        let mut k = i + 1;
        while k < bytes.len() && bytes[k].is_ascii_digit() {
            k += 1;
        }
        frac_digits = k - (i + 1);
        if int_digits > 0 || frac_digits > 0 {
            i = k;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    t[..i].parse::<f64>().ok()
}

/// Check a node's trimmed text against a [`TextFilter`].
pub fn text_qualifies(text: &str, filter: TextFilter) -> bool {
    let t = text.trim();
    match filter {
        TextFilter::Any => !t.is_empty(),
        TextFilter::Numeric => {
            !t.is_empty() && t != CURRENCY_SYMBOL && parse_leading_number(t).is_some()
        }
    }
}

/// Concatenated text content of the element with the given node id.
pub fn element_text(doc: &Html, id: NodeId) -> Option<String> {
    let node = doc.tree.get(id)?;
    let element = ElementRef::wrap(node)?;
    Some(element.text().collect::<String>())
}

/// Evaluate a locator against a document.
///
/// Returns the ids of every qualifying element in document order; the caller
/// applies the rule's match policy. An empty result means locate failure.
pub fn locate_nodes(doc: &Html, locator: &Locator) -> Vec<NodeId> {
    match locator {
        Locator::Selector { css, filter, .. } => select_qualifying(doc, css, *filter),
        Locator::Anchored {
            phrase,
            container,
            inner,
            filter,
            ..
        } => {
            let container_el = match find_container(doc, phrase, container) {
                Some(el) => el,
                None => return Vec::new(),
            };
            let inner_sel = match Selector::parse(inner) {
                Ok(sel) => sel,
                Err(_) => return Vec::new(),
            };
            container_el
                .select(&inner_sel)
                .filter(|el| text_qualifies(&el.text().collect::<String>(), *filter))
                .map(|el| el.id())
                .collect()
        }
    }
}

/// All elements matching a selector, in document order, with no text filter.
/// The site-wide name scan matches on structure alone.
pub fn select_all(doc: &Html, css: &str) -> Vec<NodeId> {
    let selector = match Selector::parse(css) {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };
    doc.select(&selector).map(|el| el.id()).collect()
}

fn select_qualifying(doc: &Html, css: &str, filter: TextFilter) -> Vec<NodeId> {
    let selector = match Selector::parse(css) {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };
    doc.select(&selector)
        .filter(|el| text_qualifies(&el.text().collect::<String>(), filter))
        .map(|el| el.id())
        .collect()
}

/// Find the first text node containing `phrase`, then the nearest ancestor
/// element matching `container`.
fn find_container<'a>(doc: &'a Html, phrase: &str, container: &str) -> Option<ElementRef<'a>> {
    let container_sel = Selector::parse(container).ok()?;

    for node in doc.tree.root().descendants() {
        let text = match node.value() {
            Node::Text(t) => t,
            _ => continue,
        };
        if !text.contains(phrase) {
            continue;
        }
        for ancestor in node.ancestors() {
            if let Some(el) = ElementRef::wrap(ancestor) {
                if container_sel.matches(&el) {
                    return Some(el);
                }
            }
        }
        // Phrase found but no matching ancestor: locate failure.
        return None;
    }
    None
}

/// Replace the entire text content of an element, detaching any existing
/// children and appending a single text node.
pub fn set_element_text(doc: &mut Html, id: NodeId, value: &str) -> bool {
    let child_ids: Vec<NodeId> = match doc.tree.get(id) {
        Some(node) => node.children().map(|c| c.id()).collect(),
        None => return false,
    };
    for child in child_ids {
        if let Some(mut node) = doc.tree.get_mut(child) {
            node.detach();
        }
    }
    match doc.tree.get_mut(id) {
        Some(mut node) => {
            node.append(Node::Text(Text { text: value.into() }));
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MatchPolicy;

    const PAGE: &str = r#"
        <html><body>
          <div class="balance-summary">
            <span class="label">Total</span>
            <span class="total-amount">2450.30</span>
            <span class="total-amount">€</span>
          </div>
          <div class="accounts-list">
            <span class="account-amount">100.00</span>
            <span class="account-amount">250.50</span>
          </div>
          <div class="debit-summary">
            <p>Monthly total due</p>
            <span class="amount">89.99</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_leading_number() {
        assert_eq!(parse_leading_number("1000.50"), Some(1000.50));
        assert_eq!(parse_leading_number("  42 "), Some(42.0));
        assert_eq!(parse_leading_number("-3.5"), Some(-3.5));
        assert_eq!(parse_leading_number("12.34 €"), Some(12.34));
        assert_eq!(parse_leading_number("€"), None);
        assert_eq!(parse_leading_number("abc"), None);
        assert_eq!(parse_leading_number(""), None);
        // parseFloat semantics: comma stops the parse.
        assert_eq!(parse_leading_number("1,000.50"), Some(1.0));
    }

    #[test]
    fn test_text_qualifies_numeric() {
        assert!(text_qualifies(" 1000.50 ", TextFilter::Numeric));
        assert!(text_qualifies("89.99 €", TextFilter::Numeric));
        assert!(!text_qualifies("€", TextFilter::Numeric));
        assert!(!text_qualifies("   ", TextFilter::Numeric));
        assert!(!text_qualifies("Total", TextFilter::Numeric));
        assert!(text_qualifies("Total", TextFilter::Any));
    }

    #[test]
    fn test_selector_numeric_filter_skips_currency_symbol() {
        let doc = Html::parse_document(PAGE);
        let locator = Locator::selector(
            ".balance-summary .total-amount",
            TextFilter::Numeric,
            MatchPolicy::First,
        );

        let nodes = locate_nodes(&doc, &locator);
        assert_eq!(nodes.len(), 1);
        assert_eq!(element_text(&doc, nodes[0]).unwrap().trim(), "2450.30");
    }

    #[test]
    fn test_selector_all_matches() {
        let doc = Html::parse_document(PAGE);
        let locator = Locator::selector(
            ".accounts-list .account-amount",
            TextFilter::Numeric,
            MatchPolicy::All,
        );

        let nodes = locate_nodes(&doc, &locator);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_anchored_locator() {
        let doc = Html::parse_document(PAGE);
        let locator = Locator::anchored(
            "Monthly total",
            ".debit-summary",
            ".amount",
            TextFilter::Numeric,
            MatchPolicy::First,
        );

        let nodes = locate_nodes(&doc, &locator);
        assert_eq!(nodes.len(), 1);
        assert_eq!(element_text(&doc, nodes[0]).unwrap().trim(), "89.99");
    }

    #[test]
    fn test_anchored_locator_missing_phrase() {
        let doc = Html::parse_document(PAGE);
        let locator = Locator::anchored(
            "Quarterly total",
            ".debit-summary",
            ".amount",
            TextFilter::Numeric,
            MatchPolicy::First,
        );

        assert!(locate_nodes(&doc, &locator).is_empty());
    }

    #[test]
    fn test_set_element_text() {
        let mut doc = Html::parse_document(PAGE);
        let locator = Locator::selector(
            ".balance-summary .total-amount",
            TextFilter::Numeric,
            MatchPolicy::First,
        );
        let nodes = locate_nodes(&doc, &locator);

        assert!(set_element_text(&mut doc, nodes[0], "1000.50"));
        assert_eq!(element_text(&doc, nodes[0]).unwrap(), "1000.50");
    }

    #[test]
    fn test_invalid_selector_yields_no_nodes() {
        let doc = Html::parse_document(PAGE);
        let locator = Locator::selector(":::nope", TextFilter::Any, MatchPolicy::First);

        assert!(locate_nodes(&doc, &locator).is_empty());
    }
}
