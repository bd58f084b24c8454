//! Namespace compatibility transform applied before structural parsing.
//!
//! The PMML namespace URI encodes the schema minor version, and model files
//! in the wild carry any of a dozen revisions. The transform rewrites every
//! PMML namespace URI to the supported one in a single pass over the raw
//! document, so the structural parser only ever sees one namespace.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// Namespace URI the structural parser targets.
pub const SUPPORTED_NAMESPACE: &str = "http://www.dmg.org/PMML-4_4";

static PMML_NS: OnceLock<Regex> = OnceLock::new();

fn pmml_ns() -> &'static Regex {
    PMML_NS.get_or_init(|| {
        Regex::new(r"http://www\.dmg\.org/PMML-\d+_\d+").expect("valid namespace pattern")
    })
}

/// Rewrite any PMML namespace URI in `document` to [`SUPPORTED_NAMESPACE`].
///
/// Pure and side-effect free; documents without a PMML namespace come back
/// unchanged.
pub fn normalize_namespace(document: &str) -> Cow<'_, str> {
    pmml_ns().replace_all(document, SUPPORTED_NAMESPACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_older_revisions() {
        let doc = r#"<PMML xmlns="http://www.dmg.org/PMML-3_2" version="3.2"/>"#;
        let normalized = normalize_namespace(doc);
        assert!(normalized.contains(SUPPORTED_NAMESPACE));
        assert!(!normalized.contains("PMML-3_2"));
    }

    #[test]
    fn test_rewrites_every_occurrence() {
        let doc = concat!(
            r#"<PMML xmlns="http://www.dmg.org/PMML-4_1">"#,
            r#"<Extension uri="http://www.dmg.org/PMML-4_0"/></PMML>"#,
        );
        let normalized = normalize_namespace(doc);
        assert_eq!(normalized.matches(SUPPORTED_NAMESPACE).count(), 2);
    }

    #[test]
    fn test_current_revision_unchanged() {
        let doc = r#"<PMML xmlns="http://www.dmg.org/PMML-4_4" version="4.4"/>"#;
        assert_eq!(normalize_namespace(doc), doc);
    }

    #[test]
    fn test_foreign_namespaces_untouched() {
        let doc = r#"<root xmlns="http://example.com/other"/>"#;
        assert_eq!(normalize_namespace(doc), doc);
    }
}
