//! Collection name patterns for multi-tenant tables
//!
//! A pattern set is configured as a `;`-separated list of templates such as
//! `orders_{{tenant}};events_{{region}}_{{tenant}}`. Each template maps every
//! physical collection it matches onto one logical table whose name is the
//! template with the placeholder braces removed (`orders_tenant`), and exposes
//! the text captured by each placeholder as a virtual column.
//!
//! Literal template text is interpreted as a regular expression. A template
//! that does not compile degenerates to an exact, case-insensitive literal
//! match of the whole template so that configuration errors never fail a query.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("Invalid regex"));

/// Characters a placeholder may capture.
const PLACEHOLDER_CAPTURE: &str = "[a-zA-Z0-9]*?";

/// One compiled template.
#[derive(Debug, Clone)]
pub struct CollectionPattern {
    canonical_name: String,
    placeholders: Vec<String>,
    matcher: Regex,
}

impl CollectionPattern {
    /// Compile a single template. Never fails.
    pub fn new(template: &str) -> Self {
        let canonical_name = RE_PLACEHOLDER.replace_all(template, "$1").into_owned();

        let mut placeholders: Vec<String> = Vec::new();
        for cap in RE_PLACEHOLDER.captures_iter(template) {
            let name = cap[1].to_string();
            if !placeholders.contains(&name) {
                placeholders.push(name);
            }
        }

        let source = format!(
            "^{}$",
            RE_PLACEHOLDER.replace_all(template, |cap: &regex::Captures<'_>| {
                format!("(?P<{}>{})", &cap[1], PLACEHOLDER_CAPTURE)
            })
        );

        match case_insensitive(&source) {
            Ok(matcher) => {
                debug!("Matching {} to regex {}", canonical_name, matcher);
                Self {
                    canonical_name,
                    placeholders,
                    matcher,
                }
            }
            Err(e) => {
                warn!(
                    "Pattern '{}' is not a valid template ({}), matching it literally",
                    template, e
                );
                Self {
                    canonical_name,
                    placeholders: Vec::new(),
                    matcher: literal(template),
                }
            }
        }
    }

    /// Logical table name: the template with placeholder braces stripped.
    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    /// Placeholder names in declaration order, without duplicates.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Whether the whole physical collection name matches this template.
    pub fn is_match(&self, physical_name: &str) -> bool {
        let matched = self.matcher.is_match(physical_name);
        debug!(
            "Collection {} {} {}",
            physical_name,
            if matched { "matches" } else { "does not match" },
            self.matcher
        );
        matched
    }

    /// Text captured by each placeholder, or an empty map when the name does not match.
    pub fn captures(&self, physical_name: &str) -> BTreeMap<String, String> {
        let Some(caps) = self.matcher.captures(physical_name) else {
            return BTreeMap::new();
        };
        self.placeholders
            .iter()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect()
    }
}

fn case_insensitive(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

fn literal(template: &str) -> Regex {
    let source = format!("^{}$", regex::escape(template));
    // Escaped text only fails past the compiled size limit; such a pattern matches nothing.
    case_insensitive(&source)
        .unwrap_or_else(|_| Regex::new(r"[^\s\S]").expect("Invalid regex"))
}

/// Ordered set of templates parsed from configuration.
///
/// An empty set is a pass-through: every physical collection is its own
/// logical table and membership is unrestricted.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CollectionPattern>,
}

impl PatternSet {
    /// Parse a `;`-separated template list. Blank segments are ignored.
    ///
    /// # Example
    ///
    /// ```rust
    /// use docstore_connector::glob::PatternSet;
    ///
    /// let patterns = PatternSet::parse("Foo_{{Id}}");
    /// assert_eq!(patterns.canonicalize("Foo_1"), "Foo_Id");
    /// assert_eq!(patterns.canonicalize("Foobar"), "Foobar");
    /// ```
    pub fn parse(config: &str) -> Self {
        info!("Received glob pattern {}", config);
        let patterns = config
            .split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(CollectionPattern::new)
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[CollectionPattern] {
        &self.patterns
    }

    /// Map a physical collection name to its logical table name.
    ///
    /// Returns the canonical name of the first template that accepts the name,
    /// or the name itself when none does.
    pub fn canonicalize(&self, physical_name: &str) -> String {
        self.first_match(physical_name)
            .map(|p| p.canonical_name.clone())
            .unwrap_or_else(|| physical_name.to_string())
    }

    /// Whether a physical collection belongs to a logical table.
    ///
    /// A logical table with no configured template accepts every collection.
    pub fn matches(&self, logical_name: &str, physical_name: &str) -> bool {
        self.by_canonical_name(logical_name)
            .map(|p| p.is_match(physical_name))
            .unwrap_or(true)
    }

    /// Whether the logical table is backed by a template.
    pub fn is_multi_tenant(&self, logical_name: &str) -> bool {
        let multi_tenant = self.by_canonical_name(logical_name).is_some();
        info!(
            "Table {} is {}a multi-tenant collection",
            logical_name,
            if multi_tenant { "" } else { "not " }
        );
        multi_tenant
    }

    /// Placeholder names declared by the template behind a logical table.
    pub fn placeholders(&self, logical_name: &str) -> Vec<String> {
        self.by_canonical_name(logical_name)
            .map(|p| p.placeholders.clone())
            .unwrap_or_default()
    }

    /// Placeholder captures from the first template accepting the physical name.
    pub fn capture_groups(&self, physical_name: &str) -> BTreeMap<String, String> {
        self.first_match(physical_name)
            .map(|p| p.captures(physical_name))
            .unwrap_or_default()
    }

    fn by_canonical_name(&self, logical_name: &str) -> Option<&CollectionPattern> {
        self.patterns
            .iter()
            .find(|p| p.canonical_name.eq_ignore_ascii_case(logical_name))
    }

    fn first_match(&self, physical_name: &str) -> Option<&CollectionPattern> {
        self.patterns.iter().find(|p| p.is_match(physical_name))
    }
}
