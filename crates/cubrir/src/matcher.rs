//! Coverage matching between discovered elements and used selectors.
//!
//! An element is covered when at least one selector is equivalent to it
//! under the element's dialect-appropriate comparison. Structural dialects
//! (CSS, XPath, test-id, placeholder, alt-text) compare normalized strings
//! exactly, with a fallback on the element's derived id/class appearing as
//! a token of the selector. Semantic dialects (text, role, label) compare
//! visible text case-insensitively by containment in either direction,
//! since semantic selectors rarely reproduce DOM structure verbatim but do
//! reproduce visible text. Any match means covered; ambiguity resolves in
//! favor of coverage rather than blocking a run.

use crate::element::{ElementType, PageElement, Priority};
use crate::selector::{normalize, SelectorDialect, TestSelector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Covered/total tally for one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCoverage {
    /// Elements in the bucket
    pub total: usize,
    /// Covered elements in the bucket
    pub covered: usize,
}

impl BucketCoverage {
    /// Rounded percentage for this bucket; 0 when empty
    #[must_use]
    pub fn percentage(&self) -> u32 {
        coverage_percentage(self.covered, self.total)
    }
}

/// Result of matching one element set against one selector set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Total discovered elements
    pub total_elements: usize,
    /// Elements with at least one equivalent selector
    pub covered_elements: usize,
    /// Elements no selector matched
    pub uncovered_elements: Vec<PageElement>,
    /// `round(covered / total * 100)`, 0 when total is 0
    pub coverage_percentage: u32,
    /// Covered/total per element type
    pub coverage_by_type: HashMap<ElementType, BucketCoverage>,
    /// Covered/total per page, for elements carrying a page key
    pub coverage_by_page: HashMap<String, BucketCoverage>,
}

/// Prioritized remediation guidance for closing a coverage gap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Human-readable guidance
    pub message: String,
    /// Remediation priority
    pub priority: Priority,
    /// Selector of the element this concerns, when element-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Element type this concerns, when type-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
}

/// Rounded coverage percentage with the zero-total guard
#[must_use]
pub fn coverage_percentage(covered: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((covered as f64 / total as f64) * 100.0).round() as u32
}

/// Whether `needle` occurs in `haystack` at token boundaries, so `#submit`
/// is found in `form > #submit` but not in `#submit-row`.
fn token_contained(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(needle) {
        let start = search_from + offset;
        let end = start + needle.len();
        let before_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(is_token_char);
        let after_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(is_token_char);
        if before_ok && after_ok {
            return true;
        }
        search_from = end;
    }
    false
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Strip the dialect prefix from a semantic selector's raw payload
fn semantic_payload(selector: &TestSelector) -> String {
    let normalized = normalize(&selector.raw, Some(selector.dialect));
    let payload = normalized
        .strip_prefix("text=")
        .or_else(|| normalized.strip_prefix("role="))
        .or_else(|| normalized.strip_prefix("label="))
        .unwrap_or(&normalized);
    payload.trim_matches(|c| c == '\'' || c == '"').to_string()
}

fn semantic_matches(payload: &str, candidate: Option<&str>) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };
    let payload = payload.to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if payload.is_empty() || candidate.is_empty() {
        return false;
    }
    payload.contains(&candidate) || candidate.contains(&payload)
}

/// Whether one selector is equivalent to one element
#[must_use]
pub fn selector_matches_element(
    selector: &TestSelector,
    element: &PageElement,
    element_key: &str,
) -> bool {
    if selector.dialect.is_structural() {
        if selector.normalized == element_key {
            return true;
        }
        if let Some(id) = &element.id {
            if token_contained(&selector.normalized, &format!("#{id}")) {
                return true;
            }
        }
        if let Some(class) = &element.class {
            if token_contained(&selector.normalized, &format!(".{class}")) {
                return true;
            }
        }
        false
    } else {
        let payload = semantic_payload(selector);
        match selector.dialect {
            SelectorDialect::Role => semantic_matches(&payload, element.role.as_deref()),
            _ => semantic_matches(&payload, element.text.as_deref()),
        }
    }
}

/// Decide covered/uncovered per element and compute aggregate tallies.
///
/// The computation never mutates its inputs; covered-flag bookkeeping is
/// the aggregator's concern.
#[must_use]
pub fn calculate_coverage(
    elements: &[PageElement],
    selectors: &[TestSelector],
) -> CoverageResult {
    let mut covered_count = 0;
    let mut uncovered = Vec::new();
    let mut by_type: HashMap<ElementType, BucketCoverage> = HashMap::new();
    let mut by_page: HashMap<String, BucketCoverage> = HashMap::new();

    for element in elements {
        let key = element.normalized_selector();
        let covered = selectors
            .iter()
            .any(|selector| selector_matches_element(selector, element, &key));

        let type_bucket = by_type.entry(element.element_type).or_default();
        type_bucket.total += 1;
        if let Some(page) = &element.page {
            let page_bucket = by_page.entry(page.clone()).or_default();
            page_bucket.total += 1;
            if covered {
                page_bucket.covered += 1;
            }
        }
        if covered {
            covered_count += 1;
            type_bucket.covered += 1;
        } else {
            uncovered.push(element.clone());
        }
    }

    CoverageResult {
        total_elements: elements.len(),
        covered_elements: covered_count,
        uncovered_elements: uncovered,
        coverage_percentage: coverage_percentage(covered_count, elements.len()),
        coverage_by_type: by_type,
        coverage_by_page: by_page,
    }
}

/// Map a coverage result to prioritized remediation guidance.
///
/// 100% produces an "Excellent" confirmation, 0% a "Critical" alert;
/// intermediate tiers produce per-type summaries plus per-element
/// guidance, each tagged with a priority derived from element criticality.
/// The result is sorted by descending priority.
#[must_use]
pub fn generate_recommendations(result: &CoverageResult) -> Vec<Recommendation> {
    if result.total_elements == 0 {
        return vec![Recommendation {
            message: "No interactive elements were discovered; nothing to cover yet".to_string(),
            priority: Priority::Low,
            selector: None,
            element_type: None,
        }];
    }

    if result.coverage_percentage == 100 {
        return vec![Recommendation {
            message: format!(
                "Excellent! All {} interactive elements are covered by tests",
                result.total_elements
            ),
            priority: Priority::Low,
            selector: None,
            element_type: None,
        }];
    }

    let mut recommendations = Vec::new();

    if result.covered_elements == 0 {
        recommendations.push(Recommendation {
            message: format!(
                "Critical: none of the {} interactive elements are exercised by any test",
                result.total_elements
            ),
            priority: Priority::High,
            selector: None,
            element_type: None,
        });
    }

    for (element_type, bucket) in &result.coverage_by_type {
        let missing = bucket.total - bucket.covered;
        if missing > 0 {
            recommendations.push(Recommendation {
                message: format!(
                    "Add tests for {missing} uncovered {element_type} element(s) ({}/{} covered)",
                    bucket.covered, bucket.total
                ),
                priority: element_type.priority(),
                selector: None,
                element_type: Some(*element_type),
            });
        }
    }

    for element in &result.uncovered_elements {
        let location = element
            .page
            .as_deref()
            .unwrap_or(element.discovery_context.as_str());
        recommendations.push(Recommendation {
            message: format!(
                "Add a test targeting '{}' ({}, seen in {location})",
                element.selector, element.element_type
            ),
            priority: element.element_type.priority(),
            selector: Some(element.selector.clone()),
            element_type: Some(element.element_type),
        });
    }

    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
    recommendations
}
