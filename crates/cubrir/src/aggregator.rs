//! Cross-run coverage aggregation.
//!
//! The aggregator is the only component with identity beyond a single
//! call: it accumulates discovered elements and coverage marks across many
//! (file, test) contributions, deduplicates by normalized identity, and
//! projects the final aggregated view on demand. Contributions arrive
//! sequentially from the host lifecycle; under a parallel driver the
//! mutating operations must be serialized while projections are safe to
//! copy-before-read.
//!
//! Invariants maintained here:
//!
//! - re-adding a known `(normalized selector, discovery source)` key is a
//!   no-op
//! - once covered, an element stays covered for the session
//! - a `(normalized, context)` collision never double-counts, whether or
//!   not `cleanup_duplicates` has run
//! - `covered <= total` and the percentage is 0 when nothing was
//!   discovered

use crate::diagnostics::DiagnosticLog;
use crate::element::{ElementType, PageElement};
use crate::matcher::{
    coverage_percentage, generate_recommendations, selector_matches_element, BucketCoverage,
    CoverageResult, Recommendation,
};
use crate::selector::TestSelector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Default display cap for uncovered-element listings
pub const DEFAULT_DISPLAY_CAP: usize = 20;

/// One element's aggregation bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AggregatedRecord {
    element: PageElement,
    normalized: String,
    covered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage_reason: Option<String>,
}

/// Aggregated coverage view; a disposable pure projection, never mutated
/// in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedCoverage {
    /// Distinct discovered elements
    pub total_elements: usize,
    /// Elements marked covered
    pub covered_elements: usize,
    /// Elements never covered
    pub uncovered_elements: Vec<PageElement>,
    /// `round(covered / total * 100)`, 0 when total is 0
    pub coverage_percentage: u32,
    /// Covered/total per element type
    pub coverage_by_type: HashMap<ElementType, BucketCoverage>,
    /// Covered/total per page
    pub coverage_by_page: HashMap<String, BucketCoverage>,
    /// Test files that contributed to this session
    pub test_files: Vec<String>,
    /// When this snapshot was produced
    pub last_updated: DateTime<Utc>,
}

impl AggregatedCoverage {
    /// One-line text summary, e.g. `"Coverage: 67% (2/3 elements)"`
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Coverage: {}% ({}/{} elements)",
            self.coverage_percentage, self.covered_elements, self.total_elements
        )
    }

    /// Whether coverage meets a percentage threshold
    #[must_use]
    pub fn meets(&self, threshold: u32) -> bool {
        self.coverage_percentage >= threshold
    }

    /// Re-shape into a [`CoverageResult`] for the recommendation logic
    #[must_use]
    pub fn to_result(&self) -> CoverageResult {
        CoverageResult {
            total_elements: self.total_elements,
            covered_elements: self.covered_elements,
            uncovered_elements: self.uncovered_elements.clone(),
            coverage_percentage: self.coverage_percentage,
            coverage_by_type: self.coverage_by_type.clone(),
            coverage_by_page: self.coverage_by_page.clone(),
        }
    }
}

/// Uncovered elements joined with remediation guidance. `total` is always
/// the exact uncovered count; `recommendations` is capped for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncoveredReport {
    /// Exact number of uncovered elements
    pub total: usize,
    /// Per-element guidance, sorted by descending priority and capped
    pub recommendations: Vec<Recommendation>,
}

/// Stateful coverage store spanning the whole reporting session
#[derive(Debug, Default)]
pub struct CoverageAggregator {
    /// Insertion-ordered records
    records: Vec<AggregatedRecord>,
    /// `(normalized, source)` key to record position
    index: HashMap<String, usize>,
    test_files: BTreeSet<String>,
    diagnostics: DiagnosticLog,
}

fn store_key(normalized: &str, element: &PageElement) -> String {
    format!("{normalized}\u{1}{}", element.discovery_source)
}

fn view_key(record: &AggregatedRecord) -> String {
    format!(
        "{}\u{1}{}",
        record.normalized, record.element.discovery_context
    )
}

impl CoverageAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge new elements into the running total set, keyed by
    /// `(normalized selector, discovery source)`. Re-adding a known key
    /// is a no-op. Malformed elements (empty selector) are dropped with a
    /// diagnostic.
    pub fn add_discovered_elements(
        &mut self,
        elements: &[PageElement],
        context_file: &str,
        context_label: &str,
    ) {
        if !context_file.is_empty() {
            self.test_files.insert(context_file.to_string());
        }
        for element in elements {
            let Some(normalized) = self.admit(element, context_file) else {
                continue;
            };
            let key = store_key(&normalized, element);
            if self.index.contains_key(&key) {
                continue;
            }
            let mut element = element.clone();
            if element.discovery_context.is_empty() {
                element.discovery_context = format!("{context_file} ({context_label})");
            }
            self.index.insert(key, self.records.len());
            self.records.push(AggregatedRecord {
                element,
                normalized,
                covered: false,
                coverage_reason: None,
            });
        }
    }

    /// Mark elements covered by normalized selector. Elements not
    /// previously discovered are first added as discovered-and-covered,
    /// since covering an element implies its existence. Monotonic: once
    /// covered, a record stays covered.
    pub fn mark_elements_covered(
        &mut self,
        elements: &[PageElement],
        context_file: &str,
        context_label: &str,
        coverage_reason: &str,
    ) {
        if !context_file.is_empty() {
            self.test_files.insert(context_file.to_string());
        }
        for element in elements {
            let Some(normalized) = self.admit(element, context_file) else {
                continue;
            };
            let mut found = false;
            for record in &mut self.records {
                if record.normalized == normalized {
                    found = true;
                    if !record.covered {
                        record.covered = true;
                        record.coverage_reason = Some(coverage_reason.to_string());
                    }
                }
            }
            if !found {
                self.add_discovered_elements(
                    std::slice::from_ref(element),
                    context_file,
                    context_label,
                );
                let key = store_key(&normalized, element);
                if let Some(&position) = self.index.get(&key) {
                    self.records[position].covered = true;
                    self.records[position].coverage_reason = Some(coverage_reason.to_string());
                }
            }
        }
    }

    /// Mark every stored element matched by one of `selectors` covered
    pub fn apply_selectors(&mut self, selectors: &[TestSelector], coverage_reason: &str) {
        for record in &mut self.records {
            if record.covered {
                continue;
            }
            let matched = selectors
                .iter()
                .any(|s| selector_matches_element(s, &record.element, &record.normalized));
            if matched {
                record.covered = true;
                record.coverage_reason = Some(coverage_reason.to_string());
            }
        }
    }

    /// Remove records whose `(normalized, context)` pair collides with an
    /// earlier record, keeping the first seen. Coverage marks on removed
    /// duplicates are folded into the survivor. Idempotent.
    pub fn cleanup_duplicates(&mut self) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<AggregatedRecord> = Vec::with_capacity(self.records.len());
        let mut removed = 0usize;

        for record in self.records.drain(..) {
            let key = view_key(&record);
            match seen.get(&key) {
                Some(&position) => {
                    removed += 1;
                    if record.covered && !kept[position].covered {
                        kept[position].covered = true;
                        kept[position].coverage_reason = record.coverage_reason;
                    }
                }
                None => {
                    seen.insert(key, kept.len());
                    kept.push(record);
                }
            }
        }

        self.records = kept;
        self.index.clear();
        for (position, record) in self.records.iter().enumerate() {
            self.index
                .entry(store_key(&record.normalized, &record.element))
                .or_insert(position);
        }
        if removed > 0 {
            debug!(removed, "removed duplicate discovery records");
        }
    }

    /// Produce the aggregated coverage view. Pure: safe to call
    /// repeatedly, no side effects. Collisions on `(normalized, context)`
    /// are skipped at view level, so duplicate cross-source discovery
    /// never double-counts even before `cleanup_duplicates` runs.
    #[must_use]
    pub fn generate_aggregated_coverage(&self) -> AggregatedCoverage {
        let mut seen: HashSet<String> = HashSet::new();
        let mut covered_by_key: HashMap<String, bool> = HashMap::new();
        for record in &self.records {
            let entry = covered_by_key.entry(view_key(record)).or_insert(false);
            *entry = *entry || record.covered;
        }

        let mut total = 0usize;
        let mut covered_count = 0usize;
        let mut uncovered = Vec::new();
        let mut by_type: HashMap<ElementType, BucketCoverage> = HashMap::new();
        let mut by_page: HashMap<String, BucketCoverage> = HashMap::new();

        for record in &self.records {
            let key = view_key(record);
            if !seen.insert(key.clone()) {
                continue;
            }
            let covered = covered_by_key.get(&key).copied().unwrap_or(record.covered);
            total += 1;
            let type_bucket = by_type.entry(record.element.element_type).or_default();
            type_bucket.total += 1;
            if let Some(page) = &record.element.page {
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
                uncovered.push(record.element.clone());
            }
        }

        AggregatedCoverage {
            total_elements: total,
            covered_elements: covered_count,
            uncovered_elements: uncovered,
            coverage_percentage: coverage_percentage(covered_count, total),
            coverage_by_type: by_type,
            coverage_by_page: by_page,
            test_files: self.test_files.iter().cloned().collect(),
            last_updated: Utc::now(),
        }
    }

    /// Uncovered elements joined with recommendation logic, sorted by
    /// descending priority and capped to `limit` for display. The `total`
    /// on the report is never capped.
    #[must_use]
    pub fn uncovered_with_recommendations(&self, limit: usize) -> UncoveredReport {
        let view = self.generate_aggregated_coverage();
        let total = view.uncovered_elements.len();
        let mut recommendations: Vec<Recommendation> = generate_recommendations(&view.to_result())
            .into_iter()
            .filter(|r| r.selector.is_some())
            .collect();
        recommendations.truncate(limit);
        UncoveredReport {
            total,
            recommendations,
        }
    }

    /// Data-quality diagnostics recorded during aggregation
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Number of stored discovery records (before view-level dedup)
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Validate an element and return its normalized key, or drop it with
    /// a warning
    fn admit(&mut self, element: &PageElement, context_file: &str) -> Option<String> {
        let normalized = element.normalized_selector();
        if normalized.is_empty() {
            let message = format!(
                "Dropping element without selector (type {}, from {})",
                element.element_type,
                if context_file.is_empty() {
                    &element.discovery_context
                } else {
                    context_file
                }
            );
            warn!("{message}");
            self.diagnostics.record(message);
            return None;
        }
        Some(normalized)
    }
}
