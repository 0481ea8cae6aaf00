//! Cubrir: Selector Extraction and Coverage Matching for Browser Suites
//!
//! Cubrir (Spanish: "to cover") measures how thoroughly a browser test
//! suite exercises the interactive elements of the pages it targets. It
//! extracts selectors statically from test sources, reduces superficially
//! different spellings to one normalized identity, classifies each into a
//! dialect, matches selectors against discovered page elements, and
//! aggregates per-run contributions into a coverage report with
//! remediation guidance.
//!
//! # Pipeline
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌────────────┐    ┌────────────┐
//! │ Test       │    │ Selector   │    │ Coverage   │    │ Aggregated │
//! │ Sources    │───►│ Extraction │───►│ Matching   │───►│ Report +   │
//! │ + Elements │    │ + Normal-  │    │ (dialect-  │    │ Recommen-  │
//! │            │    │   ization  │    │  aware)    │    │ dations    │
//! └────────────┘    └────────────┘    └────────────┘    └────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Cross-Run Coverage Aggregation
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod aggregator;

/// Bounded Data-Quality Diagnostics
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod diagnostics;

/// Page Element Model and Type Inference
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod element;

/// Static Selector Extraction from Test Sources
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod extractor;

/// Selector-to-Element Coverage Matching
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub mod matcher;

mod result;

/// Selector Normalization and Dialect Classification
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod selector;

/// Reporting-Session Lifecycle
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod session;

pub use aggregator::{
    AggregatedCoverage, CoverageAggregator, UncoveredReport, DEFAULT_DISPLAY_CAP,
};
pub use diagnostics::{DiagnosticLog, DEFAULT_DIAGNOSTIC_CAPACITY};
pub use element::{
    BoundingBox, DiscoverySource, ElementDescriptor, ElementType, PageElement, Priority,
};
pub use extractor::{ExtractionBatch, PatternFamily, RawSelectorOccurrence, SelectorExtractor};
pub use matcher::{
    calculate_coverage, coverage_percentage, generate_recommendations, BucketCoverage,
    CoverageResult, Recommendation,
};
pub use result::{CubrirError, CubrirResult};
pub use selector::{classify, display_form, normalize, SelectorDialect, TestSelector};
pub use session::{CoverageSession, ReportSink, TestStatus, TextSink};
