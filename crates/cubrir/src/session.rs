//! Reporting-session lifecycle.
//!
//! A [`CoverageSession`] walks the host test-runner lifecycle: `begin`
//! scans the suite's source files for selectors and seeds the aggregator,
//! element contributions and test outcomes stream in while the suite
//! runs, and `end` deduplicates, projects the final coverage view, and
//! derives recommendations. Operations called out of order fail with
//! [`CubrirError::InvalidState`] instead of silently producing an empty
//! report.

use crate::aggregator::{AggregatedCoverage, CoverageAggregator};
use crate::element::{DiscoverySource, ElementDescriptor, PageElement};
use crate::extractor::SelectorExtractor;
use crate::matcher::{generate_recommendations, Recommendation};
use crate::result::{CubrirError, CubrirResult};
use crate::selector::TestSelector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Outcome of one finished test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// Test completed without failure
    Passed,
    /// Test failed an assertion or errored
    Failed,
    /// Test was skipped
    Skipped,
}

/// Destination for the final coverage report. Implementations render a
/// snapshot plus its recommendations to a terminal, a file, or any other
/// sink.
pub trait ReportSink {
    /// Render the final coverage view
    ///
    /// # Errors
    ///
    /// Returns an error when the sink cannot be written.
    fn render(
        &mut self,
        coverage: &AggregatedCoverage,
        recommendations: &[Recommendation],
    ) -> CubrirResult<()>;
}

/// Writes the summary line and recommendations via `std::io::Write`
#[derive(Debug)]
pub struct TextSink<W: std::io::Write> {
    writer: W,
}

impl<W: std::io::Write> TextSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: std::io::Write> ReportSink for TextSink<W> {
    fn render(
        &mut self,
        coverage: &AggregatedCoverage,
        recommendations: &[Recommendation],
    ) -> CubrirResult<()> {
        writeln!(self.writer, "{}", coverage.summary())?;
        for recommendation in recommendations {
            writeln!(
                self.writer,
                "  [{}] {}",
                recommendation.priority, recommendation.message
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Created,
    Begun,
    Ended,
}

/// Drives extraction, aggregation, and reporting across one suite run
#[derive(Debug)]
pub struct CoverageSession {
    extractor: SelectorExtractor,
    aggregator: CoverageAggregator,
    selectors: Vec<TestSelector>,
    warnings: Vec<String>,
    threshold: Option<u32>,
    state: SessionState,
}

impl Default for CoverageSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageSession {
    /// Create a session with no coverage threshold
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractor: SelectorExtractor::new(),
            aggregator: CoverageAggregator::new(),
            selectors: Vec::new(),
            warnings: Vec::new(),
            threshold: None,
            state: SessionState::Created,
        }
    }

    /// Require a minimum coverage percentage at session end
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::Configuration`] when `percentage` exceeds
    /// 100.
    pub fn with_threshold(mut self, percentage: u32) -> CubrirResult<Self> {
        if percentage > 100 {
            return Err(CubrirError::Configuration {
                message: format!("coverage threshold {percentage}% exceeds 100%"),
            });
        }
        self.threshold = Some(percentage);
        Ok(self)
    }

    /// Start the session: scan `test_files` for selectors and seed the
    /// aggregator with their synthesized elements, marked covered since
    /// the suite references them directly. Unreadable files become
    /// warnings, never errors.
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::InvalidState`] when the session has already
    /// begun or ended.
    pub fn begin(&mut self, test_files: &[PathBuf]) -> CubrirResult<()> {
        if self.state != SessionState::Created {
            return Err(CubrirError::InvalidState {
                message: "session has already begun".to_string(),
            });
        }
        self.state = SessionState::Begun;

        let batch = self.extractor.extract_from_files(test_files);
        self.warnings = batch.warnings;
        for selector in &batch.selectors {
            let element = PageElement::from_test_selector(selector);
            self.aggregator.mark_elements_covered(
                std::slice::from_ref(&element),
                &selector.file_path,
                "static scan",
                &format!("referenced at {}:{}", selector.file_path, selector.line_number),
            );
        }
        self.selectors = batch.selectors;
        info!(
            files = test_files.len(),
            selectors = self.selectors.len(),
            warnings = self.warnings.len(),
            "coverage session started"
        );
        Ok(())
    }

    /// Feed elements discovered live on a page. Incoming descriptors are
    /// normalized, added to the aggregator, and immediately matched
    /// against the session's extracted selectors.
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::InvalidState`] before `begin` or after
    /// `end`.
    pub fn record_page_elements(
        &mut self,
        descriptors: Vec<ElementDescriptor>,
        page: &str,
    ) -> CubrirResult<()> {
        self.require_begun("record_page_elements")?;
        let elements: Vec<PageElement> = descriptors
            .into_iter()
            .map(|descriptor| {
                let mut element = PageElement::from_descriptor(
                    descriptor,
                    DiscoverySource::RuntimeDiscovery,
                    format!("page {page}"),
                );
                if element.page.is_none() {
                    element.page = Some(page.to_string());
                }
                element
            })
            .collect();
        self.aggregator
            .add_discovered_elements(&elements, "", page);
        self.aggregator
            .apply_selectors(&self.selectors, "matched by suite selector");
        Ok(())
    }

    /// Record a finished test. On a passing test, `interaction_log`
    /// (selector-bearing text emitted during the run) contributes
    /// execution-time coverage marks.
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::InvalidState`] before `begin` or after
    /// `end`.
    pub fn record_test_end(
        &mut self,
        test_name: &str,
        status: TestStatus,
        interaction_log: Option<&str>,
    ) -> CubrirResult<()> {
        self.require_begun("record_test_end")?;
        debug!(test = test_name, ?status, "test finished");
        if status != TestStatus::Passed {
            return Ok(());
        }
        if let Some(log) = interaction_log {
            let selectors = self.extractor.extract_selectors(log, test_name);
            let elements: Vec<PageElement> = selectors
                .iter()
                .map(|selector| {
                    let mut element = PageElement::from_test_selector(selector);
                    element.discovery_source = DiscoverySource::TestExecution;
                    element
                })
                .collect();
            self.aggregator.mark_elements_covered(
                &elements,
                test_name,
                "test execution",
                &format!("exercised by {test_name}"),
            );
        }
        Ok(())
    }

    /// Finish the session: deduplicate, project the final view, and
    /// derive recommendations. After this the session accepts no further
    /// contributions.
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::InvalidState`] before `begin` or on a
    /// second call.
    pub fn end(&mut self) -> CubrirResult<(AggregatedCoverage, Vec<Recommendation>)> {
        self.require_begun("end")?;
        self.state = SessionState::Ended;
        self.aggregator.cleanup_duplicates();
        let coverage = self.aggregator.generate_aggregated_coverage();
        let recommendations = generate_recommendations(&coverage.to_result());
        info!(summary = coverage.summary(), "coverage session ended");
        Ok((coverage, recommendations))
    }

    /// Assert the configured threshold against a final coverage view
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::AssertionFailed`] when coverage falls below
    /// the threshold; the message lists up to five uncovered selectors.
    pub fn assert_threshold(&self, coverage: &AggregatedCoverage) -> CubrirResult<()> {
        let Some(threshold) = self.threshold else {
            return Ok(());
        };
        if coverage.meets(threshold) {
            return Ok(());
        }
        let sample: Vec<String> = coverage
            .uncovered_elements
            .iter()
            .take(5)
            .map(|element| element.selector.clone())
            .collect();
        Err(CubrirError::AssertionFailed {
            message: format!(
                "coverage {}% below threshold {}%; uncovered includes: {}",
                coverage.coverage_percentage,
                threshold,
                sample.join(", ")
            ),
        })
    }

    /// File-read warnings collected during `begin`
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Selectors extracted during `begin`
    #[must_use]
    pub fn selectors(&self) -> &[TestSelector] {
        &self.selectors
    }

    /// Mutable access to the underlying aggregator for hosts with their
    /// own discovery pipelines
    pub fn aggregator_mut(&mut self) -> &mut CoverageAggregator {
        &mut self.aggregator
    }

    fn require_begun(&self, operation: &str) -> CubrirResult<()> {
        match self.state {
            SessionState::Begun => Ok(()),
            SessionState::Created => Err(CubrirError::InvalidState {
                message: format!("{operation} called before begin"),
            }),
            SessionState::Ended => Err(CubrirError::InvalidState {
                message: format!("{operation} called after end"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_spec(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn descriptor(selector: &str) -> ElementDescriptor {
        ElementDescriptor {
            selector: Some(selector.to_string()),
            ..ElementDescriptor::default()
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_operations_before_begin_fail() {
            let mut session = CoverageSession::new();
            let err = session
                .record_test_end("t", TestStatus::Passed, None)
                .unwrap_err();
            assert!(matches!(err, CubrirError::InvalidState { .. }));
            assert!(session.end().is_err());
        }

        #[test]
        fn test_double_begin_fails() {
            let dir = TempDir::new().unwrap();
            let file = write_spec(&dir, "a.spec.ts", "await page.click('#go');\n");
            let mut session = CoverageSession::new();
            session.begin(std::slice::from_ref(&file)).unwrap();
            assert!(session.begin(&[file]).is_err());
        }

        #[test]
        fn test_operations_after_end_fail() {
            let dir = TempDir::new().unwrap();
            let file = write_spec(&dir, "a.spec.ts", "await page.click('#go');\n");
            let mut session = CoverageSession::new();
            session.begin(&[file]).unwrap();
            session.end().unwrap();
            assert!(session
                .record_page_elements(vec![descriptor("#x")], "home")
                .is_err());
            assert!(session.end().is_err());
        }

        #[test]
        fn test_invalid_threshold_rejected() {
            let err = CoverageSession::new().with_threshold(120).unwrap_err();
            assert!(matches!(err, CubrirError::Configuration { .. }));
        }
    }

    mod pipeline_tests {
        use super::*;

        #[test]
        fn test_full_run() {
            let dir = TempDir::new().unwrap();
            let file = write_spec(
                &dir,
                "login.spec.ts",
                "await page.click('#submit');\nawait page.fill('input[name=\"email\"]', v);\n",
            );

            let mut session = CoverageSession::new();
            session.begin(&[file]).unwrap();
            assert_eq!(session.selectors().len(), 2);

            // Live discovery turns up one extra element the suite never
            // touches
            session
                .record_page_elements(
                    vec![descriptor("#submit"), descriptor("#forgot-password")],
                    "login",
                )
                .unwrap();
            session
                .record_test_end("login works", TestStatus::Passed, None)
                .unwrap();

            let (coverage, recommendations) = session.end().unwrap();
            assert_eq!(coverage.covered_elements, 3);
            assert_eq!(coverage.total_elements, 4);
            assert_eq!(coverage.coverage_percentage, 75);
            assert!(recommendations
                .iter()
                .any(|r| r.selector.as_deref() == Some("#forgot-password")));
        }

        #[test]
        fn test_unreadable_file_becomes_warning() {
            let mut session = CoverageSession::new();
            session
                .begin(&[PathBuf::from("/nonexistent/suite.spec.ts")])
                .unwrap();
            assert_eq!(session.warnings().len(), 1);
            let (coverage, _) = session.end().unwrap();
            assert_eq!(coverage.total_elements, 0);
        }

        #[test]
        fn test_interaction_log_marks_covered() {
            let dir = TempDir::new().unwrap();
            let file = write_spec(&dir, "a.spec.ts", "// no selectors here\n");
            let mut session = CoverageSession::new();
            session.begin(&[file]).unwrap();
            session
                .record_page_elements(vec![descriptor("#dynamic-btn")], "home")
                .unwrap();
            session
                .record_test_end(
                    "dynamic flow",
                    TestStatus::Passed,
                    Some("await page.click('#dynamic-btn');"),
                )
                .unwrap();

            let (coverage, _) = session.end().unwrap();
            assert_eq!(coverage.covered_elements, coverage.total_elements);
        }

        #[test]
        fn test_failed_test_contributes_nothing() {
            let dir = TempDir::new().unwrap();
            let file = write_spec(&dir, "a.spec.ts", "// empty\n");
            let mut session = CoverageSession::new();
            session.begin(&[file]).unwrap();
            session
                .record_page_elements(vec![descriptor("#btn")], "home")
                .unwrap();
            session
                .record_test_end(
                    "broken",
                    TestStatus::Failed,
                    Some("await page.click('#btn');"),
                )
                .unwrap();

            let (coverage, _) = session.end().unwrap();
            assert_eq!(coverage.covered_elements, 0);
        }
    }

    mod threshold_tests {
        use super::*;

        #[test]
        fn test_threshold_pass_and_fail() {
            let dir = TempDir::new().unwrap();
            let file = write_spec(&dir, "a.spec.ts", "await page.click('#a');\n");
            let mut session = CoverageSession::new().with_threshold(50).unwrap();
            session.begin(&[file]).unwrap();
            session
                .record_page_elements(
                    vec![descriptor("#never-1"), descriptor("#never-2")],
                    "home",
                )
                .unwrap();
            let (coverage, _) = session.end().unwrap();

            // 1 of 3 covered, 33% < 50%
            let err = session.assert_threshold(&coverage).unwrap_err();
            assert!(matches!(err, CubrirError::AssertionFailed { .. }));
            assert!(err.to_string().contains("33%"));
        }

        #[test]
        fn test_no_threshold_never_fails() {
            let session = CoverageSession::new();
            let coverage = CoverageAggregator::new().generate_aggregated_coverage();
            assert!(session.assert_threshold(&coverage).is_ok());
        }
    }

    mod sink_tests {
        use super::*;

        #[test]
        fn test_text_sink_renders_summary() {
            let mut agg = CoverageAggregator::new();
            agg.add_discovered_elements(
                &[PageElement::from_descriptor(
                    descriptor("#a"),
                    DiscoverySource::RuntimeDiscovery,
                    "scan",
                )],
                "f",
                "scan",
            );
            let coverage = agg.generate_aggregated_coverage();
            let recommendations = generate_recommendations(&coverage.to_result());

            let mut buffer = Vec::new();
            TextSink::new(&mut buffer)
                .render(&coverage, &recommendations)
                .unwrap();
            let out = String::from_utf8(buffer).unwrap();
            assert!(out.starts_with("Coverage: 0% (0/1 elements)"));
        }
    }
}
