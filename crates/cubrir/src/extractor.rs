//! Static selector extraction from test source text.
//!
//! The extractor holds an explicit ordered list of named pattern families,
//! each matching one idiom for referencing an element: accessor calls
//! (`getByRole(...)`), locator calls, imperative action calls taking a
//! selector argument, query-selector calls, and raw XPath/CSS string
//! literals. Every line is tried against every family; non-noise matches
//! become occurrences, which are folded into deduplicated
//! [`TestSelector`]s per file.
//!
//! Extraction is best-effort: unreadable files are collected as warnings
//! on the batch result, never thrown, so a scan completes even when some
//! inputs fail.

use crate::result::{CubrirError, CubrirResult};
use crate::selector::{classify, SelectorDialect, TestSelector};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Characters of surrounding source captured per occurrence
pub const CONTEXT_WIDTH: usize = 70;

/// Payloads longer than this are treated as noise, not selectors
pub const MAX_SELECTOR_LENGTH: usize = 1024;

/// One idiom for referencing an element in source text
#[derive(Debug)]
pub struct PatternFamily {
    /// Family name, used for diagnostics and family-hint classification
    pub name: &'static str,
    /// Compiled pattern; the payload is one of the quote-specific capture
    /// groups when present, otherwise the whole match
    pub pattern: Regex,
    /// Weak dialect hint applied when nothing more specific matches
    pub dialect_hint: Option<SelectorDialect>,
    /// Whether capture group "accessor" names the accessor kind
    pub has_accessor: bool,
}

/// A single pattern match in a source line; ephemeral, consumed
/// immediately into a [`TestSelector`].
#[derive(Debug, Clone)]
pub struct RawSelectorOccurrence {
    /// Captured selector payload
    pub text: String,
    /// Dialect resolved by the classification cascade
    pub dialect: SelectorDialect,
    /// Name of the pattern family that matched
    pub family: &'static str,
    /// 1-indexed line number
    pub line_number: usize,
    /// Surrounding source text for diagnostics
    pub context: String,
}

/// Result of a best-effort multi-file scan
#[derive(Debug, Default)]
pub struct ExtractionBatch {
    /// Deduplicated selectors across all readable files
    pub selectors: Vec<TestSelector>,
    /// One entry per file that could not be scanned
    pub warnings: Vec<String>,
}

/// Quoted-argument alternation: one named group per quote character, so a
/// selector wrapped in `'...'` may freely contain `"` and vice versa.
/// `{body}` is the payload shape; `{q}` stands for the closing quote's
/// excluded class member.
fn quoted_argument(body: &str) -> String {
    let single = body.replace("{q}", "'");
    let double = body.replace("{q}", "\"");
    let tick = body.replace("{q}", "`");
    format!("(?:'(?P<q1>{single})'|\"(?P<q2>{double})\"|`(?P<q3>{tick})`)")
}

fn call_pattern(call: &str) -> Regex {
    let arg = quoted_argument("[^{q}]+");
    Regex::new(&format!(r"{call}\(\s*{arg}")).unwrap()
}

fn pattern_families() -> &'static [PatternFamily] {
    static FAMILIES: OnceLock<Vec<PatternFamily>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        vec![
            PatternFamily {
                name: "get-by-accessor",
                pattern: call_pattern(
                    r"\.get_?[Bb]y_?(?P<accessor>[Rr]ole|[Tt]ext|[Ll]abel|[Pp]laceholder|[Aa]lt_?[Tt]ext|[Tt]est_?[Ii]d)",
                ),
                dialect_hint: None,
                has_accessor: true,
            },
            PatternFamily {
                name: "locator-call",
                pattern: call_pattern(r"\.locator"),
                dialect_hint: None,
                has_accessor: false,
            },
            PatternFamily {
                name: "action-call",
                pattern: call_pattern(
                    r"\.(?:click|dblclick|fill|type|check|uncheck|selectOption|select_option|hover|focus|press|tap|waitForSelector|wait_for_selector)",
                ),
                dialect_hint: None,
                has_accessor: false,
            },
            PatternFamily {
                name: "query-selector",
                pattern: call_pattern(r"(?:querySelectorAll|querySelector|\$\$|\$)"),
                dialect_hint: Some(SelectorDialect::Css),
                has_accessor: false,
            },
            PatternFamily {
                name: "xpath-literal",
                pattern: Regex::new(&quoted_argument("//[^{q}]+")).unwrap(),
                dialect_hint: Some(SelectorDialect::XPath),
                has_accessor: false,
            },
            PatternFamily {
                name: "css-literal",
                pattern: Regex::new(&quoted_argument(
                    r"(?:[#.][A-Za-z_][\w-]*|[a-z]+\[[^{q}\]]+\])[^{q}]*",
                ))
                .unwrap(),
                dialect_hint: Some(SelectorDialect::Css),
                has_accessor: false,
            },
        ]
    })
}

fn accessor_dialect(name: &str) -> Option<SelectorDialect> {
    let lowered = name.to_ascii_lowercase().replace('_', "");
    match lowered.as_str() {
        "role" => Some(SelectorDialect::Role),
        "text" => Some(SelectorDialect::Text),
        "label" => Some(SelectorDialect::Label),
        "placeholder" => Some(SelectorDialect::Placeholder),
        "alttext" => Some(SelectorDialect::AltText),
        "testid" => Some(SelectorDialect::TestId),
        _ => None,
    }
}

/// Noise filter for captured payloads: URLs, asset/code paths, over-long
/// strings, and bare words matched only by the generic literal family are
/// not selectors.
fn is_noise(payload: &str, family: &str) -> bool {
    let trimmed = payload.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_SELECTOR_LENGTH {
        return true;
    }
    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("file://")
        || trimmed.starts_with("data:")
    {
        return true;
    }
    const ASSET_EXTENSIONS: &[&str] = &[
        ".ts", ".tsx", ".js", ".jsx", ".json", ".png", ".jpg", ".jpeg", ".svg", ".gif", ".html",
        ".md",
    ];
    if ASSET_EXTENSIONS.iter().any(|ext| trimmed.ends_with(ext)) {
        return true;
    }
    if family == "css-literal" {
        // Bare prose with no selector syntax
        let has_selector_syntax = trimmed
            .chars()
            .any(|c| matches!(c, '#' | '.' | '[' | ']' | '>' | ':' | '='));
        if !has_selector_syntax {
            return true;
        }
    }
    false
}

fn surrounding_context(line: &str, match_start: usize) -> String {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let center = chars
        .iter()
        .position(|(idx, _)| *idx >= match_start)
        .unwrap_or(chars.len());
    let half = CONTEXT_WIDTH / 2;
    let start = center.saturating_sub(half);
    let end = (start + CONTEXT_WIDTH).min(chars.len());
    chars[start..end].iter().map(|(_, c)| *c).collect()
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// Static selector extractor over an ordered set of pattern families
#[derive(Debug, Default)]
pub struct SelectorExtractor;

impl SelectorExtractor {
    /// Create an extractor with the default pattern families
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// The ordered pattern families, exposed so each can be exercised in
    /// isolation
    #[must_use]
    pub fn families(&self) -> &'static [PatternFamily] {
        pattern_families()
    }

    /// Scan source text and return every non-noise occurrence
    #[must_use]
    pub fn extract_from_text(&self, text: &str) -> Vec<RawSelectorOccurrence> {
        let mut occurrences = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if is_comment_line(line) {
                continue;
            }
            for family in pattern_families() {
                for captures in family.pattern.captures_iter(line) {
                    let group = captures
                        .name("q1")
                        .or_else(|| captures.name("q2"))
                        .or_else(|| captures.name("q3"));
                    let (payload, match_start) = match group {
                        Some(group) => (group.as_str(), group.start()),
                        None => {
                            let whole = captures.get(0).unwrap();
                            (whole.as_str(), whole.start())
                        }
                    };
                    if is_noise(payload, family.name) {
                        continue;
                    }
                    let accessor_hint = if family.has_accessor {
                        captures
                            .name("accessor")
                            .and_then(|m| accessor_dialect(m.as_str()))
                    } else {
                        None
                    };
                    let dialect = classify(payload, accessor_hint, family.dialect_hint);
                    occurrences.push(RawSelectorOccurrence {
                        text: payload.to_string(),
                        dialect,
                        family: family.name,
                        line_number: index + 1,
                        context: surrounding_context(line, match_start),
                    });
                }
            }
        }
        occurrences
    }

    /// Scan source text into deduplicated selectors. Within one file, two
    /// occurrences with the same normalized key collapse to one selector;
    /// the first occurrence wins for line-number reporting.
    #[must_use]
    pub fn extract_selectors(&self, text: &str, file_path: &str) -> Vec<TestSelector> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut selectors = Vec::new();
        for occurrence in self.extract_from_text(text) {
            let selector = TestSelector::new(
                occurrence.text,
                occurrence.dialect,
                occurrence.line_number,
                file_path,
            )
            .with_context(occurrence.context);
            if selector.normalized.is_empty() {
                continue;
            }
            if seen.insert(selector.normalized.clone()) {
                selectors.push(selector);
            }
        }
        debug!(
            file = file_path,
            count = selectors.len(),
            "extracted selectors"
        );
        selectors
    }

    /// Extract selectors from a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`CubrirError::FileRead`] when the file cannot be read;
    /// callers in batch mode record the warning and continue.
    pub fn extract_from_file(&self, path: impl AsRef<Path>) -> CubrirResult<Vec<TestSelector>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CubrirError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(self.extract_selectors(&text, &path.display().to_string()))
    }

    /// Best-effort scan over many files: unreadable inputs become warning
    /// strings on the batch, never errors.
    #[must_use]
    pub fn extract_from_files<P: AsRef<Path>>(&self, paths: &[P]) -> ExtractionBatch {
        let mut batch = ExtractionBatch::default();
        for path in paths {
            match self.extract_from_file(path) {
                Ok(selectors) => batch.selectors.extend(selectors),
                Err(e) => {
                    let message = e.to_string();
                    warn!("{message}");
                    batch.warnings.push(message);
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<RawSelectorOccurrence> {
        SelectorExtractor::new().extract_from_text(text)
    }

    mod pattern_family_tests {
        use super::*;

        #[test]
        fn test_families_are_ordered_and_named() {
            let extractor = SelectorExtractor::new();
            let names: Vec<&str> = extractor.families().iter().map(|f| f.name).collect();
            assert_eq!(
                names,
                vec![
                    "get-by-accessor",
                    "locator-call",
                    "action-call",
                    "query-selector",
                    "xpath-literal",
                    "css-literal",
                ]
            );
        }

        #[test]
        fn test_get_by_accessor_family() {
            let occurrences = extract("await page.getByRole('button', { name: 'Start' });");
            let accessor = occurrences
                .iter()
                .find(|o| o.family == "get-by-accessor")
                .unwrap();
            assert_eq!(accessor.text, "button");
            assert_eq!(accessor.dialect, SelectorDialect::Role);
        }

        #[test]
        fn test_get_by_accessor_snake_case() {
            let occurrences = extract("page.get_by_test_id(\"submit\")");
            let accessor = occurrences
                .iter()
                .find(|o| o.family == "get-by-accessor")
                .unwrap();
            assert_eq!(accessor.text, "submit");
            assert_eq!(accessor.dialect, SelectorDialect::TestId);
        }

        #[test]
        fn test_locator_call_family() {
            let occurrences = extract("page.locator('#submit').click();");
            assert!(occurrences
                .iter()
                .any(|o| o.family == "locator-call" && o.text == "#submit"));
        }

        #[test]
        fn test_chained_locator_calls() {
            let occurrences = extract("page.locator('form').locator('.field');");
            let payloads: Vec<&str> = occurrences
                .iter()
                .filter(|o| o.family == "locator-call")
                .map(|o| o.text.as_str())
                .collect();
            assert_eq!(payloads, vec!["form", ".field"]);
        }

        #[test]
        fn test_action_call_family() {
            let occurrences = extract("await page.fill('input[name=\"email\"]', 'x');");
            let action = occurrences
                .iter()
                .find(|o| o.family == "action-call")
                .unwrap();
            assert_eq!(action.text, "input[name=\"email\"]");
            assert_eq!(action.dialect, SelectorDialect::Css);
        }

        #[test]
        fn test_query_selector_family() {
            let occurrences = extract("document.querySelector('.panel > button')");
            assert!(occurrences
                .iter()
                .any(|o| o.family == "query-selector" && o.text == ".panel > button"));
        }

        #[test]
        fn test_xpath_literal_family() {
            let occurrences = extract("let x = \"//button[@id='go']\";");
            let xpath = occurrences
                .iter()
                .find(|o| o.family == "xpath-literal")
                .unwrap();
            assert_eq!(xpath.dialect, SelectorDialect::XPath);
        }

        #[test]
        fn test_css_literal_family() {
            let occurrences = extract("const sel = '#main-nav .item';");
            assert!(occurrences
                .iter()
                .any(|o| o.family == "css-literal" && o.text == "#main-nav .item"));
        }

        #[test]
        fn test_payload_hint_overrides_family_hint() {
            // css-literal family match that still classifies as test-id
            let occurrences = extract("const sel = 'button[data-testid=start]';");
            let found = occurrences
                .iter()
                .find(|o| o.text == "button[data-testid=start]")
                .unwrap();
            assert_eq!(found.dialect, SelectorDialect::TestId);
        }
    }

    mod noise_filter_tests {
        use super::*;

        #[test]
        fn test_urls_are_noise() {
            let occurrences = extract("await page.goto('https://example.com/#anchor');");
            assert!(occurrences.is_empty());
        }

        #[test]
        fn test_asset_paths_are_noise() {
            let occurrences = extract("page.locator('./fixtures/login.png');");
            assert!(occurrences.is_empty());
        }

        #[test]
        fn test_bare_prose_is_noise_for_literals() {
            let occurrences = extract("console.log('hello world');");
            assert!(occurrences.is_empty());
        }

        #[test]
        fn test_over_long_payload_is_noise() {
            let long = "a".repeat(MAX_SELECTOR_LENGTH + 1);
            let occurrences = extract(&format!("page.locator('#{long}');"));
            assert!(occurrences.is_empty());
        }

        #[test]
        fn test_comment_lines_skipped() {
            let occurrences = extract("// page.click('#old-button')");
            assert!(occurrences.is_empty());
        }
    }

    mod selector_extraction_tests {
        use super::*;

        #[test]
        fn test_scenario_a() {
            let text = "line1\nline2\nline3\nline4\nawait page.fill('input[name=\"email\"]', 'x')\n";
            let selectors = SelectorExtractor::new().extract_selectors(text, "login.spec.ts");
            assert_eq!(selectors.len(), 1);
            let sel = &selectors[0];
            assert_eq!(sel.raw, "input[name=\"email\"]");
            assert_eq!(sel.normalized, "input[name=email]");
            assert_eq!(sel.dialect, SelectorDialect::Css);
            assert_eq!(sel.line_number, 5);
            assert_eq!(sel.file_path, "login.spec.ts");
        }

        #[test]
        fn test_dedup_first_occurrence_wins() {
            let text = "page.click('#submit');\npage.click('#submit');\n";
            let selectors = SelectorExtractor::new().extract_selectors(text, "a.spec.ts");
            assert_eq!(selectors.len(), 1);
            assert_eq!(selectors[0].line_number, 1);
        }

        #[test]
        fn test_quoting_variants_share_identity() {
            let text = "page.fill('input[type=\"email\"]', 'x');\npage.fill('input[type=email]', 'y');\n";
            let selectors = SelectorExtractor::new().extract_selectors(text, "a.spec.ts");
            assert_eq!(selectors.len(), 1);
            assert_eq!(selectors[0].normalized, "input[type=email]");
        }

        #[test]
        fn test_deterministic_extraction() {
            let text = "page.click('#a');\npage.locator('.b').fill('#c');\n";
            let extractor = SelectorExtractor::new();
            let first = extractor.extract_selectors(text, "t.spec.ts");
            let second = extractor.extract_selectors(text, "t.spec.ts");
            let keys = |sels: &[TestSelector]| {
                let mut k: Vec<String> = sels.iter().map(|s| s.normalized.clone()).collect();
                k.sort();
                k
            };
            assert_eq!(keys(&first), keys(&second));
        }

        #[test]
        fn test_context_captured() {
            let text = "await page.click('#submit'); // primary action\n";
            let selectors = SelectorExtractor::new().extract_selectors(text, "a.spec.ts");
            let context = selectors[0].context.as_deref().unwrap();
            assert!(context.contains("#submit"));
            assert!(context.chars().count() <= CONTEXT_WIDTH);
        }
    }

    mod file_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_extract_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "await page.click('#start');").unwrap();
            let selectors = SelectorExtractor::new()
                .extract_from_file(file.path())
                .unwrap();
            assert_eq!(selectors.len(), 1);
            assert_eq!(selectors[0].normalized, "#start");
        }

        #[test]
        fn test_unreadable_file_is_recoverable() {
            let result = SelectorExtractor::new().extract_from_file("/no/such/file.spec.ts");
            assert!(matches!(result, Err(CubrirError::FileRead { .. })));
        }

        #[test]
        fn test_batch_collects_warnings_and_continues() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "page.locator('#ok').click();").unwrap();
            let good = file.path().to_path_buf();
            let missing = std::path::PathBuf::from("/no/such/file.spec.ts");

            let batch = SelectorExtractor::new().extract_from_files(&[good, missing]);
            assert_eq!(batch.selectors.len(), 1);
            assert_eq!(batch.warnings.len(), 1);
            assert!(batch.warnings[0].contains("/no/such/file.spec.ts"));
        }

        #[test]
        fn test_empty_batch() {
            let paths: Vec<std::path::PathBuf> = Vec::new();
            let batch = SelectorExtractor::new().extract_from_files(&paths);
            assert!(batch.selectors.is_empty());
            assert!(batch.warnings.is_empty());
        }
    }
}
