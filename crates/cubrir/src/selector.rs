//! Selector dialects, normalization, and the `TestSelector` record.
//!
//! A selector is a string expression identifying page elements in one of
//! several dialects (CSS, XPath, text, role, label, placeholder, alt-text,
//! test-id). Each dialect is resolved once during classification to a
//! [`SelectorDialect`] tag; matching and display behavior then dispatch on
//! the tag instead of re-sniffing the string.
//!
//! Normalization canonicalizes a selector so cosmetic variation (quoting
//! style, whitespace, runtime interpolation) does not create spurious
//! distinct identities. The same raw input always normalizes to the same
//! key, and `normalize(normalize(s)) == normalize(s)` for every `s`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Token standing in for runtime-interpolated selector fragments
pub const INTERPOLATION_TOKEN: &str = "...";

/// Selector dialect, resolved once at classification time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorDialect {
    /// CSS selector (e.g. `button.primary`)
    Css,
    /// XPath expression (e.g. `//button[@id='start']`)
    XPath,
    /// Visible text content (e.g. `text=Start Game`)
    Text,
    /// ARIA role (e.g. `role=button`)
    Role,
    /// Test ID attribute (`data-testid`)
    TestId,
    /// Image alt text
    AltText,
    /// Input placeholder text
    Placeholder,
    /// Form label text
    Label,
}

impl SelectorDialect {
    /// Whether matching for this dialect compares normalized strings
    /// exactly (structural), as opposed to text containment (semantic)
    #[must_use]
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Css | Self::XPath | Self::TestId | Self::Placeholder | Self::AltText
        )
    }

    /// Whether matching for this dialect compares visible text/role
    /// case-insensitively (semantic)
    #[must_use]
    pub fn is_semantic(self) -> bool {
        !self.is_structural()
    }
}

impl fmt::Display for SelectorDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::Text => "text",
            Self::Role => "role",
            Self::TestId => "test-id",
            Self::AltText => "alt-text",
            Self::Placeholder => "placeholder",
            Self::Label => "label",
        };
        write!(f, "{name}")
    }
}

fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Template placeholders plus quote-break string concatenation
    PATTERN.get_or_init(|| Regex::new(r#"\$\{[^}]*\}|['"`]\s*\+[^+]*?\+\s*['"`]|\{\{[^}]*\}\}"#).unwrap())
}

fn attribute_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // `@`-prefixed names cover XPath attribute predicates
        Regex::new(r#"\[\s*(@?[\w-]+)\s*([*^$~|]?=)\s*["']([^"'\]]*)["']\s*\]"#).unwrap()
    })
}

fn text_payload_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#":text\(\s*[^)]*\)"#).unwrap())
}

/// Strip matching outer quote layers. Only strips when the interior does
/// not itself contain the outer quote character, so attribute-value
/// quoting survives and the operation is stable under re-application.
fn strip_outer_quotes(input: &str) -> &str {
    let mut current = input;
    loop {
        let bytes = current.as_bytes();
        if bytes.len() < 2 {
            return current;
        }
        let first = bytes[0];
        if (first == b'\'' || first == b'"' || first == b'`') && bytes[bytes.len() - 1] == first {
            let inner = &current[1..current.len() - 1];
            if !inner.contains(first as char) {
                current = inner;
                continue;
            }
        }
        return current;
    }
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Normalize a raw selector into its canonical comparison key.
///
/// Pure and total: never fails, worst case returns the trimmed input
/// unchanged. Applied rules, in order:
///
/// 1. strip matching outer quote layers (inner quotes untouched)
/// 2. replace template interpolation / concatenation fragments with `...`
/// 3. collapse whitespace runs to a single space
/// 4. unquote attribute values inside `[...]` so `[name="email"]` and
///    `[name=email]` share one identity
///
/// Unicode and emoji payloads pass through untouched; malformed nesting is
/// returned as-is past whatever normalization succeeded.
///
/// The rules can unlock each other: unquoting an attribute value may expose
/// an outer quote layer the strip declined on the first pass (the interior
/// still contained that quote character). The pipeline therefore runs to a
/// fixpoint, which is what makes the function idempotent for every input.
#[must_use]
pub fn normalize(raw: &str, _dialect: Option<SelectorDialect>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut current = trimmed.to_string();
    loop {
        let stripped = strip_outer_quotes(&current);
        let masked = interpolation_pattern().replace_all(stripped, INTERPOLATION_TOKEN);
        let collapsed = collapse_whitespace(masked.trim());
        let next = attribute_value_pattern()
            .replace_all(&collapsed, "[$1$2$3]")
            .into_owned();
        // Terminates: after the first pass all whitespace is single
        // spaces, so any later change strictly shortens the string.
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Display form of a selector: for the semantic TEXT/ROLE dialects the
/// payload is masked to `"..."` so reports show the shape without pinning
/// a runtime string; all other dialects display their normalized form.
#[must_use]
pub fn display_form(raw: &str, dialect: SelectorDialect) -> String {
    let normalized = normalize(raw, Some(dialect));
    match dialect {
        SelectorDialect::Text => {
            if let Some(rest) = normalized.strip_prefix("text=") {
                let _ = rest;
                "text=\"...\"".to_string()
            } else if normalized.contains(":text(") {
                text_payload_pattern()
                    .replace_all(&normalized, ":text(\"...\")")
                    .into_owned()
            } else {
                "text=\"...\"".to_string()
            }
        }
        SelectorDialect::Role => "role=\"...\"".to_string(),
        _ => normalized,
    }
}

/// Classify a selector payload into its dialect.
///
/// Priority cascade, most specific first:
///
/// 1. XPath prefix (`//`, `/`, `(`)
/// 2. accessor-name hint from the matched call (`getByRole` etc.)
/// 3. attribute-name hints embedded in the payload itself
/// 4. the pattern family's generic dialect hint
/// 5. CSS as the default
///
/// A payload matched by a generic CSS-literal pattern but carrying
/// `data-testid` must still classify as the more specific dialect, which
/// is why payload hints outrank family hints.
#[must_use]
pub fn classify(
    payload: &str,
    accessor_hint: Option<SelectorDialect>,
    family_hint: Option<SelectorDialect>,
) -> SelectorDialect {
    let trimmed = payload.trim();
    let unquoted = strip_outer_quotes(trimmed);

    if unquoted.starts_with("//") || unquoted.starts_with('/') || unquoted.starts_with('(') {
        return SelectorDialect::XPath;
    }

    if let Some(hint) = accessor_hint {
        return hint;
    }

    if let Some(hint) = payload_attribute_hint(unquoted) {
        return hint;
    }

    family_hint.unwrap_or(SelectorDialect::Css)
}

fn payload_attribute_hint(payload: &str) -> Option<SelectorDialect> {
    if payload.contains("data-testid") || payload.contains("data-test-id") {
        return Some(SelectorDialect::TestId);
    }
    if payload.starts_with("text=") || payload.contains(":text(") {
        return Some(SelectorDialect::Text);
    }
    if payload.starts_with("role=") || payload.contains("[role=") {
        return Some(SelectorDialect::Role);
    }
    if payload.contains("aria-label") || payload.starts_with("label=") {
        return Some(SelectorDialect::Label);
    }
    if payload.starts_with("placeholder=") || payload.contains("[placeholder") {
        return Some(SelectorDialect::Placeholder);
    }
    if payload.starts_with("alt=") || payload.contains("[alt=") {
        return Some(SelectorDialect::AltText);
    }
    None
}

/// A selector occurrence extracted from test source, with its canonical
/// comparison key.
///
/// Identity during per-file extraction is `(normalized, file_path)`;
/// cross-file coverage matching uses `normalized` alone. Immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSelector {
    /// Raw payload as written in the source
    pub raw: String,
    /// Canonical comparison key
    pub normalized: String,
    /// Resolved dialect
    pub dialect: SelectorDialect,
    /// 1-indexed source line of the first occurrence
    pub line_number: usize,
    /// Source file the selector was extracted from
    pub file_path: String,
    /// Surrounding source text for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TestSelector {
    /// Create a selector, computing its normalized key
    #[must_use]
    pub fn new(
        raw: impl Into<String>,
        dialect: SelectorDialect,
        line_number: usize,
        file_path: impl Into<String>,
    ) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw, Some(dialect));
        Self {
            raw,
            normalized,
            dialect,
            line_number,
            file_path: file_path.into(),
            context: None,
        }
    }

    /// Attach surrounding source context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Per-file identity key
    #[must_use]
    pub fn file_key(&self) -> (String, String) {
        (self.normalized.clone(), self.file_path.clone())
    }

    /// Display form with semantic payloads masked
    #[must_use]
    pub fn display(&self) -> String {
        display_form(&self.raw, self.dialect)
    }
}

impl fmt::Display for TestSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({}:{})",
            self.normalized, self.dialect, self.file_path, self.line_number
        )
    }
}
