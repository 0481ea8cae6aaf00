//! Canonical page-element records and discovery normalization.
//!
//! Element descriptors arrive from two very different producers: static
//! analysis (selectors treated as hypothetical elements) and live page
//! inspection (selector plus visual/DOM metadata). Both are folded into
//! one [`PageElement`] shape so downstream matching never special-cases
//! the origin. Normalization is total: missing fields default, nothing
//! here fails.

use crate::selector::{normalize, TestSelector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interactive element categories tracked for coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
    /// `<button>` or button-like control
    Button,
    /// Text-entry `<input>`
    Input,
    /// Anchor / navigation link
    Link,
    /// `<select>` dropdown
    Select,
    /// `<textarea>`
    Textarea,
    /// Checkbox input
    Checkbox,
    /// Radio input
    Radio,
    /// Generic interactive element (focusable, keyboard-operable)
    InteractiveElement,
    /// Element with a click handler but no richer semantics
    ClickableElement,
}

impl ElementType {
    /// Remediation priority when this element is uncovered. Form controls
    /// and primary actions rank high, navigation ranks medium, bare click
    /// targets rank low.
    #[must_use]
    pub fn priority(self) -> Priority {
        match self {
            Self::Button | Self::Input | Self::Select | Self::Textarea | Self::Checkbox
            | Self::Radio => Priority::High,
            Self::Link | Self::InteractiveElement => Priority::Medium,
            Self::ClickableElement => Priority::Low,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Button => "button",
            Self::Input => "input",
            Self::Link => "link",
            Self::Select => "select",
            Self::Textarea => "textarea",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::InteractiveElement => "interactive-element",
            Self::ClickableElement => "clickable-element",
        };
        write!(f, "{name}")
    }
}

/// Remediation priority for recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Decorative or rarely-triggered elements
    Low,
    /// Secondary interactions
    Medium,
    /// Interactive form controls and primary actions
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{name}")
    }
}

/// Provenance of a discovered element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    /// Synthesized from selectors found in test source
    StaticAnalysis,
    /// Inferred from executed test steps
    TestExecution,
    /// Enumerated on a live rendered page
    RuntimeDiscovery,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StaticAnalysis => "static-analysis",
            Self::TestExecution => "test-execution",
            Self::RuntimeDiscovery => "runtime-discovery",
        };
        write!(f, "{name}")
    }
}

/// Bounding box for an element on a rendered page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Loosely-typed element descriptor from an external inspector.
///
/// This is the wire shape at the page/DOM inspector boundary: every field
/// is optional and the struct deserializes from whatever subset the
/// producer supplies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementDescriptor {
    /// Tag name (e.g. "button")
    pub tag_name: Option<String>,
    /// Selector identifying the element
    pub selector: Option<String>,
    /// Visible text content
    pub text: Option<String>,
    /// DOM id attribute
    pub id: Option<String>,
    /// DOM class attribute
    pub class_name: Option<String>,
    /// ARIA role
    pub role: Option<String>,
    /// Pre-classified element type, if the producer knows it
    pub element_type: Option<ElementType>,
    /// Whether the element was visible
    pub is_visible: Option<bool>,
    /// Whether the element was enabled
    pub is_enabled: Option<bool>,
    /// Bounding box on the rendered page
    pub bounding_box: Option<BoundingBox>,
    /// Page the element was found on
    pub page: Option<String>,
}

/// Canonical discovered-element record.
///
/// `discovery_context` disambiguates otherwise-identical selectors from
/// different files/tests so they stay distinct records when they must;
/// the normalized selector is the coverage identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    /// Selector identifying the element
    pub selector: String,
    /// Element category
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Visible text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// DOM id (supplied or derived from the selector)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// DOM class (supplied or derived from the selector)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// ARIA role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Whether the element was visible when discovered
    pub is_visible: bool,
    /// Whether the element was enabled when discovered
    pub is_enabled: bool,
    /// Bounding box, when live-discovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Page the element belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Provenance of the discovery
    pub discovery_source: DiscoverySource,
    /// File/test the discovery came from
    pub discovery_context: String,
}

impl PageElement {
    /// Normalize a loose descriptor into a canonical record.
    ///
    /// Missing `id`/`class` are derived from the selector text (first
    /// `#token` and `.token`), so statically-synthesized elements carry
    /// the same hints as live-discovered ones. A descriptor with no
    /// selector falls back to `#id`, then the tag name, then empty (the
    /// aggregator drops empty-selector records with a warning).
    #[must_use]
    pub fn from_descriptor(
        descriptor: ElementDescriptor,
        source: DiscoverySource,
        context: impl Into<String>,
    ) -> Self {
        let selector = descriptor
            .selector
            .clone()
            .or_else(|| descriptor.id.as_ref().map(|id| format!("#{id}")))
            .or_else(|| descriptor.tag_name.clone())
            .unwrap_or_default();

        let id = descriptor.id.clone().or_else(|| derive_id_hint(&selector));
        let class = descriptor
            .class_name
            .clone()
            .or_else(|| derive_class_hint(&selector));
        let element_type = descriptor.element_type.unwrap_or_else(|| {
            infer_element_type(descriptor.tag_name.as_deref(), &selector, descriptor.role.as_deref())
        });

        Self {
            selector,
            element_type,
            text: descriptor.text,
            id,
            class,
            role: descriptor.role,
            is_visible: descriptor.is_visible.unwrap_or(false),
            is_enabled: descriptor.is_enabled.unwrap_or(false),
            bounding_box: descriptor.bounding_box,
            page: descriptor.page,
            discovery_source: source,
            discovery_context: context.into(),
        }
    }

    /// Synthesize a hypothetical element from a statically-extracted
    /// selector, letting purely-textual selectors participate in the same
    /// coverage model as live-discovered elements.
    #[must_use]
    pub fn from_test_selector(selector: &TestSelector) -> Self {
        Self::from_descriptor(
            ElementDescriptor {
                selector: Some(selector.raw.clone()),
                ..ElementDescriptor::default()
            },
            DiscoverySource::StaticAnalysis,
            selector.file_path.clone(),
        )
    }

    /// Canonical comparison key for coverage identity
    #[must_use]
    pub fn normalized_selector(&self) -> String {
        normalize(&self.selector, None)
    }
}

fn derive_id_hint(selector: &str) -> Option<String> {
    derive_token(selector, '#')
}

fn derive_class_hint(selector: &str) -> Option<String> {
    derive_token(selector, '.')
}

fn derive_token(selector: &str, marker: char) -> Option<String> {
    let start = selector.find(marker)? + marker.len_utf8();
    let rest = &selector[start..];
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let token = &rest[..end];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn infer_element_type(tag_name: Option<&str>, selector: &str, role: Option<&str>) -> ElementType {
    if let Some(tag) = tag_name {
        match tag.to_ascii_lowercase().as_str() {
            "button" => return ElementType::Button,
            "a" => return ElementType::Link,
            "select" => return ElementType::Select,
            "textarea" => return ElementType::Textarea,
            "input" => return input_element_type(selector),
            _ => {}
        }
    }

    if let Some(role) = role {
        match role.to_ascii_lowercase().as_str() {
            "button" => return ElementType::Button,
            "link" => return ElementType::Link,
            "checkbox" => return ElementType::Checkbox,
            "radio" => return ElementType::Radio,
            "textbox" => return ElementType::Input,
            _ => return ElementType::InteractiveElement,
        }
    }

    let lowered = selector.to_ascii_lowercase();
    if lowered.contains("type=checkbox") || lowered.contains("checkbox") {
        ElementType::Checkbox
    } else if lowered.contains("type=radio") || lowered.contains("radio") {
        ElementType::Radio
    } else if lowered.contains("textarea") {
        ElementType::Textarea
    } else if lowered.contains("select") {
        ElementType::Select
    } else if lowered.contains("button") || lowered.contains("btn") || lowered.contains("submit")
    {
        ElementType::Button
    } else if lowered.contains("input") || lowered.contains("field") {
        ElementType::Input
    } else if lowered.starts_with("a.")
        || lowered.starts_with("a#")
        || lowered.starts_with("a[")
        || lowered.contains("link")
        || lowered.contains("href")
    {
        ElementType::Link
    } else if lowered.contains("onclick") || lowered.contains("clickable") {
        ElementType::ClickableElement
    } else {
        ElementType::InteractiveElement
    }
}

fn input_element_type(selector: &str) -> ElementType {
    let lowered = selector.to_ascii_lowercase();
    if lowered.contains("type=checkbox") || lowered.contains("type=\"checkbox\"") {
        ElementType::Checkbox
    } else if lowered.contains("type=radio") || lowered.contains("type=\"radio\"") {
        ElementType::Radio
    } else {
        ElementType::Input
    }
}
