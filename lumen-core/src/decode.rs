// Normalizes raw audit engine output into uniform violation records

use lumen_scanner::RawAuditOutput;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Critical,
    Serious,
    Moderate,
    Minor,
    None,
}

impl ImpactLevel {
    pub const ALL: [ImpactLevel; 5] = [
        ImpactLevel::Critical,
        ImpactLevel::Serious,
        ImpactLevel::Moderate,
        ImpactLevel::Minor,
        ImpactLevel::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Critical => "critical",
            ImpactLevel::Serious => "serious",
            ImpactLevel::Moderate => "moderate",
            ImpactLevel::Minor => "minor",
            ImpactLevel::None => "none",
        }
    }

    /// Unknown or missing impact strings map to `None`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("critical") => ImpactLevel::Critical,
            Some("serious") => ImpactLevel::Serious,
            Some("moderate") => ImpactLevel::Moderate,
            Some("minor") => ImpactLevel::Minor,
            _ => ImpactLevel::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedNode {
    pub snippet: String,
    pub problem: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub rule_id: String,
    pub impact: ImpactLevel,
    pub description: String,
    pub help_text: String,
    pub remediation: String,
    pub affected_nodes: Vec<AffectedNode>,
    pub reference_links: Vec<String>,
}

impl Violation {
    /// Number of issues this violation contributes to aggregate counts: one
    /// per affected node.
    pub fn issue_count(&self) -> u64 {
        self.affected_nodes.len() as u64
    }
}

const GENERIC_REMEDIATION: &str =
    "Review the affected elements and follow the linked WCAG guideline to resolve this issue.";

const REMEDIATION_HINTS: &[(&str, &str)] = &[
    ("color-contrast", "Increase the contrast between text and its background to at least 4.5:1 (3:1 for large text)."),
    ("image-alt", "Add an alt attribute describing the image, or alt=\"\" if it is purely decorative."),
    ("input-image-alt", "Give image buttons an alt attribute that describes the action they perform."),
    ("label", "Associate every form field with a <label>, or provide aria-label / aria-labelledby."),
    ("select-name", "Associate the <select> element with a visible <label>."),
    ("link-name", "Give every link descriptive text, or an aria-label when it only contains an icon."),
    ("button-name", "Give every button visible text or an aria-label that describes its action."),
    ("html-has-lang", "Add a lang attribute to the <html> element, e.g. <html lang=\"en\">."),
    ("html-lang-valid", "Use a valid BCP 47 language code in the <html> lang attribute."),
    ("document-title", "Add a descriptive, non-empty <title> element to the document head."),
    ("frame-title", "Add a title attribute to every <iframe> describing its content."),
    ("heading-order", "Use heading levels in order without skipping levels (h1, then h2, then h3)."),
    ("empty-heading", "Remove empty headings or give them meaningful text."),
    ("page-has-heading-one", "Add a single <h1> that describes the main content of the page."),
    ("landmark-one-main", "Wrap the primary content of the page in a single <main> landmark."),
    ("region", "Place all page content inside landmark regions such as <header>, <main>, <nav> and <footer>."),
    ("bypass", "Provide a skip link or landmarks so keyboard users can bypass repeated blocks."),
    ("meta-viewport", "Remove user-scalable=no and any maximum-scale below 2 from the viewport meta tag."),
    ("duplicate-id", "Make every id attribute value unique within the page."),
    ("duplicate-id-aria", "Make ids referenced by ARIA attributes unique within the page."),
    ("list", "Only place <li>, <script> or <template> elements directly inside <ul> and <ol>."),
    ("listitem", "Ensure every <li> element is contained in a <ul> or <ol>."),
    ("tabindex", "Avoid tabindex values greater than 0; rely on the natural document order."),
    ("aria-required-attr", "Add the ARIA attributes that are required for the element's role."),
    ("aria-valid-attr-value", "Correct ARIA attribute values so they match the allowed values."),
    ("aria-hidden-focus", "Remove focusable elements from aria-hidden containers or make them unfocusable."),
    ("aria-allowed-attr", "Remove ARIA attributes that are not permitted on the element's role."),
];

/// Rule-specific guidance, or a generic hint for rules not in the table.
pub fn remediation_hint(rule_id: &str) -> &'static str {
    REMEDIATION_HINTS
        .iter()
        .find(|(id, _)| *id == rule_id)
        .map(|(_, hint)| *hint)
        .unwrap_or(GENERIC_REMEDIATION)
}

/// Decode one page's raw audit output. Pure and deterministic.
pub fn decode(raw: &RawAuditOutput, page_url: &str) -> Vec<Violation> {
    let violations: Vec<Violation> = raw
        .violations
        .iter()
        .map(|violation| Violation {
            rule_id: violation.id.clone(),
            impact: ImpactLevel::from_raw(violation.impact.as_deref()),
            description: violation.description.clone(),
            help_text: violation.help.clone(),
            remediation: remediation_hint(&violation.id).to_string(),
            affected_nodes: violation
                .nodes
                .iter()
                .map(|node| AffectedNode {
                    snippet: node.html.clone(),
                    problem: node.failure_summary.clone().unwrap_or_default(),
                })
                .collect(),
            reference_links: violation
                .help_url
                .iter()
                .filter(|link| !link.trim().is_empty())
                .cloned()
                .collect(),
        })
        .collect();

    debug!("Decoded {} violations for {}", violations.len(), page_url);
    violations
}
