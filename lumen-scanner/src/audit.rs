// Accessibility audit capability and a built-in static rule set

use crate::error::{Result, ScanError};
use crate::session::Page;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Audit engine output for one page, in the JSON shape common audit engines
/// emit (`{"violations": [{"id", "impact", "nodes": [...]}, ...]}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuditOutput {
    #[serde(default)]
    pub violations: Vec<RawViolation>,
}

impl RawAuditOutput {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScanError::Audit(format!("malformed output: {}", e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawViolation {
    pub id: String,
    /// Free-form impact string; validated by the decoder.
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub help_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub failure_summary: Option<String>,
}

#[async_trait]
pub trait PageAuditor: Send + Sync {
    async fn analyze(&self, page: &dyn Page) -> Result<RawAuditOutput>;
}

/// Runs a fixed set of WCAG checks against the page's served markup.
#[derive(Debug, Clone, Default)]
pub struct StaticAuditor;

impl StaticAuditor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageAuditor for StaticAuditor {
    async fn analyze(&self, page: &dyn Page) -> Result<RawAuditOutput> {
        let html = page
            .html()
            .ok_or_else(|| ScanError::Audit("page has no loaded document".to_string()))?;
        audit_document(html)
    }
}

struct Rule {
    id: &'static str,
    impact: &'static str,
    description: &'static str,
    help: &'static str,
    tags: &'static [&'static str],
    check: fn(&Html) -> Result<Vec<RawNode>>,
}

const RULES: &[Rule] = &[
    Rule {
        id: "html-has-lang",
        impact: "serious",
        description: "Ensures every HTML document has a lang attribute",
        help: "<html> element must have a lang attribute",
        tags: &["wcag2a", "wcag311"],
        check: check_html_lang,
    },
    Rule {
        id: "document-title",
        impact: "serious",
        description: "Ensures each HTML document contains a non-empty <title> element",
        help: "Documents must have <title> element to aid in navigation",
        tags: &["wcag2a", "wcag242"],
        check: check_document_title,
    },
    Rule {
        id: "image-alt",
        impact: "critical",
        description: "Ensures <img> elements have alternate text or a role of none or presentation",
        help: "Images must have alternate text",
        tags: &["wcag2a", "wcag111"],
        check: check_image_alt,
    },
    Rule {
        id: "link-name",
        impact: "serious",
        description: "Ensures links have discernible text",
        help: "Links must have discernible text",
        tags: &["wcag2a", "wcag244", "wcag412"],
        check: check_link_name,
    },
    Rule {
        id: "button-name",
        impact: "critical",
        description: "Ensures buttons have discernible text",
        help: "Buttons must have discernible text",
        tags: &["wcag2a", "wcag412"],
        check: check_button_name,
    },
    Rule {
        id: "label",
        impact: "critical",
        description: "Ensures every form element has a label",
        help: "Form elements must have labels",
        tags: &["wcag2a", "wcag412", "wcag131"],
        check: check_form_labels,
    },
    Rule {
        id: "frame-title",
        impact: "serious",
        description: "Ensures <iframe> and <frame> elements have an accessible name",
        help: "Frames must have an accessible name",
        tags: &["wcag2a", "wcag412"],
        check: check_frame_title,
    },
    Rule {
        id: "meta-viewport",
        impact: "moderate",
        description: "Ensures <meta name=\"viewport\"> does not disable text scaling and zooming",
        help: "Zooming and scaling must not be disabled",
        tags: &["wcag2aa", "wcag144"],
        check: check_meta_viewport,
    },
    Rule {
        id: "empty-heading",
        impact: "minor",
        description: "Ensures headings have discernible text",
        help: "Headings should not be empty",
        tags: &["best-practice"],
        check: check_empty_heading,
    },
];

/// Run every rule against `html`. Rules with no failing nodes are omitted.
pub fn audit_document(html: &str) -> Result<RawAuditOutput> {
    let document = Html::parse_document(html);
    let mut violations = Vec::new();

    for rule in RULES {
        let nodes = (rule.check)(&document)?;
        if nodes.is_empty() {
            continue;
        }
        violations.push(RawViolation {
            id: rule.id.to_string(),
            impact: Some(rule.impact.to_string()),
            description: rule.description.to_string(),
            help: rule.help.to_string(),
            help_url: Some(format!("https://dequeuniversity.com/rules/axe/4.8/{}", rule.id)),
            tags: rule.tags.iter().map(|t| t.to_string()).collect(),
            nodes,
        });
    }

    Ok(RawAuditOutput { violations })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::Audit(format!("invalid selector {}: {:?}", css, e)))
}

fn node(element: ElementRef, failure: &str) -> RawNode {
    RawNode {
        html: snippet(element),
        failure_summary: Some(format!("Fix any of the following:\n  {}", failure)),
    }
}

const MAX_SNIPPET_CHARS: usize = 250;

fn snippet(element: ElementRef) -> String {
    let full = element.html();
    if full.chars().count() <= MAX_SNIPPET_CHARS {
        return full;
    }
    opening_tag(element)
}

fn opening_tag(element: ElementRef) -> String {
    let mut tag = format!("<{}", element.value().name());
    for (name, value) in element.value().attrs() {
        tag.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }
    tag.push('>');
    tag
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn has_text(element: ElementRef) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}

fn non_empty_attr(element: ElementRef, name: &str) -> bool {
    element
        .value()
        .attr(name)
        .is_some_and(|v| !v.trim().is_empty())
}

fn has_aria_name(element: ElementRef) -> bool {
    non_empty_attr(element, "aria-label")
        || non_empty_attr(element, "aria-labelledby")
        || non_empty_attr(element, "title")
}

fn is_presentational(element: ElementRef) -> bool {
    matches!(element.value().attr("role"), Some("presentation") | Some("none"))
}

fn check_html_lang(document: &Html) -> Result<Vec<RawNode>> {
    let root = document.root_element();
    if non_empty_attr(root, "lang") || non_empty_attr(root, "xml:lang") {
        return Ok(Vec::new());
    }
    Ok(vec![RawNode {
        html: opening_tag(root),
        failure_summary: Some(
            "Fix any of the following:\n  The <html> element does not have a lang attribute"
                .to_string(),
        ),
    }])
}

fn check_document_title(document: &Html) -> Result<Vec<RawNode>> {
    let title = selector("title")?;
    if document.select(&title).any(has_text) {
        return Ok(Vec::new());
    }
    Ok(vec![RawNode {
        html: opening_tag(document.root_element()),
        failure_summary: Some(
            "Fix any of the following:\n  Document does not have a non-empty <title> element"
                .to_string(),
        ),
    }])
}

fn check_image_alt(document: &Html) -> Result<Vec<RawNode>> {
    let images = selector("img")?;
    Ok(document
        .select(&images)
        .filter(|img| {
            img.value().attr("alt").is_none() && !is_presentational(*img) && !has_aria_name(*img)
        })
        .map(|img| {
            node(
                img,
                "Element does not have an alt attribute, aria-label, aria-labelledby or title",
            )
        })
        .collect())
}

fn check_link_name(document: &Html) -> Result<Vec<RawNode>> {
    let links = selector("a[href]")?;
    let images = selector("img[alt]")?;
    Ok(document
        .select(&links)
        .filter(|link| {
            !has_text(*link)
                && !has_aria_name(*link)
                && !link.select(&images).any(|img| non_empty_attr(img, "alt"))
        })
        .map(|link| node(link, "Element is in tab order and does not have accessible text"))
        .collect())
}

fn check_button_name(document: &Html) -> Result<Vec<RawNode>> {
    let buttons = selector("button, input[type=button]")?;
    Ok(document
        .select(&buttons)
        .filter(|button| {
            let named = if button.value().name() == "input" {
                non_empty_attr(*button, "value")
            } else {
                has_text(*button)
            };
            !named && !has_aria_name(*button)
        })
        .map(|button| node(button, "Element does not have inner text that is visible to screen readers"))
        .collect())
}

const UNLABELLED_INPUT_TYPES: [&str; 5] = ["hidden", "submit", "button", "reset", "image"];

fn check_form_labels(document: &Html) -> Result<Vec<RawNode>> {
    let labels = selector("label[for]")?;
    let fields = selector("input, select, textarea")?;

    let labelled_ids: HashSet<&str> = document
        .select(&labels)
        .filter_map(|label| label.value().attr("for"))
        .collect();

    Ok(document
        .select(&fields)
        .filter(|field| {
            let input_type = field
                .value()
                .attr("type")
                .unwrap_or_default()
                .to_ascii_lowercase();
            if UNLABELLED_INPUT_TYPES.contains(&input_type.as_str()) {
                return false;
            }

            let explicit = field
                .value()
                .attr("id")
                .is_some_and(|id| labelled_ids.contains(id));
            let implicit = field
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| ancestor.value().name() == "label");

            !explicit && !implicit && !has_aria_name(*field) && !non_empty_attr(*field, "placeholder")
        })
        .map(|field| node(field, "Form element does not have an implicit (wrapped) <label> or explicit <label>"))
        .collect())
}

fn check_frame_title(document: &Html) -> Result<Vec<RawNode>> {
    let frames = selector("iframe, frame")?;
    Ok(document
        .select(&frames)
        .filter(|frame| !has_aria_name(*frame) && !is_presentational(*frame))
        .map(|frame| node(frame, "Element has no title attribute"))
        .collect())
}

fn check_meta_viewport(document: &Html) -> Result<Vec<RawNode>> {
    let viewports = selector("meta[name=viewport]")?;
    Ok(document
        .select(&viewports)
        .filter(|meta| {
            meta.value()
                .attr("content")
                .is_some_and(viewport_blocks_zoom)
        })
        .map(|meta| node(meta, "<meta> tag disables zooming on mobile devices"))
        .collect())
}

fn viewport_blocks_zoom(content: &str) -> bool {
    content.split([',', ';']).any(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let value = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        match key.as_str() {
            "user-scalable" => value == "no" || value == "0",
            "maximum-scale" => value.parse::<f32>().is_ok_and(|scale| scale < 2.0),
            _ => false,
        }
    })
}

fn check_empty_heading(document: &Html) -> Result<Vec<RawNode>> {
    let headings = selector("h1, h2, h3, h4, h5, h6")?;
    Ok(document
        .select(&headings)
        .filter(|heading| !has_text(*heading) && !has_aria_name(*heading))
        .map(|heading| node(heading, "Element does not have text that is visible to screen readers"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_ids(output: &RawAuditOutput) -> Vec<&str> {
        output.violations.iter().map(|v| v.id.as_str()).collect()
    }

    fn find<'a>(output: &'a RawAuditOutput, id: &str) -> Option<&'a RawViolation> {
        output.violations.iter().find(|v| v.id == id)
    }

    #[test]
    fn test_clean_document_has_no_violations() {
        let html = r#"<!DOCTYPE html>
            <html lang="en">
            <head><title>Home</title>
            <meta name="viewport" content="width=device-width, initial-scale=1"></head>
            <body>
                <h1>Welcome</h1>
                <img src="logo.png" alt="Company logo">
                <img src="spacer.gif" alt="">
                <a href="/about">About us</a>
                <a href="/home"><img src="home.png" alt="Home"></a>
                <button>Send</button>
                <label for="email">Email</label><input id="email" type="email">
                <label>Name <input type="text"></label>
                <input type="submit">
                <iframe src="/map" title="Office location"></iframe>
            </body></html>"#;

        let output = audit_document(html).unwrap();
        assert!(output.violations.is_empty(), "unexpected: {:?}", rule_ids(&output));
    }

    #[test]
    fn test_document_level_rules() {
        let output = audit_document("<html><head></head><body><p>Hi</p></body></html>").unwrap();
        let ids = rule_ids(&output);
        assert!(ids.contains(&"html-has-lang"));
        assert!(ids.contains(&"document-title"));

        let lang = find(&output, "html-has-lang").unwrap();
        assert_eq!(lang.impact.as_deref(), Some("serious"));
        assert_eq!(lang.nodes.len(), 1);
        assert!(lang.nodes[0].html.starts_with("<html"));
    }

    #[test]
    fn test_image_alt_reports_each_image() {
        let html = r#"<html lang="en"><head><title>t</title></head><body>
            <img src="a.png"><img src="b.png"><img src="c.png" alt="c">
            <img src="d.png" role="presentation">
        </body></html>"#;

        let output = audit_document(html).unwrap();
        let violation = find(&output, "image-alt").unwrap();
        assert_eq!(violation.impact.as_deref(), Some("critical"));
        assert_eq!(violation.nodes.len(), 2);
        assert!(violation.nodes[0].html.contains("a.png"));
        assert!(
            violation.nodes[0]
                .failure_summary
                .as_deref()
                .unwrap()
                .contains("alt attribute")
        );
        assert_eq!(
            violation.help_url.as_deref(),
            Some("https://dequeuniversity.com/rules/axe/4.8/image-alt")
        );
    }

    #[test]
    fn test_link_and_button_names() {
        let html = r#"<html lang="en"><head><title>t</title></head><body>
            <a href="/x"></a>
            <a href="/y" aria-label="Close"></a>
            <button></button>
            <button title="Menu"></button>
            <input type="button">
        </body></html>"#;

        let output = audit_document(html).unwrap();
        assert_eq!(find(&output, "link-name").unwrap().nodes.len(), 1);
        assert_eq!(find(&output, "button-name").unwrap().nodes.len(), 2);
    }

    #[test]
    fn test_unlabelled_form_fields() {
        let html = r#"<html lang="en"><head><title>t</title></head><body>
            <input type="text" id="q">
            <input type="hidden" name="token">
            <select name="country"></select>
            <textarea aria-label="Message"></textarea>
            <input type="search" placeholder="Search">
        </body></html>"#;

        let output = audit_document(html).unwrap();
        let violation = find(&output, "label").unwrap();
        assert_eq!(violation.nodes.len(), 2);
    }

    #[test]
    fn test_frames_headings_and_viewport() {
        let html = r#"<html lang="en"><head><title>t</title>
            <meta name="viewport" content="width=device-width, user-scalable=no">
            </head><body>
            <iframe src="/ad"></iframe>
            <h2>  </h2>
        </body></html>"#;

        let output = audit_document(html).unwrap();
        assert!(find(&output, "frame-title").is_some());
        assert_eq!(
            find(&output, "empty-heading").unwrap().impact.as_deref(),
            Some("minor")
        );
        assert_eq!(
            find(&output, "meta-viewport").unwrap().impact.as_deref(),
            Some("moderate")
        );
    }

    #[test]
    fn test_viewport_zoom_detection() {
        assert!(viewport_blocks_zoom("width=device-width, user-scalable=no"));
        assert!(viewport_blocks_zoom("maximum-scale=1.0"));
        assert!(!viewport_blocks_zoom("width=device-width, initial-scale=1"));
        assert!(!viewport_blocks_zoom("maximum-scale=5"));
    }

    #[test]
    fn test_long_elements_are_reduced_to_opening_tag() {
        let long_text = "x".repeat(400);
        let html = format!(
            r#"<html lang="en"><head><title>t</title></head><body><a href="/long" class="big"><span>{}</span></a></body></html>"#,
            long_text
        );
        let document = Html::parse_document(&html);
        let link = document.select(&selector("a").unwrap()).next().unwrap();

        let reduced = snippet(link);
        assert!(reduced.starts_with("<a "));
        assert!(reduced.contains(r#"href="/long""#));
        assert!(reduced.contains(r#"class="big""#));
        assert!(reduced.ends_with('>'));
        assert!(!reduced.contains("xxx"));
    }

    #[test]
    fn test_opening_tag_escapes_attribute_values() {
        let long_text = "x".repeat(400);
        let html = format!(
            r#"<html lang="en"><head><title>t</title></head><body><a href="/q?a=1&amp;b=2" title='say "hi"'>{}</a></body></html>"#,
            long_text
        );
        let document = Html::parse_document(&html);
        let link = document.select(&selector("a").unwrap()).next().unwrap();

        let reduced = snippet(link);
        assert!(reduced.contains(r#"title="say &quot;hi&quot;""#));
        assert!(reduced.contains(r#"href="/q?a=1&amp;b=2""#));
        assert_eq!(reduced.matches('"').count(), 4);
    }

    #[test]
    fn test_raw_output_parses_engine_json() {
        let json = r#"{
            "testEngine": {"name": "axe-core"},
            "violations": [{
                "id": "color-contrast",
                "impact": "serious",
                "description": "Ensures contrast",
                "help": "Elements must meet minimum color contrast ratio thresholds",
                "helpUrl": "https://dequeuniversity.com/rules/axe/4.8/color-contrast",
                "tags": ["wcag2aa"],
                "nodes": [{"html": "<p class=\"muted\">", "failureSummary": "Fix any", "target": [".muted"]}]
            }, {
                "id": "region",
                "impact": null,
                "nodes": []
            }]
        }"#;

        let output = RawAuditOutput::from_json(json).unwrap();
        assert_eq!(output.violations.len(), 2);
        assert_eq!(output.violations[0].nodes[0].failure_summary.as_deref(), Some("Fix any"));
        assert_eq!(output.violations[1].impact, None);
    }

    #[test]
    fn test_raw_output_rejects_malformed_json() {
        assert!(matches!(
            RawAuditOutput::from_json("{not json"),
            Err(ScanError::Audit(_))
        ));
    }
}
