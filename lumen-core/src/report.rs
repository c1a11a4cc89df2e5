// Report generation from database

use crate::data::Database;
use crate::decode::ImpactLevel;
use crate::error::StoreError;
use crate::score::ImpactCounts;
use crate::store::{PageReport, ReportStats, ScanStatus, ScannedWebsite};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub website: ScannedWebsite,
    pub pages: Vec<PageReport>,
    /// Absent for failed scans, which never reach scoring.
    pub stats: Option<ReportStats>,
}

impl ReportData {
    fn status_to_string(&self) -> &str {
        match self.website.status {
            ScanStatus::Success => "Completed",
            ScanStatus::Failed => "Failed",
        }
    }

    fn counts(&self) -> ImpactCounts {
        self.stats.as_ref().map(|s| s.counts).unwrap_or_default()
    }

    fn score_to_string(&self) -> String {
        match &self.stats {
            Some(stats) => format!("{:.1} / 100", stats.score),
            None => "n/a (no page could be audited)".to_string(),
        }
    }

    fn page_issue_count(page: &PageReport) -> u64 {
        page.violations.iter().map(|v| v.issue_count()).sum()
    }
}

/// Load a scanned website with its per-page reports and aggregate stats.
///
/// Stats are only optional for failed scans; a successful scan without them
/// is reported as `NotFound`.
pub fn gather_report_data(db: &Database, website_id: &str) -> Result<ReportData, StoreError> {
    let website = db
        .get_scanned_website(website_id)?
        .ok_or_else(|| StoreError::NotFound(format!("scanned website {}", website_id)))?;

    let pages = db.get_reports(website_id)?;
    if pages.is_empty() {
        return Err(StoreError::NotFound(format!(
            "reports for website {}",
            website_id
        )));
    }

    let stats = db.get_stats(website_id)?;
    if stats.is_none() && website.status == ScanStatus::Success {
        return Err(StoreError::NotFound(format!(
            "report stats for website {}",
            website_id
        )));
    }

    Ok(ReportData {
        website,
        pages,
        stats,
    })
}

const HEAVY_RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const LIGHT_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────\n";

fn section(report: &mut String, title: &str) {
    report.push_str(HEAVY_RULE);
    report.push_str(title);
    report.push('\n');
    report.push_str(HEAVY_RULE);
    report.push('\n');
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    // Header
    report.push_str(HEAVY_RULE);
    report.push_str("                     LUMEN ACCESSIBILITY SCAN REPORT\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    report.push_str(&format!("Website ID:   {}\n", data.website.id));
    report.push_str(&format!("URL:          {}\n", data.website.url));
    report.push_str(&format!("Status:       {}\n", data.status_to_string()));
    report.push_str(&format!(
        "Scan Date:    {}\n",
        format_timestamp(data.website.created_at)
    ));
    report.push_str(&format!("Pages:        {}\n", data.pages.len()));
    report.push('\n');

    section(&mut report, "EXECUTIVE SUMMARY");

    let counts = data.counts();
    report.push_str(&format!("Accessibility Score: {}\n", data.score_to_string()));
    report.push_str(&format!("Total Issues:        {}\n\n", counts.total_issues));

    for level in ImpactLevel::ALL {
        let count = counts.get(level);
        if count > 0 {
            report.push_str(&format!(
                "  {:<10} {}  ({})\n",
                format!("[{}]", level.as_str().to_uppercase()),
                count,
                impact_guidance(level)
            ));
        }
    }
    report.push('\n');

    section(&mut report, "PAGES");

    for (idx, page) in data.pages.iter().enumerate() {
        report.push_str(&format!("[{}] {}\n", idx + 1, page.url));
        if page.status == ScanStatus::Failed {
            report.push_str("    Not scanned\n\n");
            continue;
        }
        report.push_str(&format!(
            "    {} violations, {} issues\n\n",
            page.violations.len(),
            ReportData::page_issue_count(page)
        ));

        for violation in &page.violations {
            report.push_str(&format!(
                "  {} [{}]\n",
                violation.rule_id,
                violation.impact.as_str().to_uppercase()
            ));
            report.push_str(&wrap_text(&violation.help_text, 80, "    "));
            report.push_str(&format!(
                "    Affected elements: {}\n",
                violation.affected_nodes.len()
            ));

            report.push_str("    Fix:\n");
            report.push_str(&wrap_text(&violation.remediation, 80, "      "));

            for link in &violation.reference_links {
                report.push_str(&format!("    See: {}\n", link));
            }
            report.push('\n');
        }

        report.push_str(LIGHT_RULE);
        report.push('\n');
    }

    // Footer
    report.push_str(HEAVY_RULE);
    report.push_str("                          End of Report\n");
    report.push_str(HEAVY_RULE);
    report.push_str("\nGenerated by Lumen - a crawling web accessibility auditor\n\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let counts = data.counts();
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Lumen",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "website": {
                "id": data.website.id,
                "url": data.website.url,
                "status": data.website.status,
                "scanned_at": format_iso8601_timestamp(data.website.created_at)
            },
            "summary": {
                "score": data.stats.as_ref().map(|s| s.score),
                "total_pages": data.pages.len(),
                "total_issues": counts.total_issues,
                "impact_breakdown": {
                    "critical": counts.critical,
                    "serious": counts.serious,
                    "moderate": counts.moderate,
                    "minor": counts.minor,
                    "none": counts.none
                }
            },
            "pages": data.pages.iter().map(|page| serde_json::json!({
                "url": page.url,
                "status": page.status,
                "issues": ReportData::page_issue_count(page),
                "violations": page.violations
            })).collect::<Vec<_>>()
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("# Accessibility Scan Report\n\n");
    report.push_str(&format!("- **URL:** {}\n", data.website.url));
    report.push_str(&format!("- **Website ID:** `{}`\n", data.website.id));
    report.push_str(&format!("- **Status:** {}\n", data.status_to_string()));
    report.push_str(&format!(
        "- **Scan date:** {}\n",
        format_timestamp(data.website.created_at)
    ));
    report.push_str(&format!("- **Score:** {}\n\n", data.score_to_string()));

    report.push_str("## Summary\n\n");
    let counts = data.counts();
    report.push_str("| Impact | Issues |\n|---|---|\n");
    for level in ImpactLevel::ALL {
        report.push_str(&format!("| {} | {} |\n", level.as_str(), counts.get(level)));
    }
    report.push_str(&format!(
        "| **total** | **{}** |\n\n",
        counts.total_issues
    ));

    report.push_str("## Pages\n\n");
    for page in &data.pages {
        report.push_str(&format!("### {}\n\n", page.url));
        if page.status == ScanStatus::Failed {
            report.push_str("_Not scanned._\n\n");
            continue;
        }
        if page.violations.is_empty() {
            report.push_str("No violations found.\n\n");
            continue;
        }

        for violation in &page.violations {
            report.push_str(&format!(
                "- **{}** ({}): {}\n",
                violation.rule_id,
                violation.impact.as_str(),
                violation.help_text
            ));
            report.push_str(&format!("  - Fix: {}\n", violation.remediation));
            for node in violation.affected_nodes.iter().take(3) {
                report.push_str(&format!("  - `{}`\n", node.snippet.replace('`', "'")));
            }
            for link in &violation.reference_links {
                report.push_str(&format!("  - [Reference]({})\n", link));
            }
        }
        report.push('\n');
    }

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn impact_guidance(level: ImpactLevel) -> &'static str {
    match level {
        ImpactLevel::Critical => "Blocks access for some users",
        ImpactLevel::Serious => "Severely degrades access",
        ImpactLevel::Moderate => "Should be addressed",
        ImpactLevel::Minor => "Minor annoyance",
        ImpactLevel::None => "Unclassified",
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}

fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > width.saturating_sub(indent.len())
            && !current_line.is_empty()
        {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}
