use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::workflows::scrape::domain::JobRecord;

/// Run summary handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// Attached only when present and `relevant_count > 0`.
    pub export_path: Option<PathBuf>,
    pub relevant_count: usize,
    pub total_count: usize,
    pub by_company: BTreeMap<String, usize>,
}

impl JobReport {
    pub fn empty(total_count: usize) -> Self {
        Self {
            export_path: None,
            relevant_count: 0,
            total_count,
            by_company: BTreeMap::new(),
        }
    }

    pub fn for_records(
        records: &[JobRecord],
        total_count: usize,
        export_path: Option<PathBuf>,
    ) -> Self {
        Self {
            export_path,
            relevant_count: records.len(),
            total_count,
            by_company: count_by_company(records),
        }
    }

    pub fn has_attachment(&self) -> bool {
        self.export_path.is_some() && self.relevant_count > 0
    }
}

pub fn count_by_company(records: &[JobRecord]) -> BTreeMap<String, usize> {
    records
        .iter()
        .fold(BTreeMap::new(), |mut counts, record| {
            *counts.entry(record.company.clone()).or_insert(0) += 1;
            counts
        })
}

pub fn report_subject(date: NaiveDate, relevant_count: usize) -> String {
    format!(
        "Frontend Job Report - {} ({relevant_count} Jobs)",
        date.format("%Y-%m-%d")
    )
}

pub fn error_subject(date: NaiveDate) -> String {
    format!("Job Scraper Error - {}", date.format("%Y-%m-%d"))
}

const REPORT_STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; } \
.container { max-width: 600px; margin: 0 auto; padding: 20px; } \
.header { background: #667eea; color: white; padding: 20px; border-radius: 8px; text-align: center; } \
.stat-number { font-size: 24px; font-weight: bold; color: #667eea; } \
.company { background: white; padding: 10px; margin: 5px 0; border-left: 4px solid #667eea; } \
.footer { text-align: center; color: #666; font-size: 12px; }";

pub fn render_report_html(report: &JobReport, generated_at: DateTime<Utc>) -> String {
    let has_jobs = report.relevant_count > 0;
    let mut html = String::with_capacity(2048);

    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<style>{REPORT_STYLE}</style></head><body>"));
    html.push_str("<div class=\"container\"><div class=\"header\">");
    html.push_str("<h1>Frontend Job Scraper Report</h1><p>Automated Job Search Results</p></div>");

    html.push_str("<h2>Scraping Summary</h2>");
    html.push_str(&format!(
        "<p><strong>Report Generated:</strong> {}</p>",
        generated_at.format("%A, %B %d, %Y %H:%M UTC")
    ));
    html.push_str(&format!(
        "<p><span class=\"stat-number\">{}</span> Relevant Jobs Found</p>",
        report.relevant_count
    ));
    html.push_str(&format!(
        "<p><span class=\"stat-number\">{}</span> Total Jobs Scraped</p>",
        report.total_count
    ));

    html.push_str("<h3>What's Included</h3><ul>");
    let included: &[&str] = if has_jobs {
        &[
            "Complete CSV file with all job listings",
            "Job titles, companies, and direct application links",
            "Source information for each job posting",
        ]
    } else {
        &[
            "No frontend jobs found in this search cycle",
            "The search will continue on the next scheduled run",
        ]
    };
    push_items(&mut html, included);
    html.push_str("</ul>");

    html.push_str("<h3>Jobs by Company</h3>");
    if report.by_company.is_empty() {
        html.push_str("<p>No company breakdown available for this search cycle.</p>");
    } else {
        for (company, count) in &report.by_company {
            let plural = if *count == 1 { "" } else { "s" };
            html.push_str(&format!(
                "<div class=\"company\"><strong>{}:</strong> {count} job{plural}</div>",
                escape_html(company)
            ));
        }
    }

    html.push_str("<h3>Next Steps</h3><ol>");
    let next_steps: &[&str] = if has_jobs {
        &[
            "Review the attached CSV file",
            "Visit job application pages directly using the provided links",
            "Apply to positions that match your skills and preferences",
        ]
    } else {
        &[
            "Wait for the next automated search",
            "Consider expanding the keyword list if needed",
        ]
    };
    push_items(&mut html, next_steps);
    html.push_str("</ol>");

    html.push_str("<div class=\"footer\"><p>This report was generated automatically by the job scraper.</p></div>");
    html.push_str("</div></body></html>");
    html
}

pub fn render_error_html(message: &str, trace: &str, occurred_at: DateTime<Utc>) -> String {
    format!(
        "<h2>Job Scraper Error Report</h2>\
         <p><strong>Time:</strong> {}</p>\
         <p><strong>Error:</strong> {}</p>\
         <pre style=\"background: #f5f5f5; padding: 10px; border-radius: 4px; overflow-x: auto;\">{}</pre>",
        occurred_at.to_rfc3339(),
        escape_html(message),
        escape_html(trace)
    )
}

fn push_items(html: &mut String, items: &[&str]) {
    for item in items {
        html.push_str("<li>");
        html.push_str(item);
        html.push_str("</li>");
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
