use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use super::document::{first_text_within, parse_selector, RenderedDocument};
use super::{Adapter, ExtractionError, InteractionPlan};
use crate::workflows::scrape::domain::{JobRecord, SourceDescriptor, Strategy, TITLE_NOT_FOUND};

const CONTAINER_SELECTOR: &str = r#"div[aria-label^="Job item"]"#;
const TITLE_SELECTOR: &str = r#"h3[data-automation-id="jobTitle"]"#;
const COMPANY_SELECTOR: &str = r#"span[data-automation-id="companyName"]"#;
const JOB_URL_BASE: &str = "https://jobs.careers.microsoft.com/global/en/job";
const DEFAULT_COMPANY: &str = "Microsoft";

static JOB_ITEM_LABEL: OnceLock<Regex> = OnceLock::new();

fn job_item_label() -> &'static Regex {
    JOB_ITEM_LABEL.get_or_init(|| Regex::new(r"Job item (\d+)").expect("job item pattern compiles"))
}

/// Listing containers carry the posting id in their aria-label. The id, not any
/// DOM href, determines the canonical link. The search URL is static, so the
/// keyword does not narrow results.
#[derive(Debug, Default, Clone, Copy)]
pub struct MicrosoftAdapter;

impl MicrosoftAdapter {
    pub fn job_url(job_id: &str) -> String {
        format!("{JOB_URL_BASE}/{job_id}/")
    }
}

impl Adapter for MicrosoftAdapter {
    fn strategy(&self) -> Strategy {
        Strategy::Microsoft
    }

    fn interaction(&self) -> InteractionPlan {
        InteractionPlan::settle_and_scroll(Duration::from_millis(3000), Duration::from_millis(2000))
    }

    fn extract(
        &self,
        document: &RenderedDocument,
        source: &SourceDescriptor,
        _keyword: &str,
    ) -> Result<Vec<JobRecord>, ExtractionError> {
        let containers = parse_selector(CONTAINER_SELECTOR)?;
        let title = parse_selector(TITLE_SELECTOR)?;
        let company = parse_selector(COMPANY_SELECTOR)?;
        let captured_at = Utc::now();

        let records = document
            .select(&containers)
            .into_iter()
            .filter_map(|element| {
                let label = element.value().attr("aria-label")?;
                let Some(job_id) = job_item_label()
                    .captures(label)
                    .and_then(|captures| captures.get(1))
                    .map(|id| id.as_str().to_string())
                else {
                    debug!(label, "job container without a numeric id");
                    return None;
                };

                Some(JobRecord {
                    title: first_text_within(element, &title)
                        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
                    company: first_text_within(element, &company)
                        .unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
                    link: Self::job_url(&job_id),
                    source: source.name.clone(),
                    captured_at,
                    job_id: Some(job_id),
                })
            })
            .collect();

        Ok(records)
    }
}
