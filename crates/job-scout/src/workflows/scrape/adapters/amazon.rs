use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;
use std::time::Duration;

use super::document::{first_text_within, parse_selector, text_of, RenderedDocument};
use super::{Adapter, ExtractionError, InteractionPlan};
use crate::workflows::scrape::domain::{JobRecord, SourceDescriptor, Strategy, TITLE_NOT_FOUND};

const ANCHOR_SELECTOR: &str = "a.job-link";
const TILE_SELECTOR: &str = ".job-tile";
const JOB_URL_BASE: &str = "https://www.amazon.jobs";
const COMPANY: &str = "Amazon";
const UNKNOWN_ID: &str = "Unknown";

static NUMERIC_SEGMENT: OnceLock<Regex> = OnceLock::new();

fn numeric_segment() -> &'static Regex {
    NUMERIC_SEGMENT.get_or_init(|| Regex::new(r"/(\d+)/").expect("numeric segment pattern compiles"))
}

/// Listing anchors carry site-relative hrefs such as
/// `en/jobs/3078075/frontend-engineer-ii`; the canonical link prefixes the
/// site root. Every posting belongs to the same employer.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmazonAdapter;

impl AmazonAdapter {
    pub fn job_url(href: &str) -> String {
        format!("{JOB_URL_BASE}/{}", href.trim().trim_start_matches('/'))
    }

    fn job_id(href: &str) -> String {
        numeric_segment()
            .captures(href)
            .and_then(|captures| captures.get(1))
            .map_or_else(|| UNKNOWN_ID.to_string(), |id| id.as_str().to_string())
    }
}

struct TitleCandidates {
    heading: Selector,
    title_class: Selector,
    tile: Selector,
}

impl TitleCandidates {
    fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            heading: parse_selector("h3")?,
            title_class: parse_selector(".job-title")?,
            tile: parse_selector(TILE_SELECTOR)?,
        })
    }

    /// Anchor heading, then `.job-title` inside the anchor, then the heading of
    /// the closest enclosing tile.
    fn find(&self, anchor: ElementRef<'_>) -> Option<String> {
        first_text_within(anchor, &self.heading)
            .or_else(|| first_text_within(anchor, &self.title_class))
            .or_else(|| {
                std::iter::once(anchor)
                    .chain(anchor.ancestors().filter_map(ElementRef::wrap))
                    .find(|element| self.tile.matches(element))
                    .and_then(|tile| tile.select(&self.heading).find_map(text_of))
            })
    }
}

impl Adapter for AmazonAdapter {
    fn strategy(&self) -> Strategy {
        Strategy::Amazon
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
        let anchors = parse_selector(ANCHOR_SELECTOR)?;
        let titles = TitleCandidates::new()?;
        let captured_at = Utc::now();

        let records = document
            .select(&anchors)
            .into_iter()
            .filter_map(|anchor| {
                let href = anchor
                    .value()
                    .attr("href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty())?;

                Some(JobRecord {
                    title: titles
                        .find(anchor)
                        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string()),
                    company: COMPANY.to_string(),
                    link: Self::job_url(href),
                    source: source.name.clone(),
                    captured_at,
                    job_id: Some(Self::job_id(href)),
                })
            })
            .collect();

        Ok(records)
    }
}
