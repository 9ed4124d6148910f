use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::ExtractionError;
use crate::workflows::scrape::browser::RenderedPage;

/// Parsed, queryable view of a rendered page.
pub struct RenderedDocument {
    html: Html,
    base_url: Url,
}

impl RenderedDocument {
    pub fn parse(page: &RenderedPage) -> Self {
        Self::from_html(&page.html, page.url.clone())
    }

    pub fn from_html(html: &str, base_url: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            base_url,
        }
    }

    pub fn select(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(selector).collect()
    }

    /// Resolves an href against the page URL. Only http(s) links qualify.
    pub fn resolve_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let resolved = self.base_url.join(href).ok()?;
        matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
    }
}

pub(crate) fn parse_selector(raw: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(raw).map_err(|err| ExtractionError::InvalidSelector {
        selector: raw.to_string(),
        reason: err.to_string(),
    })
}

/// Trimmed text content, `None` when blank.
pub(crate) fn text_of(element: ElementRef<'_>) -> Option<String> {
    let collapsed = element.text().collect::<Vec<_>>().join(" ");
    let text = collapsed.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

pub(crate) fn first_text_within(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).find_map(text_of)
}
