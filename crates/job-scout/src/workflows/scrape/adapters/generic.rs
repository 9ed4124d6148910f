use chrono::Utc;
use std::time::Duration;

use super::document::{first_text_within, parse_selector, text_of, RenderedDocument};
use super::{Adapter, ExtractionError, InteractionPlan};
use crate::workflows::scrape::domain::{
    JobRecord, SourceDescriptor, Strategy, COMPANY_NOT_FOUND, TITLE_NOT_FOUND,
};

pub const KEYWORD_PLACEHOLDER: &str = "{keywords}";

/// Selector-driven extraction configured per source.
///
/// Company names are paired with listings by position: the i-th node matching
/// the `company` selector belongs to the i-th listing. Pages whose company nodes
/// are not index-aligned with listings get mismatched attributions.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericAdapter;

impl Adapter for GenericAdapter {
    fn strategy(&self) -> Strategy {
        Strategy::Generic
    }

    fn search_url(&self, source: &SourceDescriptor, keyword: &str) -> String {
        source
            .search_url
            .replace(KEYWORD_PLACEHOLDER, &urlencoding::encode(keyword))
    }

    fn interaction(&self) -> InteractionPlan {
        InteractionPlan::settle_only(Duration::from_millis(2000))
    }

    fn extract(
        &self,
        document: &RenderedDocument,
        source: &SourceDescriptor,
        _keyword: &str,
    ) -> Result<Vec<JobRecord>, ExtractionError> {
        let bindings = source
            .selectors
            .as_ref()
            .ok_or_else(|| ExtractionError::MissingSelectors(source.name.clone()))?;

        let listings = parse_selector(&bindings.list_item)?;
        let title_selector = bindings.title.as_deref().map(parse_selector).transpose()?;
        let company_selector = bindings.company.as_deref().map(parse_selector).transpose()?;

        let company_nodes = company_selector
            .as_ref()
            .map(|selector| document.select(selector))
            .unwrap_or_default();
        let captured_at = Utc::now();

        let records = document
            .select(&listings)
            .into_iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let link = node
                    .value()
                    .attr("href")
                    .and_then(|href| document.resolve_link(href))?;

                let title = text_of(node)
                    .or_else(|| {
                        title_selector
                            .as_ref()
                            .and_then(|selector| first_text_within(node, selector))
                    })
                    .unwrap_or_else(|| TITLE_NOT_FOUND.to_string());

                let company = company_nodes
                    .get(index)
                    .copied()
                    .and_then(text_of)
                    .unwrap_or_else(|| COMPANY_NOT_FOUND.to_string());

                Some(JobRecord {
                    title,
                    company,
                    link,
                    source: source.name.clone(),
                    captured_at,
                    job_id: None,
                })
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::scrape::domain::SelectorBindings;
    use url::Url;

    fn source(company: Option<&str>) -> SourceDescriptor {
        SourceDescriptor {
            name: "Board".to_string(),
            search_url: "https://x.com/search?q={keywords}&remote=true".to_string(),
            strategy: Strategy::Generic,
            selectors: Some(SelectorBindings {
                list_item: "a.job".to_string(),
                title: Some(".title".to_string()),
                company: company.map(str::to_string),
            }),
        }
    }

    fn document(html: &str) -> RenderedDocument {
        RenderedDocument::from_html(html, Url::parse("https://x.com").expect("url"))
    }

    #[test]
    fn resolves_relative_links_against_the_document_url() {
        let records = GenericAdapter
            .extract(
                &document(r#"<a class="job" href="/jobs/42">UI Engineer</a>"#),
                &source(None),
                "ui",
            )
            .expect("extraction succeeds");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, "https://x.com/jobs/42");
        assert_eq!(records[0].title, "UI Engineer");
        assert_eq!(records[0].company, COMPANY_NOT_FOUND);
        assert_eq!(records[0].source, "Board");
    }

    #[test]
    fn pairs_companies_by_position() {
        let html = r#"
            <ul>
              <li><a class="job" href="/jobs/1">Frontend Developer</a></li>
              <li><a class="job" href="https://boards.test/jobs/2">React Engineer</a></li>
              <li><a class="job" href="/jobs/3">Design Engineer</a></li>
            </ul>
            <span class="co">Acme</span>
            <span class="co">Globex</span>
        "#;
        let records = GenericAdapter
            .extract(&document(html), &source(Some(".co")), "react")
            .expect("extraction succeeds");

        let companies: Vec<&str> = records.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["Acme", "Globex", COMPANY_NOT_FOUND]);
        assert_eq!(records[1].link, "https://boards.test/jobs/2");
    }

    #[test]
    fn skips_listings_without_links() {
        let html = r#"<a class="job">Closed role</a><a class="job" href="/jobs/9"></a>"#;
        let records = GenericAdapter
            .extract(&document(html), &source(None), "react")
            .expect("extraction succeeds");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, TITLE_NOT_FOUND);
    }

    #[test]
    fn missing_bindings_are_an_extraction_error() {
        let mut source = source(None);
        source.selectors = None;
        let error = GenericAdapter
            .extract(&document("<html></html>"), &source, "react")
            .expect_err("bindings required");
        assert!(matches!(error, ExtractionError::MissingSelectors(name) if name == "Board"));
    }

    #[test]
    fn search_url_encodes_the_keyword() {
        assert_eq!(
            GenericAdapter.search_url(&source(None), "frontend engineer & ui"),
            "https://x.com/search?q=frontend%20engineer%20%26%20ui&remote=true"
        );
    }
}
