use tracing::{debug, info, warn};

use super::adapters::{Adapter, AdapterTable, ExtractionError, RenderedDocument};
use super::browser::{BrowserSession, FetchOptions, NavigationError, PageFetcher};
use super::domain::{JobRecord, KeywordList, SourceDescriptor};
use super::pacing::PacingPolicy;

/// Failure of a single (source, keyword) pair. Never escalates past the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Visits every source with its keyword budget, one pair at a time.
pub struct ScrapeOrchestrator {
    adapters: AdapterTable,
    pacing: PacingPolicy,
    fetch_options: FetchOptions,
}

impl ScrapeOrchestrator {
    pub fn new(adapters: AdapterTable, pacing: PacingPolicy, fetch_options: FetchOptions) -> Self {
        Self {
            adapters,
            pacing,
            fetch_options,
        }
    }

    /// Concatenates the records of every pair in registry order. A failing pair
    /// is logged and contributes nothing; the pacing delay follows every fetch
    /// attempt, failed or not.
    pub async fn run_all(
        &self,
        session: &mut dyn BrowserSession,
        sources: &[SourceDescriptor],
        keywords: &KeywordList,
    ) -> Vec<JobRecord> {
        let mut records = Vec::new();

        for source in sources {
            let Some(adapter) = self.adapters.resolve(source.strategy) else {
                warn!(source = %source.name, strategy = %source.strategy, "no adapter registered, skipping source");
                continue;
            };

            let terms = keywords.first(source.strategy.keyword_limit());
            info!(source = %source.name, strategy = %source.strategy, keywords = terms.len(), "scraping source");

            for keyword in terms {
                match self.scrape_pair(session, adapter, source, keyword).await {
                    Ok(found) => {
                        info!(source = %source.name, keyword = %keyword, found = found.len(), "pair scraped");
                        records.extend(found);
                    }
                    Err(err) => {
                        warn!(source = %source.name, keyword = %keyword, error = %err, "pair failed, continuing");
                    }
                }
                self.pacing.pause(source.strategy).await;
            }
        }

        records
    }

    async fn scrape_pair(
        &self,
        session: &mut dyn BrowserSession,
        adapter: &dyn Adapter,
        source: &SourceDescriptor,
        keyword: &str,
    ) -> Result<Vec<JobRecord>, ScrapeError> {
        let url = adapter.search_url(source, keyword);
        let plan = adapter.interaction();
        debug!(source = %source.name, %url, "fetching listing page");

        let mut fetcher = PageFetcher::new(session);
        let mut page = fetcher.fetch(&url, self.fetch_options).await?;
        page.wait(plan.settle).await;
        if plan.scroll_to_bottom {
            page.scroll_to_bottom().await?;
            page.wait(plan.settle_after_scroll).await;
        }
        let rendered = page.render().await?;

        let document = RenderedDocument::parse(&rendered);
        Ok(adapter.extract(&document, source, keyword)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::scrape::browser::BrowserError;
    use crate::workflows::scrape::domain::{SelectorBindings, Strategy};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::Instant;
    use url::Url;

    #[derive(Default)]
    struct ScriptedSession {
        pages: HashMap<String, String>,
        current: Option<Url>,
        visited: Vec<String>,
    }

    impl ScriptedSession {
        fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, url: &Url, _idle: bool) -> Result<(), NavigationError> {
            self.visited.push(url.to_string());
            if !self.pages.contains_key(url.as_str()) {
                return Err(NavigationError::Failed {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_RESET".to_string(),
                });
            }
            self.current = Some(url.clone());
            Ok(())
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
            Ok(())
        }

        async fn content(&mut self) -> Result<String, NavigationError> {
            let url = self.current.as_ref().map(Url::to_string).unwrap_or_default();
            Ok(self.pages.get(&url).cloned().unwrap_or_default())
        }

        async fn current_url(&mut self) -> Option<String> {
            self.current.as_ref().map(Url::to_string)
        }

        async fn close(self: Box<Self>) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    fn board(name: &str, host: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            search_url: format!("https://{host}/search?q={{keywords}}"),
            strategy: Strategy::Generic,
            selectors: Some(SelectorBindings {
                list_item: "a.job".to_string(),
                title: None,
                company: None,
            }),
        }
    }

    fn orchestrator(delay: Duration) -> ScrapeOrchestrator {
        ScrapeOrchestrator::new(
            AdapterTable::standard(),
            PacingPolicy::new(Some(delay)),
            FetchOptions::default(),
        )
    }

    fn keywords(terms: &[&str]) -> KeywordList {
        KeywordList::new(terms.iter().map(|term| term.to_string()).collect())
    }

    #[tokio::test(start_paused = true)]
    async fn failing_pair_does_not_affect_other_pairs() {
        let mut session = ScriptedSession::default()
            .with_page(
                "https://a.test/search?q=react",
                r#"<a class="job" href="/jobs/1">React Dev</a>"#,
            )
            .with_page(
                "https://b.test/search?q=react",
                r#"<a class="job" href="/jobs/2">React Engineer</a>"#,
            )
            .with_page(
                "https://b.test/search?q=vue",
                r#"<a class="job" href="/jobs/3">Vue Engineer</a>"#,
            );
        let sources = vec![board("A", "a.test"), board("B", "b.test")];

        let records = orchestrator(Duration::from_millis(10))
            .run_all(&mut session, &sources, &keywords(&["react", "vue"]))
            .await;

        let links: Vec<&str> = records.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://a.test/jobs/1",
                "https://b.test/jobs/2",
                "https://b.test/jobs/3"
            ]
        );
        assert_eq!(session.visited.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_selectors_are_isolated_to_their_source() {
        let mut broken = board("Broken", "broken.test");
        broken.selectors = Some(SelectorBindings {
            list_item: "a[".to_string(),
            title: None,
            company: None,
        });
        let mut session = ScriptedSession::default()
            .with_page("https://broken.test/search?q=react", "<a>ignored</a>")
            .with_page(
                "https://ok.test/search?q=react",
                r#"<a class="job" href="https://ok.test/jobs/9">UI</a>"#,
            );

        let records = orchestrator(Duration::from_millis(10))
            .run_all(
                &mut session,
                &[broken, board("Ok", "ok.test")],
                &keywords(&["react"]),
            )
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "Ok");
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_follows_every_pair_and_keyword_budget_applies() {
        let mut session = ScriptedSession::default();
        let sources = vec![board("A", "a.test")];
        let started = Instant::now();

        let records = orchestrator(Duration::from_secs(1))
            .run_all(
                &mut session,
                &sources,
                &keywords(&["one", "two", "three", "four", "five", "six"]),
            )
            .await;

        assert!(records.is_empty());
        assert_eq!(session.visited.len(), 5);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
