//! Per-strategy extraction adapters and the table the orchestrator dispatches through.

mod amazon;
mod document;
mod generic;
mod microsoft;

pub use amazon::AmazonAdapter;
pub use document::RenderedDocument;
pub use generic::GenericAdapter;
pub use microsoft::MicrosoftAdapter;

use std::collections::HashMap;
use std::time::Duration;

use super::domain::{JobRecord, SourceDescriptor, Strategy};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("selector '{selector}' is invalid: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("source '{0}' has no selector bindings for generic extraction")]
    MissingSelectors(String),
}

/// Page interaction an adapter needs before its snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionPlan {
    pub settle: Duration,
    pub scroll_to_bottom: bool,
    pub settle_after_scroll: Duration,
}

impl InteractionPlan {
    pub const fn settle_only(settle: Duration) -> Self {
        Self {
            settle,
            scroll_to_bottom: false,
            settle_after_scroll: Duration::ZERO,
        }
    }

    pub const fn settle_and_scroll(settle: Duration, settle_after_scroll: Duration) -> Self {
        Self {
            settle,
            scroll_to_bottom: true,
            settle_after_scroll,
        }
    }
}

/// Maps a rendered listing page to job records for one strategy.
///
/// Missing fields fall back to placeholders; a page without matching
/// containers yields an empty list. Only unusable selectors are errors.
pub trait Adapter: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn search_url(&self, source: &SourceDescriptor, _keyword: &str) -> String {
        source.search_url.clone()
    }

    fn interaction(&self) -> InteractionPlan;

    fn extract(
        &self,
        document: &RenderedDocument,
        source: &SourceDescriptor,
        keyword: &str,
    ) -> Result<Vec<JobRecord>, ExtractionError>;
}

/// Strategy → adapter handlers. New strategies register here; dispatch never changes.
pub struct AdapterTable {
    handlers: HashMap<Strategy, Box<dyn Adapter>>,
}

impl AdapterTable {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty()
            .with(MicrosoftAdapter)
            .with(AmazonAdapter)
            .with(GenericAdapter)
    }

    pub fn with<A: Adapter + 'static>(mut self, adapter: A) -> Self {
        self.handlers.insert(adapter.strategy(), Box::new(adapter));
        self
    }

    /// Handler for the strategy, or the generic handler when none is registered.
    pub fn resolve(&self, strategy: Strategy) -> Option<&dyn Adapter> {
        self.handlers
            .get(&strategy)
            .or_else(|| self.handlers.get(&Strategy::Generic))
            .map(|adapter| adapter.as_ref())
    }
}

impl Default for AdapterTable {
    fn default() -> Self {
        Self::standard()
    }
}
