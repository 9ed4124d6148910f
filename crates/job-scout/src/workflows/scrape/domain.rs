use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TITLE_NOT_FOUND: &str = "Job Title Not Found";
pub const COMPANY_NOT_FOUND: &str = "Company Not Found";

/// Extraction approach selecting which adapter handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Single-employer portal keyed by `aria-label="Job item <id>"` containers.
    Microsoft,
    /// Single-employer portal keyed by `a.job-link` anchors with relative hrefs.
    Amazon,
    /// Selector-driven extraction for any other listing page.
    Generic,
}

impl Strategy {
    pub const fn ordered() -> [Self; 3] {
        [Self::Microsoft, Self::Amazon, Self::Generic]
    }

    /// Resolves a configuration tag; unknown tags fall back to `Generic`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "microsoft" | "named_a" => Some(Self::Microsoft),
            "amazon" | "named_b" => Some(Self::Amazon),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Microsoft => "microsoft",
            Self::Amazon => "amazon",
            Self::Generic => "generic",
        }
    }

    pub const fn is_single_employer(self) -> bool {
        matches!(self, Self::Microsoft | Self::Amazon)
    }

    /// Number of leading keywords searched per source.
    pub const fn keyword_limit(self) -> usize {
        if self.is_single_employer() {
            3
        } else {
            5
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// CSS selectors driving the generic adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorBindings {
    #[serde(alias = "jobLink")]
    pub list_item: String,
    #[serde(alias = "jobTitle", default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// One configured career portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub search_url: String,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorBindings>,
}

/// Ordered search terms; only the primary list drives searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordList {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl KeywordList {
    pub fn new(primary: Vec<String>) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
        }
    }

    pub fn first(&self, limit: usize) -> &[String] {
        &self.primary[..limit.min(self.primary.len())]
    }
}

/// A normalized job posting. The canonical link is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub link: String,
    pub source: String,
    pub captured_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl JobRecord {
    pub fn captured_at_label(&self) -> String {
        self.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
