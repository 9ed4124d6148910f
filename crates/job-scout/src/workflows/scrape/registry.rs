use super::domain::{KeywordList, SelectorBindings, SourceDescriptor, Strategy};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PORTALS_FILE: &str = "career-portals.json";
pub const KEYWORDS_FILE: &str = "job-keywords.json";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed {file}: {source}")]
    Parse {
        file: String,
        source: serde_json::Error,
    },
    #[error("source #{index} is missing a {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("source name '{0}' is configured more than once")]
    DuplicateSource(String),
}

/// Portals and keywords loaded once at startup.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    pub sources: Vec<SourceDescriptor>,
    pub keywords: KeywordList,
}

impl SourceRegistry {
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, RegistryError> {
        let data_dir = data_dir.as_ref();
        let portals_path = data_dir.join(PORTALS_FILE);
        let keywords_path = data_dir.join(KEYWORDS_FILE);

        let portals = open(&portals_path)?;
        let keywords = open(&keywords_path)?;
        let registry = Self::from_readers(portals, keywords)?;

        info!(
            sources = registry.sources.len(),
            keywords = registry.keywords.primary.len(),
            "loaded career portal registry"
        );
        Ok(registry)
    }

    pub fn from_readers<P: Read, K: Read>(portals: P, keywords: K) -> Result<Self, RegistryError> {
        let sources = parse_sources(portals)?;
        let keywords = parse_keywords(keywords)?;
        Ok(Self { sources, keywords })
    }
}

fn open(path: &Path) -> Result<std::fs::File, RegistryError> {
    std::fs::File::open(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortalEntry {
    #[serde(default)]
    name: String,
    #[serde(default, alias = "search_url")]
    search_url: String,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    scraping_type: Option<String>,
    #[serde(default)]
    selectors: Option<SelectorBindings>,
}

impl PortalEntry {
    fn resolve_strategy(&self) -> Strategy {
        if let Some(tag) = self.strategy.as_deref() {
            return Strategy::from_tag(tag).unwrap_or_else(|| {
                warn!(
                    source = %self.name,
                    strategy = tag,
                    "unrecognized extraction strategy, using generic selectors"
                );
                Strategy::Generic
            });
        }

        match self.scraping_type.as_deref() {
            Some("company-specific") => match self.name.as_str() {
                "Microsoft" => Strategy::Microsoft,
                "Amazon" => Strategy::Amazon,
                _ => {
                    warn!(
                        source = %self.name,
                        "no company-specific adapter for source, using generic selectors"
                    );
                    Strategy::Generic
                }
            },
            _ => Strategy::Generic,
        }
    }
}

fn parse_sources<R: Read>(reader: R) -> Result<Vec<SourceDescriptor>, RegistryError> {
    let entries: Vec<PortalEntry> =
        serde_json::from_reader(reader).map_err(|source| RegistryError::Parse {
            file: PORTALS_FILE.to_string(),
            source,
        })?;

    let mut seen = HashSet::new();
    let mut sources = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(RegistryError::MissingField {
                index,
                field: "name",
            });
        }
        if entry.search_url.trim().is_empty() {
            return Err(RegistryError::MissingField {
                index,
                field: "searchUrl",
            });
        }
        if !seen.insert(entry.name.clone()) {
            return Err(RegistryError::DuplicateSource(entry.name));
        }

        let strategy = entry.resolve_strategy();
        sources.push(SourceDescriptor {
            name: entry.name,
            search_url: entry.search_url,
            strategy,
            selectors: entry.selectors,
        });
    }

    Ok(sources)
}

#[derive(Debug, Deserialize)]
struct KeywordFile {
    primary_keywords: Vec<String>,
    #[serde(default)]
    secondary_keywords: Vec<String>,
}

fn parse_keywords<R: Read>(reader: R) -> Result<KeywordList, RegistryError> {
    let file: KeywordFile =
        serde_json::from_reader(reader).map_err(|source| RegistryError::Parse {
            file: KEYWORDS_FILE.to_string(),
            source,
        })?;

    let clean = |terms: Vec<String>| -> Vec<String> {
        terms
            .into_iter()
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
            .collect()
    };

    Ok(KeywordList {
        primary: clean(file.primary_keywords),
        secondary: clean(file.secondary_keywords),
    })
}
