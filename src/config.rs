use crate::context::PageContext;
use crate::purge::QualifyingPageSet;
use crate::time::UnitWords;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by every widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The wiki's `api.php` endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// File the purge flags persist in
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Pages auto purge applies to, by `wgPageName`
    #[serde(default)]
    pub auto_purge_pages: Vec<String>,

    /// Words used when rendering relative times
    #[serde(default)]
    pub unit_words: UnitWords,

    /// Which pages get creator and last editor lookups
    #[serde(default)]
    pub revision_info: RevisionInfoConfig,
}

/// Pages the creator and last editor lookups apply to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfoConfig {
    /// Namespace numbers the lookups run in
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<i64>,

    /// Page names skipped even inside those namespaces
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// Main, Project, MediaWiki and Template
fn default_namespaces() -> Vec<i64> {
    vec![0, 4, 8, 10]
}

impl Default for RevisionInfoConfig {
    fn default() -> Self {
        Self {
            namespaces: default_namespaces(),
            excluded: Vec::new(),
        }
    }
}

impl RevisionInfoConfig {
    /// Whether the lookups run for `ctx`; a page with no known namespace
    /// never matches
    pub fn applies_to(&self, ctx: &PageContext) -> bool {
        let in_namespace = ctx
            .namespace
            .is_some_and(|ns| self.namespaces.contains(&ns));
        in_namespace && !self.excluded.contains(&ctx.page_name)
    }
}

/// Default value for api_url
fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".wiki-widgets/store.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            webdriver_url: default_webdriver_url(),
            store_path: default_store_path(),
            auto_purge_pages: Vec::new(),
            unit_words: UnitWords::default(),
            revision_info: RevisionInfoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn qualifying_pages(&self) -> QualifyingPageSet {
        self.auto_purge_pages.iter().cloned().collect()
    }
}
