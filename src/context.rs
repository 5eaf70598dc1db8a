use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Matches the start of the page's client configuration object, in both the
/// inline `RLCONF=` form and the older `mw.config.set(` form
static CONFIG_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bRLCONF\s*=|\bmw\.config\.set\()\s*").expect("static regex is valid")
});

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("page has no client configuration script")]
    MissingConfig,

    #[error("client configuration is not valid JSON: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("client configuration lacks {0}")]
    MissingField(&'static str),
}

/// What a loaded wiki page says about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// `wgPageName`, e.g. `Main_Page`
    pub page_name: String,
    /// `wgSiteName`, lower-cased
    pub site_name: String,
    pub skin: Option<String>,
    pub article_id: Option<u64>,
    pub namespace: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ClientConfig {
    #[serde(rename = "wgPageName")]
    page_name: Option<String>,
    #[serde(rename = "wgSiteName")]
    site_name: Option<String>,
    skin: Option<String>,
    #[serde(rename = "wgArticleId")]
    article_id: Option<u64>,
    #[serde(rename = "wgNamespaceNumber")]
    namespace: Option<i64>,
}

impl PageContext {
    pub fn new(page_name: &str, site_name: &str) -> Self {
        Self {
            page_name: page_name.to_string(),
            site_name: site_name.to_lowercase(),
            skin: None,
            article_id: None,
            namespace: None,
        }
    }

    /// Reads the context from a rendered page's inline scripts
    pub fn from_html(html: &str) -> Result<Self, ContextError> {
        let doc = Html::parse_document(html);
        let script_selector = Selector::parse("script").expect("static selector is valid");

        for script in doc.select(&script_selector) {
            let text = script.text().collect::<String>();
            if let Some(found) = CONFIG_START.find(&text) {
                let config = first_json_object(&text[found.end()..])?;
                return Self::from_config(config);
            }
        }

        Err(ContextError::MissingConfig)
    }

    fn from_config(config: Value) -> Result<Self, ContextError> {
        let config: ClientConfig = serde_json::from_value(config)?;

        let page_name = config
            .page_name
            .ok_or(ContextError::MissingField("wgPageName"))?;
        let site_name = config
            .site_name
            .ok_or(ContextError::MissingField("wgSiteName"))?;

        ::log::debug!("Page context: {} on {}", page_name, site_name);

        Ok(Self {
            page_name,
            site_name: site_name.to_lowercase(),
            skin: config.skin,
            article_id: config.article_id,
            namespace: config.namespace,
        })
    }
}

/// Decodes the JSON value at the start of `text`, ignoring whatever follows it
fn first_json_object(text: &str) -> Result<Value, ContextError> {
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match values.next() {
        Some(value) => Ok(value?),
        None => Err(ContextError::MissingConfig),
    }
}
