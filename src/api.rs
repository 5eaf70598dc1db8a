use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors talking to the wiki's action API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("api error {code}: {info}")]
    Remote { code: String, info: String },

    #[error("no revision found for {0}")]
    MissingRevision(String),
}

/// Result of a single purge request
#[derive(Debug, Clone, PartialEq)]
pub enum PurgeOutcome {
    Purged,
    /// The API answered with an `error` object
    Rejected(Value),
}

impl PurgeOutcome {
    /// Interprets a purge response body: any `error` member means rejection
    pub fn from_response(body: &Value) -> Self {
        match body.get("error") {
            Some(error) if !error.is_null() => PurgeOutcome::Rejected(error.clone()),
            _ => PurgeOutcome::Purged,
        }
    }

    pub fn is_purged(&self) -> bool {
        matches!(self, PurgeOutcome::Purged)
    }
}

/// Cache invalidation endpoint
#[allow(async_fn_in_trait)]
pub trait PurgeApi {
    async fn purge(&self, title: &str) -> Result<PurgeOutcome, ApiError>;
}

/// One revision of a page, with whichever extra properties were requested
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Revision {
    #[serde(default)]
    pub revid: Option<u64>,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    /// Set when the edit was flagged minor
    #[serde(default, deserialize_with = "present")]
    pub minor: bool,
    /// Edit summary rendered as HTML
    #[serde(default)]
    pub parsedcomment: Option<String>,
    /// Revision id of the diff against the previous revision
    #[serde(default, rename = "diff", deserialize_with = "diff_target")]
    pub diff_to: Option<u64>,
}

/// Format version 1 marks boolean flags by the key being there at all
fn present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    serde::de::IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

fn diff_target<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    struct Diff {
        to: Option<u64>,
    }
    Ok(Option::<Diff>::deserialize(deserializer)?.and_then(|d| d.to))
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    error: Option<RemoteError>,
    #[serde(default)]
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PageRevisions {
    #[serde(default)]
    revisions: Vec<Revision>,
}

/// Pulls the first listed revision out of a `prop=revisions` query response
pub fn parse_revision(title: &str, body: Value) -> Result<Revision, ApiError> {
    let response: QueryResponse = serde_json::from_value(body)?;

    if let Some(error) = response.error {
        return Err(ApiError::Remote {
            code: error.code,
            info: error.info,
        });
    }

    let pages = response.query.map(|q| q.pages).unwrap_or_default();
    for (_, page) in pages {
        let page: PageRevisions = serde_json::from_value(page)?;
        if let Some(revision) = page.revisions.into_iter().next() {
            return Ok(revision);
        }
    }

    Err(ApiError::MissingRevision(title.to_string()))
}

/// Client for a MediaWiki `api.php` endpoint
#[derive(Debug, Clone)]
pub struct WikiApi {
    client: reqwest::Client,
    endpoint: String,
}

impl WikiApi {
    pub fn new(endpoint: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wiki-widgets/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    async fn query_revision(
        &self,
        title: &str,
        params: &[(&str, &str)],
    ) -> Result<Revision, ApiError> {
        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("titles", title),
                ("rvlimit", "1"),
                ("format", "json"),
                ("formatversion", "1"),
            ])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_revision(title, body)
    }

    /// Fetches the most recent revision of `title`, with its flags, summary
    /// and diff target
    pub async fn latest_revision(&self, title: &str) -> Result<Revision, ApiError> {
        ::log::debug!("Querying latest revision of {}", title);
        self.query_revision(
            title,
            &[
                ("rvprop", "ids|timestamp|user|userid|size|parsedcomment|flags"),
                ("rvdiffto", "prev"),
            ],
        )
        .await
    }

    /// Fetches the revision that created `title`
    pub async fn first_revision(&self, title: &str) -> Result<Revision, ApiError> {
        ::log::debug!("Querying first revision of {}", title);
        self.query_revision(
            title,
            &[("rvprop", "ids|timestamp|user|userid"), ("rvdir", "newer")],
        )
        .await
    }

    /// Downloads the rendered HTML of a wiki page
    pub async fn fetch_page(&self, url: &str) -> Result<String, ApiError> {
        ::log::debug!("Fetching page {}", url);
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

impl PurgeApi for WikiApi {
    async fn purge(&self, title: &str) -> Result<PurgeOutcome, ApiError> {
        ::log::info!("Purging {} via {}", title, self.endpoint);

        let body: Value = self
            .client
            .post(&self.endpoint)
            .form(&[("action", "purge"), ("titles", title), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let outcome = PurgeOutcome::from_response(&body);
        if let PurgeOutcome::Rejected(error) = &outcome {
            ::log::warn!("Purge of {} rejected: {}", title, error);
        }
        Ok(outcome)
    }
}
