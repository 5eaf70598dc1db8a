use crate::context::{ContextError, PageContext};
use crate::purge::PageHost;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use thiserror::Error;

/// Local ports WebDriver servers commonly listen on
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not reach any WebDriver server (tried {0})")]
    Connect(String),

    #[error("WebDriver command failed: {0}")]
    Command(#[from] CmdError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// A wiki page open in a WebDriver-controlled browser
pub struct BrowserPage {
    client: Client,
}

impl BrowserPage {
    /// Connects to `webdriver_url`, falling back to well-known local servers
    pub async fn connect(webdriver_url: &str) -> Result<Self, BrowserError> {
        match ClientBuilder::native().connect(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Ok(Self { client });
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    webdriver_url,
                    e
                );
            }
        }

        for url in FALLBACK_WEBDRIVER_URLS.iter() {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = ClientBuilder::native().connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(Self { client });
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );

        let mut tried = vec![webdriver_url];
        tried.extend(FALLBACK_WEBDRIVER_URLS.iter().filter(|u| **u != webdriver_url));
        Err(BrowserError::Connect(tried.join(", ")))
    }

    /// Navigates to `url`
    pub async fn open(&self, url: &str) -> Result<(), BrowserError> {
        ::log::info!("Opening {}", url);
        self.client.goto(url).await?;
        Ok(())
    }

    /// Serialized DOM of the current page
    pub async fn source(&self) -> Result<String, BrowserError> {
        Ok(self.client.source().await?)
    }

    /// Ends the WebDriver session
    pub async fn close(self) -> Result<(), BrowserError> {
        self.client.close().await?;
        Ok(())
    }
}

impl PageHost for BrowserPage {
    type Error = BrowserError;

    async fn context(&mut self) -> Result<PageContext, Self::Error> {
        let html = self.source().await?;
        Ok(PageContext::from_html(&html)?)
    }

    async fn reload(&mut self) -> Result<(), Self::Error> {
        ::log::debug!("Refreshing browser page");
        self.client.refresh().await?;
        Ok(())
    }
}
