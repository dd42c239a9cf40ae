//! Summarisation pipeline: target check, extraction, prompt, request, parse.

use crate::agent::{AgentError, ApiKey, SummaryClient};
use crate::config::Config;
use crate::preferences::{self, PreferenceError};
use crate::prompt::{LengthPreference, PromptBuilder};
use crate::scraper::{self, ExtractedPage, ScraperError};
use crate::storage::PreferenceStore;
use crate::summary::Summary;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{info, warn};

/// Extraction is attempted at most this many times, with one re-injection in between
pub const MAX_EXTRACTION_ATTEMPTS: u32 = 2;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("No active page found. Enter a URL to summarise.")]
    NoActiveTab,
    #[error("Cannot summarise browser internal pages ({0}). Navigate to a website first.")]
    RestrictedPage(String),
    #[error("Could not extract page content after {attempts} attempt(s): {detail}")]
    ExtractionFailed { attempts: u32, detail: String },
    #[error("Could not extract page content. The page may be empty or restricted.")]
    EmptyContent,
    #[error("Please save your API key first.")]
    MissingCredential,
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

impl SummarizeError {
    /// Stable tag for logs and machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            SummarizeError::NoActiveTab => "no-active-tab",
            SummarizeError::RestrictedPage(_) => "restricted-page",
            SummarizeError::ExtractionFailed { .. } => "extraction-failed",
            SummarizeError::EmptyContent => "empty-content",
            SummarizeError::MissingCredential => "missing-credential",
            SummarizeError::Agent(err) => err.kind(),
            SummarizeError::Preferences(_) => "preferences",
        }
    }
}

/// Somewhere page content can be read from.
///
/// `reinject` prepares the source for a second attempt after `extract` failed.
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    type Error: std::fmt::Display;

    async fn extract(&mut self) -> Result<ExtractedPage, Self::Error>;

    async fn reinject(&mut self) -> Result<(), Self::Error>;
}

/// Fetches a web page over HTTP.
pub struct HttpSource {
    url: Url,
    client: Client,
}

impl HttpSource {
    pub fn new(url: Url) -> Result<Self, ScraperError> {
        Ok(Self {
            url,
            client: scraper::create_client()?,
        })
    }
}

impl ContentSource for HttpSource {
    type Error = ScraperError;

    async fn extract(&mut self) -> Result<ExtractedPage, ScraperError> {
        scraper::fetch_content(&self.client, &self.url).await
    }

    async fn reinject(&mut self) -> Result<(), ScraperError> {
        // Fresh connection pool for the second attempt.
        self.client = scraper::create_client()?;
        Ok(())
    }
}

/// Run the two-attempt extraction policy against a source
pub async fn extract_with_reinjection<C: ContentSource>(
    source: &mut C,
) -> Result<ExtractedPage, SummarizeError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let failure = match source.extract().await {
            Ok(page) => return Ok(page),
            Err(err) => err.to_string(),
        };
        warn!(attempt = attempts, error = %failure, "content extraction failed");

        if attempts >= MAX_EXTRACTION_ATTEMPTS {
            return Err(SummarizeError::ExtractionFailed {
                attempts,
                detail: failure,
            });
        }
        if let Err(err) = source.reinject().await {
            return Err(SummarizeError::ExtractionFailed {
                attempts,
                detail: format!("re-injection failed: {err}"),
            });
        }
    }
}

/// Ties extraction, prompting, the model request and parsing together.
///
/// Holds configuration and the preference store, never per-request state.
pub struct Summarizer<S> {
    config: Config,
    client: SummaryClient,
    prompts: PromptBuilder,
    store: S,
}

impl<S: PreferenceStore> Summarizer<S> {
    pub fn new(config: Config, store: S) -> Result<Self, AgentError> {
        let client = SummaryClient::new(config.agent.clone())?;
        let prompts = PromptBuilder::new(config.agent.persona.clone());
        Ok(Self {
            config,
            client,
            prompts,
            store,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configured key first, stored key second
    pub fn credential(&self) -> Result<Option<ApiKey>, PreferenceError> {
        if let Some(key) = self.config.api_key().and_then(ApiKey::new) {
            return Ok(Some(key));
        }
        preferences::api_key(&self.store)
    }

    pub fn length(&self) -> Result<LengthPreference, PreferenceError> {
        preferences::summary_length(&self.store)
    }

    pub fn set_length(&self, length: LengthPreference) -> Result<(), PreferenceError> {
        preferences::set_summary_length(&self.store, length)
    }

    /// Fetch a page and summarise it.
    ///
    /// The credential is resolved before the page is touched.
    pub async fn summarize_url(
        &self,
        input: &str,
        length: Option<LengthPreference>,
    ) -> Result<Summary, SummarizeError> {
        let key = self.require_credential()?;
        let page = self.extract(input).await?;
        check_page(&page)?;
        self.request(&page, length, &key).await
    }

    /// Resolve a URL and read its content without summarising
    pub async fn extract(&self, input: &str) -> Result<ExtractedPage, SummarizeError> {
        let url = scraper::resolve_target(input).map_err(|err| match err {
            ScraperError::NoTarget => SummarizeError::NoActiveTab,
            ScraperError::Restricted(target) => SummarizeError::RestrictedPage(target),
            _ => SummarizeError::RestrictedPage(input.trim().to_string()),
        })?;

        let mut source = HttpSource::new(url).map_err(|err| SummarizeError::ExtractionFailed {
            attempts: 1,
            detail: err.to_string(),
        })?;
        extract_with_reinjection(&mut source).await
    }

    /// Summarise an already extracted page
    pub async fn summarize_page(
        &self,
        page: &ExtractedPage,
        length: Option<LengthPreference>,
    ) -> Result<Summary, SummarizeError> {
        check_page(page)?;
        let key = self.require_credential()?;
        self.request(page, length, &key).await
    }

    fn require_credential(&self) -> Result<ApiKey, SummarizeError> {
        self.credential()?.ok_or(SummarizeError::MissingCredential)
    }

    async fn request(
        &self,
        page: &ExtractedPage,
        length: Option<LengthPreference>,
        key: &ApiKey,
    ) -> Result<Summary, SummarizeError> {
        let length = match length {
            Some(length) => length,
            None => self.length()?,
        };

        let prompt = self.prompts.build(page, length);
        info!(
            url = %page.url,
            chars = page.text.chars().count(),
            truncated = page.is_truncated(),
            %length,
            "summarising page"
        );

        let raw = self.client.request_summary(&prompt, key).await?;
        Ok(Summary::parse(&raw))
    }
}

/// A page is summarisable when it was read and has text
fn check_page(page: &ExtractedPage) -> Result<(), SummarizeError> {
    if let Some(error) = &page.error {
        return Err(SummarizeError::ExtractionFailed {
            attempts: 1,
            detail: error.clone(),
        });
    }
    if page.text.trim().is_empty() {
        return Err(SummarizeError::EmptyContent);
    }
    Ok(())
}
