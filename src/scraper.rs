//! Web scraping module for content extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing. Page text is
//! normalised the way a browser renders `innerText` closely enough for
//! summarisation: block elements become line breaks, scripts are dropped,
//! whitespace runs collapse.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// User-Agent string identifying this scraper
const USER_AGENT: &str = concat!("pagebrain/", env!("CARGO_PKG_VERSION"));

/// Default timeout for HTTP requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of characters of page text handed to the model
pub const MAX_TEXT_LENGTH: usize = 50_000;

/// Appended once to text cut at [`MAX_TEXT_LENGTH`]
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

/// A main-content candidate must carry more text than this to be chosen
const MAIN_CONTENT_MIN_CHARS: usize = 200;

const MAIN_SELECTORS: [&str; 7] = [
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".article-content",
    ".entry-content",
    "#content",
];

const SKIPPED_TAGS: [&str; 7] = [
    "script", "style", "noscript", "template", "svg", "iframe", "head",
];

const BLOCK_TAGS: [&str; 27] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "p", "pre", "section", "tr",
];

const WEB_SCHEMES: [&str; 2] = ["http", "https"];

lazy_static! {
    static ref TITLE_SELECTOR: Selector = Selector::parse("title").unwrap();
    static ref H1_SELECTOR: Selector = Selector::parse("h1").unwrap();
    static ref BODY_SELECTOR: Selector = Selector::parse("body").unwrap();
    static ref BLANK_LINE_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref SPACE_RUNS: Regex = Regex::new(r" {2,}").unwrap();
}

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("page returned HTTP {0}")]
    Status(u16),
    #[error("no page to summarise")]
    NoTarget,
    #[error("cannot summarise '{0}': not a web page")]
    Restricted(String),
}

/// Extracted content from a webpage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Page title
    pub title: String,
    /// The page URL
    pub url: String,
    /// Main text content, at most [`MAX_TEXT_LENGTH`] characters plus the truncation marker
    pub text: String,
    /// Set when the page was reached but could not be read
    pub error: Option<String>,
}

impl ExtractedPage {
    /// Build a page from raw text, cleaning and truncating it
    pub fn new(title: impl Into<String>, url: impl Into<String>, text: &str) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            text: truncate_text(clean_text(text)),
            error: None,
        }
    }

    /// A page that was reached but yielded no readable text
    pub fn failed(title: impl Into<String>, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            text: String::new(),
            error: Some(error.into()),
        }
    }

    /// Whether the cap was hit
    pub fn is_truncated(&self) -> bool {
        self.text.ends_with(TRUNCATION_MARKER)
    }
}

/// Resolve user input into a fetchable web URL.
///
/// Bare host names get `https://`. Browser-internal and local schemes are refused.
pub fn resolve_target(input: &str) -> Result<Url, ScraperError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ScraperError::NoTarget);
    }

    let url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{input}")))
        .map_err(|_| ScraperError::Restricted(input.to_string()))?;

    if !WEB_SCHEMES.contains(&url.scheme()) || url.host_str().is_none() {
        return Err(ScraperError::Restricted(input.to_string()));
    }
    Ok(url)
}

/// Create a configured HTTP client for scraping
pub fn create_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Fetch and extract content from a URL
pub async fn fetch_content(client: &Client, url: &Url) -> Result<ExtractedPage, ScraperError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("text/html")
        .to_ascii_lowercase();
    let final_url = response.url().to_string();
    let body = response.text().await?;

    debug!(url = %final_url, bytes = body.len(), %content_type, "fetched page");

    if content_type.starts_with("text/plain") {
        return Ok(ExtractedPage::new(final_url.clone(), final_url, &body));
    }
    if !content_type.contains("html") && !content_type.contains("xml") {
        return Ok(ExtractedPage::failed(
            "Untitled Page",
            final_url,
            format!("unsupported content type: {content_type}"),
        ));
    }

    Ok(extract_page(&body, &final_url))
}

/// Extract title and readable text from an HTML document
pub fn extract_page(html: &str, url: &str) -> ExtractedPage {
    let document = Html::parse_document(html);
    let title = extract_title(&document).unwrap_or_else(|| "Untitled Page".to_string());
    ExtractedPage::new(title, url, &extract_text(&document))
}

/// Extract the page title from <title> or <h1>
fn extract_title(document: &Html) -> Option<String> {
    [&*TITLE_SELECTOR, &*H1_SELECTOR]
        .into_iter()
        .filter_map(|selector| document.select(selector).next())
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .find(|title| !title.is_empty())
}

/// Extract readable text, preferring the main content area
fn extract_text(document: &Html) -> String {
    for selector_str in MAIN_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = clean_text(&visible_text(element));
            if text.chars().count() > MAIN_CONTENT_MIN_CHARS {
                return text;
            }
        }
    }

    // Fall back to the whole body
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());
    visible_text(root)
}

/// Rendered text of an element, with block boundaries as line breaks
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out, false);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String, preformatted: bool) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    let preformatted = preformatted || name == "pre";
    if block {
        out.push('\n');
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out, preformatted);
        } else if let Some(text) = child.value().as_text() {
            if preformatted {
                out.push_str(text);
            } else {
                push_collapsed(out, text);
            }
        }
    }

    if block {
        out.push('\n');
    }
}

fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(&[' ', '\n'][..]) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalise extracted text: trim lines, collapse blank-line and space runs
pub fn clean_text(text: &str) -> String {
    let trimmed_lines = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    let text = BLANK_LINE_RUNS.replace_all(&trimmed_lines, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Cut text to [`MAX_TEXT_LENGTH`] characters and mark the cut
pub fn truncate_text(text: String) -> String {
    match text.char_indices().nth(MAX_TEXT_LENGTH) {
        Some((cut, _)) => {
            let mut truncated = text[..cut].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_PARAGRAPH: &str = "Rust's ownership model lets the compiler reject data races at build time, \
        which means concurrent code that compiles is free of a whole class of bugs. \
        This article walks through borrowing, lifetimes and the Send and Sync traits \
        with examples drawn from real services.";

    #[test]
    fn prefers_article_over_chrome() {
        let html = format!(
            r#"<html><head><title> Ownership  explained </title><style>p {{ color: red }}</style></head>
            <body><nav>Home | Blog | About</nav>
            <article><h1>Ownership</h1><p>{LONG_PARAGRAPH}</p><script>track()</script></article>
            <footer>Copyright</footer></body></html>"#
        );
        let page = extract_page(&html, "https://example.org/ownership");

        assert_eq!(page.title, "Ownership explained");
        assert_eq!(page.url, "https://example.org/ownership");
        assert!(page.text.starts_with("Ownership\n\nRust's ownership model"));
        assert!(!page.text.contains("Home | Blog"));
        assert!(!page.text.contains("track()"));
        assert!(!page.text.contains("Copyright"));
        assert!(page.error.is_none());
    }

    #[test]
    fn short_main_area_falls_back_to_body() {
        let html = r#"<html><body><main><p>Tiny.</p></main><div><p>Sidebar text</p></div></body></html>"#;
        let page = extract_page(html, "https://example.org");
        assert_eq!(page.text, "Tiny.\n\nSidebar text");
        assert_eq!(page.title, "Untitled Page");
    }

    #[test]
    fn title_falls_back_to_first_heading() {
        let page = extract_page("<body><h1>Release notes</h1><p>Body</p></body>", "https://x.dev");
        assert_eq!(page.title, "Release notes");
    }

    #[test]
    fn inline_whitespace_collapses_and_breaks_survive() {
        let page = extract_page(
            "<body><p>one\n   two\t<b>three</b></p><p>four<br>five</p><pre>a  b\n c</pre></body>",
            "https://x.dev",
        );
        assert_eq!(page.text, "one two three\n\nfour\nfive\n\na b\nc");
    }

    #[test]
    fn clean_text_collapses_runs() {
        let cleaned = clean_text("  a    b  \n\n\n\n\nc\n \n \nd  ");
        assert_eq!(cleaned, "a b\n\nc\n\nd");
    }

    #[test]
    fn long_text_is_truncated_once() {
        let text = "x".repeat(MAX_TEXT_LENGTH + 10_000);
        let truncated = truncate_text(text);
        assert_eq!(
            truncated.chars().count(),
            MAX_TEXT_LENGTH + TRUNCATION_MARKER.chars().count()
        );
        assert_eq!(truncated.matches("[Content truncated...]").count(), 1);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn text_at_cap_is_untouched() {
        let text = "é".repeat(MAX_TEXT_LENGTH);
        assert_eq!(truncate_text(text.clone()), text);

        let page = ExtractedPage::new("t", "u", &"é".repeat(MAX_TEXT_LENGTH + 1));
        assert!(page.is_truncated());
        assert_eq!(page.text.matches(TRUNCATION_MARKER).count(), 1);
    }

    #[test]
    fn resolve_target_accepts_web_urls() {
        assert_eq!(
            resolve_target("https://example.org/a").unwrap().as_str(),
            "https://example.org/a"
        );
        assert_eq!(
            resolve_target("  example.org/path ").unwrap().as_str(),
            "https://example.org/path"
        );
        assert!(resolve_target("http://127.0.0.1:8080/").is_ok());
    }

    #[test]
    fn resolve_target_refuses_internal_pages() {
        for input in [
            "chrome://settings",
            "chrome-extension://abc/popup.html",
            "about:blank",
            "file:///etc/passwd",
        ] {
            assert!(
                matches!(resolve_target(input), Err(ScraperError::Restricted(_))),
                "should refuse {input}"
            );
        }
        assert!(matches!(resolve_target("   "), Err(ScraperError::NoTarget)));
    }
}
