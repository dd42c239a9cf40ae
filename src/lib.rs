//! # PageBrain
//!
//! Structured webpage summaries from the terminal.
//!
//! ## Features
//!
//! - **Fixed reply contract**: the model answers in three plain-text sections
//!   (`KEY POINTS:`, `ACTION ITEMS:`, `MAIN TAKEAWAY:`) that [`Summary::parse`]
//!   reads back without ever failing
//! - **Readable extraction**: main-content detection and text cleanup over fetched HTML
//! - **Persistent preferences**: API key and summary length kept in sled

pub mod agent;
pub mod config;
pub mod pipeline;
pub mod preferences;
pub mod prompt;
pub mod scraper;
pub mod storage;
pub mod summary;
pub mod ui;

pub use agent::{AgentError, ApiKey, SummaryClient};
pub use config::Config;
pub use pipeline::{SummarizeError, Summarizer};
pub use prompt::{build_prompt, LengthPreference, Prompt};
pub use scraper::ExtractedPage;
pub use storage::{MemoryStore, PreferenceStore, Storage};
pub use summary::Summary;
