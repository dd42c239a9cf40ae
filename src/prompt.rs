//! Prompt construction for the summarisation request.
//!
//! The system prompt pins the reply to the three-section format that
//! [`Summary::parse`](crate::summary::Summary::parse) reads back. Both sides
//! use the marker constants from [`crate::summary`].

use crate::scraper::ExtractedPage;
use crate::summary::{ACTION_ITEMS_MARKER, KEY_POINTS_MARKER, TAKEAWAY_MARKER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Persona used when no other is configured
pub const DEFAULT_PERSONA: &str = "You are PageBrain, an expert webpage summarizer.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown summary length '{0}' (expected short, medium or detailed)")]
pub struct UnknownLength(pub String);

/// User-selected verbosity tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LengthPreference {
    Short,
    #[default]
    Medium,
    Detailed,
}

impl LengthPreference {
    pub const ALL: [LengthPreference; 3] = [
        LengthPreference::Short,
        LengthPreference::Medium,
        LengthPreference::Detailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LengthPreference::Short => "short",
            LengthPreference::Medium => "medium",
            LengthPreference::Detailed => "detailed",
        }
    }

    /// Bullet-count and sentence-count guidance for this tier
    pub fn instructions(self) -> &'static str {
        match self {
            LengthPreference::Short => {
                "Provide a very concise summary. Key Points: 3 bullet points max. \
                 Action Items: 1-2 items. Main Takeaway: 1-2 sentences."
            }
            LengthPreference::Medium => {
                "Provide a balanced summary. Key Points: 4-6 bullet points. \
                 Action Items: 2-4 items. Main Takeaway: 2-3 sentences."
            }
            LengthPreference::Detailed => {
                "Provide a thorough and detailed summary. Key Points: 6-10 bullet points \
                 covering all major topics. Action Items: 3-6 items. \
                 Main Takeaway: 3-5 sentences with nuance."
            }
        }
    }

    /// The tier after this one, wrapping around
    pub fn next(self) -> Self {
        match self {
            LengthPreference::Short => LengthPreference::Medium,
            LengthPreference::Medium => LengthPreference::Detailed,
            LengthPreference::Detailed => LengthPreference::Short,
        }
    }
}

impl fmt::Display for LengthPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthPreference {
    type Err = UnknownLength;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|length| length.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLength(s.to_string()))
    }
}

/// The two text payloads sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds prompts around a configurable persona line.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn build(&self, page: &ExtractedPage, length: LengthPreference) -> Prompt {
        Prompt {
            system: self.system_prompt(length),
            user: user_message(page),
        }
    }

    fn system_prompt(&self, length: LengthPreference) -> String {
        format!(
            r#"{persona} Analyze the provided webpage content and produce a structured summary.

Your output MUST be in the following exact format with these three sections. Use plain text, not markdown headers:

{key_points}
- Point 1
- Point 2
- Point 3

{action_items}
- Action 1
- Action 2

{takeaway}
Your main takeaway text here.

Rules:
- {instructions}
- Be specific and informative, not vague
- Action items should be practical things the reader can do based on the content
- If the page has no clear action items, suggest relevant next steps (e.g. "Research X further", "Bookmark for reference")
- The main takeaway should capture the single most important insight
- Do not include any other sections or formatting"#,
            persona = self.persona.trim(),
            key_points = KEY_POINTS_MARKER,
            action_items = ACTION_ITEMS_MARKER,
            takeaway = TAKEAWAY_MARKER,
            instructions = length.instructions(),
        )
    }
}

fn user_message(page: &ExtractedPage) -> String {
    format!(
        "Summarize this webpage:\n\nTitle: {}\nURL: {}\n\nContent:\n{}",
        page.title, page.url, page.text
    )
}

/// Build a prompt with the default persona
pub fn build_prompt(page: &ExtractedPage, length: LengthPreference) -> Prompt {
    PromptBuilder::default().build(page, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> ExtractedPage {
        ExtractedPage {
            title: "Rust 2024".to_string(),
            url: "https://blog.example.org/rust-2024".to_string(),
            text: "The edition ships \"gen\" blocks.\nAnd more.".to_string(),
            error: None,
        }
    }

    #[test]
    fn system_prompt_lists_markers_in_order() {
        let prompt = build_prompt(&page(), LengthPreference::Medium);
        let key = prompt.system.find(KEY_POINTS_MARKER).unwrap();
        let actions = prompt.system.find(ACTION_ITEMS_MARKER).unwrap();
        let takeaway = prompt.system.find(TAKEAWAY_MARKER).unwrap();
        assert!(key < actions && actions < takeaway);
        assert!(prompt.system.starts_with(DEFAULT_PERSONA));
    }

    #[test]
    fn each_tier_injects_its_own_instructions() {
        for length in LengthPreference::ALL {
            let prompt = build_prompt(&page(), length);
            assert!(prompt.system.contains(length.instructions()));
            for other in LengthPreference::ALL.into_iter().filter(|l| *l != length) {
                assert!(!prompt.system.contains(other.instructions()));
            }
        }
        assert!(LengthPreference::Short.instructions().contains("3 bullet points max"));
        assert!(LengthPreference::Medium.instructions().contains("4-6 bullet points"));
        assert!(LengthPreference::Detailed.instructions().contains("6-10 bullet points"));
    }

    #[test]
    fn user_message_embeds_page_verbatim() {
        let page = page();
        let prompt = build_prompt(&page, LengthPreference::Short);
        assert!(prompt.user.contains("Title: Rust 2024"));
        assert!(prompt.user.contains("URL: https://blog.example.org/rust-2024"));
        assert!(prompt.user.ends_with(&page.text));
    }

    #[test]
    fn custom_persona_replaces_default() {
        let prompt = PromptBuilder::new("You are a terse analyst.")
            .build(&page(), LengthPreference::Detailed);
        assert!(prompt.system.starts_with("You are a terse analyst. Analyze"));
        assert!(!prompt.system.contains("PageBrain"));
    }

    #[test]
    fn parse_length_is_case_insensitive_and_strict() {
        assert_eq!("Short".parse::<LengthPreference>(), Ok(LengthPreference::Short));
        assert_eq!(" detailed ".parse::<LengthPreference>(), Ok(LengthPreference::Detailed));
        assert_eq!(
            "huge".parse::<LengthPreference>(),
            Err(UnknownLength("huge".to_string()))
        );
        assert!("".parse::<LengthPreference>().is_err());
        assert!("undefined".parse::<LengthPreference>().is_err());
    }

    #[test]
    fn default_is_medium_and_next_cycles() {
        assert_eq!(LengthPreference::default(), LengthPreference::Medium);
        let mut length = LengthPreference::Short;
        for _ in 0..3 {
            length = length.next();
        }
        assert_eq!(length, LengthPreference::Short);
    }
}
