//! Summary struct and the parser that reads it out of a model reply.
//!
//! The model is asked for three plain-text sections. Replies are produced by
//! a text generator, so the parser accepts casing changes, markdown
//! decoration around the markers and missing sections, and never fails.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const KEY_POINTS_MARKER: &str = "KEY POINTS:";
pub const ACTION_ITEMS_MARKER: &str = "ACTION ITEMS:";
pub const TAKEAWAY_MARKER: &str = "MAIN TAKEAWAY:";

/// Takeaway used when the reply carried none of the sections
pub const FALLBACK_TAKEAWAY: &str = "See key points above for the full summary.";

/// Structured summary shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Main takeaways from the content
    pub key_points: Vec<String>,
    /// Actionable items or next steps identified in the content
    pub action_items: Vec<String>,
    /// The single most important insight
    pub takeaway: String,
}

impl Summary {
    /// Create a new summary
    pub fn new(key_points: Vec<String>, action_items: Vec<String>, takeaway: String) -> Self {
        Self {
            key_points,
            action_items,
            takeaway,
        }
    }

    /// Check if the summary has any content
    pub fn is_empty(&self) -> bool {
        self.key_points.is_empty() && self.action_items.is_empty() && self.takeaway.is_empty()
    }

    /// Parse a raw model reply.
    ///
    /// Sections run from their marker to the next marker or the end of the
    /// reply. When no section yields content, every non-blank line becomes a
    /// key point and the takeaway is [`FALLBACK_TAKEAWAY`].
    pub fn parse(raw: &str) -> Self {
        let spans = Spans::scan(raw);

        let key_points = spans.key_points.as_deref().map(bullets).unwrap_or_default();
        let action_items = spans.action_items.as_deref().map(bullets).unwrap_or_default();
        let takeaway = spans
            .takeaway
            .as_deref()
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        let summary = Self::new(key_points, action_items, takeaway);
        if !summary.is_empty() {
            return summary;
        }

        debug!(reply_len = raw.len(), "no summary sections recognised, using fallback");
        Self::new(bullets(raw), Vec::new(), FALLBACK_TAKEAWAY.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    KeyPoints,
    ActionItems,
    Takeaway,
}

impl Section {
    const ALL: [Section; 3] = [Section::KeyPoints, Section::ActionItems, Section::Takeaway];

    fn marker(self) -> &'static str {
        match self {
            Section::KeyPoints => KEY_POINTS_MARKER,
            Section::ActionItems => ACTION_ITEMS_MARKER,
            Section::Takeaway => TAKEAWAY_MARKER,
        }
    }
}

/// Raw text of each section, `None` when its marker never appeared.
#[derive(Debug, Default)]
struct Spans {
    key_points: Option<String>,
    action_items: Option<String>,
    takeaway: Option<String>,
}

impl Spans {
    fn scan(raw: &str) -> Self {
        let mut spans = Spans::default();
        let mut current: Option<Section> = None;

        for line in raw.lines() {
            let mut segment = line;
            if let Some((section, rest)) = marker_line(line) {
                spans.slot(section).get_or_insert_with(String::new);
                current = Some(section);
                segment = rest;
            }
            if let Some(active) = current {
                spans.push_line(active, segment);
            }
        }

        spans
    }

    fn slot(&mut self, section: Section) -> &mut Option<String> {
        match section {
            Section::KeyPoints => &mut self.key_points,
            Section::ActionItems => &mut self.action_items,
            Section::Takeaway => &mut self.takeaway,
        }
    }

    fn push_line(&mut self, section: Section, segment: &str) {
        if is_decoration(segment) {
            return;
        }
        let text = self.slot(section).get_or_insert_with(String::new);
        text.push_str(segment);
        text.push('\n');
    }
}

/// The section a line opens and the text after its marker.
///
/// A marker counts only as the first text on its line once leading
/// whitespace and markdown decoration are skipped, matched ASCII
/// case-insensitively.
fn marker_line(line: &str) -> Option<(Section, &str)> {
    let body = line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '#' | '_'));
    let decorated = body.len() < line.trim_start().len();

    Section::ALL.into_iter().find_map(|section| {
        let marker = section.marker();
        let head = body.get(..marker.len())?;
        if !head.eq_ignore_ascii_case(marker) {
            return None;
        }
        let rest = &body[marker.len()..];
        // Closing emphasis of `**KEY POINTS:**`
        let rest = if decorated {
            rest.trim_start_matches(&['*', '_'][..])
        } else {
            rest
        };
        Some((section, rest))
    })
}

/// Markdown emphasis or heading characters left over around a marker.
fn is_decoration(segment: &str) -> bool {
    let trimmed = segment.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '*' | '#' | '_'))
}

fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed.strip_prefix(&['-', '*'][..]).unwrap_or(trimmed).trim()
}

fn bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
