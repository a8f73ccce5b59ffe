use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Maximum length of the extracted text excerpt
const EXCERPT_MAX_CHARS: usize = 500;

/// Maximum length of the text kept per summarized element
const ELEMENT_TEXT_MAX_CHARS: usize = 120;

/// A console log entry captured from the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Log level (log, info, warn, error)
    pub level: String,

    /// The message text
    pub message: String,

    /// ISO-8601 timestamp recorded when the message was logged
    pub timestamp: String,
}

/// A network request that completed with a failure status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRequest {
    /// HTTP method
    pub method: String,

    /// Request URL
    pub url: String,

    /// Response status code
    pub status: u16,
}

/// Summary of one element matched by a snapshot selector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSummary {
    /// Tag name
    pub tag: String,

    /// Class list
    pub classes: Vec<String>,

    /// Truncated text content
    pub text: String,
}

/// An immutable point-in-time capture of page state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// URL at capture time
    pub url: String,

    /// Page title, if any
    pub title: Option<String>,

    /// When the snapshot was captured
    pub captured_at: DateTime<Utc>,

    /// Excerpt of the visible text content
    pub text_excerpt: String,

    /// Elements matched by the configured snapshot selectors
    pub elements: Vec<ElementSummary>,

    /// Console entries drained from the page
    pub console: Vec<ConsoleEntry>,

    /// Requests that completed with a failure status
    pub failed_requests: Vec<FailedRequest>,
}

impl Snapshot {
    /// Build a snapshot from a page source dump plus drained console and
    /// network state
    pub fn from_page_source(
        url: &str,
        title: Option<String>,
        html: &str,
        element_selectors: &[String],
        console: Vec<ConsoleEntry>,
        failed_requests: Vec<FailedRequest>,
    ) -> Self {
        Self {
            url: url.to_string(),
            title,
            captured_at: Utc::now(),
            text_excerpt: text_excerpt(html, EXCERPT_MAX_CHARS),
            elements: summarize_elements(html, element_selectors),
            console,
            failed_requests,
        }
    }

    /// Console entries at warn level or above
    pub fn console_problems(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.console
            .iter()
            .filter(|e| e.level == "warn" || e.level == "error")
    }
}

/// Extracts a whitespace-normalized excerpt of the page's body text
pub fn text_excerpt(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);

    let text = match Selector::parse("body") {
        Ok(selector) => doc
            .select(&selector)
            .flat_map(|n| n.text())
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
        Err(_) => String::new(),
    };

    truncate_chars(&text, max_chars)
}

/// Summarizes elements matched by each selector (tag, classes, text)
pub fn summarize_elements(html: &str, selectors: &[String]) -> Vec<ElementSummary> {
    let doc = Html::parse_document(html);
    let mut summaries = Vec::new();

    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            ::log::warn!("Skipping invalid snapshot selector: {}", raw);
            continue;
        };

        for element in doc.select(&selector) {
            let value = element.value();
            let text = element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            summaries.push(ElementSummary {
                tag: value.name().to_string(),
                classes: value.classes().map(|c| c.to_string()).collect(),
                text: truncate_chars(&text, ELEMENT_TEXT_MAX_CHARS),
            });
        }
    }

    summaries
}

/// Checks whether the client-rendering mount point exists and is empty.
///
/// Returns `None` when no element matches the selector, `Some(true)` when
/// the mount exists but has no rendered children or text.
pub fn root_mount_is_empty(html: &str, selector: &str) -> Option<bool> {
    let doc = Html::parse_document(html);
    let parsed = Selector::parse(selector).ok()?;

    let mount = doc.select(&parsed).next()?;
    let has_children = mount.children().any(|c| c.value().is_element());
    let has_text = mount.text().any(|t| !t.trim().is_empty());
    Some(!has_children && !has_text)
}

/// Truncate a string to at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
