//! Session page extraction
//!
//! Turns a rendered session page into a `Session`:
//! - Scalar fields take the trimmed text of the first element matching their selector
//! - Speakers collect every match in document order, duplicates included
//! - A selector that matches nothing leaves its field empty
//!
//! Extraction only fails when there is no document to parse at all.

use crate::catalog::Session;
use crate::config::SelectorConfig;
use crate::{CatalogError, ConfigError};
use scraper::{ElementRef, Html, Selector};

/// Compiled field selectors for session pages
#[derive(Debug, Clone)]
pub struct SessionExtractor {
    title: Selector,
    description: Selector,
    date: Selector,
    time: Selector,
    location: Selector,
    duration: Selector,
    speakers: Selector,
}

impl SessionExtractor {
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: compile("title", &config.title)?,
            description: compile("description", &config.description)?,
            date: compile("date", &config.date)?,
            time: compile("time", &config.time)?,
            location: compile("location", &config.location)?,
            duration: compile("duration", &config.duration)?,
            speakers: compile("speakers", &config.speakers)?,
        })
    }

    /// Extracts a session from page markup
    ///
    /// # Arguments
    ///
    /// * `id` - The session identifier the page was fetched for
    /// * `url` - The URL the markup came from
    /// * `html` - The rendered page markup
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - Best-effort record; unmatched fields are empty
    /// * `Err(CatalogError::Parse)` - The markup is empty
    ///
    /// # Example
    ///
    /// ```
    /// use session_catalog::config::SelectorConfig;
    /// use session_catalog::crawler::SessionExtractor;
    ///
    /// let extractor = SessionExtractor::new(&SelectorConfig::default()).unwrap();
    /// let html = r#"<html><body><h1 class="session-title"> Go at Scale </h1></body></html>"#;
    /// let session = extractor
    ///     .extract("42", "https://example.com/42", html)
    ///     .unwrap();
    /// assert_eq!(session.title, "Go at Scale");
    /// assert!(session.description.is_empty());
    /// ```
    pub fn extract(&self, id: &str, url: &str, html: &str) -> Result<Session, CatalogError> {
        // html5ever recovers from any malformed input, so the only markup
        // that yields no document is no markup.
        if html.trim().is_empty() {
            return Err(CatalogError::Parse {
                url: url.to_string(),
                message: "empty document".to_string(),
            });
        }

        let document = Html::parse_document(html);

        let mut session = Session::new(id, url);
        session.title = first_text(&document, &self.title);
        session.description = first_text(&document, &self.description);
        session.date = first_text(&document, &self.date);
        session.time = first_text(&document, &self.time);
        session.location = first_text(&document, &self.location);
        session.duration = first_text(&document, &self.duration);
        session.speakers = document
            .select(&self.speakers)
            .map(element_text)
            .filter(|name| !name.is_empty())
            .collect();

        Ok(session)
    }
}

fn compile(name: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, selector, e))
    })
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
