// src/services/extractor.rs

//! Item extraction from page markup.
//!
//! Turns raw HTML into an ordered list of candidate items using the
//! configured CSS selectors. When the item selector is absent or matches
//! nothing, the whole page degrades to a single item so that any change to
//! the page text is still detected.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, ParsedItem};
use crate::utils::{normalize_whitespace, resolve_url, sha256_hex};

/// Title used when an item element yields no extractable title text.
const NO_TITLE: &str = "(no title)";

/// Title used for the single whole-page item.
const PAGE_TITLE: &str = "Page Update";

/// Extracts candidate items from page markup.
///
/// Selectors and the base URL are parsed once at construction; `extract`
/// itself is pure and performs no I/O.
pub struct ItemExtractor {
    base_url: Url,
    item_selector: Option<Selector>,
    title_selector: Option<Selector>,
    link_selector: Option<Selector>,
    content_selector: Option<Selector>,
    anchor_selector: Selector,
}

impl ItemExtractor {
    /// Build an extractor from the configured selectors and target URL.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&config.target_url)?,
            item_selector: parse_optional(config.item_selector.as_deref())?,
            title_selector: parse_optional(config.title_selector.as_deref())?,
            link_selector: parse_optional(config.link_selector.as_deref())?,
            content_selector: parse_optional(config.content_selector.as_deref())?,
            anchor_selector: parse_selector("a")?,
        })
    }

    /// Extract candidate items from raw markup, in document order.
    ///
    /// Identical markup always yields identical items and identity hashes.
    pub fn extract(&self, markup: &str) -> Vec<ParsedItem> {
        let document = Html::parse_document(markup);

        let elements: Vec<ElementRef> = match &self.item_selector {
            Some(selector) => document.select(selector).collect(),
            None => Vec::new(),
        };

        if elements.is_empty() {
            return vec![self.whole_page_item(&document)];
        }

        elements
            .into_iter()
            .map(|element| self.parse_item(element))
            .collect()
    }

    /// Whole-page fallback: the page text as a single item.
    ///
    /// The item carries no link. Every snapshot of the page would share the
    /// target URL, so a link identity could never distinguish old text from
    /// new; the hash of the page text is the identity instead.
    fn whole_page_item(&self, document: &Html) -> ParsedItem {
        let text = collect_text(&document.root_element());
        let identity_hash = sha256_hex(&text);

        ParsedItem {
            title: PAGE_TITLE.to_string(),
            link: None,
            content: text,
            identity_hash,
        }
    }

    fn parse_item(&self, element: ElementRef) -> ParsedItem {
        let own_text = collect_text(&element);

        let mut title = self.select_text(&element, self.title_selector.as_ref(), &own_text);
        if title.is_empty() {
            title = NO_TITLE.to_string();
        }

        let content = self.select_text(&element, self.content_selector.as_ref(), &own_text);

        let link = self
            .select_href(&element)
            .map(|href| resolve_url(&self.base_url, &href));

        let identity_hash = sha256_hex(&format!(
            "{}|{}|{}",
            title,
            link.as_deref().unwrap_or(""),
            content
        ));

        ParsedItem {
            title,
            link,
            content,
            identity_hash,
        }
    }

    /// Text of the first match within the element, else the element's own text.
    fn select_text(
        &self,
        element: &ElementRef,
        selector: Option<&Selector>,
        own_text: &str,
    ) -> String {
        selector
            .and_then(|sel| element.select(sel).next())
            .map(|found| collect_text(&found))
            .unwrap_or_else(|| own_text.to_string())
    }

    /// The raw href of the configured link selector's first match, else the
    /// first anchor descendant, else none.
    fn select_href(&self, element: &ElementRef) -> Option<String> {
        if let Some(selector) = &self.link_selector {
            if let Some(href) = element
                .select(selector)
                .next()
                .and_then(|found| found.value().attr("href"))
            {
                return Some(href.to_string());
            }
        }

        element
            .select(&self.anchor_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .map(str::to_string)
    }
}

/// Collected, whitespace-normalized text of an element subtree.
fn collect_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_optional(s: Option<&str>) -> Result<Option<Selector>> {
    s.map(parse_selector).transpose()
}
