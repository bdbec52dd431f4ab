//! Item extraction from listing pages

use crate::catalog::{normalize_text, CategorySource, RawItemRecord, SelectorSet};
use crate::crawler::fetcher::{compile_selectors, PageHandle};
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Why one product container could not become a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Missing {field}")]
    MissingField { field: &'static str },

    #[error("Price text '{text}' does not match the price pattern")]
    PriceFormat { text: String },
}

/// Records extracted from one page, in page order
pub type ExtractedItems<'a> =
    Box<dyn Iterator<Item = Result<RawItemRecord, ExtractError>> + Send + 'a>;

/// Turns a fetched page into item records
///
/// An empty iterator is a legitimate result for a page with no items.
pub trait ItemExtractor: Send + Sync {
    fn extract<'a>(&'a self, page: &'a PageHandle, source: &'a CategorySource)
        -> ExtractedItems<'a>;
}

/// Selector-driven extractor for server-rendered listings
#[derive(Debug, Clone)]
pub struct CssItemExtractor {
    item: Vec<Selector>,
    name: Vec<Selector>,
    brand: Vec<Selector>,
    price: Vec<Selector>,
    secondary_price: Vec<Selector>,
    price_pattern: Option<Regex>,
}

impl CssItemExtractor {
    /// Compiles a retailer's selector set
    ///
    /// # Returns
    ///
    /// * `Ok(CssItemExtractor)` - Every selector and the price pattern compiled
    /// * `Err(ConfigError)` - A selector or the price pattern is invalid
    pub fn new(selectors: &SelectorSet) -> Result<Self, ConfigError> {
        let price_pattern = selectors
            .price_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
            })
            .transpose()?;

        Ok(Self {
            item: compile_selectors("item", &selectors.item)?,
            name: compile_selectors("name", &selectors.name)?,
            brand: compile_selectors("brand", &selectors.brand)?,
            price: compile_selectors("price", &selectors.price)?,
            secondary_price: compile_selectors("secondary-price", &selectors.secondary_price)?,
            price_pattern,
        })
    }

    /// Extracts every product container on the page
    ///
    /// The document is parsed and dropped here so nothing borrowed from it
    /// outlives the call.
    fn extract_all(
        &self,
        body: &str,
        source: &CategorySource,
    ) -> Vec<Result<RawItemRecord, ExtractError>> {
        let document = Html::parse_document(body);

        let containers: Vec<ElementRef> = self
            .item
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        containers
            .into_iter()
            .map(|container| self.extract_item(container, source))
            .collect()
    }

    fn extract_item(
        &self,
        container: ElementRef,
        source: &CategorySource,
    ) -> Result<RawItemRecord, ExtractError> {
        let name = first_text(container, &self.name)
            .ok_or(ExtractError::MissingField { field: "name" })?;
        let name = match first_text(container, &self.brand) {
            Some(brand) if !name.starts_with(&brand) => format!("{} {}", brand, name),
            _ => name,
        };

        let price_text = first_text(container, &self.price)
            .ok_or(ExtractError::MissingField { field: "price" })?;
        let price = self
            .apply_pattern(&price_text)
            .ok_or(ExtractError::PriceFormat { text: price_text })?;

        let secondary_price = first_text(container, &self.secondary_price)
            .and_then(|text| self.apply_pattern(&text));

        Ok(RawItemRecord {
            retailer: source.retailer.clone(),
            category: source.label.clone(),
            name,
            price,
            secondary_price,
        })
    }

    fn apply_pattern(&self, text: &str) -> Option<String> {
        match &self.price_pattern {
            Some(pattern) => pattern.find(text).map(|m| m.as_str().to_string()),
            None => Some(text.to_string()),
        }
    }
}

impl ItemExtractor for CssItemExtractor {
    fn extract<'a>(
        &'a self,
        page: &'a PageHandle,
        source: &'a CategorySource,
    ) -> ExtractedItems<'a> {
        Box::new(self.extract_all(&page.body, source).into_iter())
    }
}

/// First non-empty text produced by a selector chain
fn first_text(container: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        container
            .select(selector)
            .map(|element| normalize_text(&element.text().collect::<Vec<_>>().join(" ")))
            .find(|text| !text.is_empty())
    })
}
