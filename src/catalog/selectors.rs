/// CSS selectors and patterns describing one retailer's listing markup
///
/// Every field list is a fallback chain: the first selector that produces a
/// non-empty result wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet {
    /// Product container selectors
    pub item: Vec<String>,

    /// Product name selectors, relative to the container
    pub name: Vec<String>,

    /// Brand selectors; a found brand is prefixed to the name
    pub brand: Vec<String>,

    /// Price selectors, relative to the container
    pub price: Vec<String>,

    /// Loyalty or promotional price selectors
    pub secondary_price: Vec<String>,

    /// Regex applied to price text; the first match becomes the price
    pub price_pattern: Option<String>,

    /// A page with none of these present has no listing content
    pub wait_for: Vec<String>,

    /// Any match means another page follows
    pub next_enabled: Vec<String>,

    /// Any match means this is the last page
    pub next_disabled: Vec<String>,
}

impl SelectorSet {
    /// Returns true if the markup can tell when the listing ends
    pub fn has_end_marker(&self) -> bool {
        !self.next_enabled.is_empty() || !self.next_disabled.is_empty()
    }
}
