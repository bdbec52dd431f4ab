use serde::Deserialize;
use std::fmt;

/// One product as extracted from a listing page
///
/// Field values are kept as the retailer renders them; prices are not parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItemRecord {
    /// Retailer the item was listed by
    pub retailer: String,

    /// Category label of the source the item was found under
    pub category: String,

    /// Display name, including any brand prefix
    pub name: String,

    /// Price text in the retailer's own format (e.g. "£1.25")
    pub price: String,

    /// Loyalty-card or promotional price, when the retailer shows one
    pub secondary_price: Option<String>,
}

impl RawItemRecord {
    /// Creates a record without a secondary price
    pub fn new(retailer: &str, category: &str, name: &str, price: &str) -> Self {
        Self {
            retailer: retailer.to_string(),
            category: category.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            secondary_price: None,
        }
    }

    /// Attaches a secondary price
    pub fn with_secondary_price(mut self, price: &str) -> Self {
        self.secondary_price = Some(price.to_string());
        self
    }
}

/// Which record fields make up an item's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    /// Items with the same name are the same item
    Name,

    /// Items are the same only when both name and price match
    #[default]
    NameAndPrice,
}

impl IdentityPolicy {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::NameAndPrice => "name-and-price",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "name-and-price" => Some(Self::NameAndPrice),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Deduplication key derived from a [`RawItemRecord`]
///
/// Text is whitespace-normalized, so the same product rendered with different
/// spacing on two pages maps to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    name: String,
    price: Option<String>,
}

impl ItemIdentity {
    /// Derives the identity of a record under the given policy
    pub fn of(record: &RawItemRecord, policy: IdentityPolicy) -> Self {
        let price = match policy {
            IdentityPolicy::Name => None,
            IdentityPolicy::NameAndPrice => Some(normalize_text(&record.price)),
        };

        Self {
            name: normalize_text(&record.name),
            price,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_deref()
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.price {
            Some(price) => write!(f, "{}_{}", self.name, price),
            None => f.write_str(&self.name),
        }
    }
}

/// Trims text and collapses internal whitespace runs to single spaces
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Semi  Skimmed\n Milk "), "Semi Skimmed Milk");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("\t\n"), "");
    }

    #[test]
    fn test_identity_ignores_whitespace_differences() {
        let a = RawItemRecord::new("aldi", "Dairy", "Whole  Milk", "£1.25");
        let b = RawItemRecord::new("aldi", "Dairy", " Whole Milk\n", " £1.25 ");
        assert_eq!(
            ItemIdentity::of(&a, IdentityPolicy::NameAndPrice),
            ItemIdentity::of(&b, IdentityPolicy::NameAndPrice)
        );
    }

    #[test]
    fn test_name_policy_ignores_price() {
        let a = RawItemRecord::new("sainsburys", "Bread", "White Loaf", "£1.10");
        let b = RawItemRecord::new("sainsburys", "Bread", "White Loaf", "£0.95");
        assert_eq!(
            ItemIdentity::of(&a, IdentityPolicy::Name),
            ItemIdentity::of(&b, IdentityPolicy::Name)
        );
        assert_ne!(
            ItemIdentity::of(&a, IdentityPolicy::NameAndPrice),
            ItemIdentity::of(&b, IdentityPolicy::NameAndPrice)
        );
    }

    #[test]
    fn test_identity_ignores_category() {
        let a = RawItemRecord::new("asda", "Bakery", "Crumpets", "£0.85");
        let b = RawItemRecord::new("asda", "Breakfast", "Crumpets", "£0.85");
        assert_eq!(
            ItemIdentity::of(&a, IdentityPolicy::NameAndPrice),
            ItemIdentity::of(&b, IdentityPolicy::NameAndPrice)
        );
    }

    #[test]
    fn test_identity_display() {
        let record = RawItemRecord::new("tesco", "Fruit", "Bananas", "£0.90");
        assert_eq!(
            ItemIdentity::of(&record, IdentityPolicy::NameAndPrice).to_string(),
            "Bananas_£0.90"
        );
        assert_eq!(
            ItemIdentity::of(&record, IdentityPolicy::Name).to_string(),
            "Bananas"
        );
    }

    #[test]
    fn test_identity_policy_roundtrip() {
        for policy in [IdentityPolicy::Name, IdentityPolicy::NameAndPrice] {
            assert_eq!(
                IdentityPolicy::from_db_string(policy.to_db_string()),
                Some(policy)
            );
        }
        assert_eq!(IdentityPolicy::from_db_string("sku"), None);
    }
}
