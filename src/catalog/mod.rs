//! Catalog data model
//!
//! Types describing what gets crawled (category sources and their page
//! numbering), what comes out of a page (raw item records), and how items
//! are told apart (identities).

mod record;
mod selectors;
mod source;

pub use record::{normalize_text, IdentityPolicy, ItemIdentity, RawItemRecord};
pub use selectors::SelectorSet;
pub use source::{CategorySource, PageNumbering};
