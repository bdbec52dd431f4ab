use crate::{ConfigError, UrlError};
use url::Url;

/// Placeholder substituted with the page number in path templates
const PAGE_PLACEHOLDER: &str = "{page}";

/// How a retailer numbers the pages of a category listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageNumbering {
    /// Page number carried in a query parameter (`?page=3`)
    Query {
        param: String,
        /// Page 1 is requested without the parameter
        first_page_bare: bool,
    },

    /// Page number carried in a path suffix (`/opt/page:3`)
    Path {
        /// Suffix appended to the locator path, containing `{page}`
        template: String,
        /// Page 1 is requested without the suffix
        first_page_bare: bool,
    },
}

impl PageNumbering {
    /// Query parameter numbering with every page, including the first, numbered
    pub fn query(param: &str) -> Self {
        Self::Query {
            param: param.to_string(),
            first_page_bare: false,
        }
    }

    /// Path suffix numbering where page 1 is the bare locator
    pub fn path(template: &str) -> Self {
        Self::Path {
            template: template.to_string(),
            first_page_bare: true,
        }
    }

    /// Returns true if page 1 is the locator unchanged
    pub fn first_page_bare(&self) -> bool {
        match self {
            Self::Query {
                first_page_bare, ..
            }
            | Self::Path {
                first_page_bare, ..
            } => *first_page_bare,
        }
    }

    /// Short name used in logs and the dry-run listing
    pub fn style(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Path { .. } => "path",
        }
    }

    /// Checks that the numbering can produce page URLs
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Query { param, .. } => {
                if param.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "page query parameter cannot be empty".to_string(),
                    ));
                }
            }
            Self::Path { template, .. } => {
                if !template.contains(PAGE_PLACEHOLDER) {
                    return Err(ConfigError::Validation(format!(
                        "page path template '{}' must contain {}",
                        template, PAGE_PLACEHOLDER
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One configured category listing of one retailer
///
/// Created once per configured category and only ever read by the crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySource {
    /// Retailer the category belongs to
    pub retailer: String,

    /// Human-readable category label copied onto every extracted record
    pub label: String,

    /// URL of the first page of the listing
    pub locator: Url,

    /// How later pages are addressed
    pub numbering: PageNumbering,
}

impl CategorySource {
    /// Creates a new category source
    pub fn new(retailer: &str, label: &str, locator: Url, numbering: PageNumbering) -> Self {
        Self {
            retailer: retailer.to_string(),
            label: label.to_string(),
            locator,
            numbering,
        }
    }

    /// Builds the URL of the given 1-based page
    ///
    /// # Arguments
    ///
    /// * `page_index` - The page number, starting at 1
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The page URL
    /// * `Err(UrlError)` - The page index is zero or the locator cannot carry a path
    ///
    /// # Examples
    ///
    /// ```
    /// use aisle_sweep::catalog::{CategorySource, PageNumbering};
    /// use url::Url;
    ///
    /// let source = CategorySource::new(
    ///     "aldi",
    ///     "Bakery",
    ///     Url::parse("https://www.aldi.co.uk/products/bakery/k/1588161416978050").unwrap(),
    ///     PageNumbering::query("page"),
    /// );
    /// assert_eq!(
    ///     source.page_url(2).unwrap().as_str(),
    ///     "https://www.aldi.co.uk/products/bakery/k/1588161416978050?page=2"
    /// );
    /// ```
    pub fn page_url(&self, page_index: u32) -> Result<Url, UrlError> {
        if page_index == 0 {
            return Err(UrlError::Malformed(
                "page numbering starts at 1".to_string(),
            ));
        }

        let mut url = self.locator.clone();
        if page_index == 1 && self.numbering.first_page_bare() {
            return Ok(url);
        }

        match &self.numbering {
            PageNumbering::Query { param, .. } => {
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(key, _)| key != param.as_str())
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();

                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair(param, &page_index.to_string());
            }
            PageNumbering::Path { template, .. } => {
                if url.cannot_be_a_base() {
                    return Err(UrlError::Malformed(format!(
                        "{} cannot carry a page path",
                        url
                    )));
                }
                let suffix = template.replace(PAGE_PLACEHOLDER, &page_index.to_string());
                let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
                url.set_path(&path);
            }
        }

        Ok(url)
    }

    /// Validates the source before a crawl starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "category label cannot be empty ({})",
                self.locator
            )));
        }

        if !matches!(self.locator.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "category URL '{}' must use http or https",
                self.locator
            )));
        }

        self.numbering.validate()
    }
}
