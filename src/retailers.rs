//! Retailer presets and config resolution
//!
//! Each supported retailer renders its listings differently. A preset bundles
//! the selectors and page numbering that work for one retailer; a configured
//! retailer starts from a preset and may override any part of it.

use crate::catalog::{CategorySource, PageNumbering, SelectorSet};
use crate::config::{PagingConfig, PagingStyle, RetailerConfig, SelectorOverrides};
use crate::url::{derive_category_label, parse_listing_url};
use crate::{ConfigError, UrlError};
use std::time::Duration;
use url::Url;

/// Names of the built-in presets
pub const PRESET_NAMES: [&str; 5] = ["aldi", "asda", "morrisons", "sainsburys", "tesco"];

/// Selector and paging defaults for one retailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetailerPreset {
    pub selectors: SelectorSet,
    pub numbering: PageNumbering,
}

/// A configured retailer, resolved and ready to crawl
#[derive(Debug, Clone)]
pub struct RetailerPlan {
    pub name: String,
    pub selectors: SelectorSet,
    pub numbering: PageNumbering,
    pub categories: Vec<CategorySource>,
    pub probe_url: Option<Url>,
    pub timeout: Duration,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Looks up a built-in preset by name (case-insensitive)
pub fn preset(name: &str) -> Option<RetailerPreset> {
    let preset = match name.to_lowercase().as_str() {
        "aldi" => RetailerPreset {
            selectors: SelectorSet {
                item: strings(&["a.product-tile__link"]),
                name: strings(&["div.product-tile__name p"]),
                brand: strings(&["div.product-tile__brandname p"]),
                price: strings(&["span.base-price__regular"]),
                wait_for: strings(&["a.product-tile__link"]),
                ..Default::default()
            },
            numbering: PageNumbering::query("page"),
        },
        "asda" => RetailerPreset {
            selectors: SelectorSet {
                item: strings(&["div.product-module", ".product-item", ".product-card"]),
                name: strings(&[
                    "a[data-locator='txt-product-name']",
                    "[data-testid='product-name'] a",
                    "h3 a",
                    ".product-name a",
                    ".product-title a",
                    "a[href*='/product/']",
                    ".product-link",
                ]),
                price: strings(&[
                    "p[data-locator='txt-product-price']",
                    "[data-testid='product-price']",
                    ".product-price",
                    ".price",
                    ".price-current",
                    ".co-product__price",
                    "[class*='price']",
                ]),
                price_pattern: Some(r"£\s?[\d.,]+".to_string()),
                wait_for: strings(&["div.product-module"]),
                next_disabled: strings(&[
                    "button[data-testid='btn-pagination-next'][disabled]",
                    "button[data-testid='btn-pagination-next'].disabled",
                ]),
                next_enabled: strings(&["button[data-testid='btn-pagination-next']"]),
                ..Default::default()
            },
            numbering: PageNumbering::query("page"),
        },
        "morrisons" => RetailerPreset {
            selectors: SelectorSet {
                item: strings(&["div[data-test^='fop-wrapper']"]),
                name: strings(&["h3[data-test='fop-title']"]),
                price: strings(&["span[data-test='fop-price']"]),
                ..Default::default()
            },
            numbering: PageNumbering::query("page"),
        },
        "sainsburys" => RetailerPreset {
            selectors: SelectorSet {
                item: strings(&[".pt__content"]),
                name: strings(&[".pt__info a"]),
                price: strings(&[".pt__cost__retail-price"]),
                secondary_price: strings(&[".pt__cost--price"]),
                price_pattern: Some(r"£[\d.]+".to_string()),
                wait_for: strings(&[".pt__content"]),
                next_disabled: strings(&[
                    "button[rel='next'].ln-c-pagination__link.is-disabled",
                    "button[rel='next'][disabled]",
                    "button[rel='next'][aria-disabled='true']",
                    ".ln-c-pagination__link[rel='next'].is-disabled",
                    ".ln-c-pagination__link[rel='next'][aria-disabled='true']",
                ]),
                next_enabled: strings(&[
                    "button[rel='next']:not(.is-disabled):not([disabled]):not([aria-disabled='true'])",
                    ".ln-c-pagination__link[rel='next']:not(.is-disabled):not([disabled]):not([aria-disabled='true'])",
                ]),
                ..Default::default()
            },
            numbering: PageNumbering::path("/opt/page:{page}"),
        },
        "tesco" => RetailerPreset {
            selectors: SelectorSet {
                item: strings(&["div[class*='verticalTile']"]),
                name: strings(&["a[class*='titleLink']"]),
                price: strings(&["p[class*='priceText']"]),
                next_enabled: strings(&[
                    "[data-testid='next']",
                    "a[aria-label*='Next']",
                    ".pagination-next",
                ]),
                ..Default::default()
            },
            numbering: PageNumbering::query("page"),
        },
        _ => return None,
    };
    Some(preset)
}

/// Applies selector overrides on top of a base selector set
pub fn apply_overrides(mut base: SelectorSet, overrides: &SelectorOverrides) -> SelectorSet {
    let lists: [(&mut Vec<String>, &Option<Vec<String>>); 8] = [
        (&mut base.item, &overrides.item),
        (&mut base.name, &overrides.name),
        (&mut base.brand, &overrides.brand),
        (&mut base.price, &overrides.price),
        (&mut base.secondary_price, &overrides.secondary_price),
        (&mut base.wait_for, &overrides.wait_for),
        (&mut base.next_enabled, &overrides.next_enabled),
        (&mut base.next_disabled, &overrides.next_disabled),
    ];
    for (target, replacement) in lists {
        if let Some(replacement) = replacement {
            *target = replacement.clone();
        }
    }

    if let Some(pattern) = &overrides.price_pattern {
        base.price_pattern = if pattern.is_empty() {
            None
        } else {
            Some(pattern.clone())
        };
    }

    base
}

/// Builds page numbering from a paging override
fn numbering_from_config(
    retailer: &str,
    paging: &PagingConfig,
    preset: Option<&PageNumbering>,
) -> Result<PageNumbering, ConfigError> {
    let numbering = match paging.style {
        PagingStyle::Query => {
            let inherited = match preset {
                Some(PageNumbering::Query { param, .. }) => Some(param.clone()),
                _ => None,
            };
            PageNumbering::Query {
                param: paging
                    .param
                    .clone()
                    .or(inherited)
                    .unwrap_or_else(|| "page".to_string()),
                first_page_bare: paging.first_page_bare.unwrap_or(false),
            }
        }
        PagingStyle::Path => {
            let inherited = match preset {
                Some(PageNumbering::Path { template, .. }) => Some(template.clone()),
                _ => None,
            };
            let template = paging.template.clone().or(inherited).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "retailer '{}': path paging needs a template",
                    retailer
                ))
            })?;
            PageNumbering::Path {
                template,
                first_page_bare: paging.first_page_bare.unwrap_or(true),
            }
        }
    };
    numbering.validate()?;
    Ok(numbering)
}

fn url_error(retailer: &str, raw: &str, err: UrlError) -> ConfigError {
    ConfigError::InvalidUrl(format!("retailer '{}': '{}': {}", retailer, raw, err))
}

/// Resolves a configured retailer into a crawl plan
///
/// # Arguments
///
/// * `config` - The retailer entry from the configuration
/// * `https_only` - Whether category and probe URLs must use https
///
/// # Returns
///
/// * `Ok(RetailerPlan)` - Selectors, numbering, and category sources to crawl
/// * `Err(ConfigError)` - Unknown preset, missing selectors, or a bad URL
pub fn resolve_retailer(
    config: &RetailerConfig,
    https_only: bool,
) -> Result<RetailerPlan, ConfigError> {
    let name = config.name.trim();

    let preset = match &config.preset {
        Some(preset_name) => Some(preset(preset_name).ok_or_else(|| {
            ConfigError::Validation(format!(
                "retailer '{}': unknown preset '{}' (known: {})",
                name,
                preset_name,
                PRESET_NAMES.join(", ")
            ))
        })?),
        None => None,
    };

    let base = preset
        .as_ref()
        .map(|p| p.selectors.clone())
        .unwrap_or_default();
    let selectors = match &config.selectors {
        Some(overrides) => apply_overrides(base, overrides),
        None => base,
    };

    for (field, list) in [
        ("item", &selectors.item),
        ("name", &selectors.name),
        ("price", &selectors.price),
    ] {
        if list.is_empty() {
            return Err(ConfigError::Validation(format!(
                "retailer '{}': no {} selectors (set a preset or selectors.{})",
                name, field, field
            )));
        }
    }

    let numbering = match (&config.paging, &preset) {
        (Some(paging), preset) => {
            numbering_from_config(name, paging, preset.as_ref().map(|p| &p.numbering))?
        }
        (None, Some(preset)) => preset.numbering.clone(),
        (None, None) => PageNumbering::query("page"),
    };

    let probe_url = match &config.probe_url {
        Some(raw) => {
            Some(parse_listing_url(raw, https_only).map_err(|e| url_error(name, raw, e))?)
        }
        None => None,
    };

    let mut categories = Vec::with_capacity(config.categories.len());
    for category in &config.categories {
        let locator = parse_listing_url(&category.url, https_only)
            .map_err(|e| url_error(name, &category.url, e))?;
        let label = match category.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => derive_category_label(&locator),
        };
        let source = CategorySource::new(name, &label, locator, numbering.clone());
        source.validate()?;
        categories.push(source);
    }

    Ok(RetailerPlan {
        name: name.to_string(),
        selectors,
        numbering,
        categories,
        probe_url,
        timeout: Duration::from_secs(config.timeout_minutes.saturating_mul(60)),
    })
}
