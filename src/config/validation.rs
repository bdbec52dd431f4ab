use crate::config::types::{
    ClientProfileConfig, Config, CrawlerConfig, OutputConfig, RetailerConfig,
};
use crate::crawler::{CssItemExtractor, PageProbes, TerminationPolicy};
use crate::retailers::resolve_retailer;
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_client_profiles(&config.client_profiles)?;
    validate_retailers(&config.retailers, config.crawler.https_only)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    TerminationPolicy::from_config(config).validate()?;

    if config.max_concurrent_categories < 1 || config.max_concurrent_categories > 16 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_categories must be between 1 and 16, got {}",
            config.max_concurrent_categories
        )));
    }

    if config.request_timeout < 1 || config.request_timeout > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be between 1 and 300 seconds, got {}",
            config.request_timeout
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the client profile chain
fn validate_client_profiles(profiles: &[ClientProfileConfig]) -> Result<(), ConfigError> {
    if profiles.is_empty() {
        return Err(ConfigError::Validation(
            "at least one client-profile must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for profile in profiles {
        if profile.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "client-profile name cannot be empty".to_string(),
            ));
        }

        if !names.insert(profile.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "client-profile '{}' is defined more than once",
                profile.name
            )));
        }

        validate_header_value(&profile.name, "user_agent", &profile.user_agent)?;
        if let Some(language) = &profile.accept_language {
            validate_header_value(&profile.name, "accept_language", language)?;
        }
    }

    Ok(())
}

/// Header values must be non-empty visible ASCII
fn validate_header_value(profile: &str, field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "client-profile '{}': {} cannot be empty",
            profile, field
        )));
    }

    if !value.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
        return Err(ConfigError::Validation(format!(
            "client-profile '{}': {} must be printable ASCII",
            profile, field
        )));
    }

    Ok(())
}

/// Validates retailer entries
fn validate_retailers(retailers: &[RetailerConfig], https_only: bool) -> Result<(), ConfigError> {
    if retailers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one retailer must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for retailer in retailers {
        if retailer.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "retailer name cannot be empty".to_string(),
            ));
        }

        if !names.insert(retailer.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' is defined more than once",
                retailer.name
            )));
        }

        if retailer.timeout_minutes < 1 {
            return Err(ConfigError::Validation(format!(
                "retailer '{}': timeout_minutes must be >= 1",
                retailer.name
            )));
        }

        let plan = resolve_retailer(retailer, https_only)?;
        if plan.categories.is_empty() {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' must list at least one category",
                retailer.name
            )));
        }

        CssItemExtractor::new(&plan.selectors)?;
        PageProbes::new(&plan.selectors)?;
    }

    Ok(())
}
