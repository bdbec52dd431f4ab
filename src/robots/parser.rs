//! Robots.txt rule evaluation
//!
//! Allow/disallow matching is delegated to the robotstxt crate; the
//! `Crawl-delay` extension, which that crate ignores, is read here.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt body
    content: String,
    /// True when the host has no usable robots.txt
    allow_all: bool,
}

impl ParsedRobots {
    /// Wraps a fetched robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// A permissive policy, used when robots.txt is missing or unreachable
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns true if the policy places no restrictions
    pub fn is_permissive(&self) -> bool {
        self.allow_all || self.content.trim().is_empty()
    }

    /// Checks if a URL may be fetched by the given agent
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path of the listing page
    /// * `user_agent` - The product token the crawler identifies as
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the `Crawl-delay` in seconds that applies to the given agent
    ///
    /// A group naming the agent takes precedence over the `*` group. Agent
    /// names match case-insensitively as substrings of `user_agent`.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.is_permissive() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut specific: Option<f64> = None;
        let mut wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // A user-agent line after any rule starts a new group
                if !group_open {
                    group.clear();
                    group_open = true;
                }
                if !value.is_empty() {
                    group.push(value.to_lowercase());
                }
                continue;
            }
            group_open = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };

            if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                specific = Some(delay);
            } else if group.iter().any(|ua| ua == "*") {
                wildcard = Some(delay);
            }
        }

        specific.or(wildcard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_permissive());
        assert!(robots.is_allowed("https://www.aldi.co.uk/products/bakery", "AisleSweep"));
    }

    #[test]
    fn test_disallow_all() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://shop.example.com/", "AisleSweep"));
        assert!(!robots.is_allowed("https://shop.example.com/bakery?page=2", "AisleSweep"));
    }

    #[test]
    fn test_disallow_search_but_allow_listings() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nDisallow: /search\nDisallow: /checkout/",
        );
        assert!(robots.is_allowed("https://shop.example.com/groceries/bakery", "AisleSweep"));
        assert!(!robots.is_allowed("https://shop.example.com/search?q=milk", "AisleSweep"));
        assert!(!robots.is_allowed("https://shop.example.com/checkout/basket", "AisleSweep"));
    }

    #[test]
    fn test_allow_overrides_broader_disallow() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nDisallow: /groceries\nAllow: /groceries/bakery",
        );
        assert!(!robots.is_allowed("https://shop.example.com/groceries/frozen", "AisleSweep"));
        assert!(robots.is_allowed("https://shop.example.com/groceries/bakery", "AisleSweep"));
    }

    #[test]
    fn test_specific_agent_group() {
        let robots = ParsedRobots::from_content(
            "User-agent: AisleSweep\nDisallow: /\n\nUser-agent: *\nAllow: /",
        );
        assert!(!robots.is_allowed("https://shop.example.com/bakery", "AisleSweep"));
        assert!(robots.is_allowed("https://shop.example.com/bakery", "OtherBot"));
    }

    #[test]
    fn test_garbage_and_empty_allow() {
        let robots = ParsedRobots::from_content("<html>not found</html>");
        assert!(robots.is_allowed("https://shop.example.com/bakery", "AisleSweep"));

        let robots = ParsedRobots::from_content("  \n");
        assert!(robots.is_permissive());
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /basket");
        assert_eq!(robots.crawl_delay("AisleSweep"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_specific_beats_wildcard() {
        let robots = ParsedRobots::from_content(
            "User-agent: *\nCrawl-delay: 10\n\nUser-agent: aislesweep\nCrawl-delay: 2.5",
        );
        assert_eq!(robots.crawl_delay("AisleSweep"), Some(2.5));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let robots =
            ParsedRobots::from_content("User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay("BotA"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotB"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_after_rules_in_same_group() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nDisallow: /basket\nCrawl-delay: 4 # polite");
        assert_eq!(robots.crawl_delay("AisleSweep"), Some(4.0));
    }

    #[test]
    fn test_crawl_delay_absent_or_invalid() {
        assert_eq!(
            ParsedRobots::from_content("User-agent: *\nDisallow: /x").crawl_delay("AisleSweep"),
            None
        );
        assert_eq!(
            ParsedRobots::from_content("User-agent: *\nCrawl-delay: soon")
                .crawl_delay("AisleSweep"),
            None
        );
        assert_eq!(ParsedRobots::allow_all().crawl_delay("AisleSweep"), None);
    }

    #[test]
    fn test_crawl_delay_ignores_empty_user_agent() {
        let robots = ParsedRobots::from_content(
            "User-agent:\nCrawl-delay: 30\n\nUser-agent: *\nCrawl-delay: 2\n",
        );
        assert_eq!(robots.crawl_delay("AisleSweep"), Some(2.0));
    }
}
