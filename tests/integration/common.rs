//! Shared fixtures for the integration tests

use aisle_sweep::catalog::SelectorSet;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Selectors matching the pages produced by `listing_page`
pub fn listing_selectors() -> SelectorSet {
    SelectorSet {
        item: vec!["li.product".to_string()],
        name: vec![".name".to_string()],
        brand: vec![],
        price: vec![".price".to_string()],
        secondary_price: vec![".clubcard".to_string()],
        price_pattern: Some(r"£\d+\.\d{2}".to_string()),
        wait_for: vec!["ul.grid".to_string()],
        next_enabled: vec!["a.next".to_string()],
        next_disabled: vec![".next.disabled".to_string()],
    }
}

/// Renders one listing page
///
/// Each product is `(name, price)`. `last` renders a disabled next control.
pub fn listing_page(products: &[(&str, &str)], last: bool) -> String {
    let mut html = String::from("<html><body><ul class=\"grid\">\n");
    for (name, price) in products {
        html.push_str(&format!(
            "<li class=\"product\"><h3 class=\"name\">{}</h3><span class=\"price\">{}</span></li>\n",
            name, price
        ));
    }
    html.push_str("</ul>\n");
    if last {
        html.push_str("<span class=\"next disabled\">Next</span>");
    } else {
        html.push_str("<a class=\"next\" href=\"#\">Next</a>");
    }
    html.push_str("</body></html>");
    html
}

/// Serves `body` for one page of the listing at `listing_path`
pub async fn mount_page(server: &MockServer, listing_path: &str, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(listing_path))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves a robots.txt body
pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
