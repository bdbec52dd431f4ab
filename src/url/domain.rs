use url::Url;

/// Extracts the host from a URL, lowercased
///
/// A non-default port is kept (`127.0.0.1:8080`) so that two servers on the
/// same machine are paced independently.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use aisle_sweep::url::extract_domain;
///
/// let url = Url::parse("https://WWW.ALDI.CO.UK/products").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.aldi.co.uk".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
