use url::Url;

/// Label used when nothing readable can be taken from a URL
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Path segments after which the category slug follows
const SLUG_MARKERS: [&str; 3] = ["products", "categories", "shop"];

/// Derives a readable category label from a listing URL
///
/// Tries, in order: the segment before a `c:<id>` segment (Sainsbury's),
/// the segment after a `products`/`categories`/`shop` marker, and the last
/// segment that is not an identifier. Hyphens become spaces and each word
/// is capitalized.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use aisle_sweep::url::derive_category_label;
///
/// let url = Url::parse("https://www.aldi.co.uk/products/fresh-food/k/1588161416978076").unwrap();
/// assert_eq!(derive_category_label(&url), "Fresh Food");
/// ```
pub fn derive_category_label(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let slug = segments
        .iter()
        .position(|seg| seg.starts_with("c:"))
        .and_then(|i| i.checked_sub(1))
        .map(|i| segments[i])
        .or_else(|| {
            segments
                .iter()
                .position(|seg| SLUG_MARKERS.contains(&seg.to_lowercase().as_str()))
                .and_then(|i| segments.get(i + 1).copied())
        })
        .or_else(|| segments.iter().rev().copied().find(|seg| !is_identifier(seg)));

    match slug {
        Some(slug) => {
            let label = title_case(slug);
            if label.is_empty() {
                UNKNOWN_LABEL.to_string()
            } else {
                label
            }
        }
        None => UNKNOWN_LABEL.to_string(),
    }
}

/// Segments that name an id rather than a category
fn is_identifier(segment: &str) -> bool {
    segment.len() <= 1
        || segment.chars().all(|c| c.is_ascii_digit())
        || segment.contains(':')
        || (segment.len() >= 32 && segment.chars().all(|c| c.is_ascii_hexdigit() || c == '-'))
}

fn title_case(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
