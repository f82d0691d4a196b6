pub mod amazon_partners;
pub mod digistore;

pub use amazon_partners::AmazonPartnersPlugin;
pub use digistore::DigistorePlugin;

/// URL-safe slug from free-form text. Non-alphanumeric runs collapse to a
/// single hyphen.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Structural checks shared by the built-in plugins.
pub(crate) fn structurally_valid(raw: &monetra_core::RawOffer) -> bool {
    if raw.external_id.trim().is_empty() || raw.title.trim().is_empty() {
        return false;
    }
    if raw.price.is_some_and(|p| p < 0.0) {
        return false;
    }
    match url::Url::parse(&raw.target_url) {
        Ok(parsed) => parsed.host_str().is_some(),
        Err(_) => false,
    }
}
