use url::Url;

use monetra_core::{Offer, SelectionContext};

#[derive(Debug, thiserror::Error)]
pub enum CloakError {
    #[error("invalid base url: {0}")]
    InvalidBase(#[from] url::ParseError),
    #[error("base url cannot carry path segments")]
    CannotBeABase,
}

/// Build the internal redirect URL served in place of the merchant link.
/// The true target stays hidden until the redirect resolver runs.
pub fn cloaked_link(
    base_url: &str,
    offer: &Offer,
    context: &SelectionContext,
    page_slug: Option<&str>,
) -> Result<String, CloakError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| CloakError::CannotBeABase)?
        .pop_if_empty()
        .extend(["redirect", &offer.slug]);

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("utm_source", "monetra");
        pairs.append_pair("utm_medium", "affiliate");
        pairs.append_pair(
            "utm_campaign",
            offer.category.as_deref().unwrap_or("general"),
        );
        if let Some(archetype) = context.archetype.as_deref() {
            pairs.append_pair("utm_content", archetype);
        }
        if let Some(page) = page_slug {
            pairs.append_pair("ref", page);
        }
    }

    Ok(url.into())
}
