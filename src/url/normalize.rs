use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves a discovered reference against the page it was found on
///
/// Standard base resolution applies: scheme-relative (`//host/x`),
/// path-relative (`x`, `../x`), absolute-path (`/x`), query-only (`?q`)
/// and fragment-only (`#f`) references are all handled by the `url` crate.
/// The fragment of the result is always stripped.
///
/// # Errors
///
/// * `UrlError::Parse` - The reference cannot be resolved
/// * `UrlError::InvalidScheme` - The result is not http(s) (e.g. `mailto:`)
///
/// # Examples
///
/// ```
/// use sitemapper::url::resolve_link;
/// use url::Url;
///
/// let page = Url::parse("https://example.com/docs/intro").unwrap();
/// let url = resolve_link("../about#team", &page).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> UrlResult<Url> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Canonicalises the configured crawl root
///
/// A bare host gains its trailing slash (`https://example.com` becomes
/// `https://example.com/`) so prefix checks against it are exact.
pub fn canonical_root(root_url: &str) -> UrlResult<Url> {
    let mut url = Url::parse(root_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves a link and keeps it only if it belongs to the crawled site
///
/// Returns the canonical absolute URL string, or `None` when the link
/// cannot be resolved or does not start with `root`.
pub fn same_site_candidate(href: &str, page_url: &Url, root: &str) -> Option<String> {
    match resolve_link(href, page_url) {
        Ok(url) if url.as_str().starts_with(root) => Some(url.into()),
        Ok(url) => {
            tracing::trace!("Skipping off-site link {}", url);
            None
        }
        Err(e) => {
            tracing::trace!("Skipping unresolvable link {}: {}", href, e);
            None
        }
    }
}

/// Rules deciding where an image source may point
#[derive(Debug, Clone)]
pub struct ImageScope {
    /// Canonical crawl root
    pub root: String,

    /// Recognized image roots, in configured order
    pub image_roots: Vec<Url>,

    /// Only accept images under `root` or one of `image_roots`
    pub this_domain: bool,
}

/// Resolves an `<img src>` value into an absolute image URL
///
/// Relative sources are resolved against the first image root that is a
/// prefix of the page URL when the scope is domain-restricted and image
/// roots are configured; otherwise against the page URL itself. Under a
/// domain restriction the final URL must start with the site root or one
/// of the image roots.
pub fn resolve_image_src(src: &str, page_url: &Url, scope: &ImageScope) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    let is_absolute = Url::parse(src).is_ok();

    let base = if !is_absolute && scope.this_domain && !scope.image_roots.is_empty() {
        scope
            .image_roots
            .iter()
            .find(|root| page_url.as_str().starts_with(root.as_str()))?
    } else {
        page_url
    };

    let url = resolve_link(src, base).ok()?;

    if scope.this_domain {
        let allowed = url.as_str().starts_with(&scope.root)
            || scope
                .image_roots
                .iter()
                .any(|root| url.as_str().starts_with(root.as_str()));
        if !allowed {
            return None;
        }
    }

    Some(url.into())
}
