//! URL reference resolution against the target URL.

use url::Url;

/// Resolve `reference` against `base` the way a browser resolves a link.
///
/// Absolute references come back normalized, relative ones (path, scheme
/// relative, query or fragment only) are joined onto `base`. Empty values
/// and references that do not parse yield `None` and must be left as-is.
pub fn resolve_reference(base: &Url, reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    base.join(reference).ok().map(String::from)
}
