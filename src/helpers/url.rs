//! URL helper functions

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Everything outside the RFC 3986 unreserved set
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Route of a post detail page
///
/// # Examples
/// ```ignore
/// post_url(&config, "my-post") // -> "/post/my-post/"
/// ```
pub fn post_url(config: &SiteConfig, uid: &str) -> String {
    url_for(config, &format!("post/{}/", encode_url(uid)))
}

/// Pre-rendered listing page `n`, fetched by the "load more" control
pub fn page_url(config: &SiteConfig, n: usize) -> String {
    url_for(config, &format!("page/{}.json", n))
}

/// Route of the preview server's live "load more" for a cursor
pub fn more_url(config: &SiteConfig, cursor: &str) -> String {
    url_for(config, &format!("api/more?cursor={}", encode_url(cursor)))
}

/// Encode a URL path segment or query value
pub fn encode_url(path: &str) -> String {
    percent_encoding::utf8_percent_encode(path, COMPONENT).to_string()
}
