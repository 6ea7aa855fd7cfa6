//! Post detail resolution

use crate::cms::ContentSource;
use crate::content::PostDetail;
use crate::error::CmsResult;

/// Render state of a post page
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    /// The page is being built on demand
    Loading,
    Ready(PostDetail),
    NotFound,
}

impl DetailState {
    pub fn post(&self) -> Option<&PostDetail> {
        match self {
            DetailState::Ready(post) => Some(post),
            DetailState::Loading | DetailState::NotFound => None,
        }
    }
}

/// Resolve a route slug to a post
///
/// A slug the content source does not know resolves to `NotFound`; only
/// transport and decoding failures are errors.
pub async fn resolve<S>(source: &S, doc_type: &str, slug: &str) -> CmsResult<DetailState>
where
    S: ContentSource + ?Sized,
{
    let slug = slug.trim();
    if slug.is_empty() {
        return Ok(DetailState::NotFound);
    }

    match source.get_by_uid(doc_type, slug).await {
        Ok(Some(post)) => Ok(DetailState::Ready(post)),
        Ok(None) => {
            tracing::debug!("No {} with uid {:?}", doc_type, slug);
            Ok(DetailState::NotFound)
        }
        Err(e) if e.is_not_found() => Ok(DetailState::NotFound),
        Err(e) => Err(e),
    }
}
