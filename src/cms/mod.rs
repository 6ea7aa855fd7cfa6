//! Content source - the headless CMS the blog is generated from

mod client;
pub mod wire;

pub use client::PrismicClient;

use async_trait::async_trait;

use crate::content::{PostDetail, PostPage};
use crate::error::CmsResult;

/// Fetches one page of summaries from an opaque cursor URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, cursor: &str) -> CmsResult<PostPage>;
}

/// Queries answered by the headless CMS
#[async_trait]
pub trait ContentSource: PageFetcher {
    /// First page of documents of the given type
    async fn list_by_type(&self, doc_type: &str, page_size: usize) -> CmsResult<PostPage>;

    /// A single document by its uid, `None` when no such document exists
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> CmsResult<Option<PostDetail>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory content source for tests

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::error::CmsError;

    /// Serves canned pages keyed by cursor and records every fetch
    #[derive(Default)]
    pub struct FakeSource {
        pub first: PostPage,
        pub pages: Mutex<HashMap<String, Result<PostPage, String>>>,
        pub posts: HashMap<String, PostDetail>,
        pub delay: Option<Duration>,
        pub fetches: AtomicUsize,
    }

    impl FakeSource {
        pub fn with_page(self, cursor: &str, page: PostPage) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(cursor.to_string(), Ok(page));
            self
        }

        pub fn with_failure(self, cursor: &str, body: &str) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(cursor.to_string(), Err(body.to_string()));
            self
        }

        pub fn with_post(mut self, uid: &str, post: PostDetail) -> Self {
            self.posts.insert(uid.to_string(), post);
            self
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for FakeSource {
        async fn fetch_page(&self, cursor: &str) -> CmsResult<PostPage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let entry = self.pages.lock().unwrap().get(cursor).cloned();
            match entry {
                Some(Ok(page)) => Ok(page),
                // failures replay a bad body through the real decoder
                Some(Err(body)) => super::wire::decode_page(cursor, &body),
                None => Err(CmsError::Status(
                    reqwest::StatusCode::NOT_FOUND,
                    cursor.to_string(),
                )),
            }
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn list_by_type(&self, _doc_type: &str, _page_size: usize) -> CmsResult<PostPage> {
            Ok(self.first.clone())
        }

        async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> CmsResult<Option<PostDetail>> {
            Ok(self.posts.get(uid).cloned())
        }
    }
}
