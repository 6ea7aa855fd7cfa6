//! Post listing with incremental "load more"
//!
//! The listing starts from the first page produced at generation time and
//! grows one page at a time. Items are only ever appended, in fetch order,
//! and the cursor always holds the `next_page` of the last applied page.
//! A load either applies a whole page or leaves the state untouched.
//!
//! `load_more` takes `&mut self`, so a listing never has two loads running.
//! In the browser the control is disabled while its request is pending.

use serde::Serialize;
use std::time::Duration;

use crate::cms::PageFetcher;
use crate::content::{Cursor, PostPage, PostSummary};
use crate::error::{CmsError, CmsResult};

/// Accumulated summaries plus the cursor of the next page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListState {
    cursor: Cursor,
    items: Vec<PostSummary>,
}

impl ListState {
    /// Seed the state from a pre-fetched first page
    pub fn seed(first: PostPage) -> Self {
        let mut state = Self::default();
        state.apply(first);
        state
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    /// Whether another page can be requested
    pub fn has_more(&self) -> bool {
        self.cursor.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Append a fetched page and move the cursor, returning how many items were added
    pub fn apply(&mut self, page: PostPage) -> usize {
        let PostPage { next_page, results } = PostPage::new(page.next_page, page.results);
        let appended = results.len();
        self.cursor = next_page;
        self.items.extend(results);
        appended
    }
}

/// What the "load more" control should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    /// No further pages
    Hidden,
    /// A page can be requested
    LoadMore,
    /// The last request failed and can be retried
    Retry,
}

/// Result of a load request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was applied
    Loaded { appended: usize },
    /// There was no cursor, nothing was fetched
    Exhausted,
}

/// The listing screen's state and its single mutation path
#[derive(Debug, Clone)]
pub struct Listing {
    state: ListState,
    timeout: Duration,
    /// Message of the last failed load, cleared by the next successful one
    last_error: Option<String>,
}

impl Listing {
    pub fn new(first: PostPage, timeout: Duration) -> Self {
        Self {
            state: ListState::seed(first),
            timeout,
            last_error: None,
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn affordance(&self) -> Affordance {
        if !self.state.has_more() {
            Affordance::Hidden
        } else if self.last_error.is_some() {
            Affordance::Retry
        } else {
            Affordance::LoadMore
        }
    }

    /// Fetch the page behind the cursor and append it
    ///
    /// Makes exactly one request when a cursor is present and none otherwise.
    /// On any failure the items and cursor are left as they were. Dropping the
    /// returned future abandons the request without touching the state.
    pub async fn load_more<F>(&mut self, fetcher: &F) -> CmsResult<LoadOutcome>
    where
        F: PageFetcher + ?Sized,
    {
        let cursor = match self.state.cursor() {
            Some(cursor) if !cursor.is_empty() => cursor.to_string(),
            _ => return Ok(LoadOutcome::Exhausted),
        };

        tracing::debug!("Loading more posts from {}", cursor);
        let result = match tokio::time::timeout(self.timeout, fetcher.fetch_page(&cursor)).await {
            Ok(result) => result,
            Err(_) => Err(CmsError::Timeout(self.timeout)),
        };

        match result {
            Ok(page) => {
                let appended = self.state.apply(page);
                self.last_error = None;
                tracing::debug!(
                    "Appended {} posts, {} total",
                    appended,
                    self.state.items.len()
                );
                Ok(LoadOutcome::Loaded { appended })
            }
            Err(e) => {
                tracing::warn!("Failed to load more posts: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Keep loading until the cursor is exhausted, returning the number of pages fetched
    pub async fn load_all<F>(&mut self, fetcher: &F) -> CmsResult<usize>
    where
        F: PageFetcher + ?Sized,
    {
        let mut pages = 0;
        while let LoadOutcome::Loaded { .. } = self.load_more(fetcher).await? {
            pages += 1;
        }
        Ok(pages)
    }
}
