//! Post models shared by the listing and detail screens

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::RichTextNode;

/// Opaque URL of the next page of summaries. `None` means the list is complete.
pub type Cursor = Option<String>;

/// Lightweight listing representation of a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    /// Unique identifier used as the route slug
    pub uid: Option<String>,

    /// First publication date, absent for documents never published
    pub first_publication_date: Option<DateTime<FixedOffset>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Create a summary with an identifier and title
    pub fn new(uid: &str, title: &str) -> Self {
        Self {
            uid: Some(uid.to_string()),
            first_publication_date: None,
            title: title.to_string(),
            subtitle: String::new(),
            author: String::new(),
        }
    }
}

/// Full representation of a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub uid: Option<String>,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub banner_url: String,
    pub author: String,

    /// Body sections, in the order the content source returned them
    pub content: Vec<ContentSection>,
}

/// One heading plus its rich text body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: Vec<RichTextNode>,
}

/// A single page of post summaries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostPage {
    pub next_page: Cursor,
    pub results: Vec<PostSummary>,
}

impl PostPage {
    /// Build a page, treating an empty cursor the same as a missing one
    pub fn new(next_page: Option<String>, results: Vec<PostSummary>) -> Self {
        Self {
            next_page: next_page.filter(|url| !url.trim().is_empty()),
            results,
        }
    }
}
