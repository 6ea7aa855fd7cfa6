//! Content module - post models and rich text rendering

mod post;
mod richtext;

pub use post::{ContentSection, Cursor, PostDetail, PostPage, PostSummary};
pub use richtext::{RichTextNode, RichTextRenderer, Span};
