//! Built-in blog templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on; only markup
//! produced by the rich text renderer or by the URL helpers is marked `safe`.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::content::{PostDetail, PostSummary, RichTextRenderer};
use crate::helpers::Helpers;
use crate::listing::{Affordance, ListState};

/// Template renderer with the embedded blog theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("loading.html", include_str!("blog/loading.html")),
            ("not_found.html", include_str!("blog/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("blog/partials/header.html"),
            ),
            (
                "partials/post_summary.html",
                include_str!("blog/partials/post_summary.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub root: String,
    pub language: String,
    pub meta_generator: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub uid: Option<String>,
    pub url: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
}

impl SummaryData {
    pub fn new(post: &PostSummary, helpers: &Helpers) -> Self {
        let date = post.first_publication_date.as_ref();
        Self {
            uid: post.uid.clone(),
            url: post.uid.as_deref().map(|uid| helpers.post_url(uid)),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: helpers.date(date),
            datetime: helpers.date_attr(date),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingData {
    pub affordance: Affordance,
    /// What the "load more" control requests next: the pre-rendered second page
    pub more_url: Option<String>,
}

impl ListingData {
    /// Listing data for the first page of a listing
    pub fn new(state: &ListState, affordance: Affordance, helpers: &Helpers) -> Self {
        Self {
            affordance,
            more_url: state.has_more().then(|| helpers.page_url(2)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostViewData {
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
    pub reading_time: String,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Output of the rich text renderer, trusted as-is
    pub body_html: String,
}

impl PostViewData {
    pub fn new(
        post: &PostDetail,
        helpers: &Helpers,
        rich_text: &RichTextRenderer,
        reading_time: &str,
    ) -> Self {
        let date = post.first_publication_date.as_ref();
        Self {
            title: post.title.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date: helpers.date(date),
            datetime: helpers.date_attr(date),
            reading_time: reading_time.to_string(),
            sections: post
                .content
                .iter()
                .map(|section| SectionData {
                    heading: section.heading.clone(),
                    body_html: rich_text.render(&section.body),
                })
                .collect(),
        }
    }
}
