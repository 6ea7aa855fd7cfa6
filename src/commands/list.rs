//! List posts from the content repository

use anyhow::Result;

use crate::cms::ContentSource;
use crate::helpers::Helpers;
use crate::listing::Listing;
use crate::Blog;

/// Print the first page of posts, or every page with `all`
pub async fn run(blog: &Blog, all: bool) -> Result<()> {
    let client = blog.client()?;
    let lines = collect(blog, &client, all).await?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Build the listing lines, loading further pages one at a time
async fn collect<S>(blog: &Blog, source: &S, all: bool) -> Result<Vec<String>>
where
    S: ContentSource + ?Sized,
{
    let cms = &blog.config.cms;
    let helpers = Helpers::new(blog.config.clone());

    let first = source.list_by_type(&cms.document_type, cms.page_size).await?;
    let mut listing = Listing::new(first, cms.timeout());

    if all {
        let pages = listing.load_all(source).await?;
        tracing::debug!("Loaded {} more pages", pages);
    }

    let state = listing.state();
    let mut lines = vec![format!("Posts ({}):", state.items().len())];
    for post in state.items() {
        lines.push(format!(
            "  {:>11} - {} [{}] by {}",
            helpers.date(post.first_publication_date.as_ref()),
            post.title,
            post.uid.as_deref().unwrap_or("-"),
            post.author
        ));
    }
    if let Some(cursor) = state.cursor() {
        lines.push(format!("More posts at {}", cursor));
    }

    Ok(lines)
}
