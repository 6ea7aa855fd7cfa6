//! Generate static files

use anyhow::Result;

use crate::generator::{GenerateReport, Generator};
use crate::Blog;

/// Generate the static site from the content repository
pub async fn run(blog: &Blog) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let client = blog.client()?;
    let generator = Generator::new(blog)?;
    let report = generator.generate(&client).await?;

    tracing::info!(
        "Listed {} posts on {} pages, wrote {} post pages",
        report.posts_listed,
        report.listing_pages,
        report.pages_written
    );
    if !report.missing.is_empty() {
        tracing::warn!("Unresolved posts: {}", report.missing.join(", "));
    }

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
