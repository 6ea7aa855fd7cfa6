//! Generator module - renders the listing and post pages with the built-in templates

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;

use crate::cache::{self, PageLedger};
use crate::cms::{ContentSource, PageFetcher};
use crate::content::{PostSummary, RichTextRenderer};
use crate::detail::{self, DetailState};
use crate::helpers::{meta_generator, Helpers};
use crate::i18n::I18n;
use crate::listing::{Listing, LoadOutcome};
use crate::templates::{ListingData, PostViewData, SiteData, SummaryData, TemplateRenderer};
use crate::Blog;

/// Directory of the pre-rendered listing pages after the first
pub const PAGES_DIR: &str = "page";

/// What a generation run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateReport {
    /// Summaries across all listing pages
    pub posts_listed: usize,
    /// Listing pages, the index included
    pub listing_pages: usize,
    /// Post pages written
    pub pages_written: usize,
    /// Listed uids the content source could not resolve
    pub missing: Vec<String>,
}

/// One further page of the listing, as appended by the "load more" control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorePage {
    /// Cursor of the page after this one
    pub next_page: Option<String>,
    /// Where the control goes next, `None` on the last page
    pub more_url: Option<String>,
    /// Rendered summaries of this page
    pub html: String,
}

/// A resolved post and its rendered page
#[derive(Debug)]
pub struct BuiltPost {
    pub state: DetailState,
    pub html: String,
    /// Where the page was written, if it was
    pub output_path: Option<PathBuf>,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    helpers: Helpers,
    rich_text: RichTextRenderer,
    i18n: I18n,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(blog.base_dir.join("languages"))?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            helpers: Helpers::new(blog.config.clone()),
            rich_text: RichTextRenderer::new(),
            i18n,
        })
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Generate the listing, its further pages and a page for every listed post
    pub async fn generate<S>(&self, source: &S) -> Result<GenerateReport>
    where
        S: ContentSource + ?Sized,
    {
        let cms = &self.blog.config.cms;
        let public_dir = &self.blog.public_dir;
        fs::create_dir_all(public_dir)?;

        let first = source.list_by_type(&cms.document_type, cms.page_size).await?;
        let mut listing = Listing::new(first, cms.timeout());

        let html = self.render_index(&listing)?;
        write_page(&public_dir.join("index.html"), &html)?;
        let more_pages = self.write_more_pages(source, &mut listing).await?;

        let not_found = self.render_detail(&DetailState::NotFound)?;
        write_page(&public_dir.join("404.html"), &not_found)?;

        let items = listing.state().items();
        let mut report = GenerateReport {
            posts_listed: items.len(),
            listing_pages: 1 + more_pages,
            ..Default::default()
        };

        let mut ledger = PageLedger::load(&self.blog.base_dir);
        let now = cache::unix_now();
        let mut seen = HashSet::new();

        for uid in items.iter().filter_map(|p| p.uid.as_deref()) {
            if !seen.insert(uid) {
                continue;
            }
            let built = self.build_post(source, uid).await?;
            match (&built.state, &built.output_path) {
                (DetailState::Ready(_), Some(path)) => {
                    ledger.record(uid, &self.relative(path), &built.html, now);
                    report.pages_written += 1;
                }
                (DetailState::Ready(_), None) => {}
                (DetailState::NotFound, _) | (DetailState::Loading, _) => {
                    tracing::warn!("Listed post {:?} could not be resolved, skipping", uid);
                    ledger.remove(uid);
                    report.missing.push(uid.to_string());
                }
            }
        }

        ledger.save(&self.blog.base_dir)?;
        Ok(report)
    }

    /// Follow the cursor chain, writing page `n` of the listing to `page/{n}.json`
    ///
    /// Returns how many pages were written. The files replace any from an
    /// earlier run.
    async fn write_more_pages<S>(&self, source: &S, listing: &mut Listing) -> Result<usize>
    where
        S: PageFetcher + ?Sized,
    {
        let dir = self.blog.public_dir.join(PAGES_DIR);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }

        let mut written = 0;
        let mut shown = listing.state().items().len();

        while let LoadOutcome::Loaded { .. } = listing.load_more(source).await? {
            let n = written + 2;
            let state = listing.state();
            let page = MorePage {
                next_page: state.cursor().map(str::to_string),
                more_url: state.has_more().then(|| self.helpers.page_url(n + 1)),
                html: self.render_summaries(&state.items()[shown..])?,
            };
            shown = state.items().len();

            write_page(&dir.join(format!("{}.json", n)), &serde_json::to_string(&page)?)?;
            tracing::debug!("Generated listing page {}", n);
            written += 1;
        }

        Ok(written)
    }

    /// Resolve a post, render it and write the page when the post exists
    pub async fn build_post<S>(&self, source: &S, slug: &str) -> Result<BuiltPost>
    where
        S: ContentSource + ?Sized,
    {
        let state = detail::resolve(source, &self.blog.config.cms.document_type, slug).await?;
        let html = self.render_detail(&state)?;

        let output_path = match (&state, self.post_output_path(slug)) {
            (DetailState::Ready(_), Some(path)) => {
                write_page(&path, &html)?;
                tracing::debug!("Generated post: {:?}", path);
                Some(path)
            }
            (DetailState::NotFound, Some(path)) => {
                if path.exists() {
                    fs::remove_file(&path)?;
                    tracing::info!("Removed page of deleted post: {:?}", path);
                }
                None
            }
            _ => None,
        };

        Ok(BuiltPost {
            state,
            html,
            output_path,
        })
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let config = &self.blog.config;
        let mut context = Context::new();
        context.insert(
            "site",
            &SiteData {
                title: config.title.clone(),
                root: self.helpers.url_for(""),
                language: config.language.clone(),
                meta_generator: meta_generator(),
            },
        );
        context.insert("i18n", &self.i18n.get_all_translations());
        context
    }

    /// Render the listing page
    pub fn render_index(&self, listing: &Listing) -> Result<String> {
        let state = listing.state();
        let mut context = self.create_base_context();
        context.insert("posts", &self.summary_data(state.items()));
        context.insert(
            "listing",
            &ListingData::new(state, listing.affordance(), &self.helpers),
        );
        self.renderer.render("index.html", &context)
    }

    /// Render summaries alone, for appending to an existing listing
    pub fn render_summaries(&self, posts: &[PostSummary]) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("posts", &self.summary_data(posts));
        self.renderer.render("partials/post_summary.html", &context)
    }

    /// Render a post page in any of its states
    pub fn render_detail(&self, state: &DetailState) -> Result<String> {
        let mut context = self.create_base_context();
        match state {
            DetailState::Loading => self.renderer.render("loading.html", &context),
            DetailState::NotFound => self.renderer.render("not_found.html", &context),
            DetailState::Ready(post) => {
                let view = PostViewData::new(
                    post,
                    &self.helpers,
                    &self.rich_text,
                    &self.blog.config.reading_time,
                );
                context.insert("post", &view);
                self.renderer.render("post.html", &context)
            }
        }
    }

    /// Output file of a post page. `None` for uids that are not safe as a
    /// directory name; those are only ever served on demand.
    pub fn post_output_path(&self, uid: &str) -> Option<PathBuf> {
        let safe = !uid.is_empty()
            && !uid.starts_with('.')
            && uid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        safe.then(|| self.blog.public_dir.join("post").join(uid).join("index.html"))
    }

    fn summary_data(&self, posts: &[PostSummary]) -> Vec<SummaryData> {
        posts
            .iter()
            .map(|p| SummaryData::new(p, &self.helpers))
            .collect()
    }

    /// Output path relative to the public directory, as recorded in the ledger
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.blog.public_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}

/// Write a page, creating parent directories
fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, html).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::FakeSource;
    use crate::config::SiteConfig;
    use crate::content::{ContentSection, PostDetail, PostPage, RichTextNode};
    use crate::helpers::parse_timestamp;
    use std::time::Duration;
    use tempfile::TempDir;

    fn blog(dir: &TempDir) -> Blog {
        Blog::with_config(dir.path(), SiteConfig::default())
    }

    fn detail(uid: &str, title: &str) -> PostDetail {
        PostDetail {
            uid: Some(uid.to_string()),
            first_publication_date: parse_timestamp("2021-03-25T19:25:28+0000"),
            title: title.to_string(),
            banner_url: "https://images.example/banner.png".to_string(),
            author: "Ana".to_string(),
            content: vec![
                ContentSection {
                    heading: "Primeiro".to_string(),
                    body: vec![RichTextNode::text("paragraph", "<b>texto</b>")],
                },
                ContentSection {
                    heading: "Segundo".to_string(),
                    body: vec![RichTextNode::text("paragraph", "mais")],
                },
            ],
        }
    }

    #[test]
    fn test_index_shows_load_more_only_with_cursor() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        let first = PostPage::new(
            Some("https://cms.example/page2".to_string()),
            vec![PostSummary::new("a", "Hello")],
        );
        let html = generator
            .render_index(&Listing::new(first, Duration::from_secs(1)))
            .unwrap();
        assert!(html.contains("Hello"));
        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains("id=\"load-more\""));

        let last = PostPage::new(None, vec![PostSummary::new("a", "Hello")]);
        let html = generator
            .render_index(&Listing::new(last, Duration::from_secs(1)))
            .unwrap();
        assert!(!html.contains("id=\"load-more\""));
    }

    #[test]
    fn test_summary_without_date_renders_empty_time() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        let html = generator
            .render_summaries(&[PostSummary::new("a", "Hello")])
            .unwrap();
        assert!(html.contains(r#"<time datetime=""></time>"#));
        assert!(!html.contains("Invalid"));
    }

    #[test]
    fn test_summary_text_is_escaped() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        let html = generator
            .render_summaries(&[PostSummary::new("a", "<script>x</script>")])
            .unwrap();
        assert!(!html.contains("<script>x"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_post_keeps_section_order() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        let html = generator
            .render_detail(&DetailState::Ready(detail("hello", "Olá")))
            .unwrap();
        let first = html.find("Primeiro").unwrap();
        let second = html.find("Segundo").unwrap();
        assert!(first < second);
        assert!(html.contains("25 mar 2021"));
        assert!(html.contains("4 min"));
        assert!(html.contains("<p>&lt;b&gt;texto&lt;/b&gt;</p>"));
    }

    #[test]
    fn test_render_loading_and_not_found() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        assert!(generator
            .render_detail(&DetailState::Loading)
            .unwrap()
            .contains("Carregando..."));
        assert!(generator
            .render_detail(&DetailState::NotFound)
            .unwrap()
            .contains("Post não encontrado"));
    }

    #[test]
    fn test_post_output_path_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        assert!(generator.post_output_path("como-utilizar-hooks").is_some());
        assert!(generator.post_output_path("../etc").is_none());
        assert!(generator.post_output_path("a/b").is_none());
        assert!(generator.post_output_path("").is_none());
    }

    #[tokio::test]
    async fn test_generate_site() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();

        let source = FakeSource {
            first: PostPage::new(
                Some("https://cms.example/page2".to_string()),
                vec![
                    PostSummary::new("hello", "Hello"),
                    PostSummary::new("gone", "Gone"),
                ],
            ),
            ..Default::default()
        }
        .with_page(
            "https://cms.example/page2",
            PostPage::new(None, vec![PostSummary::new("world", "World")]),
        )
        .with_post("hello", detail("hello", "Hello"))
        .with_post("world", detail("world", "World"));

        let report = generator.generate(&source).await.unwrap();
        assert_eq!(
            report,
            GenerateReport {
                posts_listed: 3,
                listing_pages: 2,
                pages_written: 2,
                missing: vec!["gone".to_string()],
            }
        );

        assert!(blog.public_dir.join("index.html").exists());
        assert!(blog.public_dir.join("404.html").exists());
        assert!(blog.public_dir.join("post/hello/index.html").exists());
        // posts from later listing pages get their own page too
        assert!(blog.public_dir.join("post/world/index.html").exists());
        assert!(!blog.public_dir.join("post/gone/index.html").exists());

        let ledger = PageLedger::load(&blog.base_dir);
        assert!(ledger.pages.contains_key("hello"));
        assert!(!ledger.pages.contains_key("gone"));
    }

    fn data_url(html: &str) -> &str {
        let start = html.find("data-url=\"").unwrap() + "data-url=\"".len();
        let end = start + html[start..].find('"').unwrap();
        &html[start..end]
    }

    #[tokio::test]
    async fn test_load_more_targets_generated_files() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();

        let page2 = "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=2";
        let page3 = "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=3";
        let source = FakeSource {
            first: PostPage::new(Some(page2.to_string()), vec![PostSummary::new("a", "One")]),
            ..Default::default()
        }
        .with_page(
            page2,
            PostPage::new(Some(page3.to_string()), vec![PostSummary::new("b", "Two")]),
        )
        .with_page(page3, PostPage::new(None, vec![PostSummary::new("c", "Three")]));

        generator.generate(&source).await.unwrap();

        let index = fs::read_to_string(blog.public_dir.join("index.html")).unwrap();
        assert!(!index.contains("/api/"));
        let mut url = data_url(&index).to_string();
        assert_eq!(url, "/page/2.json");

        // follow the chain the way the browser does, using only files on disk
        let mut titles = Vec::new();
        loop {
            let file = blog.public_dir.join(url.trim_start_matches('/'));
            let page: MorePage =
                serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
            titles.push(page.html);
            match page.more_url {
                Some(next) => url = next,
                None => {
                    assert_eq!(page.next_page, None);
                    break;
                }
            }
        }

        assert_eq!(titles.len(), 2);
        assert!(titles[0].contains("Two") && !titles[0].contains("One"));
        assert!(titles[1].contains("Three") && !titles[1].contains("Two"));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_single_page_listing_has_no_further_pages() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();

        let stale = blog.public_dir.join("page/2.json");
        write_page(&stale, "{}").unwrap();

        let source = FakeSource {
            first: PostPage::new(None, vec![PostSummary::new("a", "One")]),
            ..Default::default()
        };
        let report = generator.generate(&source).await.unwrap();

        assert_eq!(report.listing_pages, 1);
        assert!(!stale.exists());
        let index = fs::read_to_string(blog.public_dir.join("index.html")).unwrap();
        assert!(!index.contains("data-url"));
    }

    #[tokio::test]
    async fn test_generate_fails_when_a_listing_page_fails() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        let source = FakeSource {
            first: PostPage::new(Some("p2".to_string()), vec![PostSummary::new("a", "One")]),
            ..Default::default()
        }
        .with_failure("p2", "not json");

        assert!(generator.generate(&source).await.is_err());
    }

    #[test]
    fn test_load_more_control_disables_while_pending() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(&dir)).unwrap();

        let first = PostPage::new(Some("p2".to_string()), vec![PostSummary::new("a", "A")]);
        let html = generator
            .render_index(&Listing::new(first, Duration::from_secs(1)))
            .unwrap();
        assert!(html.contains("if (button.disabled) return;"));
        assert!(html.contains("button.disabled = true;"));
        assert!(html.contains(r#"data-loading="Carregando...""#));
    }

    #[tokio::test]
    async fn test_build_post_removes_deleted_page() {
        let dir = TempDir::new().unwrap();
        let blog = blog(&dir);
        let generator = Generator::new(&blog).unwrap();

        let stale = blog.public_dir.join("post/old/index.html");
        write_page(&stale, "<p>old</p>").unwrap();

        let built = generator
            .build_post(&FakeSource::default(), "old")
            .await
            .unwrap();
        assert_eq!(built.state, DetailState::NotFound);
        assert_eq!(built.output_path, None);
        assert!(!stale.exists());
    }
}
