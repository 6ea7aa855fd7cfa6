//! Preview server with on-demand post pages
//!
//! Serves the generated site. Post pages missing from disk, or older than the
//! revalidation window, are fetched and rendered on request. `/api/more`
//! renders the listing page behind any cursor of the content repository live,
//! next to the pre-rendered `page/{n}.json` files.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::cache::{self, PageLedger};
use crate::cms::ContentSource;
use crate::content::PostPage;
use crate::detail::DetailState;
use crate::generator::{Generator, MorePage};
use crate::listing::{Listing, LoadOutcome};
use crate::Blog;

/// Server state
pub struct ServerState<S> {
    blog: Blog,
    generator: Generator,
    source: S,
    ledger: Mutex<PageLedger>,
    /// Slugs with an on-demand build running
    building: std::sync::Mutex<HashSet<String>>,
}

impl<S: ContentSource + 'static> ServerState<S> {
    pub fn new(blog: &Blog, source: S) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            generator: Generator::new(blog)?,
            source,
            ledger: Mutex::new(PageLedger::load(&blog.base_dir)),
            building: std::sync::Mutex::new(HashSet::new()),
        })
    }
}

/// Start the preview server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(blog, blog.client()?)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes of the preview server
pub fn router<S: ContentSource + 'static>(state: Arc<ServerState<S>>) -> Router {
    Router::new()
        .route("/post/:slug", get(post_handler::<S>))
        .route("/post/:slug/", get(post_handler::<S>))
        .route("/api/more", get(more_handler::<S>))
        .fallback(fallback_handler::<S>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Marks a slug as being built for as long as it lives
struct BuildGuard<'a> {
    building: &'a std::sync::Mutex<HashSet<String>>,
    slug: String,
}

impl<'a> BuildGuard<'a> {
    fn acquire(building: &'a std::sync::Mutex<HashSet<String>>, slug: &str) -> Option<Self> {
        let mut set = building.lock().unwrap_or_else(|e| e.into_inner());
        set.insert(slug.to_string()).then(|| Self {
            building,
            slug: slug.to_string(),
        })
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.building.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.slug);
    }
}

/// Serve a post page, building it when missing or stale
async fn post_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    Path(slug): Path<String>,
) -> Response {
    let existing = state
        .generator
        .post_output_path(&slug)
        .filter(|path| path.exists());

    let fresh = state
        .ledger
        .lock()
        .await
        .is_fresh(&slug, cache::unix_now(), state.blog.config.revalidate());

    if fresh {
        if let Some(path) = &existing {
            if let Ok(html) = tokio::fs::read_to_string(path).await {
                return Html(html).into_response();
            }
        }
    }

    let Some(_guard) = BuildGuard::acquire(&state.building, &slug) else {
        // another request is building this page
        if let Some(path) = &existing {
            if let Ok(html) = tokio::fs::read_to_string(path).await {
                return Html(html).into_response();
            }
        }
        return render_state(&state.generator, &DetailState::Loading, StatusCode::OK);
    };

    match state.generator.build_post(&state.source, &slug).await {
        Ok(built) => match &built.state {
            DetailState::Ready(_) => {
                if let Some(path) = &built.output_path {
                    let mut ledger = state.ledger.lock().await;
                    ledger.record(
                        &slug,
                        &state.generator.relative(path),
                        &built.html,
                        cache::unix_now(),
                    );
                    if let Err(e) = ledger.save(&state.blog.base_dir) {
                        tracing::warn!("Failed to save page ledger: {}", e);
                    }
                }
                tracing::info!("Built post page on demand: {}", slug);
                Html(built.html).into_response()
            }
            DetailState::NotFound => {
                state.ledger.lock().await.remove(&slug);
                (StatusCode::NOT_FOUND, Html(built.html)).into_response()
            }
            DetailState::Loading => Html(built.html).into_response(),
        },
        Err(e) => {
            tracing::error!("Failed to build post {:?}: {:#}", slug, e);
            if let Some(path) = &existing {
                if let Ok(html) = tokio::fs::read_to_string(path).await {
                    tracing::info!("Serving stale page for {}", slug);
                    return Html(html).into_response();
                }
            }
            (StatusCode::BAD_GATEWAY, format!("Failed to load post: {}", e)).into_response()
        }
    }
}

fn render_state(generator: &Generator, state: &DetailState, status: StatusCode) -> Response {
    match generator.render_detail(state) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct MoreQuery {
    cursor: String,
}

/// Fetch the page behind a cursor for the listing's "load more" control
async fn more_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    Query(query): Query<MoreQuery>,
) -> Response {
    let cms = &state.blog.config.cms;
    if !same_origin(&cms.endpoint, &query.cursor) {
        tracing::warn!("Rejected cursor outside the content repository: {}", query.cursor);
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "cursor does not belong to the content repository" })),
        )
            .into_response();
    }

    let first = PostPage::new(Some(query.cursor), Vec::new());
    let mut listing = Listing::new(first, cms.timeout());

    match listing.load_more(&state.source).await {
        Ok(LoadOutcome::Loaded { .. }) => {
            let page = listing.state();
            let html = match state.generator.render_summaries(page.items()) {
                Ok(html) => html,
                Err(e) => {
                    return (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
                }
            };
            Json(MorePage {
                next_page: page.cursor().map(str::to_string),
                more_url: page.cursor().map(|c| state.generator.helpers().more_url(c)),
                html,
            })
            .into_response()
        }
        Ok(LoadOutcome::Exhausted) => Json(MorePage {
            next_page: None,
            more_url: None,
            html: String::new(),
        })
        .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Whether a cursor resolves to the same scheme and host as the endpoint
fn same_origin(endpoint: &str, cursor: &str) -> bool {
    let Ok(endpoint) = Url::parse(endpoint) else {
        return false;
    };
    match endpoint.join(cursor) {
        Ok(url) => url.scheme() == endpoint.scheme() && url.host() == endpoint.host(),
        Err(_) => false,
    }
}

/// Serve generated files, answering unknown paths with the not-found page
async fn fallback_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
            render_state(&state.generator, &DetailState::NotFound, StatusCode::NOT_FOUND)
        }
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
