//! HTTP client for a Prismic-compatible REST API

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{wire, ContentSource, PageFetcher};
use crate::config::CmsConfig;
use crate::content::{PostDetail, PostPage};
use crate::error::{CmsError, CmsResult};

const USER_AGENT: &str = concat!("cms-blog/", env!("CARGO_PKG_VERSION"));

/// Content source backed by the CMS REST API
#[derive(Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl PrismicClient {
    /// Build a client from the `cms` section of the site config
    pub fn new(config: &CmsConfig) -> CmsResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| CmsError::InvalidUrl(config.endpoint.clone(), e))?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            timeout: config.timeout(),
        })
    }

    async fn get_text(&self, url: &Url) -> CmsResult<String> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                CmsError::Timeout(self.timeout)
            } else {
                CmsError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status(status, url.to_string()));
        }

        Ok(response.text().await?)
    }

    /// Current master ref of the repository
    async fn master_ref(&self) -> CmsResult<String> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }

        let body = self.get_text(&url).await?;
        let info = wire::decode_api_info(url.as_str(), &body)?;
        info.master_ref()
            .map(str::to_string)
            .ok_or_else(|| CmsError::NoMasterRef(self.endpoint.to_string()))
    }

    async fn search(&self, query: &str, page_size: usize) -> CmsResult<(Url, String)> {
        let reference = self.master_ref().await?;
        let url = search_url(
            &self.endpoint,
            &reference,
            query,
            page_size,
            self.access_token.as_deref(),
        );
        let body = self.get_text(&url).await?;
        Ok((url, body))
    }
}

/// Build a documents search URL
fn search_url(
    endpoint: &Url,
    reference: &str,
    query: &str,
    page_size: usize,
    access_token: Option<&str>,
) -> Url {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("documents").push("search");
    }

    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("ref", reference)
            .append_pair("q", query)
            .append_pair("pageSize", &page_size.to_string());
        if let Some(token) = access_token {
            pairs.append_pair("access_token", token);
        }
    }

    url
}

fn type_predicate(doc_type: &str) -> String {
    format!(r#"[[at(document.type,"{}")]]"#, doc_type)
}

fn uid_predicate(doc_type: &str, uid: &str) -> String {
    format!(
        r#"[[at(my.{}.uid,"{}")]]"#,
        doc_type,
        uid.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

#[async_trait]
impl PageFetcher for PrismicClient {
    async fn fetch_page(&self, cursor: &str) -> CmsResult<PostPage> {
        // cursors are usually absolute; relative ones resolve against the API
        let url = self
            .endpoint
            .join(cursor)
            .map_err(|e| CmsError::InvalidUrl(cursor.to_string(), e))?;
        let body = self.get_text(&url).await?;
        wire::decode_page(url.as_str(), &body)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn list_by_type(&self, doc_type: &str, page_size: usize) -> CmsResult<PostPage> {
        let (url, body) = self.search(&type_predicate(doc_type), page_size).await?;
        let page = wire::decode_page(url.as_str(), &body)?;
        tracing::debug!(
            "Listed {} {} (more: {})",
            page.results.len(),
            doc_type,
            page.next_page.is_some()
        );
        Ok(page)
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> CmsResult<Option<PostDetail>> {
        match self.search(&uid_predicate(doc_type, uid), 1).await {
            Ok((url, body)) => wire::decode_detail(url.as_str(), &body),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let endpoint = Url::parse("https://blog.cdn.prismic.io/api/v2").unwrap();
        let url = search_url(&endpoint, "YE8xZ", &type_predicate("posts"), 2, None);
        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("ref".to_string(), "YE8xZ".to_string()),
                (
                    "q".to_string(),
                    r#"[[at(document.type,"posts")]]"#.to_string()
                ),
                ("pageSize".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_url_trailing_slash_and_token() {
        let endpoint = Url::parse("https://blog.cdn.prismic.io/api/v2/").unwrap();
        let url = search_url(&endpoint, "r", "q", 1, Some("secret"));
        assert_eq!(url.path(), "/api/v2/documents/search");
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "access_token" && v == "secret"));
    }

    #[test]
    fn test_uid_predicate_escapes_quotes() {
        assert_eq!(
            uid_predicate("posts", r#"a"b"#),
            r#"[[at(my.posts.uid,"a\"b")]]"#
        );
    }

    #[test]
    fn test_client_rejects_bad_endpoint() {
        let config = CmsConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PrismicClient::new(&config),
            Err(CmsError::InvalidUrl(..))
        ));
    }
}
