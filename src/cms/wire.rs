//! Raw response shapes of the CMS REST API
//!
//! Responses are decoded into these structs and converted into the domain
//! types exactly once. Nothing past this module sees raw JSON.

use serde::{Deserialize, Deserializer};

use crate::content::{ContentSection, PostDetail, PostPage, PostSummary, RichTextNode};
use crate::error::{CmsError, CmsResult};
use crate::helpers::parse_timestamp;

/// Repository metadata returned by the API root
#[derive(Debug, Deserialize)]
pub struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,

    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// A page of search results
#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub next_page: Option<String>,
    pub results: Vec<Document<T>>,
}

/// A single document with its custom-type data
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct SummaryData {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailData {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub banner: Option<Banner>,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Vec<Section>,
}

#[derive(Debug, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "nullable")]
    pub heading: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: Vec<RichTextNode>,
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<Document<SummaryData>> for PostSummary {
    fn from(doc: Document<SummaryData>) -> Self {
        Self {
            uid: doc.uid,
            first_publication_date: doc
                .first_publication_date
                .as_deref()
                .and_then(parse_timestamp),
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
        }
    }
}

impl From<Document<DetailData>> for PostDetail {
    fn from(doc: Document<DetailData>) -> Self {
        Self {
            uid: doc.uid,
            first_publication_date: doc
                .first_publication_date
                .as_deref()
                .and_then(parse_timestamp),
            title: doc.data.title,
            banner_url: doc.data.banner.and_then(|b| b.url).unwrap_or_default(),
            author: doc.data.author,
            content: doc
                .data
                .content
                .into_iter()
                .map(|section| ContentSection {
                    heading: section.heading,
                    body: section.body,
                })
                .collect(),
        }
    }
}

fn decode<'a, T: Deserialize<'a>>(url: &str, body: &'a str) -> CmsResult<T> {
    serde_json::from_str(body).map_err(|source| CmsError::Malformed {
        url: url.to_string(),
        source,
    })
}

/// Decode a page of post summaries
pub fn decode_page(url: &str, body: &str) -> CmsResult<PostPage> {
    let response: SearchResponse<SummaryData> = decode(url, body)?;
    Ok(PostPage::new(
        response.next_page,
        response.results.into_iter().map(PostSummary::from).collect(),
    ))
}

/// Decode the first post detail of a search response
pub fn decode_detail(url: &str, body: &str) -> CmsResult<Option<PostDetail>> {
    let response: SearchResponse<DetailData> = decode(url, body)?;
    Ok(response.results.into_iter().next().map(PostDetail::from))
}

/// Decode the repository metadata
pub fn decode_api_info(url: &str, body: &str) -> CmsResult<ApiInfo> {
    decode(url, body)
}
