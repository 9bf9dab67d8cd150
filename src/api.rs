use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use anyhow::{Context, Result};

use crate::category::Category;
use crate::config::Config;
use crate::error::CatfreqError;

/// Namespace of regular articles.
pub const CONTENT_NAMESPACE: i64 = 0;

/// A single entry of a category listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub title: String,
    #[serde(rename = "ns")]
    pub namespace: i64,
}

impl Member {
    pub fn new<T: ToString>(title: T, namespace: i64) -> Self {
        Self {
            title: title.to_string(),
            namespace,
        }
    }

    /// Whether the member is an article, as opposed to a sub category, file
    /// or other namespace.
    #[inline]
    pub fn is_article(&self) -> bool {
        self.namespace == CONTENT_NAMESPACE
    }
}

/// One page of a category listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberPage {
    pub members: Vec<Member>,
    /// Where the next page begins, `None` on the last page.
    pub next_cursor: Option<String>,
}

/// The remote calls the crawler depends on.
#[async_trait]
pub trait WikiApi: Send + Sync {
    /// Fetches one page of members of the category.
    async fn category_members(
        &self,
        category: &Category,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<MemberPage, CatfreqError>;

    /// Fetches the full plain text of an article, `None` if it has none.
    async fn extract(&self, title: &str) -> Result<Option<String>, CatfreqError>;
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    query: Option<ListingQuery>,
    #[serde(rename = "continue")]
    cont: Option<ListingContinue>,
}

#[derive(Debug, Deserialize)]
struct ListingQuery {
    categorymembers: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct ListingContinue {
    cmcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    extract: Option<String>,
}

/// [`WikiApi`] backed by the MediaWiki action api.
#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    /// The [`reqwest::Client`] that drives requests.
    client: Client,
    /// Url of the `api.php` endpoint.
    endpoint: Url,
}

impl MediaWikiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = Url::parse(config.api_endpoint())
            .with_context(|| format!("Invalid api endpoint {:?}", config.api_endpoint()))?;

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(
            USER_AGENT,
            config
                .user_agent()
                .parse()
                .context("Failed to parse user agent header.")?,
        );
        headers.insert(ACCEPT, "application/json".parse()?);

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, endpoint })
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn query<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, CatfreqError> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(params)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CatfreqError::NoHttpSuccess {
                status: resp.status(),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(CatfreqError::malformed)
    }
}

#[async_trait]
impl WikiApi for MediaWikiClient {
    async fn category_members(
        &self,
        category: &Category,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<MemberPage, CatfreqError> {
        let title = category.api_title();
        let limit = limit.to_string();
        let mut params = vec![
            ("action", "query"),
            ("format", "json"),
            ("list", "categorymembers"),
            ("cmtitle", title.as_str()),
            ("cmlimit", limit.as_str()),
            ("cmtype", "page"),
        ];
        if let Some(cursor) = cursor {
            params.push(("cmcontinue", cursor));
        }

        let resp: ListingResponse = self.query(&params).await?;
        let query = resp
            .query
            .ok_or_else(|| CatfreqError::malformed("listing without `query`"))?;

        Ok(MemberPage {
            members: query.categorymembers,
            next_cursor: resp.cont.and_then(|c| c.cmcontinue),
        })
    }

    async fn extract(&self, title: &str) -> Result<Option<String>, CatfreqError> {
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("exintro", "0"),
            ("titles", title),
        ];

        let resp: ExtractResponse = self.query(&params).await?;
        let query = resp
            .query
            .ok_or_else(|| CatfreqError::malformed("extract without `query`"))?;

        Ok(query
            .pages
            .into_iter()
            .filter_map(|(_, page)| page.extract)
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> MediaWikiClient {
        let config = Config::builder()
            .api_endpoint(format!("{}/w/api.php", server.uri()))
            .build();
        MediaWikiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn list_members() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "categorymembers"))
            .and(query_param("cmtitle", "Category:American silversmiths"))
            .and(query_param("cmcontinue", "page|2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "continue": { "cmcontinue": "page|3", "continue": "-||" },
                "query": { "categorymembers": [
                    { "pageid": 1, "ns": 0, "title": "Paul Revere" },
                    { "pageid": 2, "ns": 14, "title": "Category:Silversmiths from Boston" }
                ]}
            })))
            .mount(&server)
            .await;

        let category = Category::new("American silversmiths").unwrap();
        let page = client(&server)
            .await
            .category_members(&category, Some("page|2"), 500)
            .await
            .unwrap();

        assert_eq!(
            page.members,
            vec![
                Member::new("Paul Revere", 0),
                Member::new("Category:Silversmiths from Boston", 14)
            ]
        );
        assert!(page.members[0].is_article());
        assert!(!page.members[1].is_article());
        assert_eq!(page.next_cursor.as_deref(), Some("page|3"));
    }

    #[tokio::test]
    async fn last_listing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "batchcomplete": "",
                "query": { "categorymembers": [] }
            })))
            .mount(&server)
            .await;

        let category = Category::new("Empty").unwrap();
        let page = client(&server)
            .await
            .category_members(&category, None, 500)
            .await
            .unwrap();
        assert_eq!(page, MemberPage::default());
    }

    #[tokio::test]
    async fn fetch_extract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("prop", "extracts"))
            .and(query_param("titles", "Paul Revere"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "24387": {
                    "pageid": 24387, "ns": 0, "title": "Paul Revere",
                    "extract": "Paul Revere was an American silversmith."
                }}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("titles", "Nobody"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "-1": { "ns": 0, "title": "Nobody", "missing": "" }}}
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert_eq!(
            client.extract("Paul Revere").await.unwrap().as_deref(),
            Some("Paul Revere was an American silversmith.")
        );
        assert_eq!(client.extract("Nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("titles", "Busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("titles", "Garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("titles", "Error"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "code": "badvalue" }
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        match client.extract("Busy").await {
            Err(CatfreqError::NoHttpSuccess { status }) => assert_eq!(status.as_u16(), 503),
            other => panic!("unexpected {:?}", other),
        }
        for title in &["Garbage", "Error"] {
            match client.extract(title).await {
                Err(e @ CatfreqError::MalformedResponse { .. }) => assert!(e.is_transient()),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
