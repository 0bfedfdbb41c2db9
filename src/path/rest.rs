//! REST index client
//!
//! Speaks the search index's HTTP API: `_mget` for existence checks,
//! newline-delimited `_bulk` for batched writes, and `_search` with a
//! scroll cursor for paged queries. A 400 response surfaces as
//! [`Error::IndexQueryMalformed`] carrying the offending body; transport
//! failures surface as [`Error::BackendUnavailable`].

use super::decompose::PathDocument;
use super::index::{IndexClient, SearchPage, SearchQuery, SCROLL_LIFETIME, SEARCH_PAGE_SIZE};
use crate::config::PathStoreConfig;
use crate::{Error, Result};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashSet;
use url::Url;

/// Index client over the remote HTTP API
#[derive(Debug, Clone)]
pub struct RestIndexClient {
    http: reqwest::Client,
    base: Url,
    index: String,
}

impl RestIndexClient {
    pub fn new(config: &PathStoreConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("invalid index url '{}': {e}", config.url)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            index: config.index.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("invalid index endpoint '{path}': {e}")))
    }

    /// Map a non-success response to a structured error.
    async fn check(&self, response: reqwest::Response, query: &Value) -> Result<Value> {
        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(Error::IndexQueryMalformed {
                query: query.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::BackendUnavailable(format!(
                "index returned {status}"
            )));
        }
        Ok(response.json::<Value>().await?)
    }

    fn query_body(&self, query: &SearchQuery) -> Value {
        let mut filters = vec![
            json!({"term": {"tenant": query.tenant}}),
            json!({"term": {"depth": query.depth}}),
            json!({"regexp": {"path": query.regex}}),
        ];
        if query.leafs_only {
            filters.push(json!({"term": {"leaf": true}}));
        }
        json!({
            "size": SEARCH_PAGE_SIZE,
            "query": {"bool": {"filter": filters}},
        })
    }

    fn parse_page(&self, body: &Value) -> Result<SearchPage> {
        let hits = body
            .get("hits")
            .ok_or_else(|| Error::Serialization("search response missing hits".to_string()))?;

        // ES7 reports total as {"value": n}, older servers as a bare number
        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
            Some(Value::Object(o)) => o
                .get("value")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
            _ => 0,
        };

        let docs = hits
            .get("hits")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("_source"))
                    .filter_map(|source| serde_json::from_value(source.clone()).ok())
                    .collect::<Vec<PathDocument>>()
            })
            .unwrap_or_default();

        let scroll_id = body
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|_| !docs.is_empty());

        Ok(SearchPage {
            total,
            docs,
            scroll_id,
        })
    }
}

#[async_trait]
impl IndexClient for RestIndexClient {
    async fn exists(&self, id: &str) -> Result<bool> {
        let url = self.endpoint(&format!("{}/_doc/{}", self.index, id))?;
        let response = self.http.head(url).send().await?;
        Ok(response.status().is_success())
    }

    async fn multi_get(&self, ids: &[String]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let url = self.endpoint(&format!("{}/_mget", self.index))?;
        let body = json!({"ids": ids});
        let response = self.http.post(url).json(&body).send().await?;
        let parsed = self.check(response, &body).await?;

        let mut existing = HashSet::new();
        if let Some(docs) = parsed.get("docs").and_then(Value::as_array) {
            for doc in docs {
                let found = doc.get("found").and_then(Value::as_bool).unwrap_or(false);
                if found {
                    if let Some(id) = doc.get("_id").and_then(Value::as_str) {
                        existing.insert(id.to_string());
                    }
                }
            }
        }
        Ok(existing)
    }

    async fn put(&self, doc: &PathDocument) -> Result<()> {
        let url = self.endpoint(&format!("{}/_doc/{}", self.index, doc.id()))?;
        let body = serde_json::to_value(doc)?;
        let response = self.http.put(url).json(&body).send().await?;
        self.check(response, &body).await?;
        Ok(())
    }

    async fn bulk_upsert(&self, docs: &[PathDocument]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let mut ndjson = String::new();
        for doc in docs {
            let action = json!({"index": {"_index": self.index, "_id": doc.id()}});
            ndjson.push_str(&action.to_string());
            ndjson.push('\n');
            ndjson.push_str(&serde_json::to_string(doc)?);
            ndjson.push('\n');
        }

        let url = self.endpoint("_bulk")?;
        let response = self
            .http
            .post(url)
            .header("content-type", "application/x-ndjson")
            .body(ndjson)
            .send()
            .await?;
        let parsed = self.check(response, &Value::Null).await?;

        if parsed
            .get("errors")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(Error::BackendUnavailable(
                "bulk index write reported item errors".to_string(),
            ));
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let url = self.endpoint(&format!(
            "{}/_search?scroll={}",
            self.index, SCROLL_LIFETIME
        ))?;
        let body = self.query_body(query);
        let response = self.http.post(url).json(&body).send().await?;
        let parsed = self.check(response, &body).await?;
        self.parse_page(&parsed)
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage> {
        let url = self.endpoint("_search/scroll")?;
        let body = json!({"scroll": SCROLL_LIFETIME, "scroll_id": scroll_id});
        let response = self.http.post(url).json(&body).send().await?;
        let parsed = self.check(response, &body).await?;
        self.parse_page(&parsed)
    }
}
