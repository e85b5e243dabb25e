//! Registry source clients.

pub mod clinicaltrials;
pub mod mock;
pub mod registry;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use abtox_common::Result;

/// One page of a cursor-paginated studies search.
///
/// The two states are distinct so a continuation can never carry the
/// query term: cursor semantics live server-side and resending filter
/// parameters alongside the token would corrupt them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    First { query_term: String, page_size: usize },
    Continuation { page_token: String, page_size: usize },
}

impl PageRequest {
    pub fn first(query_term: &str, page_size: usize) -> Self {
        PageRequest::First {
            query_term: query_term.to_string(),
            page_size,
        }
    }

    /// The request for the page behind `page_token`, keeping the page size.
    pub fn continuation(&self, page_token: String) -> Self {
        PageRequest::Continuation {
            page_token,
            page_size: self.page_size(),
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            PageRequest::First { page_size, .. } | PageRequest::Continuation { page_size, .. } => *page_size,
        }
    }

    /// Query-string parameters for this request.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            PageRequest::First { query_term, page_size } => vec![
                ("query.term", query_term.clone()),
                ("pageSize", page_size.to_string()),
                ("format", "json".to_string()),
            ],
            PageRequest::Continuation { page_token, page_size } => vec![
                ("pageToken", page_token.clone()),
                ("pageSize", page_size.to_string()),
                ("format", "json".to_string()),
            ],
        }
    }
}

/// Body of a studies search response.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StudiesPage {
    #[serde(default)]
    pub studies: Vec<Value>,
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

impl StudiesPage {
    /// The continuation cursor, treating a blank token as absent.
    pub fn cursor(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Transport for studies search and study detail.
#[async_trait]
pub trait StudySource: Send + Sync {
    /// Fetch one search page. Transport failures are fatal for the run.
    async fn fetch_page(&self, request: &PageRequest) -> Result<StudiesPage>;

    /// Fetch the full record for one study; `None` if the registry has no such study.
    async fn fetch_study(&self, nct_id: &str) -> Result<Option<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_carries_query_term() {
        let req = PageRequest::first("antibody", 100);
        let pairs = req.query_pairs();
        assert!(pairs.contains(&("query.term", "antibody".to_string())));
        assert!(pairs.contains(&("pageSize", "100".to_string())));
        assert!(pairs.iter().all(|(k, _)| *k != "pageToken"));
    }

    #[test]
    fn test_continuation_never_carries_query_term() {
        let req = PageRequest::first("antibody", 50).continuation("abc123".to_string());
        assert_eq!(req.page_size(), 50);
        let pairs = req.query_pairs();
        assert!(pairs.contains(&("pageToken", "abc123".to_string())));
        assert!(pairs.iter().all(|(k, _)| *k != "query.term"));
    }

    #[test]
    fn test_blank_cursor_is_absent() {
        let page: StudiesPage = serde_json::from_str(r#"{"studies": [], "nextPageToken": "  "}"#).unwrap();
        assert_eq!(page.cursor(), None);
        let page: StudiesPage = serde_json::from_str(r#"{"nextPageToken": "tok"}"#).unwrap();
        assert!(page.studies.is_empty());
        assert_eq!(page.cursor(), Some("tok"));
    }
}
