//! In-memory `StudySource` for tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use abtox_common::{AbtoxError, Result};
use serde_json::Value;

use super::{PageRequest, StudiesPage, StudySource};

enum Scripted {
    Page(StudiesPage),
    TransportError(String),
}

/// Mock source that replays scripted pages in order and records every
/// request it receives. Once the script runs out it serves empty pages.
pub struct MockStudySource {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<PageRequest>>,
    details: HashMap<String, Value>,
    detail_requests: Mutex<Vec<String>>,
    fail_details: bool,
}

impl MockStudySource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            details: HashMap::new(),
            detail_requests: Mutex::new(Vec::new()),
            fail_details: false,
        }
    }

    /// Queue a page of studies with an optional continuation cursor.
    pub fn with_page(self, studies: Vec<Value>, next_page_token: Option<&str>) -> Self {
        self.push(Scripted::Page(StudiesPage {
            studies,
            next_page_token: next_page_token.map(String::from),
        }))
    }

    /// Queue a transport failure.
    pub fn with_transport_error(self, message: &str) -> Self {
        self.push(Scripted::TransportError(message.to_string()))
    }

    /// Register a full record served by `fetch_study`.
    pub fn with_detail(mut self, nct_id: &str, study: Value) -> Self {
        self.details.insert(nct_id.to_string(), study);
        self
    }

    /// Make every `fetch_study` call fail with a transport error.
    pub fn with_failing_details(mut self) -> Self {
        self.fail_details = true;
        self
    }

    fn push(self, item: Scripted) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }

    /// Every page request received so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// NCT ids passed to `fetch_study`, in order.
    pub fn detail_requests(&self) -> Vec<String> {
        self.detail_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MockStudySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StudySource for MockStudySource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<StudiesPage> {
        self.requests
            .lock()
            .map_err(|_| AbtoxError::Transport("mock request log poisoned".into()))?
            .push(request.clone());

        let next = self
            .script
            .lock()
            .map_err(|_| AbtoxError::Transport("mock script poisoned".into()))?
            .pop_front();

        match next {
            Some(Scripted::Page(page)) => Ok(page),
            Some(Scripted::TransportError(msg)) => Err(AbtoxError::Transport(msg)),
            None => Ok(StudiesPage::default()),
        }
    }

    async fn fetch_study(&self, nct_id: &str) -> Result<Option<Value>> {
        self.detail_requests
            .lock()
            .map_err(|_| AbtoxError::Transport("mock detail log poisoned".into()))?
            .push(nct_id.to_string());

        if self.fail_details {
            return Err(AbtoxError::Transport(format!("detail fetch for {nct_id} refused")));
        }
        Ok(self.details.get(nct_id).cloned())
    }
}
