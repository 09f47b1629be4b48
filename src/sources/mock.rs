//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Record, RecordBuilder, SourceKind};
use crate::sources::{Source, SourceError};

#[derive(Debug, Clone)]
enum MockResponse {
    Records(Vec<Record>),
    Fail(String),
    Delayed(Duration, Vec<Record>),
    Panic,
}

/// A mock source that returns predefined responses per keyword.
///
/// Keywords without a configured response yield no records.
#[derive(Debug)]
pub struct MockSource {
    kind: SourceKind,
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    /// Create a new mock source impersonating `kind`.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn set(&self, keyword: &str, response: MockResponse) {
        let mut guard = self.responses.lock().unwrap();
        guard.insert(keyword.to_string(), response);
    }

    /// Return `records` for `keyword`.
    pub fn set_records(&self, keyword: &str, records: Vec<Record>) {
        self.set(keyword, MockResponse::Records(records));
    }

    /// Fail requests for `keyword` with a network error.
    pub fn fail_keyword(&self, keyword: &str, message: &str) {
        self.set(keyword, MockResponse::Fail(message.to_string()));
    }

    /// Return `records` for `keyword` after sleeping for `delay`.
    pub fn delay_keyword(&self, keyword: &str, delay: Duration, records: Vec<Record>) {
        self.set(keyword, MockResponse::Delayed(delay, records));
    }

    /// Panic when `keyword` is requested.
    pub fn panic_on(&self, keyword: &str) {
        self.set(keyword, MockResponse::Panic);
    }

    /// Keywords requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Record>, SourceError> {
        self.calls.lock().unwrap().push(keyword.to_string());
        let response = self.responses.lock().unwrap().get(keyword).cloned();

        match response {
            None => Ok(Vec::new()),
            Some(MockResponse::Records(records)) => Ok(records),
            Some(MockResponse::Fail(message)) => Err(SourceError::Network(message)),
            Some(MockResponse::Delayed(delay, records)) => {
                tokio::time::sleep(delay).await;
                Ok(records)
            }
            Some(MockResponse::Panic) => panic!("mock source asked to panic for '{}'", keyword),
        }
    }
}

/// Helper function to create a record for testing.
pub fn make_record(source: SourceKind, keyword: &str, title: &str, doi: &str) -> Record {
    RecordBuilder::new(source, keyword)
        .title(title)
        .doi(doi)
        .build()
}
