use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{WorkTracker, MAX_BATCH};
use crate::error::DevOpsError;
use crate::model::work_item::{Identity, WorkItemId, WorkItemRecord};

enum Wiql {
    /// Replays canned pages in order, then empty pages.
    Scripted(VecDeque<Result<Vec<u64>, DevOpsError>>),
    /// Behaves like a server: honours the `[System.Id] > n` cursor and the page size.
    Server(Vec<u64>),
}

/// In-memory tracker that records every call it receives.
pub struct MockTracker {
    wiql: Mutex<Wiql>,
    page_size: Option<usize>,
    records: BTreeMap<WorkItemId, WorkItemRecord>,
    fail_batch: Option<usize>,
    pub wiql_calls: Arc<Mutex<Vec<String>>>,
    pub batch_calls: Arc<Mutex<Vec<Vec<WorkItemId>>>>,
    pub whoami_calls: Arc<Mutex<usize>>,
    identity: Identity,
}

impl MockTracker {
    fn with_wiql(wiql: Wiql) -> Self {
        Self {
            wiql: Mutex::new(wiql),
            page_size: None,
            records: BTreeMap::new(),
            fail_batch: None,
            wiql_calls: Arc::new(Mutex::new(Vec::new())),
            batch_calls: Arc::new(Mutex::new(Vec::new())),
            whoami_calls: Arc::new(Mutex::new(0)),
            identity: Identity {
                id: "user-1".into(),
                display_name: "Dana Ruiz".into(),
                account: Some("dana@example.com".into()),
            },
        }
    }

    pub fn with_pages(pages: Vec<Vec<u64>>) -> Self {
        Self::with_wiql(Wiql::Scripted(pages.into_iter().map(Ok).collect()))
    }

    pub fn failing_wiql(error: DevOpsError) -> Self {
        Self::with_wiql(Wiql::Scripted(VecDeque::from([Err(error)])))
    }

    pub fn serving(ids: Vec<u64>) -> Self {
        Self::with_wiql(Wiql::Server(ids))
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn fail_batch(mut self, index: usize) -> Self {
        self.fail_batch = Some(index);
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn record(mut self, json: serde_json::Value) -> Self {
        let record: WorkItemRecord = serde_json::from_value(json).unwrap();
        self.records.insert(record.id, record);
        self
    }

    pub fn wiql_call_count(&self) -> usize {
        self.wiql_calls.lock().unwrap().len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn record_for(&self, id: WorkItemId) -> WorkItemRecord {
        self.records.get(&id).cloned().unwrap_or_else(|| {
            serde_json::from_value(serde_json::json!({
                "id": id.0,
                "fields": { "System.Title": format!("Item {id}"), "System.State": "Active" }
            }))
            .unwrap()
        })
    }
}

fn cursor_of(wiql: &str) -> u64 {
    let marker = "[System.Id] > ";
    let start = wiql.find(marker).unwrap() + marker.len();
    wiql[start..]
        .split_whitespace()
        .next()
        .unwrap()
        .parse()
        .unwrap()
}

#[async_trait]
impl WorkTracker for MockTracker {
    fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    async fn query_ids(&self, wiql: &str) -> Result<Vec<WorkItemId>, DevOpsError> {
        self.wiql_calls.lock().unwrap().push(wiql.to_string());
        let mut source = self.wiql.lock().unwrap();
        let page = match &mut *source {
            Wiql::Scripted(pages) => pages.pop_front().unwrap_or(Ok(Vec::new()))?,
            Wiql::Server(ids) => {
                let cursor = cursor_of(wiql);
                let mut matching: Vec<u64> = ids.iter().copied().filter(|id| *id > cursor).collect();
                matching.sort_unstable();
                if let Some(size) = self.page_size {
                    matching.truncate(size);
                }
                matching
            }
        };
        Ok(page.into_iter().map(WorkItemId).collect())
    }

    async fn work_items(
        &self,
        ids: &[WorkItemId],
        _expand_relations: bool,
    ) -> Result<Vec<WorkItemRecord>, DevOpsError> {
        assert!(ids.len() <= MAX_BATCH, "batch of {} exceeds the server limit", ids.len());
        let index = {
            let mut calls = self.batch_calls.lock().unwrap();
            calls.push(ids.to_vec());
            calls.len() - 1
        };
        if self.fail_batch == Some(index) {
            return Err(DevOpsError::rejected(
                400,
                r#"{"message":"VS403474: batch rejected"}"#,
            ));
        }
        Ok(ids.iter().map(|id| self.record_for(*id)).collect())
    }

    async fn whoami(&self) -> Result<Identity, DevOpsError> {
        *self.whoami_calls.lock().unwrap() += 1;
        Ok(self.identity.clone())
    }
}

#[tokio::test]
async fn scripted_pages_run_out_into_empty_pages() {
    let tracker = MockTracker::with_pages(vec![vec![1, 2]]);
    assert_eq!(tracker.query_ids("x [System.Id] > 0 y").await.unwrap().len(), 2);
    assert!(tracker.query_ids("x [System.Id] > 2 y").await.unwrap().is_empty());
    assert_eq!(tracker.wiql_call_count(), 2);
}

#[tokio::test]
async fn serving_mode_honours_cursor_and_page_size() {
    let tracker = MockTracker::serving(vec![9, 3, 7, 1]).page_size(2);
    let page = tracker
        .query_ids("SELECT [System.Id] FROM WorkItems WHERE [System.Id] > 1 ORDER BY [System.Id] ASC")
        .await
        .unwrap();
    assert_eq!(page, vec![WorkItemId(3), WorkItemId(7)]);
}

#[tokio::test]
async fn unknown_ids_get_synthesized_records() {
    let tracker = MockTracker::with_pages(vec![])
        .record(serde_json::json!({ "id": 4, "fields": { "System.Title": "Known" } }));
    let records = tracker
        .work_items(&[WorkItemId(4), WorkItemId(5)], false)
        .await
        .unwrap();
    assert_eq!(records[0].title(), "Known");
    assert_eq!(records[1].title(), "Item 5");
}

#[tokio::test]
async fn failing_batch_is_reported_as_rejection() {
    let tracker = MockTracker::with_pages(vec![]).fail_batch(0);
    let err = tracker.work_items(&[WorkItemId(1)], false).await.unwrap_err();
    assert!(matches!(err, DevOpsError::Query { status: 400, .. }));
}
