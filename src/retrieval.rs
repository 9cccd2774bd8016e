//! Work item retrieval: WIQL paging on an ID cursor, then batched fetches.
//!
//! A single WIQL call returns at most 20,000 rows, so IDs are pulled in pages
//! ordered by `[System.Id]`, each page asking only for IDs above the highest
//! one seen so far. Full records are then fetched 200 IDs at a time. Requests
//! are issued one after another and nothing is retried.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::api::{WorkTracker, MAX_BATCH};
use crate::error::DevOpsError;
use crate::model::query::{Assignee, WorkItemQuery};
use crate::model::work_item::{WorkItemId, WorkItemRecord};

/// One WIQL call for the page after `last_id`.
pub async fn run_query(
    tracker: &dyn WorkTracker,
    query: &WorkItemQuery,
    last_id: WorkItemId,
) -> Result<Vec<WorkItemId>, DevOpsError> {
    tracker.query_ids(&query.wiql(last_id)).await
}

/// Every ID matching `query`, following the cursor until the server runs dry.
///
/// Stops on an empty page, or on a page shorter than the tracker's requested
/// page size. A full page always means another round trip.
pub async fn fetch_all_ids(
    tracker: &dyn WorkTracker,
    query: &WorkItemQuery,
) -> Result<BTreeSet<WorkItemId>, DevOpsError> {
    let page_size = tracker.page_size();
    let mut last_id = WorkItemId(0);
    let mut collected = BTreeSet::new();
    let mut pages = 0usize;

    loop {
        let page = run_query(tracker, query, last_id).await?;
        pages += 1;
        debug!(page = pages, rows = page.len(), %last_id, "wiql page");

        let Some(max) = page.iter().copied().max() else {
            break;
        };
        if max <= last_id {
            return Err(DevOpsError::Decode {
                endpoint: "wiql",
                message: format!("page did not advance past id {last_id}"),
            });
        }

        collected.extend(page.iter().copied().filter(|id| *id > last_id));
        last_id = max;

        if page_size.is_some_and(|size| page.len() < size) {
            break;
        }
    }

    info!(
        item_type = %query.item_type,
        ids = collected.len(),
        pages,
        "id paging complete"
    );
    Ok(collected)
}

/// Full records for `ids`, at most [`MAX_BATCH`] per request. Output follows
/// batch order, then whatever order the server returns within a batch.
/// The first failing batch aborts the whole fetch.
pub async fn get_work_items(
    tracker: &dyn WorkTracker,
    ids: &[WorkItemId],
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    let mut records = Vec::with_capacity(ids.len());
    for (batch, chunk) in ids.chunks(MAX_BATCH).enumerate() {
        debug!(batch, count = chunk.len(), "fetching work item batch");
        let fetched = tracker
            .work_items(chunk, false)
            .await
            .map_err(|source| match source {
                DevOpsError::Auth { .. } => source,
                other => DevOpsError::Fetch {
                    batch,
                    count: chunk.len(),
                    source: Box::new(other),
                },
            })?;
        records.extend(fetched);
    }
    Ok(records)
}

async fn retrieve(
    tracker: &dyn WorkTracker,
    query: WorkItemQuery,
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    let ids: Vec<WorkItemId> = fetch_all_ids(tracker, &query).await?.into_iter().collect();
    let records = get_work_items(tracker, &ids).await?;
    info!(item_type = %query.item_type, records = records.len(), "work items retrieved");
    Ok(records)
}

pub async fn get_open_tasks(
    tracker: &dyn WorkTracker,
    assignee: Option<Assignee>,
    area_paths: &[String],
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    let query = WorkItemQuery::open_tasks()
        .with_assignee(assignee)
        .with_area_paths(area_paths.iter().cloned());
    retrieve(tracker, query).await
}

/// Open tasks assigned to whoever owns the credentials.
pub async fn get_my_open_tasks(
    tracker: &dyn WorkTracker,
    area_paths: &[String],
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    let me = tracker.whoami().await?;
    let assignee = match me.account {
        Some(account) => Assignee::Identity(account),
        None => {
            debug!(user = %me.display_name, id = %me.id, "no account name for caller, using @Me");
            Assignee::Me
        }
    };
    get_open_tasks(tracker, Some(assignee), area_paths).await
}

pub async fn get_open_epics(
    tracker: &dyn WorkTracker,
    area_paths: &[String],
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    let query = WorkItemQuery::open_epics().with_area_paths(area_paths.iter().cloned());
    retrieve(tracker, query).await
}
