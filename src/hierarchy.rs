use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::api::{WorkTracker, MAX_BATCH};
use crate::error::DevOpsError;
use crate::model::work_item::{WorkItemId, WorkItemRecord};
use crate::retrieval::get_work_items;

pub type ChildMap = HashMap<WorkItemId, Vec<WorkItemId>>;

/// Walks parent → child links below `root` breadth-first. Each item is
/// requested once, in batches of up to [`MAX_BATCH`].
pub async fn build_hierarchy(
    tracker: &dyn WorkTracker,
    root: WorkItemId,
) -> Result<ChildMap, DevOpsError> {
    let mut children: ChildMap = HashMap::new();
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut batch = 0usize;

    while !queue.is_empty() {
        let take = queue.len().min(MAX_BATCH);
        let ids: Vec<WorkItemId> = queue.drain(..take).collect();
        let records = tracker
            .work_items(&ids, true)
            .await
            .map_err(|source| match source {
                DevOpsError::Auth { .. } => source,
                other => DevOpsError::Fetch {
                    batch,
                    count: ids.len(),
                    source: Box::new(other),
                },
            })?;
        batch += 1;

        for record in &records {
            for child in record.child_ids() {
                children.entry(record.id).or_default().push(child);
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    debug!(%root, items = seen.len(), batches = batch, "hierarchy walked");
    Ok(children)
}

/// Every descendant of `root`, depth-first. Items reachable twice are listed once.
pub fn flatten(children: &ChildMap, root: WorkItemId) -> Vec<WorkItemId> {
    let mut out = Vec::new();
    let mut visited = HashSet::from([root]);
    let mut stack: Vec<WorkItemId> = children.get(&root).cloned().unwrap_or_default();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        out.push(id);
        if let Some(grandchildren) = children.get(&id) {
            stack.extend(grandchildren.iter().copied());
        }
    }
    out
}

/// Full records of everything below `root`.
pub async fn fetch_descendants(
    tracker: &dyn WorkTracker,
    root: WorkItemId,
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    fetch_descendants_of(tracker, &[root]).await
}

/// Full records of everything below any of `roots`, in ID order. Items
/// shared between roots are fetched once, in a single batched pass.
pub async fn fetch_descendants_of(
    tracker: &dyn WorkTracker,
    roots: &[WorkItemId],
) -> Result<Vec<WorkItemRecord>, DevOpsError> {
    let mut ids = BTreeSet::new();
    for &root in roots {
        let children = build_hierarchy(tracker, root).await?;
        ids.extend(flatten(&children, root));
    }
    let ids: Vec<WorkItemId> = ids.into_iter().collect();
    debug!(roots = roots.len(), descendants = ids.len(), "descendants collected");
    get_work_items(tracker, &ids).await
}
