pub mod client;

use async_trait::async_trait;

use crate::error::DevOpsError;
use crate::model::work_item::{Identity, WorkItemId, WorkItemRecord};

pub use client::AzureDevOpsClient;

/// Per-request ID limit of the work-items-by-ID endpoint. Larger requests
/// fail with a 400.
pub const MAX_BATCH: usize = 200;

/// Hard ceiling on rows returned by a single WIQL call (VS402337 beyond it).
pub const WIQL_PAGE_SIZE: usize = 20_000;

/// The three calls the retrieval path needs from a work tracking server.
#[async_trait]
pub trait WorkTracker: Send + Sync {
    /// Row limit this tracker asks for on each WIQL call, if any. A page
    /// shorter than this is the last one.
    fn page_size(&self) -> Option<usize> {
        None
    }

    /// Runs a WIQL query and returns the matching IDs in server order.
    async fn query_ids(&self, wiql: &str) -> Result<Vec<WorkItemId>, DevOpsError>;

    /// Fetches at most [`MAX_BATCH`] work items. With `expand_relations` the
    /// records carry their link list.
    async fn work_items(
        &self,
        ids: &[WorkItemId],
        expand_relations: bool,
    ) -> Result<Vec<WorkItemRecord>, DevOpsError>;

    /// Who the credentials belong to.
    async fn whoami(&self) -> Result<Identity, DevOpsError>;
}

#[cfg(test)]
pub mod tests;
