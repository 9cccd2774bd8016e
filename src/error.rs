//! Errors raised on the retrieval path.
//!
//! Nothing here is retried. Each variant aborts the current operation and
//! surfaces to the CLI (stderr, non-zero exit) or to the dashboard footer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevOpsError {
    /// HTTP 401/403: the PAT is invalid, expired, or lacks Work Items (Read).
    #[error("authentication failed (HTTP {status}): check the personal access token")]
    Auth { status: u16 },

    /// The server rejected the request. `code` is the `VSnnnnnn` prefix of the
    /// server message when there is one (VS402337 = too many WIQL rows).
    #[error("request rejected by server (HTTP {status}): {message}")]
    Query {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// One batch of the work-items-by-ID fetch failed; the rest were skipped.
    #[error("failed to fetch work item batch {batch} ({count} ids): {source}")]
    Fetch {
        batch: usize,
        count: usize,
        #[source]
        source: Box<DevOpsError>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

impl DevOpsError {
    /// Builds a rejection from a non-success body, pulling out the ADO error
    /// message and code when the body is the usual JSON envelope.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "no response body".to_string()
                } else {
                    trimmed.chars().take(500).collect()
                }
            });
        let code = message
            .split(':')
            .next()
            .filter(|prefix| {
                prefix.len() > 2
                    && prefix.starts_with("VS")
                    && prefix[2..].chars().all(|c| c.is_ascii_digit())
            })
            .map(String::from);
        DevOpsError::Query {
            status,
            code,
            message,
        }
    }

    pub fn is_auth(&self) -> bool {
        match self {
            DevOpsError::Auth { .. } => true,
            DevOpsError::Fetch { source, .. } => source.is_auth(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_extracts_vs_code() {
        let body = r#"{"$id":"1","message":"VS402337: The number of work items returned exceeds the size limit of 20000.","typeKey":"WorkItemTrackingQueryResultSizeLimitExceededException","errorCode":0}"#;
        match DevOpsError::rejected(400, body) {
            DevOpsError::Query {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("VS402337"));
                assert!(message.contains("size limit of 20000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejected_without_json_keeps_raw_body() {
        let err = DevOpsError::rejected(500, "  gateway exploded \n");
        match err {
            DevOpsError::Query { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "gateway exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejected_with_empty_body() {
        let err = DevOpsError::rejected(404, "");
        assert_eq!(
            err.to_string(),
            "request rejected by server (HTTP 404): no response body"
        );
    }

    #[test]
    fn fetch_error_reports_batch_and_cause() {
        let err = DevOpsError::Fetch {
            batch: 2,
            count: 50,
            source: Box::new(DevOpsError::rejected(400, r#"{"message":"VS403474: too many ids"}"#)),
        };
        let text = err.to_string();
        assert!(text.contains("batch 2 (50 ids)"));
        assert!(text.contains("VS403474"));
        assert!(!err.is_auth());
    }

    #[test]
    fn auth_is_detected_through_fetch_wrapper() {
        let err = DevOpsError::Fetch {
            batch: 0,
            count: 200,
            source: Box::new(DevOpsError::Auth { status: 401 }),
        };
        assert!(err.is_auth());
    }
}
