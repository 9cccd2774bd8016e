use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned work item number. Monotonic, so it doubles as the paging cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub u64);

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorkItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

pub const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub rel: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Relation {
    /// Target ID taken from the last path segment of the relation URL.
    pub fn target_id(&self) -> Option<WorkItemId> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<u64>().ok())
            .map(WorkItemId)
    }
}

/// A work item exactly as the server returned it. Fields stay an open-ended map;
/// the accessors below only cover what the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub id: WorkItemId,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkItemRecord {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn title(&self) -> &str {
        self.field_str("System.Title").unwrap_or_default()
    }

    pub fn state(&self) -> &str {
        self.field_str("System.State").unwrap_or_default()
    }

    pub fn work_item_type(&self) -> &str {
        self.field_str("System.WorkItemType").unwrap_or_default()
    }

    /// Area path, or `None` when the server left it blank.
    pub fn area_path(&self) -> Option<&str> {
        self.field_str("System.AreaPath").filter(|s| !s.is_empty())
    }

    /// `System.AssignedTo` is an identity object on current API versions and a
    /// plain "Name <email>" string on older ones.
    pub fn assigned_to(&self) -> Option<&str> {
        match self.fields.get("System.AssignedTo")? {
            Value::Object(identity) => identity.get("displayName").and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        self.date_field("System.CreatedDate")
    }

    pub fn changed_date(&self) -> Option<DateTime<Utc>> {
        self.date_field("System.ChangedDate")
    }

    fn date_field(&self, name: &str) -> Option<DateTime<Utc>> {
        let raw = self.field_str(name)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn child_ids(&self) -> impl Iterator<Item = WorkItemId> + '_ {
        self.relations
            .iter()
            .filter(|r| r.rel == HIERARCHY_FORWARD)
            .filter_map(Relation::target_id)
    }
}

/// The authenticated caller, as reported by `_apis/connectionData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    /// Sign-in name (usually an email). Usable in `[System.AssignedTo] = '...'`.
    pub account: Option<String>,
}
