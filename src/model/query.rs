use std::fmt;

use super::work_item::WorkItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemType {
    Task,
    Epic,
}

impl WorkItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemType::Task => "Task",
            WorkItemType::Epic => "Epic",
        }
    }

    /// States that take an item of this type off the open list.
    fn closed_states(&self) -> &'static [&'static str] {
        match self {
            WorkItemType::Task => &["Closed"],
            WorkItemType::Epic => &["Closed", "Cancelled", "Removed"],
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignee {
    /// The `@Me` macro, resolved server-side against the PAT owner.
    Me,
    /// A unique name or display name as stored in `System.AssignedTo`.
    Identity(String),
}

/// Describes one of the two supported query shapes. Never mutated once built;
/// the paging cursor lives outside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemQuery {
    pub item_type: WorkItemType,
    pub open_only: bool,
    pub assignee: Option<Assignee>,
    pub area_paths: Vec<String>,
}

impl WorkItemQuery {
    pub fn open(item_type: WorkItemType) -> Self {
        Self {
            item_type,
            open_only: true,
            assignee: None,
            area_paths: Vec::new(),
        }
    }

    pub fn open_tasks() -> Self {
        Self::open(WorkItemType::Task)
    }

    pub fn open_epics() -> Self {
        Self::open(WorkItemType::Epic)
    }

    pub fn with_assignee(mut self, assignee: Option<Assignee>) -> Self {
        self.assignee = assignee;
        self
    }

    pub fn with_area_paths<I, S>(mut self, area_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.area_paths = area_paths.into_iter().map(Into::into).collect();
        self
    }

    /// The filter shared by every page, without the cursor bound.
    pub fn predicate(&self) -> String {
        let mut clauses = vec![
            "[System.TeamProject] = @project".to_string(),
            format!("[System.WorkItemType] = {}", quote(self.item_type.as_str())),
        ];

        if self.open_only {
            let states: Vec<String> = self
                .item_type
                .closed_states()
                .iter()
                .map(|s| quote(s))
                .collect();
            clauses.push(format!("[System.State] NOT IN ({})", states.join(", ")));
        }

        match &self.assignee {
            Some(Assignee::Me) => clauses.push("[System.AssignedTo] = @Me".to_string()),
            Some(Assignee::Identity(who)) => {
                clauses.push(format!("[System.AssignedTo] = {}", quote(who)))
            }
            None => {}
        }

        if !self.area_paths.is_empty() {
            let areas: Vec<String> = self
                .area_paths
                .iter()
                .map(|path| format!("[System.AreaPath] UNDER {}", quote(path)))
                .collect();
            clauses.push(format!("({})", areas.join(" OR ")));
        }

        clauses.join(" AND ")
    }

    /// Full WIQL for the page after `last_id`. Row limits go in the `$top` URL
    /// parameter; a `TOP` clause breaks the parser on some server versions.
    pub fn wiql(&self, last_id: WorkItemId) -> String {
        format!(
            "SELECT [System.Id] FROM WorkItems WHERE {} AND [System.Id] > {} ORDER BY [System.Id] ASC",
            self.predicate(),
            last_id
        )
    }
}

/// WIQL string literal; embedded single quotes are doubled.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
