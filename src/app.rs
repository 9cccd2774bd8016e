use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::client::{clean_org_url, edit_url};
use crate::api::{AzureDevOpsClient, WorkTracker};
use crate::config::Credentials;
use crate::error::DevOpsError;
use crate::event::KeyAction;
use crate::hierarchy;
use crate::kpi::{self, Kpis, UNSPECIFIED_AREA};
use crate::model::work_item::{WorkItemId, WorkItemRecord};
use crate::retrieval;

pub const ALL_AREAS: &str = "<All Areas>";

#[derive(Debug, Clone)]
pub enum Action {
    Key(KeyAction),
    /// Redraw only.
    Tick,
    EpicsLoaded(Vec<WorkItemRecord>),
    ChildrenLoaded(WorkItemId, Vec<WorkItemRecord>),
    /// Descendants of every epic shown for `area` (`None` = all areas).
    AreaKpisLoaded {
        area: Option<String>,
        epics: usize,
        items: Vec<WorkItemRecord>,
    },
    FetchError(String),
    /// The server refused the PAT.
    AuthRejected(String),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Areas,
    Epics,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    OrgUrl,
    Project,
    Pat,
}

impl SettingsField {
    pub const ALL: [SettingsField; 3] = [SettingsField::OrgUrl, SettingsField::Project, SettingsField::Pat];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::OrgUrl => "Organization URL",
            SettingsField::Project => "Project Name",
            SettingsField::Pat => "Personal Access Token",
        }
    }

    fn next(&self) -> Self {
        match self {
            SettingsField::OrgUrl => SettingsField::Project,
            SettingsField::Project => SettingsField::Pat,
            SettingsField::Pat => SettingsField::OrgUrl,
        }
    }
}

/// Connection form shown in the sidebar popup. The PAT buffer is only ever
/// rendered masked.
#[derive(Debug, Default)]
pub struct SettingsForm {
    pub org_url: String,
    pub project: String,
    pub pat: String,
    pub active: Option<SettingsField>,
}

impl SettingsForm {
    pub fn value(&self, field: SettingsField) -> &str {
        match field {
            SettingsField::OrgUrl => &self.org_url,
            SettingsField::Project => &self.project,
            SettingsField::Pat => &self.pat,
        }
    }

    fn value_mut(&mut self, field: SettingsField) -> &mut String {
        match field {
            SettingsField::OrgUrl => &mut self.org_url,
            SettingsField::Project => &mut self.project,
            SettingsField::Pat => &mut self.pat,
        }
    }

    fn credentials(&self) -> Option<Credentials> {
        let org_url = self.org_url.trim();
        let project = self.project.trim();
        let pat = self.pat.trim();
        if org_url.is_empty() || project.is_empty() || pat.is_empty() {
            return None;
        }
        Some(Credentials {
            org_url: org_url.to_string(),
            project: project.to_string(),
            pat: SecretString::from(pat.to_string()),
        })
    }
}

pub struct EpicDetail {
    pub epic_id: WorkItemId,
    /// Descendants, most recently changed first.
    pub children: Vec<WorkItemRecord>,
    pub kpis: Kpis,
}

/// KPI banner for the area filter it was computed under.
pub struct AreaKpis {
    pub area: Option<String>,
    pub epics: usize,
    pub kpis: Kpis,
}

pub struct App {
    pub org_url: String,
    pub project: String,
    pub epics: Vec<WorkItemRecord>,
    pub area_counts: Vec<(String, usize)>,
    /// `None` shows every area.
    pub area_filter: Option<String>,
    pub area_cursor: usize,
    pub selected_epic: usize,
    pub focus: Focus,
    pub loading: bool,
    pub detail_loading: bool,
    pub detail: Option<EpicDetail>,
    pub area_loading: bool,
    pub area_kpis: Option<AreaKpis>,
    pub show_glossary: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub flash_message: Option<(String, Instant)>,
    pub settings: SettingsForm,
    pub should_quit: bool,
    pub action_tx: mpsc::UnboundedSender<Action>,
    area_chosen: bool,
    tracker: Option<Arc<dyn WorkTracker>>,
}

impl App {
    pub fn new(credentials: Option<Credentials>, action_tx: mpsc::UnboundedSender<Action>) -> Self {
        match credentials {
            Some(credentials) => {
                let tracker: Arc<dyn WorkTracker> = Arc::new(AzureDevOpsClient::new(&credentials));
                Self::with_tracker(tracker, &credentials.org_url, &credentials.project, action_tx)
            }
            None => {
                let mut app = Self::blank(action_tx);
                app.focus = Focus::Settings;
                app.settings.active = Some(SettingsField::OrgUrl);
                app.flash("Configure URL, Project, PAT.");
                app
            }
        }
    }

    pub fn with_tracker(
        tracker: Arc<dyn WorkTracker>,
        org_url: &str,
        project: &str,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        let mut app = Self::blank(action_tx);
        app.org_url = clean_org_url(org_url);
        app.project = project.to_string();
        app.settings.org_url = app.org_url.clone();
        app.settings.project = project.to_string();
        app.tracker = Some(tracker);
        app
    }

    fn blank(action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            org_url: String::new(),
            project: String::new(),
            epics: Vec::new(),
            area_counts: Vec::new(),
            area_filter: None,
            area_cursor: 0,
            selected_epic: 0,
            focus: Focus::Areas,
            loading: false,
            detail_loading: false,
            detail: None,
            area_loading: false,
            area_kpis: None,
            show_glossary: false,
            last_sync: None,
            flash_message: None,
            settings: SettingsForm::default(),
            should_quit: false,
            action_tx,
            area_chosen: false,
            tracker: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn busy(&self) -> bool {
        self.loading || self.detail_loading || self.area_loading
    }

    fn flash(&mut self, msg: impl Into<String>) {
        self.flash_message = Some((msg.into(), Instant::now()));
    }

    /// Sidebar entries: "All Areas" followed by each area, largest first.
    pub fn area_options(&self) -> Vec<(&str, usize)> {
        let total = self.epics.len();
        std::iter::once((ALL_AREAS, total))
            .chain(self.area_counts.iter().map(|(name, n)| (name.as_str(), *n)))
            .collect()
    }

    pub fn visible_epics(&self) -> Vec<&WorkItemRecord> {
        self.epics
            .iter()
            .filter(|e| match &self.area_filter {
                None => true,
                Some(area) => e.area_path().unwrap_or(UNSPECIFIED_AREA) == area,
            })
            .collect()
    }

    pub fn selected_epic_record(&self) -> Option<&WorkItemRecord> {
        self.visible_epics().get(self.selected_epic).copied()
    }

    pub fn edit_url(&self, id: WorkItemId) -> String {
        edit_url(&self.org_url, &self.project, id)
    }

    pub async fn update(&mut self, action: Action) {
        if let Some((_, t)) = &self.flash_message {
            if t.elapsed().as_secs() >= 5 {
                self.flash_message = None;
            }
        }

        match action {
            Action::Key(key) => self.handle_key(key),
            Action::Tick => {}
            Action::EpicsLoaded(epics) => self.apply_epics(epics),
            Action::ChildrenLoaded(epic_id, children) => {
                self.detail_loading = false;
                self.apply_children(epic_id, children, Utc::now());
                self.ensure_area_kpis();
            }
            Action::AreaKpisLoaded { area, epics, items } => {
                self.area_loading = false;
                self.area_kpis = Some(AreaKpis {
                    area,
                    epics,
                    kpis: kpi::compute(&items, Utc::now()),
                });
                // The filter may have moved while this was loading.
                self.ensure_area_kpis();
            }
            Action::FetchError(msg) => {
                // Keep whatever was on screen from the last good load.
                self.stop_loading();
                self.flash(format!("Fetch error: {msg}"));
            }
            Action::AuthRejected(msg) => {
                self.stop_loading();
                self.flash(msg);
                self.focus = Focus::Settings;
                self.settings.active = Some(SettingsField::Pat);
            }
            Action::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn stop_loading(&mut self) {
        self.loading = false;
        self.detail_loading = false;
        self.area_loading = false;
    }

    fn apply_epics(&mut self, epics: Vec<WorkItemRecord>) {
        self.loading = false;
        self.area_kpis = None;
        self.last_sync = Some(Utc::now());
        self.epics = epics.into_iter().filter(|e| e.state() != "Removed").collect();
        self.area_counts = kpi::area_counts(&self.epics);

        let keep = self
            .area_filter
            .as_ref()
            .filter(|area| self.area_chosen && self.area_counts.iter().any(|(n, _)| n == *area))
            .cloned();
        self.area_filter = match keep {
            Some(area) => Some(area),
            None if self.area_chosen && self.area_filter.is_none() => None,
            None => kpi::fewest_area(&self.area_counts).map(String::from),
        };
        self.area_cursor = match &self.area_filter {
            None => 0,
            Some(area) => self
                .area_counts
                .iter()
                .position(|(n, _)| n == area)
                .map_or(0, |i| i + 1),
        };

        let visible = self.visible_epics().len();
        if self.selected_epic >= visible {
            self.selected_epic = visible.saturating_sub(1);
        }
        info!(epics = self.epics.len(), areas = self.area_counts.len(), "epics loaded");
        self.ensure_area_kpis();
    }

    fn apply_children(&mut self, epic_id: WorkItemId, mut children: Vec<WorkItemRecord>, now: DateTime<Utc>) {
        children.sort_by(|a, b| b.changed_date().cmp(&a.changed_date()));
        let kpis = kpi::compute(&children, now);
        self.detail = Some(EpicDetail {
            epic_id,
            children,
            kpis,
        });
    }

    fn handle_key(&mut self, key: KeyAction) {
        if self.focus == Focus::Settings {
            self.handle_settings_key(key);
            return;
        }
        if self.show_glossary {
            match key {
                KeyAction::Char('g') | KeyAction::Escape => self.show_glossary = false,
                KeyAction::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key {
            KeyAction::Up => match self.focus {
                Focus::Areas => self.area_cursor = self.area_cursor.saturating_sub(1),
                Focus::Epics => self.selected_epic = self.selected_epic.saturating_sub(1),
                Focus::Settings => {}
            },
            KeyAction::Down => match self.focus {
                Focus::Areas => {
                    if self.area_cursor + 1 < self.area_options().len() {
                        self.area_cursor += 1;
                    }
                }
                Focus::Epics => {
                    if self.selected_epic + 1 < self.visible_epics().len() {
                        self.selected_epic += 1;
                    }
                }
                Focus::Settings => {}
            },
            KeyAction::Left => self.focus = Focus::Areas,
            KeyAction::Right => self.focus = Focus::Epics,
            KeyAction::Tab => {
                self.focus = match self.focus {
                    Focus::Areas => Focus::Epics,
                    _ => Focus::Areas,
                }
            }
            KeyAction::Select => match self.focus {
                Focus::Areas => self.choose_area(),
                Focus::Epics => self.load_selected_epic(),
                Focus::Settings => {}
            },
            KeyAction::Escape => self.detail = None,
            KeyAction::Char('q') => self.should_quit = true,
            KeyAction::Char('r') => self.refresh_epics(),
            KeyAction::Char('g') => self.show_glossary = true,
            KeyAction::Char('e') => {
                self.focus = Focus::Settings;
                self.settings.active = Some(SettingsField::OrgUrl);
            }
            KeyAction::Char(_) | KeyAction::Backspace => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyAction) {
        let field = self.settings.active.unwrap_or(SettingsField::OrgUrl);
        match key {
            KeyAction::Tab | KeyAction::Down => self.settings.active = Some(field.next()),
            KeyAction::Up => {
                self.settings.active = Some(field.next().next());
            }
            KeyAction::Char(c) => self.settings.value_mut(field).push(c),
            KeyAction::Backspace => {
                self.settings.value_mut(field).pop();
            }
            KeyAction::Escape => {
                self.settings.active = None;
                self.focus = Focus::Areas;
            }
            KeyAction::Select => self.apply_settings(),
            KeyAction::Left | KeyAction::Right => {}
        }
    }

    fn apply_settings(&mut self) {
        let Some(credentials) = self.settings.credentials() else {
            self.flash("Organization URL, project and PAT are all required");
            return;
        };
        if self.busy() {
            self.flash("Still loading, try again in a moment");
            return;
        }
        info!(org = %credentials.org_url, project = %credentials.project, "connection settings changed");
        self.org_url = clean_org_url(&credentials.org_url);
        self.project = credentials.project.clone();
        self.tracker = Some(Arc::new(AzureDevOpsClient::new(&credentials)));
        self.settings.pat.clear();
        self.settings.active = None;
        self.focus = Focus::Areas;
        self.epics.clear();
        self.area_counts.clear();
        self.area_filter = None;
        self.area_chosen = false;
        self.area_kpis = None;
        self.detail = None;
        self.refresh_epics();
    }

    fn choose_area(&mut self) {
        self.area_chosen = true;
        self.area_filter = if self.area_cursor == 0 {
            None
        } else {
            self.area_counts
                .get(self.area_cursor - 1)
                .map(|(name, _)| name.clone())
        };
        self.selected_epic = 0;
        self.detail = None;
        self.focus = Focus::Epics;
        self.ensure_area_kpis();
    }

    /// Re-runs the open epic query in the background. Ignored while a load is
    /// already running so only one request is ever in flight.
    pub fn refresh_epics(&mut self) {
        if self.busy() {
            return;
        }
        let Some(tracker) = self.tracker.clone() else {
            self.flash("Not connected: press e to configure");
            return;
        };
        self.loading = true;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match retrieval::get_open_epics(tracker.as_ref(), &[]).await {
                Ok(epics) => Action::EpicsLoaded(epics),
                Err(e) => {
                    warn!(error = %e, "epic refresh failed");
                    failure(e)
                }
            };
            let _ = tx.send(action);
        });
    }

    fn load_selected_epic(&mut self) {
        if self.busy() {
            return;
        }
        let Some(epic_id) = self.selected_epic_record().map(|e| e.id) else {
            return;
        };
        let Some(tracker) = self.tracker.clone() else {
            return;
        };
        self.detail_loading = true;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = match hierarchy::fetch_descendants(tracker.as_ref(), epic_id).await {
                Ok(children) => Action::ChildrenLoaded(epic_id, children),
                Err(e) => {
                    warn!(error = %e, %epic_id, "hierarchy load failed");
                    failure(e)
                }
            };
            let _ = tx.send(action);
        });
    }

    /// Starts the KPI load for the current area unless the banner already
    /// matches it. Waits for any running load to finish first.
    fn ensure_area_kpis(&mut self) {
        if self.busy() || self.epics.is_empty() {
            return;
        }
        if self
            .area_kpis
            .as_ref()
            .is_some_and(|k| k.area == self.area_filter)
        {
            return;
        }
        let Some(tracker) = self.tracker.clone() else {
            return;
        };
        let area = self.area_filter.clone();
        let roots: Vec<WorkItemId> = self.visible_epics().iter().map(|e| e.id).collect();
        self.area_loading = true;
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let epics = roots.len();
            let action = match hierarchy::fetch_descendants_of(tracker.as_ref(), &roots).await {
                Ok(items) => Action::AreaKpisLoaded { area, epics, items },
                Err(e) => {
                    warn!(error = %e, epics, "area kpi load failed");
                    failure(e)
                }
            };
            let _ = tx.send(action);
        });
    }
}

fn failure(e: DevOpsError) -> Action {
    if e.is_auth() {
        Action::AuthRejected(e.to_string())
    } else {
        Action::FetchError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::MockTracker;

    fn epic(id: u64, area: Option<&str>, state: &str) -> serde_json::Value {
        let mut fields = serde_json::json!({
            "System.Title": format!("Epic {id}"),
            "System.State": state,
            "System.WorkItemType": "Epic",
        });
        if let Some(area) = area {
            fields["System.AreaPath"] = serde_json::json!(area);
        }
        serde_json::json!({ "id": id, "fields": fields })
    }

    fn records(values: Vec<serde_json::Value>) -> Vec<WorkItemRecord> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    fn sample() -> Vec<WorkItemRecord> {
        records(vec![
            epic(1, Some("P\\Big"), "Active"),
            epic(2, Some("P\\Big"), "New"),
            epic(3, Some("P\\Big"), "Active"),
            epic(4, Some("P\\Small"), "Active"),
            epic(5, None, "Active"),
            epic(6, None, "New"),
            epic(7, Some("P\\Gone"), "Removed"),
        ])
    }

    fn app_with(tracker: MockTracker) -> (App, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::with_tracker(Arc::new(tracker), "https://dev.azure.com/org", "Proj", tx);
        (app, rx)
    }

    #[tokio::test]
    async fn loaded_epics_default_to_quietest_area() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::EpicsLoaded(sample())).await;

        assert!(!app.loading);
        assert_eq!(app.epics.len(), 6, "removed epics are dropped");
        assert_eq!(app.area_filter.as_deref(), Some("P\\Small"));
        assert_eq!(app.area_options()[app.area_cursor].0, "P\\Small");
        let visible: Vec<u64> = app.visible_epics().iter().map(|e| e.id.0).collect();
        assert_eq!(visible, vec![4]);
        assert!(app.last_sync.is_some());
    }

    #[tokio::test]
    async fn all_areas_option_lists_everything() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::EpicsLoaded(sample())).await;

        app.focus = Focus::Areas;
        for _ in 0..5 {
            app.update(Action::Key(KeyAction::Up)).await;
        }
        app.update(Action::Key(KeyAction::Select)).await;

        assert_eq!(app.area_filter, None);
        assert_eq!(app.focus, Focus::Epics);
        assert_eq!(app.visible_epics().len(), 6);
        assert_eq!(app.area_options()[0], (ALL_AREAS, 6));
    }

    #[tokio::test]
    async fn chosen_area_survives_refresh() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::EpicsLoaded(sample())).await;

        // options: All, P\Big(3), Unspecified(2), P\Small(1)
        app.area_cursor = 1;
        app.update(Action::Key(KeyAction::Select)).await;
        assert_eq!(app.area_filter.as_deref(), Some("P\\Big"));

        app.update(Action::EpicsLoaded(sample())).await;
        assert_eq!(app.area_filter.as_deref(), Some("P\\Big"));
        assert_eq!(app.area_cursor, 1);
    }

    #[tokio::test]
    async fn unspecified_area_filters_blank_paths() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::EpicsLoaded(sample())).await;
        app.area_cursor = 2;
        app.update(Action::Key(KeyAction::Select)).await;
        let visible: Vec<u64> = app.visible_epics().iter().map(|e| e.id.0).collect();
        assert_eq!(visible, vec![5, 6]);
    }

    #[tokio::test]
    async fn fetch_error_keeps_previous_data() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::EpicsLoaded(sample())).await;
        app.loading = true;

        app.update(Action::FetchError("boom".into())).await;

        assert!(!app.loading);
        assert_eq!(app.epics.len(), 6);
        let (msg, _) = app.flash_message.as_ref().unwrap();
        assert!(msg.contains("boom"));
    }

    #[tokio::test]
    async fn refresh_runs_epic_query_once_at_a_time() {
        let tracker = MockTracker::with_pages(vec![vec![1, 2], vec![]]);
        let calls = tracker.wiql_calls.clone();
        let (mut app, mut rx) = app_with(tracker);

        app.update(Action::Key(KeyAction::Char('r'))).await;
        assert!(app.loading);
        // A second press while loading is ignored.
        app.update(Action::Key(KeyAction::Char('r'))).await;

        let action = rx.recv().await.unwrap();
        assert!(matches!(&action, Action::EpicsLoaded(epics) if epics.len() == 2));
        app.update(action).await;

        assert!(!app.loading);
        assert_eq!(calls.lock().unwrap().len(), 2);
        assert!(calls.lock().unwrap()[0].contains("'Epic'"));
    }

    #[tokio::test]
    async fn selecting_an_epic_loads_its_descendants() {
        let tracker = MockTracker::with_pages(vec![])
            .record(serde_json::json!({
                "id": 4,
                "fields": { "System.Title": "Epic 4" },
                "relations": [
                    { "rel": "System.LinkTypes.Hierarchy-Forward", "url": "https://x/_apis/wit/workItems/40" }
                ]
            }))
            .record(serde_json::json!({
                "id": 40,
                "fields": { "System.Title": "Child", "System.State": "Closed", "System.WorkItemType": "Task" }
            }));
        let (mut app, mut rx) = app_with(tracker);
        app.update(Action::EpicsLoaded(sample())).await;

        // Loading the epics also computes the banner for P\Small (epic 4 only).
        assert!(app.area_loading);
        let action = rx.recv().await.unwrap();
        app.update(action).await;
        let banner = app.area_kpis.as_ref().unwrap();
        assert_eq!(banner.area.as_deref(), Some("P\\Small"));
        assert_eq!(banner.epics, 1);
        assert_eq!(banner.kpis.closed, 1);

        app.update(Action::Key(KeyAction::Tab)).await;
        assert_eq!(app.focus, Focus::Epics);
        app.update(Action::Key(KeyAction::Select)).await;
        assert!(app.detail_loading);

        let action = rx.recv().await.unwrap();
        app.update(action).await;

        let detail = app.detail.as_ref().unwrap();
        assert_eq!(detail.epic_id, WorkItemId(4));
        assert_eq!(detail.children.len(), 1);
        assert_eq!(detail.kpis.closed, 1);
        assert_eq!(detail.kpis.pct_complete, 100.0);
        assert!(!app.detail_loading);
    }

    #[tokio::test]
    async fn settings_form_requires_every_field() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, tx);
        assert_eq!(app.focus, Focus::Settings);
        assert!(!app.connected());

        for c in "https://dev.azure.com/org/".chars() {
            app.update(Action::Key(KeyAction::Char(c))).await;
        }
        app.update(Action::Key(KeyAction::Tab)).await;
        for c in "Proj".chars() {
            app.update(Action::Key(KeyAction::Char(c))).await;
        }
        app.update(Action::Key(KeyAction::Select)).await;
        assert!(!app.connected(), "PAT still missing");
        // 'q' is text while the form is open.
        app.update(Action::Key(KeyAction::Tab)).await;
        app.update(Action::Key(KeyAction::Char('q'))).await;
        assert!(!app.should_quit);
        assert_eq!(app.settings.pat, "q");

        app.update(Action::Key(KeyAction::Select)).await;
        assert!(app.connected());
        assert_eq!(app.org_url, "https://dev.azure.com/org");
        assert_eq!(app.project, "Proj");
        assert!(app.settings.pat.is_empty(), "PAT buffer is cleared once applied");
        assert_eq!(app.focus, Focus::Areas);
        assert!(app.loading);
    }

    #[tokio::test]
    async fn refresh_without_connection_flashes_hint() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, tx);
        app.update(Action::Key(KeyAction::Escape)).await;
        app.update(Action::Key(KeyAction::Char('r'))).await;
        assert!(!app.loading);
        let (msg, _) = app.flash_message.as_ref().unwrap();
        assert!(msg.contains("Not connected"));
    }

    #[test]
    fn children_sorted_newest_change_first() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, tx);
        let children = records(vec![
            serde_json::json!({ "id": 1, "fields": { "System.ChangedDate": "2024-01-01T00:00:00Z" } }),
            serde_json::json!({ "id": 2, "fields": { "System.ChangedDate": "2024-03-01T00:00:00Z" } }),
            serde_json::json!({ "id": 3, "fields": { "System.ChangedDate": "2024-02-01T00:00:00Z" } }),
        ]);
        app.apply_children(WorkItemId(9), children, Utc::now());
        let order: Vec<u64> = app.detail.as_ref().unwrap().children.iter().map(|c| c.id.0).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn q_quits_outside_settings() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::Key(KeyAction::Char('q'))).await;
        assert!(app.should_quit);
    }

    fn linked_epic(id: u64, area: &str, children: &[u64]) -> serde_json::Value {
        let mut value = epic(id, Some(area), "Active");
        value["relations"] = children
            .iter()
            .map(|c| {
                serde_json::json!({
                    "rel": "System.LinkTypes.Hierarchy-Forward",
                    "url": format!("https://x/_apis/wit/workItems/{c}")
                })
            })
            .collect();
        value
    }

    #[tokio::test]
    async fn choosing_an_area_recomputes_kpis_over_its_epics() {
        let epics = vec![
            linked_epic(1, "P\\A", &[10]),
            linked_epic(2, "P\\A", &[20]),
            linked_epic(3, "P\\B", &[30]),
        ];
        let mut tracker = MockTracker::with_pages(vec![]).record(serde_json::json!({
            "id": 20,
            "fields": { "System.State": "Closed", "System.WorkItemType": "Task" }
        }));
        for e in &epics {
            tracker = tracker.record(e.clone());
        }
        let batches = tracker.batch_calls.clone();
        let (mut app, mut rx) = app_with(tracker);

        app.update(Action::EpicsLoaded(records(epics))).await;
        let action = rx.recv().await.unwrap();
        app.update(action).await;
        let banner = app.area_kpis.as_ref().unwrap();
        assert_eq!(banner.area.as_deref(), Some("P\\B"));
        assert_eq!(banner.kpis.total, 1);

        // options: All, P\A(2), P\B(1)
        app.focus = Focus::Areas;
        app.area_cursor = 0;
        app.update(Action::Key(KeyAction::Select)).await;
        assert!(app.area_loading);
        let action = rx.recv().await.unwrap();
        app.update(action).await;

        let banner = app.area_kpis.as_ref().unwrap();
        assert_eq!(banner.area, None);
        assert_eq!(banner.epics, 3);
        assert_eq!(banner.kpis.total, 3);
        assert_eq!(banner.kpis.closed, 1);
        assert!(!app.busy());
        // Every descendant arrives in one merged fetch.
        let last = batches.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last, vec![WorkItemId(10), WorkItemId(20), WorkItemId(30)]);
    }

    #[tokio::test]
    async fn area_change_during_load_is_picked_up_afterwards() {
        let (mut app, mut rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::EpicsLoaded(sample())).await;
        assert!(app.area_loading);

        // Switch to P\Big while the P\Small banner is still loading.
        app.focus = Focus::Areas;
        app.area_cursor = 1;
        app.update(Action::Key(KeyAction::Select)).await;

        let action = rx.recv().await.unwrap();
        app.update(action).await;
        assert_eq!(app.area_kpis.as_ref().unwrap().area.as_deref(), Some("P\\Small"));
        assert!(app.area_loading, "stale banner triggers a reload");

        let action = rx.recv().await.unwrap();
        app.update(action).await;
        let banner = app.area_kpis.as_ref().unwrap();
        assert_eq!(banner.area.as_deref(), Some("P\\Big"));
        assert_eq!(banner.epics, 3);
    }

    #[tokio::test]
    async fn g_toggles_the_glossary() {
        let (mut app, _rx) = app_with(MockTracker::with_pages(vec![]));
        app.update(Action::Key(KeyAction::Char('g'))).await;
        assert!(app.show_glossary);

        // Other shortcuts are inert while it is open.
        app.update(Action::Key(KeyAction::Char('r'))).await;
        assert!(!app.loading);

        app.update(Action::Key(KeyAction::Char('g'))).await;
        assert!(!app.show_glossary);

        app.update(Action::Key(KeyAction::Char('g'))).await;
        app.update(Action::Key(KeyAction::Escape)).await;
        assert!(!app.show_glossary);
    }

    #[tokio::test]
    async fn g_is_text_in_the_settings_form() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, tx);
        app.update(Action::Key(KeyAction::Char('g'))).await;
        assert!(!app.show_glossary);
        assert_eq!(app.settings.org_url, "g");
    }

    #[tokio::test]
    async fn rejected_token_reopens_the_pat_field() {
        let tracker = MockTracker::failing_wiql(DevOpsError::Auth { status: 401 });
        let (mut app, mut rx) = app_with(tracker);

        app.update(Action::Key(KeyAction::Char('r'))).await;
        let action = rx.recv().await.unwrap();
        assert!(matches!(action, Action::AuthRejected(_)));
        app.update(action).await;

        assert!(!app.busy());
        assert_eq!(app.focus, Focus::Settings);
        assert_eq!(app.settings.active, Some(SettingsField::Pat));
        let (msg, _) = app.flash_message.as_ref().unwrap();
        assert!(msg.contains("authentication failed"));
    }
}
