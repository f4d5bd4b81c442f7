use crate::ascii::AsciiGallery;
use crate::database::{Database, NewTask};
use crate::model::{Mode, Pane, Task, Workspace};
use crate::parser::parse_task_input;
use crate::projection::{indent_target, unindent_target, Projection, Viewport};
use crate::theme::Theme;
use crate::tree::TaskTree;
use crate::weather::{self, WeatherError, WeatherReading, WeatherSettings, WeatherState};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Ticks a status message stays visible by default.
pub const STATUS_TICKS: u32 = 6;
pub const SHORT_STATUS_TICKS: u32 = 2;
pub const ERROR_STATUS_TICKS: u32 = 3;

/// Second key of a chord must arrive within this window.
pub const CHORD_WINDOW: Duration = Duration::from_millis(800);
/// A pending chord key idle longer than this is dropped on tick.
pub const PENDING_IDLE: Duration = Duration::from_secs(1);

/// Results that arrive from background work.
#[derive(Debug)]
pub enum AppEvent {
    Weather(Result<WeatherReading, WeatherError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingKey {
    pub key: char,
    pub at: Instant,
}

/// What committing the insert buffer does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTarget {
    New { parent_id: Option<i64> },
    Edit { task_id: i64 },
}

pub struct App {
    pub database: Database,
    pub workspaces: Vec<Workspace>,
    pub tree: TaskTree,
    pub projection: Projection,
    pub mode: Mode,
    pub pane: Pane,
    pub selected_ws: usize,
    pub viewport: Viewport,
    pub expanded: HashSet<i64>,
    pub command_buf: String,
    pub command_leader: char,
    pub search_buf: String,
    pub search_query: String,
    pub insert_buf: String,
    pub insert_target: InsertTarget,
    pub status: Option<StatusMessage>,
    pub pending: Option<PendingKey>,
    pub theme: Theme,
    pub ascii: AsciiGallery,
    pub weather: WeatherState,
    pub show_info: bool,
    pub show_help: bool,
    pub show_dashboard: bool,
    /// Rows available to the ascii list in the last frame.
    pub list_height: usize,
    pub should_quit: bool,
    runtime: Option<Handle>,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(database: Database) -> anyhow::Result<Self> {
        let weather_settings = WeatherSettings::load(&database)?;
        let theme = database
            .get_setting("scheme")?
            .as_deref()
            .and_then(Theme::named)
            .unwrap_or_default();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut app = App {
            database,
            workspaces: Vec::new(),
            tree: TaskTree::default(),
            projection: Projection::default(),
            mode: Mode::Normal,
            pane: Pane::Tasks,
            selected_ws: 0,
            viewport: Viewport::default(),
            expanded: HashSet::new(),
            command_buf: String::new(),
            command_leader: ':',
            search_buf: String::new(),
            search_query: String::new(),
            insert_buf: String::new(),
            insert_target: InsertTarget::New { parent_id: None },
            status: None,
            pending: None,
            theme,
            ascii: AsciiGallery::default(),
            weather: WeatherState::new(weather_settings),
            show_info: false,
            show_help: false,
            show_dashboard: true,
            list_height: 10,
            should_quit: false,
            runtime: None,
            events_tx,
            events_rx,
        };
        app.load_workspaces();
        Ok(app)
    }

    /// Enables background work (weather fetches) on the given runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_ascii(mut self, mut gallery: AsciiGallery) -> Self {
        gallery.pick_random();
        self.ascii = gallery;
        self
    }

    // ---- loading ----

    /// Reloads workspaces with their counters, then the selected tree. Runs after every write.
    pub fn load_workspaces(&mut self) {
        let workspaces = self.database.list_workspaces();
        self.workspaces = self.report(workspaces).unwrap_or_default();
        if self.workspaces.is_empty() {
            self.selected_ws = 0;
        } else if self.selected_ws >= self.workspaces.len() {
            self.selected_ws = self.workspaces.len() - 1;
        }
        self.load_tasks();
    }

    /// Rebuilds the tree from the store and re-projects it.
    pub fn load_tasks(&mut self) {
        self.tree = match self.current_workspace().map(|ws| ws.id) {
            Some(workspace_id) => {
                let tasks = self.database.list_tasks_for_workspace(workspace_id);
                TaskTree::from_tasks(self.report(tasks).unwrap_or_default())
            }
            None => TaskTree::default(),
        };
        self.reproject();
    }

    pub fn reproject(&mut self) {
        self.projection = Projection::build(&self.tree, &self.expanded, &self.search_query);
        self.viewport.clamp(self.projection.len());
    }

    /// Logs a failed store call and surfaces it in the status line.
    fn report<T>(&mut self, result: anyhow::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "store operation failed");
                self.set_status_for(format!("error: {e}"), ERROR_STATUS_TICKS);
                None
            }
        }
    }

    // ---- queries ----

    pub fn current_workspace(&self) -> Option<&Workspace> {
        self.workspaces.get(self.selected_ws)
    }

    pub fn selected_task_id(&self) -> Option<i64> {
        self.projection.get(self.viewport.selected).map(|row| row.task_id)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selected_task_id().and_then(|id| self.tree.get(id))
    }

    /// The tree the current rows were built from (filtered while searching).
    pub fn visible_tree(&self) -> &TaskTree {
        self.projection.visible_tree(&self.tree)
    }

    // ---- status and timers ----

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.set_status_for(text, STATUS_TICKS);
    }

    pub fn set_status_for(&mut self, text: impl Into<String>, ticks: u32) {
        self.status = Some(StatusMessage {
            text: text.into(),
            ticks,
        });
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.text.as_str())
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// One-second tick: expires idle chords and status messages, and
    /// starts a weather fetch when one is due.
    pub fn tick_at(&mut self, now: Instant) {
        if let Some(pending) = self.pending {
            if now.saturating_duration_since(pending.at) > PENDING_IDLE {
                self.pending = None;
            }
        }

        if let Some(status) = self.status.as_mut() {
            status.ticks = status.ticks.saturating_sub(1);
            if status.ticks == 0 {
                self.status = None;
            }
        }

        self.maybe_fetch_weather(now);
    }

    fn maybe_fetch_weather(&mut self, now: Instant) {
        if !self.weather.is_due(now) {
            return;
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        self.weather.in_flight = true;
        let request = self.weather.settings.request();
        let tx = self.events_tx.clone();
        debug!(city = %request.city, "starting weather fetch");
        runtime.spawn(async move {
            let result = weather::fetch(request).await;
            let _ = tx.send(AppEvent::Weather(result));
        });
    }

    /// Handles every background result that has arrived since the last call.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event_at(event, Instant::now());
        }
    }

    pub fn handle_event_at(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::Weather(result) => {
                self.weather.in_flight = false;
                self.weather.checked_at = Some(now);
                match result {
                    Ok(reading) => {
                        self.weather.temperature = reading.temperature;
                        if weather::coordinates_known(reading.lat, reading.lon) {
                            self.weather.settings.lat = reading.lat;
                            self.weather.settings.lon = reading.lon;
                            let lat = weather::format_coordinate(reading.lat);
                            let lon = weather::format_coordinate(reading.lon);
                            let saved = self
                                .database
                                .set_setting("weather_lat", &lat)
                                .and_then(|_| self.database.set_setting("weather_lon", &lon));
                            self.report(saved);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "weather fetch failed");
                        self.set_status("weather unavailable");
                    }
                }
            }
        }
    }

    // ---- workspaces ----

    pub fn select_workspace(&mut self, index: usize) {
        self.selected_ws = index;
        self.viewport.reset();
        self.load_tasks();
    }

    pub fn move_workspace(&mut self, delta: isize) {
        if self.workspaces.is_empty() {
            return;
        }
        let target = (self.selected_ws as isize + delta).clamp(0, self.workspaces.len() as isize - 1);
        self.select_workspace(target as usize);
    }

    pub fn toggle_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Tasks => Pane::Workspaces,
            Pane::Workspaces => Pane::Tasks,
        };
    }

    pub fn create_workspace(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let created = self.database.create_workspace(name);
        let Some(id) = self.report(created) else {
            return;
        };
        info!(id, name, "workspace created");
        self.load_workspaces();
        if let Some(index) = self.workspaces.iter().position(|ws| ws.id == id) {
            self.select_workspace(index);
        }
    }

    pub fn rename_workspace(&mut self, name: &str) {
        let name = name.trim();
        let Some(id) = self.current_workspace().map(|ws| ws.id) else {
            return;
        };
        if name.is_empty() {
            return;
        }
        let renamed = self.database.rename_workspace(id, name);
        if self.report(renamed).is_some() {
            self.load_workspaces();
        }
    }

    pub fn delete_workspace(&mut self) {
        let Some(id) = self.current_workspace().map(|ws| ws.id) else {
            return;
        };
        let deleted = self.database.delete_workspace(id);
        if self.report(deleted).is_some() {
            info!(id, "workspace deleted");
            self.viewport.reset();
            self.load_workspaces();
        }
    }

    // ---- tasks ----

    /// Flips a leaf, or bulk-sets a group to the opposite of its aggregate state.
    pub fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let updates = self.tree.completion_updates(id);
        let written = match updates.as_slice() {
            [(leaf, completed)] => self.database.set_task_completed(*leaf, *completed),
            _ => self.database.set_tasks_completed(&updates),
        };
        self.report(written);
        self.load_workspaces();
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let deleted = self.database.delete_task(id);
        self.report(deleted);
        self.load_workspaces();
    }

    pub fn collapse_selected(&mut self) {
        if let Some(id) = self.selected_task().filter(|t| t.has_children()).map(|t| t.id) {
            self.expanded.remove(&id);
            self.reproject();
        }
    }

    pub fn expand_selected(&mut self) {
        if let Some(id) = self.selected_task().filter(|t| t.has_children()).map(|t| t.id) {
            self.expanded.insert(id);
            self.reproject();
        }
    }

    pub fn indent_selected(&mut self) {
        let Some((task_id, parent_id)) =
            indent_target(self.projection.rows(), &self.tree, self.viewport.selected)
        else {
            return;
        };
        let moved = self.database.move_task(task_id, Some(parent_id));
        if self.report(moved).is_some() {
            self.expanded.insert(parent_id);
        }
        self.load_workspaces();
        self.follow_task(task_id);
    }

    pub fn unindent_selected(&mut self) {
        let Some((task_id, parent_id)) = self
            .selected_task_id()
            .and_then(|id| unindent_target(&self.tree, id))
        else {
            return;
        };
        let moved = self.database.move_task(task_id, parent_id);
        self.report(moved);
        self.load_workspaces();
        self.follow_task(task_id);
    }

    fn follow_task(&mut self, task_id: i64) {
        if let Some(index) = self.projection.index_of(task_id) {
            self.viewport.selected = index;
        }
    }

    // ---- insert mode ----

    /// Opens Insert mode for a new sibling of the selected task, or a child of it.
    pub fn begin_add(&mut self, as_child: bool) {
        if self.current_workspace().is_none() {
            self.set_status_for("no workspace: use :ws add <name>", ERROR_STATUS_TICKS);
            return;
        }
        let parent_id = match self.selected_task() {
            Some(task) if as_child => Some(task.id),
            Some(task) => task.parent_id,
            None => None,
        };
        if let (true, Some(id)) = (as_child, parent_id) {
            self.expanded.insert(id);
            self.reproject();
        }
        self.mode = Mode::Insert;
        self.insert_buf.clear();
        self.insert_target = InsertTarget::New { parent_id };
    }

    pub fn begin_edit(&mut self) {
        let Some((task_id, title)) = self.selected_task().map(|t| (t.id, t.title.clone())) else {
            return;
        };
        self.mode = Mode::Insert;
        self.insert_buf = title;
        self.insert_target = InsertTarget::Edit { task_id };
    }

    pub fn cancel_insert(&mut self) {
        self.mode = Mode::Normal;
        self.insert_buf.clear();
        self.insert_target = InsertTarget::New { parent_id: None };
    }

    /// Runs the buffer through the inline parser and saves it. An empty buffer
    /// keeps Insert mode open; an input with no title saves nothing.
    pub fn commit_insert(&mut self) {
        if self.insert_buf.is_empty() {
            return;
        }
        let parsed = parse_task_input(&self.insert_buf);
        match self.insert_target {
            InsertTarget::New { parent_id } => {
                if let (false, Some(workspace_id)) =
                    (parsed.title.is_empty(), self.current_workspace().map(|ws| ws.id))
                {
                    let created = self.database.create_task(NewTask {
                        workspace_id,
                        parent_id,
                        title: parsed.title,
                        tags: parsed.tags,
                        due_date: parsed.due_date,
                        priority: parsed.priority,
                    });
                    if let Some(id) = self.report(created) {
                        self.load_workspaces();
                        self.follow_task(id);
                    }
                }
            }
            InsertTarget::Edit { task_id } => {
                if let Some(mut task) = self.tree.get(task_id).cloned() {
                    if !parsed.title.is_empty() {
                        task.title = parsed.title;
                    }
                    task.push_tags(parsed.tags);
                    if !parsed.due_date.is_empty() {
                        task.due_date = parsed.due_date;
                    }
                    if parsed.priority != Default::default() {
                        task.priority = parsed.priority;
                    }
                    self.save_task(&task);
                }
            }
        }
        self.cancel_insert();
    }

    /// Writes a modified copy of a task and reloads. Returns false on store failure.
    pub fn save_task(&mut self, task: &Task) -> bool {
        let updated = self.database.update_task(task);
        let saved = self.report(updated).is_some();
        self.load_workspaces();
        saved
    }

    // ---- search mode ----

    pub fn begin_search(&mut self) {
        self.mode = Mode::Search;
        self.search_buf.clear();
    }

    pub fn commit_search(&mut self) {
        let query = self.search_buf.trim().to_string();
        self.search_buf.clear();
        self.mode = Mode::Normal;
        self.set_search_query(&query);
    }

    pub fn cancel_search(&mut self) {
        self.mode = Mode::Normal;
        self.search_buf.clear();
    }

    /// Empty query clears the filter.
    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.trim().to_string();
        self.reproject();
    }

    // ---- command mode ----

    pub fn open_command(&mut self, leader: char, prefill: &str) {
        self.mode = Mode::Command;
        self.command_leader = leader;
        self.command_buf = prefill.to_string();
    }

    pub fn cancel_command(&mut self) {
        self.mode = Mode::Normal;
        self.command_buf.clear();
    }
}
