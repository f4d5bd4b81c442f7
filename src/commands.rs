use crate::app::{App, ERROR_STATUS_TICKS, SHORT_STATUS_TICKS};
use crate::model::{Mode, Pane, Priority, Task, Workspace};
use crate::parser::resolve_due_date;
use crate::theme::Theme;
use crate::weather::TemperatureUnit;
use tracing::{debug, warn};

/// A parsed colon-command. Verbs are case-insensitive; names and free text
/// keep their case, enum-like arguments are folded to lower case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Workspace(WorkspaceCommand),
    Due(Option<String>),
    Tag(Vec<String>),
    Priority(Option<String>),
    Clear(Option<String>),
    Search(String),
    Info(Switch),
    Focus(Option<Pane>),
    Scheme(Option<String>),
    Dashboard(Switch),
    Ascii(AsciiCommand),
    Settings(SettingsCommand),
    Weather(WeatherCommand),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceCommand {
    /// Bare `ws`: focus the workspace pane.
    Focus,
    Add(String),
    Rename(String),
    Delete,
    Select(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
    Toggle,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsciiCommand {
    List,
    Hide,
    Random,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsCommand {
    Usage,
    Weather(Option<bool>),
    City(String),
    Unit(Option<String>),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherCommand {
    Usage,
    Refresh,
    City(String),
    Ignored,
}

impl Command {
    /// `None` for empty input or an unknown verb; both are silently ignored.
    pub fn parse(input: &str) -> Option<Command> {
        let words: Vec<&str> = input.split_whitespace().collect();
        let (verb, args) = words.split_first()?;
        let folded: Vec<String> = args.iter().map(|arg| arg.to_lowercase()).collect();
        let first = folded.first().map(String::as_str);

        let command = match verb.to_lowercase().as_str() {
            "q" | "quit" | "wq" => Command::Quit,
            "ws" | "workspace" | "workspaces" => Command::Workspace(parse_workspace(args, first)),
            "due" | "date" => Command::Due(args.first().map(|arg| arg.to_string())),
            "tag" | "tags" => Command::Tag(
                args.iter()
                    .map(|arg| arg.trim_start_matches('#'))
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            "priority" | "p" => Command::Priority(first.map(str::to_string)),
            "clear" => Command::Clear(first.map(str::to_string)),
            "search" => Command::Search(args.join(" ")),
            "info" => Command::Info(match first {
                None => Switch::Toggle,
                Some("on") => Switch::On,
                Some("off") => Switch::Off,
                Some(_) => Switch::Toggle,
            }),
            "focus" | "pane" => Command::Focus(match first {
                Some("ws" | "workspace" | "workspaces") => Some(Pane::Workspaces),
                Some("tasks" | "todos") => Some(Pane::Tasks),
                _ => None,
            }),
            "scheme" => Command::Scheme(match first {
                None | Some("list") => None,
                Some(name) => Some(name.to_string()),
            }),
            "dashboard" | "dash" | "db" => Command::Dashboard(match first {
                None => Switch::Toggle,
                Some("on" | "show" | "1") => Switch::On,
                Some("off" | "hide" | "0") => Switch::Off,
                Some(_) => Switch::Invalid,
            }),
            "ascii" | "art" => Command::Ascii(match first {
                None | Some("list") => AsciiCommand::List,
                Some("hide" | "clear") => AsciiCommand::Hide,
                Some("random") => AsciiCommand::Random,
                Some(_) => AsciiCommand::Ignored,
            }),
            "settings" => Command::Settings(match first {
                None => SettingsCommand::Usage,
                Some("weather") => SettingsCommand::Weather(match folded.get(1).map(String::as_str) {
                    Some("on") => Some(true),
                    Some("off") => Some(false),
                    _ => None,
                }),
                Some("city") => SettingsCommand::City(args[1..].join(" ")),
                Some("unit") => SettingsCommand::Unit(folded.get(1).cloned()),
                Some(_) => SettingsCommand::Ignored,
            }),
            "weather" => Command::Weather(match first {
                None => WeatherCommand::Usage,
                Some("refresh") => WeatherCommand::Refresh,
                Some("city") => WeatherCommand::City(args[1..].join(" ")),
                Some(_) => WeatherCommand::Ignored,
            }),
            "help" => Command::Help,
            _ => return None,
        };
        Some(command)
    }
}

fn parse_workspace(args: &[&str], first: Option<&str>) -> WorkspaceCommand {
    let Some(sub) = first else {
        return WorkspaceCommand::Focus;
    };
    let rest = || args[1..].join(" ");
    match sub {
        "add" | "new" | "create" => WorkspaceCommand::Add(rest()),
        "rename" => WorkspaceCommand::Rename(rest()),
        "delete" | "del" | "rm" => WorkspaceCommand::Delete,
        "select" | "open" => WorkspaceCommand::Select(args.get(1).map(|s| s.to_string()).unwrap_or_default()),
        _ => WorkspaceCommand::Select(args[0].to_string()),
    }
}

/// Resolves a workspace token: a 1-based index, then an exact
/// case-insensitive name, then the first case-insensitive substring match.
pub fn resolve_workspace(workspaces: &[Workspace], token: &str) -> Option<usize> {
    if token.is_empty() {
        return None;
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&idx| idx < workspaces.len());
    }

    let needle = token.to_lowercase();
    workspaces
        .iter()
        .position(|ws| ws.name.to_lowercase() == needle)
        .or_else(|| {
            workspaces
                .iter()
                .position(|ws| ws.name.to_lowercase().contains(&needle))
        })
}

/// One-line hint shown in the command line when idle.
pub fn command_hint() -> &'static str {
    ":q  /help  /ws add <name>  /ws rename <name>  /ws delete  /ws <name|#>  /search <query>  /info on|off"
}

impl App {
    /// Runs the command buffer and always returns to Normal mode.
    pub fn execute_command(&mut self) {
        let input = self.command_buf.trim().to_string();
        match Command::parse(&input) {
            Some(command) => {
                debug!(input = %input, "executing command");
                self.run_command(command);
            }
            None if !input.is_empty() => debug!(input = %input, "ignoring unknown command"),
            None => {}
        }
        self.mode = Mode::Normal;
        self.command_buf.clear();
    }

    pub fn run_command(&mut self, command: Command) {
        match command {
            Command::Quit => self.should_quit = true,
            Command::Workspace(sub) => self.run_workspace_command(sub),
            Command::Due(token) => self.run_due_command(token),
            Command::Tag(tags) => self.run_tag_command(tags),
            Command::Priority(keyword) => self.run_priority_command(keyword),
            Command::Clear(field) => self.run_clear_command(field),
            Command::Search(query) => {
                self.set_search_query(&query);
                if self.search_query.is_empty() {
                    self.set_status("search cleared");
                } else {
                    self.set_status(format!("search: {}", self.search_query));
                }
            }
            Command::Info(switch) => self.show_info = switch.apply(self.show_info),
            Command::Focus(pane) => {
                if let Some(pane) = pane {
                    self.pane = pane;
                }
            }
            Command::Scheme(None) => {
                self.set_status(format!("schemes: {}", Theme::names().join(", ")));
            }
            Command::Scheme(Some(name)) => match Theme::named(&name) {
                Some(theme) => {
                    self.theme = theme;
                    let saved = self.database.set_setting("scheme", theme.name);
                    if let Err(e) = saved {
                        warn!(error = %e, "failed to persist scheme");
                    }
                    self.set_status(format!("scheme: {name}"));
                }
                None => self.set_status("scheme not found"),
            },
            Command::Dashboard(Switch::Invalid) => {
                self.set_status_for("usage: :dashboard [on|off]", SHORT_STATUS_TICKS);
            }
            Command::Dashboard(switch) => {
                self.show_dashboard = switch.apply(self.show_dashboard);
                let state = if self.show_dashboard { "on" } else { "off" };
                self.set_status_for(format!("dashboard {state}"), SHORT_STATUS_TICKS);
            }
            Command::Ascii(AsciiCommand::List) => {
                if !self.ascii.open_list() {
                    self.set_status("no ascii art found");
                }
            }
            Command::Ascii(AsciiCommand::Hide) => self.ascii.hide_list(),
            Command::Ascii(AsciiCommand::Random) => {
                self.ascii.pick_random();
                self.ascii.hide_list();
            }
            Command::Ascii(AsciiCommand::Ignored) => {}
            Command::Settings(sub) => self.run_settings_command(sub),
            Command::Weather(sub) => self.run_weather_command(sub),
            Command::Help => self.show_help = true,
        }
    }

    fn run_workspace_command(&mut self, sub: WorkspaceCommand) {
        match sub {
            WorkspaceCommand::Focus => self.pane = Pane::Workspaces,
            WorkspaceCommand::Add(name) => self.create_workspace(&name),
            WorkspaceCommand::Rename(name) => self.rename_workspace(&name),
            WorkspaceCommand::Delete => self.delete_workspace(),
            WorkspaceCommand::Select(token) => {
                if let Some(index) = resolve_workspace(&self.workspaces, &token) {
                    self.select_workspace(index);
                }
            }
        }
    }

    /// The selected task, or a "no task selected" status when there is none.
    fn task_for_edit(&mut self) -> Option<Task> {
        let task = self.selected_task().cloned();
        if task.is_none() {
            self.set_status_for("no task selected", ERROR_STATUS_TICKS);
        }
        task
    }

    fn save_with_status(&mut self, task: &Task, message: String) {
        if self.save_task(task) {
            self.set_status_for(message, SHORT_STATUS_TICKS);
        }
    }

    fn run_due_command(&mut self, token: Option<String>) {
        let Some(mut task) = self.task_for_edit() else {
            return;
        };
        let Some(token) = token else {
            self.set_status_for("usage: :due <date|today|tomorrow|monday...>", ERROR_STATUS_TICKS);
            return;
        };
        task.due_date = resolve_due_date(&token);
        let message = format!("due date set to {}", task.due_date);
        self.save_with_status(&task, message);
    }

    fn run_tag_command(&mut self, tags: Vec<String>) {
        let Some(mut task) = self.task_for_edit() else {
            return;
        };
        if tags.is_empty() {
            self.set_status_for("usage: :tag <tag1> [tag2] ...", ERROR_STATUS_TICKS);
            return;
        }
        task.push_tags(tags);
        self.save_with_status(&task, "tags updated".to_string());
    }

    fn run_priority_command(&mut self, keyword: Option<String>) {
        let Some(mut task) = self.task_for_edit() else {
            return;
        };
        let Some(keyword) = keyword else {
            self.set_status_for("usage: :priority <high|low|normal|blocked>", ERROR_STATUS_TICKS);
            return;
        };
        let Some(priority) = Priority::from_arg(&keyword) else {
            self.set_status_for(format!("unknown priority: {keyword}"), ERROR_STATUS_TICKS);
            return;
        };
        task.priority = priority;
        self.save_with_status(&task, "priority updated".to_string());
    }

    fn run_clear_command(&mut self, field: Option<String>) {
        let Some(mut task) = self.task_for_edit() else {
            return;
        };
        let Some(field) = field else {
            self.set_status_for("usage: :clear <due|tags|priority|all>", ERROR_STATUS_TICKS);
            return;
        };
        match field.as_str() {
            "due" | "date" => task.due_date.clear(),
            "tags" | "tag" => task.tags.clear(),
            "priority" | "p" => task.priority = Priority::Normal,
            "all" => {
                task.due_date.clear();
                task.tags.clear();
                task.priority = Priority::Normal;
            }
            _ => {
                self.set_status_for(format!("unknown field: {field}"), ERROR_STATUS_TICKS);
                return;
            }
        }
        self.save_with_status(&task, format!("cleared {field}"));
    }

    fn run_settings_command(&mut self, sub: SettingsCommand) {
        match sub {
            SettingsCommand::Usage => self.set_status("settings: weather on|off, city <name>, unit c|f"),
            SettingsCommand::Weather(Some(enabled)) => {
                self.weather.settings.enabled = enabled;
                self.persist_setting("weather_enabled", if enabled { "1" } else { "0" });
                if enabled {
                    self.weather.invalidate();
                    self.set_status("weather on");
                } else {
                    self.set_status("weather off");
                }
            }
            SettingsCommand::City(name) => self.set_weather_city(&name, true),
            SettingsCommand::Unit(unit) => {
                if let Some(unit) = unit.as_deref().and_then(TemperatureUnit::parse) {
                    self.weather.settings.unit = unit;
                    self.persist_setting("weather_unit", unit.setting_value());
                    self.weather.invalidate();
                    self.set_status(format!("unit: {}", unit.name()));
                }
            }
            SettingsCommand::Weather(None) | SettingsCommand::Ignored => {}
        }
    }

    fn run_weather_command(&mut self, sub: WeatherCommand) {
        match sub {
            WeatherCommand::Usage => self.set_status("weather: refresh | city <name>"),
            WeatherCommand::Refresh => self.weather.invalidate(),
            WeatherCommand::City(name) => self.set_weather_city(&name, false),
            WeatherCommand::Ignored => {}
        }
    }

    /// A new city drops the stored coordinates so the next fetch geocodes it.
    fn set_weather_city(&mut self, name: &str, announce: bool) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.weather.settings.city = name.to_string();
        self.weather.settings.lat = 0.0;
        self.weather.settings.lon = 0.0;
        self.persist_setting("weather_city", name);
        self.persist_setting("weather_lat", "");
        self.persist_setting("weather_lon", "");
        self.weather.invalidate();
        if announce {
            self.set_status(format!("city set: {name}"));
        }
    }

    fn persist_setting(&mut self, key: &str, value: &str) {
        let saved = self.database.set_setting(key, value);
        if let Err(e) = saved {
            warn!(key, error = %e, "failed to persist setting");
            self.set_status_for(format!("error: {e}"), ERROR_STATUS_TICKS);
        }
    }
}

impl Switch {
    fn apply(self, current: bool) -> bool {
        match self {
            Switch::On => true,
            Switch::Off => false,
            Switch::Toggle | Switch::Invalid => !current,
        }
    }
}
