use crate::app::App;
use crate::commands::command_hint;
use crate::model::{Mode, Pane, Priority, Task};
use crate::projection::FlatRow;
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Padding, Paragraph},
    Frame,
};

const QUOTE: &str = "keep the noise outside";
const SIDEBAR_WIDTH: u16 = 24;
const INFO_HEIGHT: u16 = 6;

const HELP_LINES: &[&str] = &[
    "Navigation",
    "  j/k or arrows   move cursor",
    "  gg / G          top / bottom",
    "  tab             switch pane",
    "  enter           open workspace / toggle task",
    "",
    "Tasks",
    "  a / A           add task / add subtask",
    "  i               edit task",
    "  space / x       toggle task",
    "  dd              delete task",
    "  h/l             collapse / expand",
    "  > / <           indent / unindent",
    "  m               toggle details panel",
    "  ?               search",
    "",
    "Workspaces",
    "  W               add workspace",
    "  R               rename workspace",
    "  X               delete workspace",
    "",
    "Commands",
    "  /help           show this screen",
    "  /search <q>     filter tasks",
    "  /ws add <name>  create workspace",
    "  /due /tag /p    edit the selected task",
    "  /scheme list    list themes",
    "  /settings city <name>",
    "  /settings weather on|off",
    "  /settings unit c|f",
    "",
    "Press H or Esc to close.",
];

impl App {
    pub fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        f.render_widget(Block::default().style(Style::default().bg(self.theme.bg)), area);

        let header = self.header_lines(area.width);
        let header_height = (header.len() as u16 + 2).min(area.height / 2);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(header_height),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(area);

        let header = Paragraph::new(header).alignment(Alignment::Center).block(
            Block::default()
                .padding(Padding::vertical(1))
                .style(Style::default().bg(self.theme.bg)),
        );
        f.render_widget(header, chunks[0]);

        let sidebar_width = SIDEBAR_WIDTH.min(chunks[1].width / 2);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(sidebar_width), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_sidebar(f, panes[0]);
        self.draw_tasks(f, panes[1]);
        self.draw_status(f, chunks[2]);
    }

    fn header_lines(&self, width: u16) -> Vec<Line<'static>> {
        let theme = self.theme;
        let mut lines = vec![Line::styled(QUOTE, Style::default().fg(theme.dim))];
        let art_width = width.saturating_sub(2) as usize;
        for art_line in self.ascii.current_art().lines() {
            lines.push(Line::styled(
                truncate(art_line.trim_end(), art_width),
                Style::default().fg(theme.header),
            ));
        }
        lines.push(Line::styled(
            Local::now().format("%A, %B %-d, %Y").to_string(),
            Style::default().fg(theme.text),
        ));
        if self.show_dashboard {
            lines.push(self.dashboard_line());
        }
        lines
    }

    fn dashboard_line(&self) -> Line<'static> {
        let theme = self.theme;
        let stats = self.tree.dashboard(Local::now().date_naive());
        let dim = Style::default().fg(theme.dim);
        let warn = Style::default().fg(theme.warn);
        let danger = Style::default().fg(theme.danger);

        let mut parts: Vec<Vec<Span<'static>>> = vec![vec![
            Span::styled(format!("{}/{}", stats.completed, stats.total), dim),
            Span::raw(" "),
            Span::styled(
                format!("{}%", stats.progress_percent()),
                Style::default().fg(theme.accent),
            ),
        ]];
        if stats.due_today > 0 {
            parts.push(vec![Span::styled(format!("today:{}", stats.due_today), warn)]);
        }
        if stats.overdue > 0 {
            parts.push(vec![Span::styled(format!("overdue:{}", stats.overdue), danger)]);
        }
        if stats.high_priority > 0 {
            parts.push(vec![Span::styled(format!("!high:{}", stats.high_priority), warn)]);
        }
        if stats.blocked > 0 {
            parts.push(vec![Span::styled(format!("blocked:{}", stats.blocked), danger)]);
        }
        if !stats.today_titles.is_empty() {
            parts.push(vec![Span::styled(stats.today_titles.join(", "), dim)]);
        }

        let mut spans = vec![Span::styled("[ ", dim)];
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" · ", dim));
            }
            spans.extend(part);
        }
        spans.push(Span::styled(" ]", dim));
        Line::from(spans)
    }

    fn pane_title(&self, label: &str, pane: Pane) -> Span<'static> {
        if self.pane == pane {
            Span::styled(format!("▌ {label}"), Style::default().fg(self.theme.accent))
        } else {
            Span::styled(format!("  {label}"), Style::default().fg(self.theme.dim))
        }
    }

    fn rule(&self, width: u16) -> Line<'static> {
        Line::styled("─".repeat(width as usize), Style::default().fg(self.theme.border))
    }

    fn draw_sidebar(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .padding(Padding::horizontal(1))
            .style(Style::default().bg(self.theme.sidebar).fg(self.theme.text));
        let inner = block.inner(area);

        let mut lines = vec![
            Line::from(self.pane_title("Workspaces", Pane::Workspaces)),
            self.rule(inner.width),
        ];
        for (i, ws) in self.workspaces.iter().enumerate() {
            let marker = if i == self.selected_ws { "»" } else { " " };
            let count = format!("{}/{}", ws.completed_count, ws.task_count);
            let name_width = (inner.width as usize).saturating_sub(count.chars().count() + 1);
            let name = pad(&truncate(&format!("{marker} {}", ws.name), name_width), name_width);
            let mut line = Line::from(vec![
                Span::raw(name),
                Span::raw(" "),
                Span::styled(count, Style::default().fg(self.theme.dim)),
            ]);
            if i == self.selected_ws {
                line = line.style(Style::default().bg(self.theme.selection));
            }
            lines.push(line);
        }
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_tasks(&mut self, f: &mut Frame, area: Rect) {
        let theme = self.theme;
        let block = Block::default()
            .padding(Padding::horizontal(1))
            .style(Style::default().bg(theme.bg).fg(theme.text));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut title = vec![self.pane_title("Todos", Pane::Tasks)];
        if let Some(ws) = self.current_workspace() {
            title.push(Span::styled(format!("  {}", ws.name), Style::default().fg(theme.dim)));
        }
        if !self.search_query.is_empty() {
            title.push(Span::styled(
                format!("  [filter: {}]", self.search_query),
                Style::default().fg(theme.dim),
            ));
        }

        let show_info = self.show_info && self.selected_task().is_some();
        let insert = self.mode == Mode::Insert;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(if show_info { INFO_HEIGHT } else { 0 }),
                Constraint::Length(if insert { 1 } else { 0 }),
            ])
            .split(inner);
        f.render_widget(Paragraph::new(vec![Line::from(title), self.rule(inner.width)]), chunks[0]);

        let body = chunks[1];
        if self.ascii.show_list {
            self.list_height = body.height as usize;
            let lines: Vec<Line> = self
                .ascii
                .visible_lines(body.height as usize)
                .iter()
                .map(|line| Line::raw(truncate(line, body.width as usize)))
                .collect();
            f.render_widget(Paragraph::new(lines), body);
            return;
        }
        if self.show_help {
            let mut lines = vec![Line::styled("Help", Style::default().fg(theme.accent)), Line::raw("")];
            lines.extend(HELP_LINES.iter().map(|line| Line::raw(*line)));
            f.render_widget(Paragraph::new(lines), body);
            return;
        }

        self.viewport.scroll_into_view(body.height as usize, self.projection.len());
        if self.projection.is_empty() {
            self.draw_empty(f, body);
        } else {
            self.draw_rows(f, body);
        }
        if show_info {
            self.draw_info(f, chunks[2]);
        }
        if insert {
            let line = Line::styled(format!("+ {}_", self.insert_buf), Style::default().fg(theme.accent));
            f.render_widget(Paragraph::new(line), chunks[3]);
        }
    }

    fn draw_empty(&self, f: &mut Frame, area: Rect) {
        let dim = Style::default().fg(self.theme.dim);
        let empty = if self.search_query.is_empty() { "empty list" } else { "no matches" };
        let lines = vec![
            Line::styled(empty, dim),
            Line::styled("press a to add a task", dim),
            Line::styled("press W to add a workspace", dim),
            Line::styled("or use /ws add <name>", dim),
        ];
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
    }

    fn draw_rows(&self, f: &mut Frame, area: Rect) {
        let visible = area.height as usize;
        let width = area.width as usize;
        let lines: Vec<Line> = self
            .projection
            .rows()
            .iter()
            .enumerate()
            .skip(self.viewport.scroll)
            .take(visible)
            .filter_map(|(i, row)| {
                let task = self.tree.get(row.task_id)?;
                Some(self.task_line(task, row, width, i == self.viewport.selected))
            })
            .collect();
        f.render_widget(Paragraph::new(lines), area);
    }

    fn task_line(&self, task: &Task, row: &FlatRow, width: usize, selected: bool) -> Line<'static> {
        let theme = self.theme;
        let marker = match (row.has_children, row.expanded) {
            (false, _) => ' ',
            (true, true) => 'v',
            (true, false) => '>',
        };
        let progress = self.visible_tree().progress(task.id);
        let checkbox = if task.is_blocked() {
            "✖"
        } else if self.tree.is_complete(task.id) {
            "☑"
        } else {
            "☐"
        };

        let left = format!("{}{} {} {}", row.prefix, marker, checkbox, task.title);
        let mut meta = Vec::new();
        if let Some((done, total)) = progress {
            meta.push(format!("[{done}/{total}]"));
        }
        if !task.tags.is_empty() {
            meta.push(format_tags(&task.tags));
        }
        let meta = meta.join(" ");

        let mut right = Vec::new();
        if let Some(icon) = priority_icon(task.priority) {
            right.push(icon.to_string());
        }
        if !task.due_date.is_empty() {
            right.push(task.due_date.clone());
        }
        let right = right.join(" ");

        let right_width = right.chars().count();
        let avail = if right.is_empty() { width } else { width.saturating_sub(right_width + 1) };
        let left = truncate(&left, avail);
        let meta = truncate(&meta, avail.saturating_sub(left.chars().count() + 1));
        let used = left.chars().count() + if meta.is_empty() { 0 } else { meta.chars().count() + 1 };
        let padding = width.saturating_sub(used + right_width).max(usize::from(!right.is_empty()));

        let base = if task.is_blocked() {
            Style::default().fg(theme.dim)
        } else if self.tree.is_complete(task.id) {
            Style::default().fg(theme.done).add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(theme.text)
        };
        let meta_style = if task.is_blocked() || self.tree.is_complete(task.id) {
            base
        } else {
            Style::default().fg(theme.dim)
        };
        let right_style = match task.priority {
            Priority::High if !self.tree.is_complete(task.id) => Style::default().fg(theme.warn),
            _ => base,
        };

        let mut spans = vec![Span::styled(left, base)];
        if !meta.is_empty() {
            spans.push(Span::styled(format!(" {meta}"), meta_style));
        }
        spans.push(Span::raw(" ".repeat(padding)));
        if !right.is_empty() {
            spans.push(Span::styled(right, right_style));
        }

        let line = Line::from(spans);
        if selected {
            line.style(Style::default().bg(theme.cursor))
        } else {
            line
        }
    }

    fn draw_info(&self, f: &mut Frame, area: Rect) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let theme = self.theme;
        let panel = Style::default().bg(theme.info);
        let label = panel.fg(theme.dim);
        let value = panel.fg(theme.text);

        let (status, status_style) = if self.tree.is_complete(task.id) {
            ("done", panel.fg(theme.done))
        } else {
            ("pending", value)
        };
        let priority_style = match task.priority {
            Priority::Blocked => panel.fg(theme.danger),
            Priority::High => panel.fg(theme.warn),
            _ => value,
        };
        let due = if task.due_date.is_empty() { "-".to_string() } else { task.due_date.clone() };
        let max_value = (area.width as usize).saturating_sub(12).max(10);
        let tags = if task.tags.is_empty() {
            "-".to_string()
        } else {
            truncate_with_ellipsis(&format_tags(&task.tags), max_value)
        };

        let lines = vec![
            Line::from(Span::styled(
                pad(" ▸ DETAILS", area.width as usize),
                Style::default().fg(theme.bg).bg(theme.accent).add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![Span::styled(" Status   ", label), Span::styled(status, status_style)]),
            Line::from(vec![
                Span::styled(" Priority ", label),
                Span::styled(task.priority.label(), priority_style),
            ]),
            Line::from(vec![Span::styled(" Due      ", label), Span::styled(due, panel.fg(theme.accent))]),
            Line::from(vec![Span::styled(" Tags     ", label), Span::styled(tags, value)]),
            Line::from(vec![
                Span::styled(" Created  ", label),
                Span::styled(
                    task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
                    value,
                ),
            ]),
        ];
        f.render_widget(Paragraph::new(lines).style(panel), area);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect) {
        let theme = self.theme;
        let width = area.width as usize;
        let left = format!(" {} · {} ", self.mode.label(), self.pane.label());

        let weather = if self.weather.settings.enabled {
            format!("{} ", self.weather.temperature)
        } else {
            String::new()
        };
        let clock = Local::now().format("%I:%M %p");
        let right = if self.current_workspace().is_some() {
            let stats = self.tree.stats();
            format!(
                " ✔ {} ☐ {} ✖ {} {weather}{clock} ",
                stats.completed, stats.open, stats.blocked
            )
        } else {
            format!(" {weather}{clock} ")
        };
        let gap = width.saturating_sub(left.chars().count() + right.chars().count());
        let top = Line::raw(format!("{left}{}{right}", " ".repeat(gap)));

        let bottom = match self.mode {
            Mode::Command => Line::styled(
                format!("{}{}", self.command_leader, self.command_buf),
                Style::default().fg(theme.accent),
            ),
            Mode::Search => Line::styled(format!("?{}", self.search_buf), Style::default().fg(theme.accent)),
            _ => match self.status_text() {
                Some(message) => Line::styled(message.to_string(), Style::default().fg(theme.accent)),
                None => Line::styled(command_hint(), Style::default().fg(theme.dim)),
            },
        };

        let status = Paragraph::new(vec![top, bottom]).style(Style::default().bg(theme.border).fg(theme.text));
        f.render_widget(status, area);
    }
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| if tag.starts_with('#') { tag.to_string() } else { format!("#{tag}") })
        .collect::<Vec<_>>()
        .join(" ")
}

fn priority_icon(priority: Priority) -> Option<&'static str> {
    match priority {
        Priority::High => Some("^"),
        Priority::Low => Some("."),
        _ => None,
    }
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

fn truncate_with_ellipsis(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn pad(s: &str, width: usize) -> String {
    format!("{s:<width$}")
}
