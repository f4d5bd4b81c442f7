use crate::app::{App, PendingKey, CHORD_WINDOW};
use crate::model::{Mode, Pane};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

impl App {
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.handle_key_at(key, Instant::now());
    }

    /// Dispatches a key press by mode. `now` times two-key chords.
    pub fn handle_key_at(&mut self, key: KeyEvent, now: Instant) {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key, now),
            Mode::Insert => self.handle_insert_key(key),
            Mode::Command => self.handle_command_key(key),
            Mode::Search => self.handle_search_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: Instant) {
        if let KeyCode::Char(c @ ('d' | 'g')) = key.code {
            self.handle_chord_key(c, now);
            return;
        }
        self.pending = None;

        let in_tasks = self.pane == Pane::Tasks;
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.toggle_pane(),
            KeyCode::Char(leader @ (':' | '/')) => self.open_command(leader, ""),
            KeyCode::Char('?') => self.begin_search(),
            KeyCode::Esc => {
                self.ascii.hide_list();
                self.show_help = false;
            }
            KeyCode::Char('i') if in_tasks => self.begin_edit(),
            KeyCode::Char('a') if in_tasks => self.begin_add(false),
            KeyCode::Char('A') if in_tasks => self.begin_add(true),
            KeyCode::Char('m') if in_tasks => self.show_info = !self.show_info,
            KeyCode::Char('W') => self.open_command(':', "ws add "),
            KeyCode::Char('R') => self.open_command(':', "ws rename "),
            KeyCode::Char('X') => self.open_command(':', "ws delete"),
            KeyCode::Char('H') => self.show_help = !self.show_help,
            KeyCode::Char('x' | ' ') if in_tasks => self.toggle_selected(),
            KeyCode::Char('h') if in_tasks => self.collapse_selected(),
            KeyCode::Char('l') if in_tasks => self.expand_selected(),
            KeyCode::Char('j') | KeyCode::Down => self.move_vertical(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_vertical(-1),
            KeyCode::Char('G') if in_tasks => {
                if self.ascii.show_list {
                    self.ascii.scroll_to_end(self.list_height);
                } else {
                    self.viewport.to_bottom(self.projection.len());
                }
            }
            KeyCode::PageDown if in_tasks && self.ascii.show_list => {
                self.ascii.scroll_by(self.list_page() as isize, self.list_height);
            }
            KeyCode::PageUp if in_tasks && self.ascii.show_list => {
                self.ascii.scroll_by(-(self.list_page() as isize), self.list_height);
            }
            KeyCode::Enter => match self.pane {
                Pane::Workspaces => {
                    self.select_workspace(self.selected_ws);
                    self.pane = Pane::Tasks;
                }
                Pane::Tasks => self.toggle_selected(),
            },
            KeyCode::Char('>') if in_tasks => self.indent_selected(),
            KeyCode::Char('<') | KeyCode::BackTab if in_tasks => self.unindent_selected(),
            _ => {}
        }
    }

    /// `dd` deletes and `gg` jumps to the top when the second press lands
    /// inside the chord window. Only the task pane has chords.
    fn handle_chord_key(&mut self, key: char, now: Instant) {
        if self.pane != Pane::Tasks {
            self.pending = None;
            return;
        }
        let fires = self
            .pending
            .is_some_and(|p| p.key == key && now.saturating_duration_since(p.at) < CHORD_WINDOW);
        if !fires {
            self.pending = Some(PendingKey { key, at: now });
            return;
        }

        self.pending = None;
        match key {
            'd' => self.delete_selected(),
            _ if self.ascii.show_list => self.ascii.scroll_to_top(),
            _ => self.viewport.to_top(),
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        if self.pane == Pane::Workspaces {
            self.move_workspace(delta);
        } else if self.ascii.show_list {
            self.ascii.scroll_by(delta, self.list_height);
        } else {
            self.viewport.move_by(delta, self.projection.len());
        }
    }

    fn list_page(&self) -> usize {
        self.list_height.saturating_sub(1).max(1)
    }

    fn handle_insert_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_insert(),
            KeyCode::Enter => self.commit_insert(),
            KeyCode::Backspace => {
                self.insert_buf.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_buf.push(c);
            }
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_command(),
            KeyCode::Enter => self.execute_command(),
            KeyCode::Backspace => {
                self.command_buf.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.command_buf.push(c);
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_search(),
            KeyCode::Enter => self.commit_search(),
            KeyCode::Backspace => {
                self.search_buf.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_buf.push(c);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{add, select, test_app};
    use crate::app::{App, PENDING_IDLE};
    use crate::model::{Mode, Pane};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    fn press(app: &mut App, code: KeyCode, at: Instant) {
        app.handle_key_at(KeyEvent::new(code, KeyModifiers::NONE), at);
    }

    fn type_text(app: &mut App, text: &str, at: Instant) {
        for c in text.chars() {
            press(app, KeyCode::Char(c), at);
        }
    }

    #[test]
    fn dd_inside_the_window_deletes() {
        let mut app = test_app();
        let id = add(&mut app, None, "doomed");
        select(&mut app, id);

        let start = Instant::now();
        press(&mut app, KeyCode::Char('d'), start);
        assert!(app.pending.is_some());
        press(&mut app, KeyCode::Char('d'), start + Duration::from_millis(300));
        assert!(app.tree.is_empty());
        assert_eq!(app.pending, None);
    }

    #[test]
    fn dd_after_the_window_does_not_delete() {
        let mut app = test_app();
        let id = add(&mut app, None, "survivor");
        select(&mut app, id);

        let start = Instant::now();
        press(&mut app, KeyCode::Char('d'), start);
        let late = start + Duration::from_millis(900);
        press(&mut app, KeyCode::Char('d'), late);
        assert_eq!(app.tree.len(), 1);
        assert_eq!(app.pending.map(|p| p.at), Some(late));
    }

    #[test]
    fn other_keys_break_a_chord() {
        let mut app = test_app();
        let id = add(&mut app, None, "kept");
        select(&mut app, id);

        let start = Instant::now();
        press(&mut app, KeyCode::Char('d'), start);
        press(&mut app, KeyCode::Char('j'), start);
        assert_eq!(app.pending, None);
        press(&mut app, KeyCode::Char('d'), start);
        press(&mut app, KeyCode::Char('g'), start);
        press(&mut app, KeyCode::Char('d'), start);
        assert_eq!(app.tree.len(), 1);
    }

    #[test]
    fn idle_pending_key_expires_on_tick() {
        let mut app = test_app();
        let start = Instant::now();
        press(&mut app, KeyCode::Char('g'), start);
        app.tick_at(start + Duration::from_millis(500));
        assert!(app.pending.is_some());
        app.tick_at(start + PENDING_IDLE + Duration::from_millis(1));
        assert_eq!(app.pending, None);
    }

    #[test]
    fn chords_are_ignored_in_the_workspace_pane() {
        let mut app = test_app();
        add(&mut app, None, "task");
        press(&mut app, KeyCode::Tab, Instant::now());
        assert_eq!(app.pane, Pane::Workspaces);
        let now = Instant::now();
        press(&mut app, KeyCode::Char('d'), now);
        press(&mut app, KeyCode::Char('d'), now);
        assert_eq!(app.tree.len(), 1);
        assert_eq!(app.pending, None);
    }

    #[test]
    fn gg_and_g_jump_to_the_ends() {
        let mut app = test_app();
        for title in ["one", "two", "three"] {
            add(&mut app, None, title);
        }
        let now = Instant::now();
        press(&mut app, KeyCode::Char('G'), now);
        assert_eq!(app.viewport.selected, 2);
        press(&mut app, KeyCode::Char('g'), now);
        press(&mut app, KeyCode::Char('g'), now);
        assert_eq!(app.viewport.selected, 0);
    }

    #[test]
    fn insert_mode_commits_on_enter_and_discards_on_escape() {
        let mut app = test_app();
        let now = Instant::now();

        press(&mut app, KeyCode::Char('a'), now);
        assert_eq!(app.mode, Mode::Insert);
        type_text(&mut app, "Call mum", now);
        press(&mut app, KeyCode::Backspace, now);
        press(&mut app, KeyCode::Esc, now);
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.tree.is_empty());

        press(&mut app, KeyCode::Char('a'), now);
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.mode, Mode::Insert);
        type_text(&mut app, "Call mum !h", now);
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.selected_task().map(|t| t.title.as_str()), Some("Call mum"));
    }

    #[test]
    fn command_mode_runs_on_enter() {
        let mut app = test_app();
        let now = Instant::now();
        press(&mut app, KeyCode::Char('/'), now);
        assert_eq!(app.command_leader, '/');
        type_text(&mut app, "dash off", now);
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.mode, Mode::Normal);
        assert!(!app.show_dashboard);

        press(&mut app, KeyCode::Char('W'), now);
        assert_eq!(app.command_buf, "ws add ");
        press(&mut app, KeyCode::Esc, now);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.workspaces.len(), 1);
    }

    #[test]
    fn search_escape_keeps_existing_query() {
        let mut app = test_app();
        add(&mut app, None, "alpha");
        add(&mut app, None, "beta");
        let now = Instant::now();

        press(&mut app, KeyCode::Char('?'), now);
        type_text(&mut app, "bet", now);
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.search_query, "bet");
        assert_eq!(app.projection.len(), 1);

        press(&mut app, KeyCode::Char('?'), now);
        type_text(&mut app, "zzz", now);
        press(&mut app, KeyCode::Esc, now);
        assert_eq!(app.search_query, "bet");
        assert_eq!(app.projection.len(), 1);
    }

    #[test]
    fn enter_in_workspace_pane_selects_and_focuses_tasks() {
        let mut app = test_app();
        app.create_workspace("Work");
        app.select_workspace(0);
        let now = Instant::now();
        press(&mut app, KeyCode::Tab, now);
        press(&mut app, KeyCode::Char('j'), now);
        assert_eq!(app.selected_ws, 1);
        press(&mut app, KeyCode::Enter, now);
        assert_eq!(app.pane, Pane::Tasks);
        assert_eq!(app.current_workspace().map(|w| w.name.as_str()), Some("Work"));
    }
}
