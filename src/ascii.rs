use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ART: &str = "  .-.\n (o o)\n | O \\\n  \\   \\\n   `~~~'";

/// Header art loaded from `*.txt` files, plus the scrollable list view of all of them.
#[derive(Debug, Clone, Default)]
pub struct AsciiGallery {
    names: Vec<String>,
    arts: Vec<String>,
    current: Option<usize>,
    lines: Vec<String>,
    pub scroll: usize,
    pub show_list: bool,
}

impl AsciiGallery {
    /// `ascii/` next to the executable, else in the working directory.
    pub fn locate_dir() -> PathBuf {
        let candidates = [
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join("ascii"))),
            std::env::current_dir().ok().map(|cwd| cwd.join("ascii")),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|path| path.is_dir())
            .unwrap_or_else(|| PathBuf::from("ascii"))
    }

    /// Unreadable files and a missing directory just yield fewer arts.
    pub fn load_dir(dir: &Path) -> Self {
        let mut gallery = AsciiGallery::default();
        let Ok(entries) = fs::read_dir(dir) else {
            return gallery;
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
            })
            .collect();
        paths.sort();

        for path in paths {
            let Ok(data) = fs::read_to_string(&path) else {
                continue;
            };
            let art = data.trim_end_matches('\n').to_string();
            if art.is_empty() {
                continue;
            }
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            gallery.names.push(name);
            gallery.arts.push(art);
        }
        debug!(count = gallery.arts.len(), dir = %dir.display(), "ascii art loaded");
        gallery
    }

    pub fn is_empty(&self) -> bool {
        self.arts.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn current_art(&self) -> &str {
        self.current
            .and_then(|idx| self.arts.get(idx))
            .map(String::as_str)
            .unwrap_or(DEFAULT_ART)
    }

    pub fn pick_random(&mut self) {
        if self.arts.is_empty() {
            return;
        }
        let idx = rand::thread_rng().gen_range(0..self.arts.len());
        self.current = Some(idx);
    }

    /// Opens the list view. Returns false when there is nothing to show.
    pub fn open_list(&mut self) -> bool {
        if self.arts.is_empty() {
            return false;
        }
        self.lines.clear();
        for (i, art) in self.arts.iter().enumerate() {
            self.lines
                .extend(art.lines().map(|line| line.trim_end().to_string()));
            if i + 1 != self.arts.len() {
                self.lines.push(String::new());
            }
        }
        self.scroll = 0;
        self.show_list = true;
        true
    }

    pub fn hide_list(&mut self) {
        self.show_list = false;
    }

    pub fn scroll_by(&mut self, delta: isize, height: usize) {
        if self.lines.is_empty() {
            return;
        }
        let max_scroll = self.lines.len().saturating_sub(height) as isize;
        self.scroll = (self.scroll as isize + delta).clamp(0, max_scroll) as usize;
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_to_end(&mut self, height: usize) {
        self.scroll = self.lines.len().saturating_sub(height);
    }

    pub fn visible_lines(&self, height: usize) -> &[String] {
        let start = self.scroll.min(self.lines.len().saturating_sub(height));
        let end = (start + height).min(self.lines.len());
        &self.lines[start..end]
    }
}
