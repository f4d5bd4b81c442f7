mod app;
mod ascii;
mod commands;
mod database;
mod input;
mod logging;
mod model;
mod parser;
mod projection;
mod theme;
mod tree;
mod ui;
mod weather;

use anyhow::Context;
use app::App;
use ascii::AsciiGallery;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use database::{Database, NewTask};
use model::Priority;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    env, io,
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{error, info};

const TICK_RATE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "td", about = "A keyboard-driven terminal todo list", disable_version_flag = true)]
struct Cli {
    /// Add a task using inline syntax ("title #tag @date !priority") and exit
    #[arg(short = 'a', long = "add", value_name = "TEXT")]
    add: Option<String>,

    /// Database file (defaults to ~/.config/td/td.db)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Print version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version_line());
        return Ok(());
    }

    let config_dir = config_dir();
    if let Err(e) = logging::init_to_file(&config_dir.join("td.log")) {
        eprintln!("td: logging disabled: {e}");
    }

    let db_path = match cli.db {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;
            config_dir.join("td.db")
        }
    };
    let database = Database::new(&db_path.to_string_lossy())
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!(path = %db_path.display(), "database opened");

    if let Some(text) = cli.add {
        let summary = add_from_cli(&database, &text)?;
        database.checkpoint_and_close()?;
        println!("{summary}");
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let app = App::new(database)?
        .with_runtime(runtime.handle().clone())
        .with_ascii(AsciiGallery::load_dir(&AsciiGallery::locate_dir()));
    run_ui(app)
}

fn version_line() -> String {
    format!(
        "td version {}, commit {}, date {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("TD_COMMIT").unwrap_or("none"),
        option_env!("TD_BUILD_DATE").unwrap_or("unknown"),
    )
}

fn config_dir() -> PathBuf {
    let mut path = PathBuf::from(env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    path.push(".config");
    path.push("td");
    path
}

/// Adds one task to the first workspace, creating `Default` when there is none.
fn add_from_cli(database: &Database, text: &str) -> anyhow::Result<String> {
    let parsed = parser::parse_task_input(text);
    if parsed.title.is_empty() {
        anyhow::bail!("task title is required");
    }

    let workspace_id = match database.list_workspaces()?.first() {
        Some(ws) => ws.id,
        None => database.create_workspace("Default")?,
    };

    let mut summary = format!("Added: {}", parsed.title);
    if !parsed.tags.is_empty() {
        summary.push_str(&format!(" [tags: {}]", parsed.tags.join(" ")));
    }
    if !parsed.due_date.is_empty() {
        summary.push_str(&format!(" [due: {}]", parsed.due_date));
    }
    if parsed.priority != Priority::Normal {
        summary.push_str(&format!(" [priority: {}]", parsed.priority.label()));
    }

    let id = database.create_task(NewTask {
        workspace_id,
        parent_id: None,
        title: parsed.title,
        tags: parsed.tags,
        due_date: parsed.due_date,
        priority: parsed.priority,
    })?;
    info!(id, workspace_id, "task added from command line");
    Ok(summary)
}

fn run_ui(mut app: App) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);
    if let Err(e) = &result {
        error!(error = %e, "ui loop failed");
    }

    // Flush the WAL before exit
    let _ = app.database.checkpoint_and_close();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        app.drain_events();
        terminal.draw(|f| app.draw(f))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
        if app.should_quit {
            info!("quit requested");
            return Ok(());
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.tick();
            last_tick = Instant::now();
        }
    }
}
