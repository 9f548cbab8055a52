//! bytescope: browse a parsed binary file as a tree next to its bytes.
#![allow(clippy::multiple_crate_versions)]

use bytescope::{app_state, config, dump, selection::SelectionPolicy, span::OffsetMode, tree, ui};
use clap::Parser;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bytescope")]
#[command(about = "Structural tree and byte-range correlation for parsed binary files", long_about = None)]
struct Args {
    /// The binary file that was parsed
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Parse dump produced for FILE
    #[arg(value_name = "DUMP")]
    dump: PathBuf,

    /// How recorded offsets relate to file positions: relative, absolute or inferred
    #[arg(long, value_name = "MODE")]
    offsets: Option<OffsetMode>,

    /// Which overlapping nodes a byte selection selects: first or all
    #[arg(long, value_name = "POLICY")]
    select: Option<SelectionPolicy>,

    /// Load the whole tree up front
    #[arg(long)]
    eager: bool,

    /// Configuration file to use instead of ./bytescope.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs here, filtered by `RUST_LOG`
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let mut cfg = match &args.config {
        Some(path) => config::Config::load_from(path),
        None => config::Config::load(),
    };

    // Override config with command line args
    if let Some(mode) = args.offsets {
        cfg.offset_mode = mode.to_string();
    }
    if let Some(policy) = args.select {
        cfg.selection_policy = policy.to_string();
    }
    if args.eager {
        cfg.eager_index = true;
    }

    let source = Source {
        file: args.file,
        dump: args.dump,
        mode: cfg.offset_mode(),
    };
    let (tree, data) = source.load()?;
    let state = app_state::AppState::new(tree, data, &cfg);

    run_tui(state, &source, &cfg)
}

/// The file and parse dump being viewed, re-read on reload.
struct Source {
    file: PathBuf,
    dump: PathBuf,
    mode: OffsetMode,
}

impl Source {
    fn load(&self) -> io::Result<(tree::StructTree, Vec<u8>)> {
        let data = std::fs::read(&self.file)?;
        let loaded = dump::load_dump(&self.dump).map_err(io::Error::other)?;
        info!(
            file = %self.file.display(),
            bytes = data.len(),
            mode = %self.mode,
            "opening viewer"
        );
        Ok((tree::StructTree::new(loaded.root, self.mode), data))
    }
}

fn run_tui(mut app: app_state::AppState, source: &Source, cfg: &config::Config) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, source, cfg);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut app_state::AppState,
    source: &Source,
    cfg: &config::Config,
) -> io::Result<()> {
    let mut dirty = true;
    loop {
        if app.tick() {
            dirty = true;
        }
        if dirty {
            terminal.draw(|f| ui::draw(f, app))?;
            dirty = false;
        }

        // Poll so finished background expansions show up without a key press
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            dirty = true;
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        dirty = true;

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab => app.toggle_focus(),
            KeyCode::Char('e') => app.expand_all(),
            KeyCode::Char('r') => match source.load() {
                Ok((tree, data)) => app.replace_tree(tree, data, cfg.eager_index),
                Err(e) => app.message = Some(format!("Reload failed: {e}")),
            },
            _ => match app.focus {
                app_state::Focus::Tree => match key.code {
                    KeyCode::Up | KeyCode::Char('k') => app.move_up(),
                    KeyCode::Down | KeyCode::Char('j') => app.move_down(),
                    KeyCode::Left | KeyCode::Char('h') => app.close_current(),
                    KeyCode::Right | KeyCode::Char('l') => app.open_current(),
                    KeyCode::Enter | KeyCode::Char(' ') => app.toggle_current(),
                    KeyCode::Home => app.move_to_first(),
                    KeyCode::End => app.move_to_last(),
                    _ => {}
                },
                app_state::Focus::Bytes => {
                    let extend = key.modifiers.contains(KeyModifiers::SHIFT);
                    let row = i64::try_from(app.bytes_per_row).unwrap_or(16);
                    match key.code {
                        KeyCode::Left | KeyCode::Char('h' | 'H') => app.move_caret(-1, extend),
                        KeyCode::Right | KeyCode::Char('l' | 'L') => app.move_caret(1, extend),
                        KeyCode::Up | KeyCode::Char('k' | 'K') => app.move_caret(-row, extend),
                        KeyCode::Down | KeyCode::Char('j' | 'J') => app.move_caret(row, extend),
                        KeyCode::PageUp => app.move_caret(-row * 16, extend),
                        KeyCode::PageDown => app.move_caret(row * 16, extend),
                        _ => {}
                    }
                }
            },
        }
    }
}
