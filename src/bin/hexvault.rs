//! hexvault - Terminal hex editor backed by a chunked key-value store

use std::io::{self, IsTerminal, Read, Stdout, Write as _};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    terminal::{self as term, BeginSynchronizedUpdate, EndSynchronizedUpdate, SetTitle},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use hexvault::app::App;
use hexvault::config::{self, Config};
use hexvault::logging;
use hexvault::store::{ChunkedStore, FileRecord, FileStore};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Terminal hex editor that saves into a chunked key-value store
#[derive(Parser, Debug)]
#[command(name = "hexvault")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to open from disk
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Load a saved file from the store instead
    #[arg(short, long, conflicts_with = "file")]
    load: Option<String>,

    /// Store file (overrides the config)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Config file (default: search hexvault.toml, ~/.config/hexvault/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// 起動時に読み込むデータ（優先順位: ファイル > ストア > stdin）
enum Initial {
    File(PathBuf),
    Saved(String),
    Piped(Vec<u8>),
    Nothing,
}

impl Initial {
    /// stdin はターミナル初期化前に読み切る
    fn from_args(args: &Args) -> Result<Self> {
        if let Some(path) = &args.file {
            return Ok(Self::File(path.clone()));
        }
        if let Some(name) = &args.load {
            return Ok(Self::Saved(name.clone()));
        }
        if io::stdin().is_terminal() {
            return Ok(Self::Nothing);
        }
        let mut piped = Vec::new();
        io::stdin().read_to_end(&mut piped)?;
        Ok(Self::Piped(piped))
    }

    fn apply(self, app: &mut App<FileStore>, mime_type: &str) -> Result<()> {
        match self {
            Self::File(path) => app.open(path)?,
            Self::Saved(name) => app.load_saved(&name),
            Self::Piped(data) => {
                let record = FileRecord::new("stdin", data.len(), mime_type);
                app.load_bytes(record, data);
            }
            Self::Nothing => {}
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    logging::init_file(&config.log_path(), &config.log.level)?;

    let store_path = args.store.clone().unwrap_or_else(|| config.store_path());
    let kv = FileStore::open(&store_path, config.store.quota_bytes)?;
    tracing::info!(store = %store_path.display(), "starting");

    let initial = Initial::from_args(&args)?;
    let app = build_app(&config, kv);

    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, app, initial, &config.store.mime_type);
    restore_terminal(&mut terminal)?;

    if let Err(e) = result {
        tracing::error!(error = %e, "exiting with error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    tracing::info!("bye");
    Ok(())
}

fn build_app(config: &Config, kv: FileStore) -> App<FileStore> {
    let store = ChunkedStore::new(kv)
        .with_namespace(config.store.namespace.clone())
        .with_intent_marker(config.store.intent_marker);
    App::new(store)
        .with_visible_rows(config.view.visible_rows)
        .with_mime_type(config.store.mime_type.clone())
}

fn setup_terminal() -> Result<Tui> {
    term::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, term::EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    term::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        term::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(terminal: &mut Tui, mut app: App<FileStore>, initial: Initial, mime_type: &str) -> Result<()> {
    initial.apply(&mut app, mime_type)?;

    while !app.should_quit() {
        set_title(terminal.backend_mut(), &app)?;

        // 同期更新でちらつきを抑える
        queue!(terminal.backend_mut(), BeginSynchronizedUpdate)?;
        terminal.draw(|frame| app.draw(frame))?;
        queue!(terminal.backend_mut(), EndSynchronizedUpdate)?;
        terminal.backend_mut().flush()?;

        app.handle_event()?;
    }
    Ok(())
}

/// "hexvault - name [+]"
fn set_title(backend: &mut CrosstermBackend<Stdout>, app: &App<FileStore>) -> Result<()> {
    let marker = if app.is_modified() { " [+]" } else { "" };
    let title = format!("hexvault - {}{marker}", app.filename().unwrap_or("[No File]"));
    queue!(backend, SetTitle(title))?;
    Ok(())
}
