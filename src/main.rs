use std::io;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use avbot_core::cancel::CancellationToken;
use avbot_core::chat::focus_client;
use avbot_core::input::Controller;
use avbot_core::keystrokes::{
    load_keystrokes, parse_keystrokes, perform_keystrokes, record_keystrokes, save_keystrokes,
};
use avbot_core::platform::{create_platform, hotkey, stub::StubScreen};
use avbot_core::screen::{ClientView, GameWindow, MatchOptions};
use avbot_core::session::Session;
use avbot_core::settings::Settings;
use avbot_core::types::BotStatus;
use avbot_core::{assets, battleground, farm, logger, BotError};

#[derive(Parser)]
#[command(name = "avbot", version, about = "Alterac Valley AFK bot")]
struct Cli {
    /// Use the stub platform (no real input or capture)
    #[arg(long, global = true)]
    stub: bool,
    /// Run without the TUI, echoing logs to stderr
    #[arg(long, global = true)]
    headless: bool,
    #[arg(long, global = true, default_value = "settings.json")]
    settings: PathBuf,
    /// Directory holding the template and movement directories
    #[arg(long, global = true)]
    assets: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Queue, walk out, hold position and leave, for N matches
    AfkAv(AfkArgs),
    /// Spawn and loot target dummies
    FarmDummies {
        #[arg(long)]
        count: Option<u32>,
    },
    /// Report which templates a saved screenshot contains
    Analyze { image: PathBuf },
    /// Replay a recorded keystroke timeline
    Replay { recording: PathBuf },
    /// Record held keys to a timeline until the stop key is pressed
    Record(RecordArgs),
}

#[derive(Args)]
struct RecordArgs {
    #[arg(default_value = "keystroke_data.json")]
    output: PathBuf,
    /// Keys to track
    #[arg(long, value_delimiter = ',', default_value = "a,w,s,d,t")]
    keys: Vec<String>,
    #[arg(long, default_value = "escape")]
    stop: String,
}

#[derive(Args, Default)]
struct AfkArgs {
    #[arg(long)]
    games: Option<u32>,
    /// Battlemaster to target when queuing
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    interact: Option<String>,
    #[arg(long)]
    mount: Option<String>,
    #[arg(long)]
    threshold: Option<f64>,
    /// Seconds to wait for the queue to pop
    #[arg(long)]
    wait_time: Option<f64>,
}

impl AfkArgs {
    fn apply(&self, settings: &mut Settings) {
        let bg = &mut settings.battleground;
        if let Some(games) = self.games {
            bg.games = games;
        }
        if let Some(target) = &self.target {
            bg.target_name = target.clone();
        }
        if let Some(secs) = self.wait_time {
            bg.max_wait_secs = secs;
        }
        if let Some(key) = &self.interact {
            settings.keys.interact = key.clone();
        }
        if let Some(key) = &self.mount {
            settings.keys.mount = key.clone();
        }
        if let Some(t) = self.threshold {
            settings.matching.threshold = t;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if let Err(e) = logger::init(&cwd.join("logs")) {
        eprintln!("logging disabled: {}", e);
    }
    logger::register_defaults();

    let mut settings = Settings::load(&cli.settings)?;
    if !cli.settings.exists() {
        settings.save(&cli.settings)?;
        logger::info(&format!("wrote default settings to {}", cli.settings.display()));
    }
    let command = cli.command.unwrap_or(Cmd::AfkAv(AfkArgs::default()));
    match &command {
        Cmd::AfkAv(args) => args.apply(&mut settings),
        Cmd::FarmDummies { count: Some(n) } => settings.farm.count = *n,
        _ => {}
    }
    settings.validate().context("checking command-line overrides")?;
    let asset_base = cli.assets.unwrap_or(cwd);

    if let Cmd::Analyze { image } = &command {
        return analyze(image, &settings, &asset_base);
    }

    let backend = create_platform(cli.stub);
    let mut view = ClientView::new(
        backend.screen,
        GameWindow::new(&settings.client.process_name, &settings.client.window_title),
    );
    assets::install(&mut view, &settings.assets, &asset_base)?;

    let status = Arc::new(Mutex::new(BotStatus::default()));
    let shutdown = CancellationToken::new();
    hotkey::start_hotkey_listener(shutdown.clone());

    let session = Session::new(
        view,
        Controller::new(backend.input),
        settings,
        Arc::clone(&status),
        shutdown.clone(),
    );

    let outcome = if cli.headless {
        logger::set_echo(true);
        run_command(command, session)
    } else {
        run_with_tui(command, session, status, shutdown)?
    };

    match outcome {
        Ok(summary) => {
            logger::info(&summary);
            if cli.headless {
                println!("{}", summary);
            }
            Ok(())
        }
        Err(BotError::Stopped) => Ok(()),
        Err(e) => {
            eprintln!("avbot: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_command(command: Cmd, mut s: Session) -> avbot_core::Result<String> {
    match command {
        Cmd::AfkAv(_) => battleground::run_afk_av(&mut s).map(|n| format!("completed {} matches", n)),
        Cmd::FarmDummies { .. } => {
            let count = s.settings.farm.count;
            farm::run_farm_dummies(&mut s, count).map(|n| format!("looted {} dummies", n))
        }
        Cmd::Replay { recording } => replay(&mut s, &recording),
        Cmd::Record(args) => record(&s, &args),
        Cmd::Analyze { .. } => Ok(String::new()),
    }
}

fn replay(s: &mut Session, path: &Path) -> avbot_core::Result<String> {
    let actions = parse_keystrokes(&load_keystrokes(path)?);
    focus_client(&mut s.view, s.settings.battleground.ui_delay_secs);
    let cancel = s.shutdown().clone();
    let finished = perform_keystrokes(&mut s.ctl, &actions, &cancel);
    s.release_keys();
    if cancel.is_cancelled() {
        return Err(BotError::Stopped);
    }
    Ok(format!("replayed {} actions ({})", actions.len(), if finished { "complete" } else { "empty" }))
}

fn record(s: &Session, args: &RecordArgs) -> avbot_core::Result<String> {
    logger::info(&format!("recording keys {:?}; press {} to stop and save", args.keys, args.stop));
    let strokes = record_keystrokes(&s.ctl, &args.keys, &args.stop, 0.01, s.shutdown());
    save_keystrokes(&args.output, &strokes)?;
    Ok(format!("saved {} keystrokes to {}", strokes.len(), args.output.display()))
}

/// Match every template against a saved frame and print the hits.
fn analyze(image_path: &Path, settings: &Settings, asset_base: &Path) -> Result<()> {
    let (screen, _) = StubScreen::new();
    let mut view = ClientView::new(
        Box::new(screen),
        GameWindow::new(&settings.client.process_name, &settings.client.window_title),
    );
    assets::install(&mut view, &settings.assets, asset_base)?;

    let frame = image::open(image_path)
        .with_context(|| format!("opening {}", image_path.display()))?
        .to_rgba8();
    println!("{} ({}x{})", image_path.display(), frame.width(), frame.height());
    view.load_frame(frame);

    let opts = MatchOptions::new(settings.matching.threshold, settings.matching.grayscale).cached();
    for record in view.update_all(&opts)? {
        match record.location {
            Some(span) if record.found => println!("  {:<28} found at {}", record.name, span),
            _ => println!("  {:<28} -", record.name),
        }
    }
    Ok(())
}

/// Run the routine on a worker thread while the TUI owns the terminal.
fn run_with_tui(
    command: Cmd,
    session: Session,
    status: Arc<Mutex<BotStatus>>,
    shutdown: CancellationToken,
) -> Result<avbot_core::Result<String>> {
    let (log_tx, log_rx) = mpsc::channel::<String>();
    logger::set_tui_sender(log_tx);
    logger::info("avbot started");

    let worker = thread::spawn(move || run_command(command, session));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = avbot_tui::App::new(status, log_rx, shutdown.clone());
    let ui_result = avbot_tui::event::run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // The routine may still be mid-match if the UI failed.
    shutdown.cancel();
    let outcome = worker
        .join()
        .map_err(|_| anyhow::anyhow!("routine thread panicked"))?;
    ui_result?;
    Ok(outcome)
}
