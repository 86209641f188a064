use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use jtv::export::write_csv;
use jtv::logging::{init_logging, LogConfig, LOG_FILE};
use jtv::paginator::LoadMode;
use jtv::transport::login;
use jtv::{
    load, App, AppConfig, AppEvent, Args, ConfigManager, FileStatePort, HttpFetcher, RunOptions,
    StatePort, TableEvent, TableState, APP_NAME,
};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use tracing::{info, warn};

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(
    mut terminal: DefaultTerminal,
    options: &RunOptions,
    state_port: Option<Box<dyn StatePort>>,
) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new(tx.clone(), options, state_port);
    render(&mut terminal, &mut app)?;
    app.start(options);

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key)
                    if key.kind == crossterm::event::KeyEventKind::Press =>
                {
                    tx.send(AppEvent::Key(key))?
                }
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// Load once and write the CSV without starting the terminal UI
fn run_headless(options: &RunOptions) -> Result<()> {
    let url = options
        .url
        .clone()
        .ok_or_else(|| eyre!("--export needs an endpoint URL"))?;
    let path = options
        .export
        .clone()
        .ok_or_else(|| eyre!("--export needs a path"))?;
    let fetcher = HttpFetcher::new(options.timeout);

    let token = match (&options.token, &options.credentials) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(credentials)) => {
            let auth_url = options
                .auth_url
                .as_deref()
                .ok_or_else(|| eyre!("--username needs --auth-url or http.auth_url in config"))?;
            let token = login(fetcher.agent(), auth_url, credentials)
                .map_err(|e| eyre!(e.user_message()))?;
            info!("logged in");
            Some(token)
        }
        (None, None) => None,
    };

    let mut tab = TableState::new(0, "Tab 1", options.cursor.clone()).with_endpoint(url);
    if let Some(offset) = options.offset {
        tab.update(TableEvent::OffsetChanged(offset));
    }
    let summary = load(&mut tab, options.load_mode, &fetcher, token.as_deref())
        .map_err(|e| eyre!(e.user_message()))?;
    write_csv(&tab, &path)?;

    let mode = match options.load_mode {
        LoadMode::Single => "page",
        LoadMode::All => "all pages",
    };
    eprintln!(
        "Exported {} rows ({}, {} request{}) to {}; next offset {}",
        summary.rows_loaded,
        mode,
        summary.pages_fetched,
        if summary.pages_fetched == 1 { "" } else { "s" },
        path.display(),
        summary.next_offset
    );
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.clear_state {
        match FileStatePort::new(APP_NAME) {
            Ok(port) => {
                if let Err(e) = port.clear() {
                    eprintln!("Error clearing saved tabs: {}", e);
                    std::process::exit(1);
                }
                println!("Saved tabs cleared");
            }
            Err(_e) => println!("No saved tabs to clear"),
        }
        return Ok(Some(()));
    }

    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        match manager.write_default_config(args.force) {
            Ok(path) => println!("Wrote default configuration to {}", path.display()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(Some(()));
    }

    Ok(None)
}

/// Log file for TUI mode: configured, or jtv.log in the cache directory
fn tui_log_file(args: &Args, config: &AppConfig) -> Option<PathBuf> {
    args.log_file
        .clone()
        .or_else(|| config.logging.file.clone())
        .or_else(|| dirs::cache_dir().map(|dir| dir.join(APP_NAME).join(LOG_FILE)))
}

fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = AppConfig::load(APP_NAME)?;
    let options = RunOptions::from_args_and_config(&args, &config);
    let log_config = LogConfig::from_level_name(&config.logging.level, args.debug)?;

    if args.is_headless() {
        let log_file = args.log_file.clone().or_else(|| config.logging.file.clone());
        init_logging(&log_config.with_log_file(log_file))?;
        return run_headless(&options);
    }

    // Logging to stderr would draw over the table, so without a file there is no logging
    if let Some(log_file) = tui_log_file(&args, &config) {
        if let Err(e) = init_logging(&log_config.with_log_file(Some(log_file))) {
            eprintln!("Warning: Could not open log file: {}", e);
        }
    }

    let state_port: Option<Box<dyn StatePort>> = if options.persist {
        match FileStatePort::new(APP_NAME) {
            Ok(port) => Some(Box::new(port)),
            Err(e) => {
                warn!(error = %e, "tab layout will not be saved");
                None
            }
        }
    } else {
        None
    };

    let terminal = ratatui::init();
    let result = run(terminal, &options, state_port);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
