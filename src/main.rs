use picsort::cli::{AppConfig, Args};
use picsort::config::UserConfig;
use picsort::decode::ImageFileDecoder;
use picsort::navigation::Direction;
use picsort::{open_file, Result};
use picsort::tui::{
    handle_key_event, handle_prompt_input, render, render_folder_prompt, render_help_overlay,
    render_keybinds_overlay, KeyAction, PromptAction, RenderCache, Screen, StatusMessage,
    ViewState,
};
use picsort::viewer::SyncViewer;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::{io, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> io::Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Load user configuration
    let mut user_config = UserConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load user config: {}", e);
        UserConfig::default()
    });

    if update_binds(&args, &mut user_config) {
        if let Err(e) = user_config.save() {
            eprintln!("Warning: Failed to save user config: {}", e);
        }
    }

    if args.list_binds {
        print_binds(&user_config);
        return Ok(());
    }

    init_logging();

    let config = AppConfig::resolve(
        &args,
        user_config.cache_images,
        user_config.last_folder.clone(),
    );

    if let Err(e) = run_app_with_config(&config, &mut user_config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Applies `--bind`, `--rebind` and `--unbind`; returns whether anything changed
fn update_binds(args: &Args, user_config: &mut UserConfig) -> bool {
    // validate() has already rejected malformed binds
    let binds = args.parsed_binds().unwrap_or_default();
    let mut changed = false;

    for bind in binds {
        match user_config.keybinds.replace_folder(bind.key, bind.folder.clone()) {
            Some(previous) if previous != bind.folder => {
                println!("{}: {} -> {}", bind.key, previous, bind.folder);
            }
            Some(_) => {}
            None => user_config.keybinds.put(bind.key, bind.folder),
        }
        changed = true;
    }
    for (old, new) in args.parsed_rebinds().unwrap_or_default() {
        if user_config.keybinds.replace_key(old, new) {
            changed = true;
        } else {
            eprintln!("Warning: cannot rebind '{}' to '{}'", old, new);
        }
    }
    for key in &args.unbinds {
        if user_config.keybinds.remove(*key).is_some() {
            changed = true;
        } else {
            eprintln!("Warning: '{}' is not bound", key);
        }
    }

    changed
}

fn print_binds(user_config: &UserConfig) {
    if user_config.keybinds.is_empty() {
        println!("No keys bound. Add one with --bind KEY=FOLDER");
        return;
    }
    for bind in user_config.keybinds.iter() {
        println!("{}  ->  {}", bind.key, bind.folder);
    }
}

/// Sends tracing output to the log file; the terminal belongs to the UI
fn init_logging() {
    let Some(path) = UserConfig::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
}

/// Runs the TUI application with configuration
pub fn run_app_with_config(config: &AppConfig, user_config: &mut UserConfig) -> Result<()> {
    let mut viewer = SyncViewer::new(Arc::new(ImageFileDecoder), config.organizer_options())?;
    viewer.select_folder(&config.directory)?;
    user_config.last_folder = viewer.folder().map(|p| p.to_path_buf());
    info!(
        folder = %config.directory.display(),
        caching = config.caching,
        "picsort started"
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_loop(&mut terminal, &mut viewer, config, user_config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    user_config.last_folder = viewer.folder().map(|p| p.to_path_buf());
    user_config.cache_images = viewer.caching();
    if let Err(e) = user_config.save() {
        eprintln!("Warning: Failed to save user config: {}", e);
    }

    Ok(result?)
}

/// Main application loop
fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    viewer: &mut SyncViewer,
    config: &AppConfig,
    user_config: &mut UserConfig,
) -> io::Result<()> {
    let mut view_state = ViewState::Browsing;
    let mut status: Option<StatusMessage> = None;
    let mut prompt = String::new();
    let mut render_cache = RenderCache::new();

    loop {
        viewer.poll();

        terminal.draw(|frame| {
            let screen = Screen {
                folder: viewer.folder(),
                view: viewer.current(),
                progress: viewer.progress(),
                caching: viewer.caching(),
                status: status.as_ref(),
            };
            render(frame, &screen, &mut render_cache);

            // Render overlays
            match view_state {
                ViewState::Help => render_help_overlay(frame),
                ViewState::KeyBinds => render_keybinds_overlay(frame, &user_config.keybinds),
                ViewState::FolderPrompt => render_folder_prompt(frame, &prompt),
                ViewState::Browsing => {}
            }
        })?;

        // Handle input
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Handle overlay-specific input
        match view_state {
            ViewState::Help | ViewState::KeyBinds => {
                // Any key closes the overlay
                view_state = ViewState::Browsing;
                continue;
            }
            ViewState::FolderPrompt => {
                match handle_prompt_input(key, &mut prompt) {
                    PromptAction::Submit(path) if !path.is_empty() => {
                        status = Some(open_folder(viewer, PathBuf::from(path), user_config));
                        view_state = ViewState::Browsing;
                    }
                    PromptAction::Submit(_) | PromptAction::Cancel => {
                        view_state = ViewState::Browsing;
                    }
                    PromptAction::Edit => {}
                }
                continue;
            }
            ViewState::Browsing => {}
        }

        status = None;
        match handle_key_event(key, &user_config.keybinds) {
            KeyAction::Quit => break,
            KeyAction::Next => {
                if !viewer.step(Direction::Forward) && viewer.current().is_some() {
                    status = Some(StatusMessage::info("Last image"));
                }
            }
            KeyAction::Previous => {
                if !viewer.step(Direction::Backward) && viewer.current().is_some() {
                    status = Some(StatusMessage::info("First image"));
                }
            }
            KeyAction::MoveTo(folder) => {
                let name = viewer.current().map(|v| v.name.clone());
                status = match (viewer.move_current_to(&folder), name) {
                    (Ok(true), Some(name)) => {
                        Some(StatusMessage::info(format!("Moved {} to {}", name, folder)))
                    }
                    (Ok(_), _) => None,
                    (Err(e), _) => {
                        warn!(error = %e, "move failed");
                        Some(StatusMessage::error(e.to_string()))
                    }
                };
            }
            KeyAction::ToggleCache if config.window.is_some() => {
                status = Some(StatusMessage::error("Caching is unavailable with --window"));
            }
            KeyAction::ToggleCache => {
                let enabled = !viewer.caching();
                viewer.set_caching(enabled);
                user_config.cache_images = enabled;
                if let Err(e) = user_config.save() {
                    warn!(error = %e, "failed to save user config");
                }
                status = Some(StatusMessage::info(if enabled {
                    "Caching on"
                } else {
                    "Caching off"
                }));
            }
            KeyAction::SelectFolder => {
                prompt = viewer
                    .folder()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                view_state = ViewState::FolderPrompt;
            }
            KeyAction::Open => {
                if let Some(path) = viewer.current_path() {
                    if let Err(e) = open_file(&path) {
                        status = Some(StatusMessage::error(format!("Failed to open file: {}", e)));
                    }
                }
            }
            KeyAction::Help => view_state = ViewState::Help,
            KeyAction::KeyBinds => view_state = ViewState::KeyBinds,
            KeyAction::None => {}
        }
    }

    Ok(())
}

fn open_folder(viewer: &mut SyncViewer, dir: PathBuf, user_config: &mut UserConfig) -> StatusMessage {
    match viewer.select_folder(&dir) {
        Ok(true) => {
            user_config.last_folder = viewer.folder().map(|p| p.to_path_buf());
            let count = viewer.current().map(|v| v.total).unwrap_or(0);
            StatusMessage::info(format!("Opened {} ({} images)", dir.display(), count))
        }
        Ok(false) => StatusMessage::info("Folder is already open"),
        Err(e) => {
            warn!(error = %e, "folder selection failed");
            StatusMessage::error(e.to_string())
        }
    }
}
