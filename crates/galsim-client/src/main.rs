use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use galsim_config::ConfigManager;
use ratatui::{backend::CrosstermBackend, Terminal};

mod app;
mod ui;

use app::App;

#[derive(Parser, Debug)]
#[command(name = "galsim-tui")]
#[command(about = "Terminal client for GalSim dialogues")]
#[command(version)]
struct Cli {
    /// Server base URL (overrides config)
    #[arg(long, env = "GALSIM_SERVER")]
    server: Option<String>,

    /// Config file path
    #[arg(long, env = "GALSIM_CONFIG", default_value = "~/.galsim/config.json")]
    config: String,

    /// Request timeout in seconds (overrides config)
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config_path =
        galsim_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));
    let config = ConfigManager::load(&config_path).await?.snapshot().await;

    let server_url = cli.server.unwrap_or(config.client.base_url);
    let timeout = Duration::from_secs(cli.timeout.unwrap_or(config.client.request_timeout_secs));
    log::info!("Using server {} (timeout {:?})", server_url, timeout);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&server_url, timeout);
    app.check_connection().await;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut last_tick = tokio::time::Instant::now();
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if handle_key_event(app, key) {
                    return Ok(());
                }
            }
        }

        // Finished requests
        app.process_events();

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = tokio::time::Instant::now();
        }
    }
}

/// Returns `true` when the app should quit.
fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return true,
        KeyCode::Char('n') if ctrl => app.new_dialogue(),
        _ if app.has_session() => match key.code {
            KeyCode::Char(c @ ('a'..='d' | 'A'..='D')) => app.choose(c),
            KeyCode::Char(c @ '1'..='4') => {
                let letter = (b'A' + (c as u8 - b'1')) as char;
                app.choose(letter);
            }
            KeyCode::Up => app.scroll_up(),
            KeyCode::Down => app.scroll_down(),
            KeyCode::End => app.scroll_to_bottom(),
            _ => {}
        },
        _ if !app.is_busy() => match key.code {
            KeyCode::Tab | KeyCode::BackTab => app.toggle_theme_mode(),
            KeyCode::Enter => app.start_dialogue(),
            KeyCode::Backspace => app.pop_input(),
            KeyCode::Char(c) => app.push_input(c),
            _ => {}
        },
        _ => {}
    }
    false
}
