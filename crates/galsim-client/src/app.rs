use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use galsim_client::{call_with_timeout, DialogueTransport, HttpTransport, SessionClient};
use galsim_core::{
    ClientError, DialogueResponse, StartResponse, StateError, ThemeSelection, TransportError,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Connecting,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● Connected"),
            ConnectionStatus::Disconnected => write!(f, "○ Disconnected"),
            ConnectionStatus::Connecting => write!(f, "◐ Connecting"),
            ConnectionStatus::Error => write!(f, "✗ Error"),
        }
    }
}

/// Which theme option is highlighted on the start screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeMode {
    Auto,
    Custom,
}

/// Result of a spawned request, delivered back to the UI loop
#[derive(Debug)]
pub enum Outcome {
    Started(Result<StartResponse, TransportError>),
    Turned(Result<DialogueResponse, TransportError>),
}

/// A one-line notice shown in the status bar
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    pub at: chrono::DateTime<Local>,
}

pub struct App {
    pub transport: Arc<HttpTransport>,
    pub session: SessionClient,
    pub timeout: Duration,
    pub status: ConnectionStatus,
    pub theme_mode: ThemeMode,
    pub input: String,
    pub notice: Option<Notice>,
    pub scroll_offset: usize,
    pub spinner: usize,
    outcome_tx: mpsc::Sender<Outcome>,
    outcome_rx: mpsc::Receiver<Outcome>,
}

impl App {
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        Self {
            transport: Arc::new(HttpTransport::new(server_url).with_timeout(timeout)),
            session: SessionClient::new(),
            timeout,
            status: ConnectionStatus::Disconnected,
            theme_mode: ThemeMode::Auto,
            input: String::new(),
            notice: None,
            scroll_offset: 0,
            spinner: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    pub fn has_session(&self) -> bool {
        self.session.session().is_some()
    }

    /// Bounded by the request timeout so a silent server cannot hold up startup.
    pub async fn check_connection(&mut self) {
        self.status = ConnectionStatus::Connecting;
        if self.transport.health_check().await {
            self.status = ConnectionStatus::Connected;
            self.info(format!("Connected to {}", self.transport.base_url()));
        } else {
            self.status = ConnectionStatus::Disconnected;
            self.error(format!(
                "Failed to connect to server at {}",
                self.transport.base_url()
            ));
        }
    }

    pub fn toggle_theme_mode(&mut self) {
        self.theme_mode = match self.theme_mode {
            ThemeMode::Auto => ThemeMode::Custom,
            ThemeMode::Custom => ThemeMode::Auto,
        };
    }

    pub fn push_input(&mut self, c: char) {
        if self.theme_mode == ThemeMode::Custom {
            self.input.push(c);
        }
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    /// Start a dialogue with the highlighted theme option.
    pub fn start_dialogue(&mut self) {
        let selection = match self.theme_mode {
            ThemeMode::Auto => ThemeSelection::Auto,
            ThemeMode::Custom => ThemeSelection::custom(self.input.clone()),
        };

        let request = match self.session.begin_start(&selection) {
            Ok(request) => request,
            Err(e) => return self.report(e),
        };

        let transport = self.transport.clone();
        let tx = self.outcome_tx.clone();
        let limit = self.timeout;
        tokio::spawn(async move {
            let outcome = call_with_timeout(limit, transport.start(&request)).await;
            if tx.send(Outcome::Started(outcome)).await.is_err() {
                log::debug!("UI closed before start response arrived");
            }
        });
    }

    /// Continue with the choice labeled `letter`; ignored while a request is outstanding.
    pub fn choose(&mut self, letter: char) {
        if self.is_busy() {
            log::debug!("Ignoring choice {} while a request is in flight", letter);
            return;
        }

        let request = match self
            .session
            .choose_letter(letter)
            .and_then(|text| self.session.begin_turn(&text))
        {
            Ok(request) => request,
            Err(e) => return self.report(e),
        };
        self.scroll_to_bottom();

        let transport = self.transport.clone();
        let tx = self.outcome_tx.clone();
        let limit = self.timeout;
        tokio::spawn(async move {
            let outcome = call_with_timeout(limit, transport.advance(&request)).await;
            if tx.send(Outcome::Turned(outcome)).await.is_err() {
                log::debug!("UI closed before dialogue response arrived");
            }
        });
    }

    /// Drop the current session and go back to theme selection.
    pub fn new_dialogue(&mut self) {
        match self.session.abandon() {
            Ok(Some(dropped)) => {
                log::info!("Abandoned session {}", dropped.session_id());
                self.input.clear();
                self.scroll_offset = 0;
                self.info("Choose a theme to start a new dialogue".to_string());
            }
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    /// Fold finished requests back into the session state.
    pub fn process_events(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            let result = match outcome {
                Outcome::Started(outcome) => self.session.complete_start(outcome).map(|_| ()),
                Outcome::Turned(outcome) => self.session.complete_turn(outcome).map(|_| ()),
            };
            match result {
                Ok(()) => {
                    self.status = ConnectionStatus::Connected;
                    self.notice = None;
                    self.scroll_to_bottom();
                }
                Err(e) => {
                    if matches!(e, ClientError::Transport(TransportError::Network(_))) {
                        self.status = ConnectionStatus::Error;
                    }
                    self.report(e);
                }
            }
        }
    }

    pub fn on_tick(&mut self) {
        if self.is_busy() {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    fn report(&mut self, e: ClientError) {
        match e {
            ClientError::State(StateError::RequestInFlight) => {
                log::debug!("{}", e);
            }
            e => {
                log::warn!("{}", e);
                self.error(e.to_string());
            }
        }
    }

    fn info(&mut self, text: String) {
        self.notice = Some(Notice {
            text,
            is_error: false,
            at: Local::now(),
        });
    }

    fn error(&mut self, text: String) {
        self.notice = Some(Notice {
            text,
            is_error: true,
            at: Local::now(),
        });
    }
}
