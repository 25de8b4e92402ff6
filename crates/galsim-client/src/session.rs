//! Session state machine.
//!
//! Every operation is split into a `begin_*` transition, which validates and
//! produces the wire request, and a `complete_*` transition, which folds the
//! transport outcome back in. Nothing here performs I/O or rendering.

use galsim_core::{
    render_choices, validate_dialogue_response, validate_start_response, AffectionGauge,
    ClientError, ClientResult, DialogueRequest, DialogueResponse, HistoryEntry, LabeledChoice,
    StartRequest, StartResponse, StateError, ThemeSelection, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NoSession,
    AwaitingStartResponse,
    Active,
    AwaitingTurnResponse,
}

impl Phase {
    pub fn is_awaiting(self) -> bool {
        matches!(
            self,
            Phase::AwaitingStartResponse | Phase::AwaitingTurnResponse
        )
    }
}

/// A bound conversation as the client sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    session_id: String,
    theme: String,
    affection: i64,
    history: Vec<HistoryEntry>,
    choices: Vec<String>,
}

impl ActiveSession {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Raw affection as last reported by the service
    pub fn affection(&self) -> i64 {
        self.affection
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn gauge(&self) -> AffectionGauge {
        AffectionGauge::new(self.affection)
    }

    pub fn labeled_choices(&self) -> Vec<LabeledChoice> {
        render_choices(&self.choices)
    }
}

#[derive(Debug, Default)]
pub struct SessionClient {
    phase: Phase,
    session: Option<ActiveSession>,
}

impl SessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_awaiting()
    }

    pub fn begin_start(&mut self, selection: &ThemeSelection) -> ClientResult<StartRequest> {
        match self.phase {
            Phase::NoSession => {}
            Phase::Active => return Err(StateError::SessionAlreadyActive.into()),
            Phase::AwaitingStartResponse | Phase::AwaitingTurnResponse => {
                return Err(StateError::RequestInFlight.into())
            }
        }

        let request = selection.to_request()?;
        self.phase = Phase::AwaitingStartResponse;
        Ok(request)
    }

    pub fn complete_start(
        &mut self,
        outcome: Result<StartResponse, TransportError>,
    ) -> ClientResult<&ActiveSession> {
        if self.phase != Phase::AwaitingStartResponse {
            return Err(StateError::NoRequestInFlight.into());
        }

        let response = match outcome.and_then(|r| validate_start_response(&r).map(|_| r)) {
            Ok(response) => response,
            Err(e) => {
                self.phase = Phase::NoSession;
                return Err(e.into());
            }
        };

        log::info!(
            "Session {} started with theme {:?}",
            response.session_id,
            response.theme
        );
        self.phase = Phase::Active;
        let session = self.session.insert(ActiveSession {
            session_id: response.session_id,
            theme: response.theme,
            affection: response.affection,
            history: vec![HistoryEntry::character(response.initial_dialogue)],
            choices: response.choices,
        });
        Ok(&*session)
    }

    /// Record the player's line and build the turn request.
    ///
    /// The user entry is appended before the response arrives and stays even
    /// if the turn fails.
    pub fn begin_turn(&mut self, choice: &str) -> ClientResult<DialogueRequest> {
        match self.phase {
            Phase::Active => {}
            Phase::NoSession => return Err(StateError::NoActiveSession.into()),
            Phase::AwaitingStartResponse | Phase::AwaitingTurnResponse => {
                return Err(StateError::RequestInFlight.into())
            }
        }

        let choice = choice.trim();
        if choice.is_empty() {
            return Err(ClientError::Validation("empty choice".to_string()));
        }

        let session = self.session.as_mut().ok_or(StateError::NoActiveSession)?;
        session.history.push(HistoryEntry::user(choice));
        self.phase = Phase::AwaitingTurnResponse;

        Ok(DialogueRequest {
            user_input: choice.to_string(),
            session_id: session.session_id.clone(),
            theme: session.theme.clone(),
        })
    }

    pub fn complete_turn(
        &mut self,
        outcome: Result<DialogueResponse, TransportError>,
    ) -> ClientResult<&ActiveSession> {
        if self.phase != Phase::AwaitingTurnResponse {
            return Err(StateError::NoRequestInFlight.into());
        }
        self.phase = Phase::Active;

        let response = outcome.and_then(|r| validate_dialogue_response(&r).map(|_| r))?;
        let session = self.session.as_mut().ok_or(StateError::NoActiveSession)?;

        session.affection = response.affection;
        session.choices = response.choices;
        session
            .history
            .push(HistoryEntry::character(response.character_response));
        Ok(&*session)
    }

    /// Resolve a displayed letter (case-insensitive) to its choice text.
    pub fn choose_letter(&self, letter: char) -> ClientResult<String> {
        let session = self.session.as_ref().ok_or(StateError::NoActiveSession)?;
        let letter = letter.to_ascii_uppercase();
        session
            .labeled_choices()
            .into_iter()
            .find(|c| c.letter == letter)
            .map(|c| c.text)
            .ok_or_else(|| ClientError::Validation(format!("no choice labeled {}", letter)))
    }

    /// Drop the current session so a new one can be started.
    ///
    /// Not allowed while a request is outstanding; there is no cancellation.
    pub fn abandon(&mut self) -> ClientResult<Option<ActiveSession>> {
        if self.is_busy() {
            return Err(StateError::RequestInFlight.into());
        }
        self.phase = Phase::NoSession;
        Ok(self.session.take())
    }
}
