//! # GalSim Core
//!
//! Wire types for the dialogue session protocol, the error kinds shared by
//! client and service, and the pure display mapping (lettered choices,
//! affection gauge) used by any UI surface.

pub mod display;
pub mod error;
pub mod protocol;

pub use display::{render_choices, AffectionBand, AffectionGauge, LabeledChoice};
pub use error::{ClientError, ClientResult, StateError, TransportError};
pub use protocol::{
    validate_dialogue_response, validate_start_response, DialogueRequest, DialogueResponse,
    ErrorBody, HistoryEntry, Role, SessionInfo, StartRequest, StartResponse, ThemeSelection,
    AUTO_THEME, MAX_CHOICES,
};

/// Base path of every service endpoint
pub const API_PREFIX: &str = "/api/v1";
