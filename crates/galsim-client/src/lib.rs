//! # GalSim Client
//!
//! The player-side half of the dialogue protocol:
//!
//! - [`session::SessionClient`]: the session state machine, pure and I/O free
//! - [`transport::DialogueTransport`]: the seam to the service, with the
//!   reqwest-backed [`transport::HttpTransport`]
//! - [`driver::SessionDriver`]: runs a transition, the bounded network call
//!   and the completion as one operation
//!
//! The `galsim-tui` binary drives the same state machine from a terminal UI.

pub mod driver;
pub mod session;
pub mod transport;

pub use driver::{call_with_timeout, SessionDriver};
pub use session::{ActiveSession, Phase, SessionClient};
pub use transport::{DialogueTransport, HttpTransport};
