//! QR session verification engine.
//!
//! Mints short-lived, single-use, HMAC-signed check-in sessions for an event
//! and validates scans against forgery, expiry, replay, location policy and
//! scan-rate abuse.

pub mod attendance;
pub mod audit;
pub mod collaborators;
pub mod engine;
pub mod error;
pub mod geo;
pub mod rate_limiter;
pub mod session_manager;
pub mod session_store;
pub mod signer;
pub mod validator;

pub use engine::{CheckinEngine, EnginePolicy};
pub use error::{EngineError, SignerError};
pub use session_manager::{SessionManager, SessionResponse};
pub use signer::{Signer, SigningKey};
pub use validator::{CheckinValidator, DeviceInfo, GeoFix, Outcome, ScanAttempt};
