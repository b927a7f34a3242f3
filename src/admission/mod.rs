//! Admission Module
//!
//! API key authentication and per-identity request quotas.

pub mod credentials;
pub mod gate;
pub mod quota;

pub use credentials::{Authenticator, Identity};
pub use gate::{AdmissionGate, AuthOutcome};
pub use quota::{unix_now, QuotaLedger, RateLimitDecision, RateLimits, RateWindow, RateWindowState};
