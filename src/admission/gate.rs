//! Admission Gate
//!
//! Combines credential checks with the quota ledger into a single
//! "may this request proceed" decision.

use crate::admission::credentials::{Authenticator, Identity};
use crate::admission::quota::{QuotaLedger, RateLimitDecision, RateLimits, RateWindow};
use crate::error::{Result, RouterError};
use std::fmt;
use tracing::{debug, warn};

/// Successful admission
#[derive(Clone, PartialEq)]
pub struct AuthOutcome {
    /// Identity derived from the credential
    pub identity: Identity,

    /// The credential as presented (without the `Bearer` prefix)
    pub credential: String,

    /// Quota telemetry for this request
    pub rate_limit: RateLimitDecision,
}

impl fmt::Debug for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOutcome")
            .field("identity", &self.identity)
            .field("credential", &"[redacted]")
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Authenticator plus quota ledger with default limits
#[derive(Debug)]
pub struct AdmissionGate {
    authenticator: Authenticator,
    ledger: QuotaLedger,
    limits: RateLimits,
}

impl AdmissionGate {
    /// Create a gate with its own empty ledger
    pub fn new(authenticator: Authenticator, limits: RateLimits) -> Self {
        Self::with_ledger(authenticator, QuotaLedger::new(), limits)
    }

    /// Create a gate around an existing ledger
    pub fn with_ledger(
        authenticator: Authenticator,
        ledger: QuotaLedger,
        limits: RateLimits,
    ) -> Self {
        Self {
            authenticator,
            ledger,
            limits,
        }
    }

    /// Authenticate with the configured default limits
    pub fn authenticate(&self, header: Option<&str>, now: i64) -> Result<AuthOutcome> {
        self.authenticate_with_limits(header, self.limits, now)
    }

    /// Authenticate with caller-supplied limits for this request
    pub fn authenticate_with_limits(
        &self,
        header: Option<&str>,
        limits: RateLimits,
        now: i64,
    ) -> Result<AuthOutcome> {
        let credential =
            Authenticator::extract_credential(header).ok_or(RouterError::MissingCredential)?;

        if !self.authenticator.validate(credential) {
            warn!("Rejected request with unknown API key");
            return Err(RouterError::InvalidCredential);
        }

        let identity = self.authenticator.identity_for(credential);
        let rate_limit = self.ledger.check_and_record(&identity, limits, now);

        if !rate_limit.allowed {
            let window = rate_limit.window.unwrap_or(RateWindow::Minute);
            let retry_after_secs = rate_limit
                .retry_after_secs
                .unwrap_or_else(|| window.retry_after(now));
            warn!(
                identity = %identity,
                window = %window,
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(RouterError::RateLimitExceeded {
                window,
                retry_after_secs,
            });
        }

        debug!(
            identity = %identity,
            remaining_minute = rate_limit.remaining_minute,
            remaining_hour = rate_limit.remaining_hour,
            "Request admitted"
        );

        Ok(AuthOutcome {
            identity,
            credential: credential.to_string(),
            rate_limit,
        })
    }

    /// Default limits applied by [`AdmissionGate::authenticate`]
    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_704_067_200;

    fn gate(per_minute: u32, per_hour: u32) -> AdmissionGate {
        AdmissionGate::new(
            Authenticator::new(["sk-valid", "sk-other"]),
            RateLimits {
                requests_per_minute: per_minute,
                requests_per_hour: per_hour,
            },
        )
    }

    #[test]
    fn test_authenticate_success() {
        let gate = gate(60, 1000);
        let outcome = gate.authenticate(Some("Bearer sk-valid"), T0).unwrap();

        assert_eq!(outcome.credential, "sk-valid");
        assert_eq!(outcome.identity, Identity::from_token("sk-valid"));
        assert!(outcome.rate_limit.allowed);
        assert_eq!(outcome.rate_limit.remaining_minute, 59);
        assert_eq!(outcome.rate_limit.remaining_hour, 999);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let outcome = gate(60, 1000)
            .authenticate(Some("Bearer sk-valid"), T0)
            .unwrap();
        let rendered = format!("{:?}", outcome);

        assert!(!rendered.contains("sk-valid"));
        assert!(rendered.contains("[redacted]"));
        assert!(rendered.contains(outcome.identity.as_str()));
    }

    #[test]
    fn test_missing_credential() {
        let gate = gate(60, 1000);
        assert_eq!(
            gate.authenticate(None, T0).unwrap_err(),
            RouterError::MissingCredential
        );
        assert_eq!(
            gate.authenticate(Some("Token abc"), T0).unwrap_err(),
            RouterError::MissingCredential
        );
    }

    #[test]
    fn test_invalid_credential_is_not_counted() {
        let gate = gate(60, 1000);
        assert_eq!(
            gate.authenticate(Some("Bearer sk-invalid"), T0).unwrap_err(),
            RouterError::InvalidCredential
        );
        assert_eq!(gate.ledger().tracked_identities(), 0);
    }

    #[test]
    fn test_minute_limit_surfaces_as_rate_limit_error() {
        let gate = gate(2, 1000);
        gate.authenticate(Some("sk-valid"), T0).unwrap();
        gate.authenticate(Some("sk-valid"), T0 + 1).unwrap();

        let err = gate.authenticate(Some("sk-valid"), T0 + 20).unwrap_err();
        assert_eq!(
            err,
            RouterError::RateLimitExceeded {
                window: RateWindow::Minute,
                retry_after_secs: 40,
            }
        );
        assert!(!err.is_auth_failure());

        // Another key is unaffected
        assert!(gate.authenticate(Some("sk-other"), T0 + 20).is_ok());
    }

    #[test]
    fn test_hour_limit_surfaces_as_rate_limit_error() {
        let gate = gate(100, 2);
        gate.authenticate(Some("sk-valid"), T0).unwrap();
        gate.authenticate(Some("sk-valid"), T0 + 60).unwrap();

        match gate.authenticate(Some("sk-valid"), T0 + 120) {
            Err(RouterError::RateLimitExceeded {
                window,
                retry_after_secs,
            }) => {
                assert_eq!(window, RateWindow::Hour);
                assert_eq!(retry_after_secs, 3480);
            }
            other => panic!("expected hourly rate limit, got {:?}", other),
        }
    }

    #[test]
    fn test_limit_override() {
        let gate = gate(60, 1000);
        let strict = RateLimits {
            requests_per_minute: 1,
            requests_per_hour: 1000,
        };

        gate.authenticate_with_limits(Some("sk-valid"), strict, T0)
            .unwrap();
        assert!(gate
            .authenticate_with_limits(Some("sk-valid"), strict, T0)
            .is_err());
        // Default limits still admit the same identity
        assert!(gate.authenticate(Some("sk-valid"), T0).is_ok());
    }
}
