//! MuxRoute - admission and routing core for a multi-provider LLM gateway
//!
//! Sits between an upstream request handler and the provider clients. For
//! each chat request it authenticates the caller, enforces per-identity
//! quotas, classifies the prompt and picks a provider/model pair.
//!
//! ```no_run
//! use muxroute::{ChatMessage, ModelRouter};
//!
//! let router = ModelRouter::new()?;
//! let routed = router.handle(
//!     Some("Bearer sk-my-key"),
//!     &[ChatMessage::user("What is the capital of France?")],
//!     None,
//!     muxroute::admission::unix_now(),
//! )?;
//! println!("{}/{}", routed.decision.provider, routed.decision.model);
//! # Ok::<(), muxroute::RouterError>(())
//! ```

pub mod admission;
pub mod api;
pub mod config;
pub mod error;
pub mod router;
pub mod telemetry;

pub use admission::{AdmissionGate, AuthOutcome, Identity, RateLimitDecision, RateLimits};
pub use api::{ChatMessage, Role};
pub use config::{ConfigLoader, RouterConfig};
pub use error::{Result, RouterError};
pub use router::{PromptAnalysis, RoutingDecision, StatsSnapshot, TaskType};

use admission::{Authenticator, QuotaLedger};
use router::{ModelSelector, PromptClassifier, RoutingStats};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Routing decision plus the analysis that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteOutcome {
    pub decision: RoutingDecision,
    pub analysis: PromptAnalysis,
}

/// Everything the request handler needs after a full pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedRequest {
    pub identity: Identity,
    pub decision: RoutingDecision,
    pub analysis: PromptAnalysis,
    pub rate_limit: RateLimitDecision,
}

/// The admission-and-routing pipeline
#[derive(Debug)]
pub struct ModelRouter {
    gate: AdmissionGate,
    classifier: PromptClassifier,
    selector: ModelSelector,
    stats: RoutingStats,
}

impl ModelRouter {
    /// Create a router from the default configuration sources
    pub fn new() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::from_config(loader.into_config())
    }

    /// Create a router with a custom config path
    pub fn with_config_path(path: &str) -> Result<Self> {
        let loader = ConfigLoader::from_path(path)?;
        Self::from_config(loader.into_config())
    }

    /// Create a router from a config object; all config errors surface here
    pub fn from_config(config: RouterConfig) -> Result<Self> {
        config.validate()?;

        if config.api_keys.is_empty() {
            warn!("No API keys configured; every request will be rejected");
        }

        let selector = ModelSelector::from_config(&config)?;
        let gate = AdmissionGate::with_ledger(
            Authenticator::new(config.api_keys),
            QuotaLedger::new(),
            config.rate_limits,
        );

        info!(
            requests_per_minute = config.rate_limits.requests_per_minute,
            requests_per_hour = config.rate_limits.requests_per_hour,
            task_types = config.preferences.len(),
            "Router ready"
        );

        Ok(Self {
            gate,
            classifier: PromptClassifier::new(config.classification),
            selector,
            stats: RoutingStats::new(),
        })
    }

    /// Authenticate a request and charge it against the caller's quota
    pub fn authenticate(&self, authorization: Option<&str>, now: i64) -> Result<AuthOutcome> {
        self.gate.authenticate(authorization, now)
    }

    /// Classify and route an already-admitted request
    pub fn route(
        &self,
        messages: &[ChatMessage],
        identity: &Identity,
        budget_ceiling: Option<f64>,
    ) -> RouteOutcome {
        let analysis = self.classifier.analyze(messages);
        let decision = self.selector.decide(&analysis, budget_ceiling);

        self.stats.record(decision.task_type, &decision.provider);

        debug!(
            identity = %identity,
            task_type = %decision.task_type,
            provider = %decision.provider,
            model = %decision.model,
            code_confidence = analysis.code_confidence,
            complexity_confidence = analysis.complexity_confidence,
            simple_confidence = analysis.simple_confidence,
            "Routed request"
        );

        RouteOutcome { decision, analysis }
    }

    /// Run the full pipeline; admission failures short-circuit routing
    pub fn handle(
        &self,
        authorization: Option<&str>,
        messages: &[ChatMessage],
        budget_ceiling: Option<f64>,
        now: i64,
    ) -> Result<RoutedRequest> {
        let auth = self.authenticate(authorization, now)?;
        let RouteOutcome { decision, analysis } =
            self.route(messages, &auth.identity, budget_ceiling);

        Ok(RoutedRequest {
            identity: auth.identity,
            decision,
            analysis,
            rate_limit: auth.rate_limit,
        })
    }

    /// Monitoring snapshot of routing counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    pub fn classifier(&self) -> &PromptClassifier {
        &self.classifier
    }
}
