//! Router Configuration
//!
//! Defines the configuration schema: allow-listed keys, quota defaults,
//! classification thresholds, per-task model preferences and pricing.

use crate::admission::RateLimits;
use crate::error::{Result, RouterError};
use crate::router::{ModelRoute, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Provider -> model -> pricing
pub type PricingTable = HashMap<String, HashMap<String, ModelPricing>>;

/// Task type -> ordered candidate routes, most preferred first
pub type PreferenceTable = BTreeMap<TaskType, Vec<ModelRoute>>;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Allow-listed API keys
    #[serde(skip_serializing)]
    pub api_keys: Vec<String>,

    /// Default per-identity quota
    pub rate_limits: RateLimits,

    /// Prompt classifier thresholds
    pub classification: ClassificationConfig,

    /// Ordered model preferences per task type
    pub preferences: PreferenceTable,

    /// Per-1k-token prices keyed by provider, then model
    pub pricing: PricingTable,

    /// Budget filtering fallbacks
    pub budget: BudgetConfig,
}

/// Thresholds consumed by the prompt classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Minimum code confidence for the `code` task type
    pub code_threshold: f64,

    /// Minimum complexity confidence for the `complex` task type
    pub complexity_threshold: f64,

    /// Simple queries must be shorter than this many characters
    pub simple_query_max_length: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            code_threshold: 0.3,
            complexity_threshold: 0.5,
            simple_query_max_length: 100,
        }
    }
}

/// Price of a model per 1k tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// What to do when nothing fits the caller's budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Ceilings below this use the cheapest known model when nothing fits
    pub minimum_ceiling: f64,

    /// Designated cheapest model; when unset, the cheapest priced model is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheapest_model: Option<ModelRoute>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            minimum_ceiling: 0.001,
            cheapest_model: None,
        }
    }
}

/// A partial configuration read from one source
///
/// Map entries override per key. `rate_limits` replaces the whole section;
/// `classification` and `budget` override only the fields they set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverlay {
    pub api_keys: Vec<String>,
    pub rate_limits: Option<RateLimits>,
    pub classification: ClassificationOverlay,
    pub preferences: PreferenceTable,
    pub pricing: PricingTable,
    pub budget: BudgetOverlay,
}

/// Classification fields set by one source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassificationOverlay {
    pub code_threshold: Option<f64>,
    pub complexity_threshold: Option<f64>,
    pub simple_query_max_length: Option<usize>,
}

/// Budget fields set by one source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BudgetOverlay {
    pub minimum_ceiling: Option<f64>,
    pub cheapest_model: Option<ModelRoute>,
}

impl RouterConfig {
    /// Apply an overlay on top of this configuration
    pub fn merge(&mut self, overlay: ConfigOverlay) {
        self.add_api_keys(overlay.api_keys);

        if let Some(limits) = overlay.rate_limits {
            self.rate_limits = limits;
        }

        let c = overlay.classification;
        if let Some(v) = c.code_threshold {
            self.classification.code_threshold = v;
        }
        if let Some(v) = c.complexity_threshold {
            self.classification.complexity_threshold = v;
        }
        if let Some(v) = c.simple_query_max_length {
            self.classification.simple_query_max_length = v;
        }

        if let Some(v) = overlay.budget.minimum_ceiling {
            self.budget.minimum_ceiling = v;
        }
        if let Some(route) = overlay.budget.cheapest_model {
            self.budget.cheapest_model = Some(route);
        }

        for (task, routes) in overlay.preferences {
            self.preferences.insert(task, routes);
        }

        for (provider, models) in overlay.pricing {
            self.pricing.entry(provider).or_default().extend(models);
        }
    }

    /// Add keys to the allow-list, skipping blanks and duplicates
    pub fn add_api_keys<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        for key in keys {
            let key = key.trim();
            if !key.is_empty() && !self.api_keys.iter().any(|k| k == key) {
                self.api_keys.push(key.to_string());
            }
        }
    }

    /// Look up the price of a route
    pub fn price_of(&self, route: &ModelRoute) -> Option<ModelPricing> {
        self.pricing
            .get(&route.provider)
            .and_then(|models| models.get(&route.model))
            .copied()
    }

    /// Check the configuration is usable; run once at startup
    pub fn validate(&self) -> Result<()> {
        match self.preferences.get(&TaskType::General) {
            Some(routes) if !routes.is_empty() => {}
            _ => {
                return Err(RouterError::Config(
                    "preference list for task type 'general' is missing or empty".to_string(),
                ))
            }
        }

        for (task, routes) in &self.preferences {
            if routes.is_empty() {
                return Err(RouterError::Config(format!(
                    "preference list for task type '{}' is empty",
                    task
                )));
            }
        }

        let c = &self.classification;
        for (name, value) in [
            ("code_threshold", c.code_threshold),
            ("complexity_threshold", c.complexity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RouterError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.rate_limits.requests_per_minute == 0 || self.rate_limits.requests_per_hour == 0 {
            return Err(RouterError::Config(
                "rate limits must be greater than zero".to_string(),
            ));
        }

        for (provider, models) in &self.pricing {
            for (model, price) in models {
                if !(price.input_per_1k >= 0.0 && price.output_per_1k >= 0.0) {
                    return Err(RouterError::Config(format!(
                        "pricing for {}/{} must be non-negative",
                        provider, model
                    )));
                }
            }
        }

        if self.budget.minimum_ceiling < 0.0 {
            return Err(RouterError::Config(
                "budget.minimum_ceiling must be non-negative".to_string(),
            ));
        }

        if let Some(route) = &self.budget.cheapest_model {
            if self.price_of(route).is_none() {
                return Err(RouterError::Config(format!(
                    "budget.cheapest_model {} has no pricing entry",
                    route
                )));
            }
        }

        Ok(())
    }
}
