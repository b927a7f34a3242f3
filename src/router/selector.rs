//! Model Selection
//!
//! Picks a route from the configured preference list for a task type,
//! optionally filtered by a per-request budget ceiling.

use crate::config::{BudgetConfig, PreferenceTable, PricingTable, RouterConfig};
use crate::error::{Result, RouterError};
use crate::router::classifier::{PromptAnalysis, TaskType};
use crate::router::route::ModelRoute;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Assumed request size, in tokens, for budget estimates
pub const ASSUMED_REQUEST_TOKENS: f64 = 100.0;

/// Prompts longer than this are called out in the reasoning
const LONG_PROMPT_CHARS: usize = 1000;

/// Conversations with more messages than this are called out in the reasoning
const MULTI_TURN_MESSAGES: usize = 5;

/// How a route was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionBasis {
    /// First preference, no budget given
    Preferred,
    /// Cheapest preference within the budget ceiling
    WithinBudget,
    /// Nothing fit a very low ceiling; cheapest known model
    CheapestFallback,
    /// Nothing fit the ceiling; first preference regardless of cost
    BudgetFallback,
}

/// Raw outcome of [`ModelSelector::select`]
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub route: ModelRoute,
    pub estimated_cost: Option<f64>,
    pub basis: SelectionBasis,
}

/// Final routing answer handed back to the request handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub provider: String,
    pub model: String,
    /// Human-readable justification; descriptive only
    pub reasoning: String,
    pub task_type: TaskType,
    /// Estimated cost of a typical request, when the route is priced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    pub basis: SelectionBasis,
}

/// Cost-aware selection over static preference and pricing tables
#[derive(Debug, Clone)]
pub struct ModelSelector {
    preferences: PreferenceTable,
    pricing: PricingTable,
    budget: BudgetConfig,
    default_route: ModelRoute,
}

impl ModelSelector {
    /// Build a selector; empty preference lists are rejected here
    pub fn new(
        preferences: PreferenceTable,
        pricing: PricingTable,
        budget: BudgetConfig,
    ) -> Result<Self> {
        if let Some((task, _)) = preferences.iter().find(|(_, routes)| routes.is_empty()) {
            return Err(RouterError::Config(format!(
                "preference list for task type '{}' is empty",
                task
            )));
        }

        let default_route = preferences
            .get(&TaskType::General)
            .and_then(|routes| routes.first())
            .cloned()
            .ok_or_else(|| {
                RouterError::Config(
                    "preference list for task type 'general' is missing or empty".to_string(),
                )
            })?;

        Ok(Self {
            preferences,
            pricing,
            budget,
            default_route,
        })
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        Self::new(
            config.preferences.clone(),
            config.pricing.clone(),
            config.budget.clone(),
        )
    }

    /// Ordered candidates for a task type, falling back to `general`
    pub fn preferences_for(&self, task: TaskType) -> &[ModelRoute] {
        self.preferences
            .get(&task)
            .or_else(|| self.preferences.get(&TaskType::General))
            .map(Vec::as_slice)
            .unwrap_or(std::slice::from_ref(&self.default_route))
    }

    /// Estimated cost of a typical request on `route`, if it is priced
    pub fn estimate_cost(&self, route: &ModelRoute) -> Option<f64> {
        self.pricing
            .get(&route.provider)
            .and_then(|models| models.get(&route.model))
            .map(|price| price.input_per_1k * ASSUMED_REQUEST_TOKENS / 1000.0)
    }

    /// Choose a route for a task type under an optional budget ceiling
    pub fn select(&self, task: TaskType, budget_ceiling: Option<f64>) -> Selection {
        let routes = self.preferences_for(task);
        let first = routes.first().unwrap_or(&self.default_route);

        let Some(ceiling) = budget_ceiling else {
            return self.selection(first, SelectionBasis::Preferred);
        };

        let mut affordable: Vec<(&ModelRoute, f64)> = routes
            .iter()
            .filter_map(|route| self.estimate_cost(route).map(|cost| (route, cost)))
            .filter(|&(_, cost)| cost <= ceiling)
            .collect();
        affordable.sort_by(|a, b| a.1.total_cmp(&b.1));

        if let Some(&(route, cost)) = affordable.first() {
            return Selection {
                route: route.clone(),
                estimated_cost: Some(cost),
                basis: SelectionBasis::WithinBudget,
            };
        }

        if ceiling < self.budget.minimum_ceiling {
            let cheapest = self
                .budget
                .cheapest_model
                .clone()
                .or_else(|| self.cheapest_priced())
                .unwrap_or_else(|| first.clone());
            return self.selection(&cheapest, SelectionBasis::CheapestFallback);
        }

        self.selection(first, SelectionBasis::BudgetFallback)
    }

    /// Select a route for an analysed prompt and explain the choice
    pub fn decide(
        &self,
        analysis: &PromptAnalysis,
        budget_ceiling: Option<f64>,
    ) -> RoutingDecision {
        let selection = self.select(analysis.task_type, budget_ceiling);
        let reasoning = reasoning(analysis, &selection, budget_ceiling);

        RoutingDecision {
            provider: selection.route.provider,
            model: selection.route.model,
            reasoning,
            task_type: analysis.task_type,
            estimated_cost: selection.estimated_cost,
            basis: selection.basis,
        }
    }

    fn selection(&self, route: &ModelRoute, basis: SelectionBasis) -> Selection {
        Selection {
            route: route.clone(),
            estimated_cost: self.estimate_cost(route),
            basis,
        }
    }

    /// Cheapest priced model overall; ties broken by name for determinism
    fn cheapest_priced(&self) -> Option<ModelRoute> {
        self.pricing
            .iter()
            .flat_map(|(provider, models)| {
                models
                    .keys()
                    .map(move |model| ModelRoute::new(provider.clone(), model.clone()))
            })
            .filter_map(|route| self.estimate_cost(&route).map(|cost| (route, cost)))
            .min_by(|a, b| match a.1.total_cmp(&b.1) {
                Ordering::Equal => a.0.to_string().cmp(&b.0.to_string()),
                other => other,
            })
            .map(|(route, _)| route)
    }
}

fn reasoning(analysis: &PromptAnalysis, selection: &Selection, ceiling: Option<f64>) -> String {
    let mut reasons = Vec::new();

    if analysis.has_code {
        reasons.push(format!(
            "Code detected (confidence: {:.2})",
            analysis.code_confidence
        ));
    }
    if analysis.has_complexity {
        reasons.push(format!(
            "Complex analysis required (confidence: {:.2})",
            analysis.complexity_confidence
        ));
    }
    if analysis.is_simple {
        reasons.push(format!(
            "Simple query detected (length: {} chars)",
            analysis.total_length
        ));
    }
    if analysis.total_length > LONG_PROMPT_CHARS {
        reasons.push("Long prompt requires capable model".to_string());
    }
    if analysis.message_count > MULTI_TURN_MESSAGES {
        reasons.push("Multi-turn conversation".to_string());
    }

    let mut text = format!("Task type: {}", analysis.task_type);
    if !reasons.is_empty() {
        text.push_str(&format!(" ({})", reasons.join(", ")));
    }
    text.push_str(&format!(
        ". Selected {} for optimal {} performance",
        selection.route, analysis.task_type
    ));

    let ceiling = ceiling.unwrap_or_default();
    match selection.basis {
        SelectionBasis::Preferred => {}
        SelectionBasis::WithinBudget => text.push_str(&format!(
            ". Cheapest preference within budget ${:.6}",
            ceiling
        )),
        SelectionBasis::CheapestFallback => text.push_str(&format!(
            ". No preference fits budget ${:.6}; fallback to cheapest known model",
            ceiling
        )),
        SelectionBasis::BudgetFallback => text.push_str(&format!(
            ". No preference fits budget ${:.6}; fallback to first preference",
            ceiling
        )),
    }

    text
}
