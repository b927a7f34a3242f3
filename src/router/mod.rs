//! Router Module
//!
//! Prompt classification, model selection and routing statistics.

pub mod classifier;
pub mod route;
pub mod selector;
pub mod stats;

pub use classifier::{code_patterns, CodePattern, PromptAnalysis, PromptClassifier, TaskType};
pub use route::ModelRoute;
pub use selector::{ModelSelector, RoutingDecision, Selection, SelectionBasis};
pub use stats::{RoutingStats, StatsSnapshot};
