//! Configuration Module
//!
//! Handles router configuration loading and validation.

pub mod loader;
pub mod settings;

pub use loader::{parse_key_list, ConfigLoader, API_KEYS_ENV, CONFIG_PATH_ENV};
pub use settings::{
    BudgetConfig, BudgetOverlay, ClassificationConfig, ClassificationOverlay, ConfigOverlay,
    ModelPricing, PreferenceTable, PricingTable, RouterConfig,
};
