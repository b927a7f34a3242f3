//! Model Routes
//!
//! A `(provider, model)` pair, written `provider/model` in configuration.

use crate::error::{Result, RouterError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A provider/model combination that can serve a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelRoute {
    /// Provider name (e.g., "openai", "groq")
    pub provider: String,

    /// Model name as the provider knows it; may itself contain `/`
    pub model: String,
}

impl ModelRoute {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse a route string in the format "provider/model"
    pub fn parse(route: &str) -> Result<Self> {
        match route.trim().split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self::new(provider, model))
            }
            _ => Err(RouterError::Config(format!(
                "Invalid route '{}'. Expected 'provider/model'",
                route
            ))),
        }
    }
}

impl fmt::Display for ModelRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl TryFrom<String> for ModelRoute {
    type Error = RouterError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ModelRoute> for String {
    fn from(route: ModelRoute) -> Self {
        route.to_string()
    }
}
