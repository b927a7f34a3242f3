//! API Module
//!
//! Request-side types shared with the upstream request handler.

pub mod message;

pub use message::{ChatMessage, Role};
