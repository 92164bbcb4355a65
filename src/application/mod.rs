//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Messaging: handler pipes, command parsing and dispatching
//! - Auth: command locality and privilege checks
//! - Interactivity: per-chat conversations
//! - Services: built-in commands and observers
//! - Errors: Domain-specific errors

pub mod auth;
pub mod errors;
pub mod interactivity;
pub mod messaging;
pub mod services;
