//! Interactivity - Multi-message conversations owned by listeners

pub mod engine;

pub use engine::InteractivityEngine;
