//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the player core:
//! - Logging and tracing infrastructure
//! - Configuration and capability injection
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback engine depends on.
//! It establishes the logging conventions, the fail-fast capability checks and
//! the event broadcasting used by the rest of the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
