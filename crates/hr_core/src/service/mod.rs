//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate session and query calls into use-case level APIs.
//! - Keep the CLI decoupled from session internals.

pub mod staff_service;
