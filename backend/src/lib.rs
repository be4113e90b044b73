//! Babylog Backend Library
//!
//! Baby activity tracking for families: activity logs, period summaries,
//! care guidelines and a streaming AI assistant. The modules are exposed
//! for integration tests.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
