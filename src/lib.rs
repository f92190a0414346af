//! # WP Sync Library
//!
//! This library provides the core functionality for the WP Sync service:
//! the WordPress-to-document-store sync engine, its HTTP management API,
//! and the background scheduler.

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod store;
pub mod telemetry;
pub use migration;
