//! Integration tests module
//!
//! End-to-end tests for the country atlas against mock upstream servers
//! and a temporary SQLite database, including:
//! - Complete fetch → build → upsert → summarize pipeline
//! - REST API behavior
//! - Error handling and rollback scenarios

#![allow(dead_code)]

pub mod api_test;
pub mod fixtures;
