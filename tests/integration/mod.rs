//! Integration test suite for float-update
//!
//! End-to-end tests of the update pipeline. They run quickly and need no
//! network access: HTTP tests talk to an in-process server bound to
//! 127.0.0.1.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **controller**: Update sessions driven through in-memory ports
//! - **http**: Real HTTP oracle, transfer engine and package store
//! - **cli**: The `float-update` binary

mod cli;
mod controller;
mod http;
