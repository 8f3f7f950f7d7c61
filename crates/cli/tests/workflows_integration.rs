//! Integration tests for sfeed
//!
//! End-to-end workflows driving the built binary against temporary
//! repositories.

mod common;
mod workflows;
