//! Workflow integration tests
//!
//! Tests for complete workflows that exercise multiple commands
//! and validate end-to-end behavior.

pub mod edge_cases;
pub mod feed_lifecycle;
pub mod follow;
pub mod resync;
