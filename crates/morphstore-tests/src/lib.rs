//! Morphstore test & validation infrastructure
//!
//! Cross-crate integration scenarios for the transformation engine and the
//! chunked object layer, plus property tests over the full write/read
//! pipeline.

pub mod harness;

mod pipeline_tests;

pub use harness::TestStore;
