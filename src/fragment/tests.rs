//! Unit tests for chunking, envelopes and reassembly.
//!
//! Tests are split into focused submodules to keep each file short and easy
//! to navigate.

mod chunker_tests;
