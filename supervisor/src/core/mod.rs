//! Deterministic, pure logic for the run supervisor.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod breaker;
pub mod fingerprint;
pub mod policy;
pub mod types;
