//! Run supervisor for Ralph Mode agent loops.
//!
//! This crate implements the console core that supervises autonomous,
//! iterative code-change loops executed by external worker agents. After
//! every reported verification result it decides whether the loop continues,
//! pauses for human approval, aborts, or completes. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (circuit-breaker evaluation,
//!   fingerprinting, policy validation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting persistence (file-backed run, policy,
//!   iteration, and abort stores with atomic writes).
//!
//! The [`controller`] module coordinates core logic with I/O to implement
//! the externally visible control actions; [`api`] defines the wire payloads
//! consumed by the CLI in `main.rs`.

pub mod api;
pub mod controller;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
