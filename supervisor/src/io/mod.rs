//! Persistence for supervisor state.

pub mod abort_log;
pub mod atomic;
pub mod ledger;
pub mod paths;
pub mod policy_store;
pub mod run_store;
