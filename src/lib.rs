//! Workbook-driven automation for RV&S change-tracking operations.
//!
//! The pipeline is plan/validate/execute/audit: a registry of operation
//! definitions maps workbook sheets to external CLI commands, a validator
//! blocks structurally broken input, a planner renders side-effect-free
//! command descriptions, an executor runs (or simulates) them sequentially,
//! and an audit writer appends one ledger row per executed operation.

pub mod audit;
pub mod cli;
pub mod config;
pub mod exec;
pub mod extract;
pub mod plan;
pub mod registry;
pub mod util;
pub mod validate;
pub mod workbook;
