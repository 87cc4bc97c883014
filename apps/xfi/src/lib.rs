//! xfi core library.
//!
//! This crate reconciles raw x-fidelity analysis results into one canonical
//! `ProcessedAnalysisResult` and distributes it to display consumers.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `coordinator`: Conversion, fan-out to consumers, and the result cache.
//! - `location`: Best-available location for a rule failure.
//! - `range`: Line-length-aware range validation.
//! - `enhanced`: Structured details recovered from rule payloads.
//! - `consumers`: The consumer capability and the built-in views.
//! - `models`: Raw input and processed output structs.
//! - `output`: Human/JSON printers for the reconcile command.
//! - `error`: Error types.
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod config;
pub mod consumers;
pub mod coordinator;
pub mod enhanced;
pub mod error;
pub mod location;
pub mod models;
pub mod output;
pub mod range;
pub mod utils;
