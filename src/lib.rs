//! Synergy: an interactive terminal client for LLM chat providers.
//!
//! The binary in `main.rs` owns the REPL loop; everything stateful lives in
//! [`app::Session`] and is mutated only through [`commands::execute`].

pub mod app;
pub mod commands;
pub mod convo;
pub mod exec;
pub mod models;
pub mod query;
pub mod stack;
