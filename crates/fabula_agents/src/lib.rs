//! Agent execution for the Fabula narrative pipeline.
//!
//! The [`AgentExecutor`] turns a [`PromptSet`](fabula_core::PromptSet) into a
//! [`RawOutput`](fabula_core::RawOutput) by calling a generation back end once
//! per agent, following the set's execution order:
//!
//! - **Parallel**: every call runs concurrently and all are awaited.
//! - **Sequential**: calls run in order and stop after a failed required call.
//! - **Conditional**: optional calls run only after unbroken success, fallback
//!   calls only after a failure; anything not run is recorded as skipped.
//!
//! A failing agent never fails the pass. Its error is captured in a failed
//! [`AgentResponse`](fabula_core::AgentResponse). Only cancellation aborts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod executor;
mod rewrite;
mod strategy;

pub use executor::AgentExecutor;
pub use rewrite::rewrite_prompt;
