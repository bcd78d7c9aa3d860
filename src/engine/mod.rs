//! Execution engine for pushsync
//!
//! The engine orchestrates:
//! 1. Planning - Build one unit per entity from config and state
//! 2. Diffing - Display the classified changes
//! 3. Executing - Confirm, apply in parallel and report

pub mod differ;
pub mod executor;
pub mod planner;

pub use planner::{Mode, build_units};
