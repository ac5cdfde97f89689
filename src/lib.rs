//! autostrike: an attack simulation engine.
//!
//! Scenarios describe ordered phases of adversary techniques; the planner
//! expands a scenario against a set of enrolled agents into an ordered task
//! list, the engine tracks each task's outcome and scores the finished
//! execution, and the scheduler fires scenarios on recurring cadences.
//! Transport to agents is a seam (`scheduler::TaskDispatcher`), not a
//! concern of this crate.

pub mod auth;
pub mod core;
pub mod logging;
pub mod storage;
