pub mod engine;
pub mod entity;
pub mod error;
pub mod planner;
pub mod scheduler;
pub mod score;
