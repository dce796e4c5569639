//! Data models for the task backend.
//!
//! - `Identity`: who the current token says the user is
//! - `UserProfile`, `UserRole`: account data as the backend reports it
//! - `Task`, `NewTask`, `TaskUpdate`, `TaskFilter`: task resources and queries
//! - `SystemStats`: admin overview counters

pub mod task;
pub mod user;

pub use task::{NewTask, SystemStats, Task, TaskFilter, TaskSort, TaskStatus, TaskUpdate};
pub use user::{Identity, UserProfile, UserRole};
