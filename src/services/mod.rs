//! Business rules for accounts, tasks and teams.
//!
//! Every operation takes the store as `&dyn Store` and returns `AppError` on
//! failure. Services never call each other across domains except for shared
//! user resolution.

pub mod auth;
pub mod tasks;
pub mod teams;
