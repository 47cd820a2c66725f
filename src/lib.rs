#![doc = "The `taskdesk` library crate."]
#![doc = ""]
#![doc = "Domain models, storage, authentication, business rules and routing for the"]
#![doc = "TaskDesk task and team service. The binary (`main.rs`) wires these together"]
#![doc = "against Postgres; the test-suites wire them against the in-memory store."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use error::AppError;
pub use state::AppState;
