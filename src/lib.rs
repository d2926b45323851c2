//! Municipal IT help-desk: report intake service and the dashboard client that
//! reads it back.

pub mod app_state;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod reports;
pub mod router;
pub mod services;
pub mod store;
pub mod utils;
