pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod services;

pub use app::{app, AppState};
