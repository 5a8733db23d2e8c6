// src/lib.rs
pub mod config;
pub mod guard;
pub mod health;
pub mod leave;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod server;
pub mod timezone;
