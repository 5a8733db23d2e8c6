// src/scheduler/mod.rs
mod expiration;

pub use expiration::{ExpirationReport, ExpirationScheduler, RunTrigger};
