// src/leave/mod.rs
mod client;
mod service;

pub use client::{HttpLeaveService, LeaveServiceError};
pub use service::{LeaveManagementService, LeaveStep};
