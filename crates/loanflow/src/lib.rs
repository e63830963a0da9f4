//! Core building blocks for the commercial loan application service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
