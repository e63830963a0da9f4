//! Workflow modules grouped by business process.

pub mod origination;
