mod common;
mod drafts;
mod metrics;
