pub mod calendar;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod output;
pub mod roster;
pub mod schedule;
pub mod server;
pub mod store;
pub mod taxonomy;
pub mod workflow;
